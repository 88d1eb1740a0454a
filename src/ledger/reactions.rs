use std::collections::BTreeSet;

use rusqlite::{params, Connection};

use super::posts::ensure_post_exists;
use crate::db::{
    self,
    models::{PostId, ReactionCounts, ReactionKind, ReactionOutcome, UnreactOutcome, UserId, Viewer},
};
use crate::error::AppResult;
use crate::state::DbPool;

/// Record a reaction. Repeating an identical reaction is a no-op.
///
/// Uniqueness of (post, user, kind) is enforced by the table's UNIQUE
/// constraint through `ON CONFLICT DO NOTHING`, so concurrent duplicates
/// cannot both insert.
pub fn react(
    pool: &DbPool,
    viewer: &Viewer,
    post_id: PostId,
    kind: ReactionKind,
) -> AppResult<ReactionOutcome> {
    let user_id = viewer.require()?;

    let inserted = db::write(pool, |tx| {
        ensure_post_exists(tx, post_id)?;
        Ok(tx.execute(
            "INSERT INTO reactions (post_id, user_id, kind, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (post_id, user_id, kind) DO NOTHING",
            params![post_id.0, user_id.as_str(), kind, db::now_micros()],
        )?)
    })?;

    if inserted == 0 {
        tracing::debug!(post_id = %post_id, user_id = %user_id, %kind, "Already reacted");
        Ok(ReactionOutcome::AlreadyReacted)
    } else {
        tracing::info!(post_id = %post_id, user_id = %user_id, %kind, "Added reaction");
        Ok(ReactionOutcome::Added)
    }
}

/// Withdraw a reaction. Withdrawing one that is not there is a no-op.
pub fn unreact(
    pool: &DbPool,
    viewer: &Viewer,
    post_id: PostId,
    kind: ReactionKind,
) -> AppResult<UnreactOutcome> {
    let user_id = viewer.require()?;

    let deleted = db::write(pool, |tx| {
        ensure_post_exists(tx, post_id)?;
        Ok(tx.execute(
            "DELETE FROM reactions WHERE post_id = ?1 AND user_id = ?2 AND kind = ?3",
            params![post_id.0, user_id.as_str(), kind],
        )?)
    })?;

    Ok(if deleted == 0 {
        UnreactOutcome::NotReacted
    } else {
        tracing::info!(post_id = %post_id, user_id = %user_id, %kind, "Removed reaction");
        UnreactOutcome::Removed
    })
}

/// Reaction totals for a post. Every kind is present, zero if unused.
pub fn counts(conn: &Connection, post_id: PostId) -> AppResult<ReactionCounts> {
    ensure_post_exists(conn, post_id)?;

    let mut counts: ReactionCounts = ReactionKind::ALL.iter().map(|k| (*k, 0)).collect();

    let mut stmt = conn.prepare(
        "SELECT kind, COUNT(*) FROM reactions WHERE post_id = ?1 GROUP BY kind",
    )?;
    let rows = stmt.query_map(params![post_id.0], |row| {
        Ok((row.get::<_, ReactionKind>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        counts.insert(kind, count);
    }

    Ok(counts)
}

/// The kinds `user_id` currently holds on a post.
pub fn reacted_kinds(
    conn: &Connection,
    post_id: PostId,
    user_id: &UserId,
) -> AppResult<BTreeSet<ReactionKind>> {
    let mut stmt =
        conn.prepare("SELECT kind FROM reactions WHERE post_id = ?1 AND user_id = ?2")?;
    let kinds = stmt
        .query_map(params![post_id.0, user_id.as_str()], |row| row.get(0))?
        .collect::<Result<BTreeSet<ReactionKind>, _>>()?;
    Ok(kinds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_user, test_pool};
    use crate::error::AppError;
    use crate::ledger::posts::create_post;

    fn user(id: &str) -> Viewer {
        Viewer::User(UserId::new(id))
    }

    fn setup() -> (tempfile::TempDir, DbPool, PostId) {
        let (tmp, pool) = test_pool();
        insert_user(&pool, "u-alice", "alice");
        insert_user(&pool, "u-bob", "bob");
        let post = create_post(&pool, &user("u-alice"), "hello world").unwrap();
        (tmp, pool, post)
    }

    fn row_count(pool: &DbPool) -> i64 {
        let conn = pool.get().unwrap();
        conn.query_row("SELECT COUNT(*) FROM reactions", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn repeated_reaction_is_stored_once() {
        let (_tmp, pool, post) = setup();
        let bob = user("u-bob");

        assert_eq!(
            react(&pool, &bob, post, ReactionKind::Heart).unwrap(),
            ReactionOutcome::Added
        );
        assert_eq!(
            react(&pool, &bob, post, ReactionKind::Heart).unwrap(),
            ReactionOutcome::AlreadyReacted
        );

        assert_eq!(row_count(&pool), 1);
        let conn = pool.get().unwrap();
        assert_eq!(counts(&conn, post).unwrap()[&ReactionKind::Heart], 1);
    }

    #[test]
    fn both_kinds_are_independent() {
        let (_tmp, pool, post) = setup();
        let bob = user("u-bob");
        react(&pool, &bob, post, ReactionKind::ThumbsUp).unwrap();
        react(&pool, &bob, post, ReactionKind::Heart).unwrap();
        react(&pool, &user("u-alice"), post, ReactionKind::Heart).unwrap();

        let conn = pool.get().unwrap();
        let counts = counts(&conn, post).unwrap();
        assert_eq!(counts[&ReactionKind::ThumbsUp], 1);
        assert_eq!(counts[&ReactionKind::Heart], 2);
    }

    #[test]
    fn counts_report_zero_for_unused_kinds() {
        let (_tmp, pool, post) = setup();
        let conn = pool.get().unwrap();
        let counts = counts(&conn, post).unwrap();
        assert_eq!(counts.len(), ReactionKind::ALL.len());
        assert!(counts.values().all(|c| *c == 0));
    }

    #[test]
    fn anonymous_reaction_is_unauthorized() {
        let (_tmp, pool, post) = setup();
        assert!(matches!(
            react(&pool, &Viewer::Anonymous, post, ReactionKind::Heart),
            Err(AppError::Unauthorized)
        ));
        assert_eq!(row_count(&pool), 0);
    }

    #[test]
    fn unknown_post_is_not_found() {
        let (_tmp, pool, _post) = setup();
        assert!(matches!(
            react(&pool, &user("u-bob"), PostId(999), ReactionKind::Heart),
            Err(AppError::NotFound)
        ));
        let conn = pool.get().unwrap();
        assert!(matches!(counts(&conn, PostId(999)), Err(AppError::NotFound)));
    }

    #[test]
    fn unreact_removes_only_that_kind() {
        let (_tmp, pool, post) = setup();
        let bob = user("u-bob");
        react(&pool, &bob, post, ReactionKind::ThumbsUp).unwrap();
        react(&pool, &bob, post, ReactionKind::Heart).unwrap();

        assert_eq!(
            unreact(&pool, &bob, post, ReactionKind::Heart).unwrap(),
            UnreactOutcome::Removed
        );
        assert_eq!(
            unreact(&pool, &bob, post, ReactionKind::Heart).unwrap(),
            UnreactOutcome::NotReacted
        );

        let conn = pool.get().unwrap();
        let kinds = reacted_kinds(&conn, post, &UserId::new("u-bob")).unwrap();
        assert_eq!(kinds.into_iter().collect::<Vec<_>>(), vec![ReactionKind::ThumbsUp]);
    }

    #[test]
    fn unreact_requires_login() {
        let (_tmp, pool, post) = setup();
        assert!(matches!(
            unreact(&pool, &Viewer::Anonymous, post, ReactionKind::Heart),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn concurrent_identical_reactions_store_one_row() {
        let (_tmp, pool, post) = setup();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    react(&pool, &user("u-bob"), post, ReactionKind::ThumbsUp).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<ReactionOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let added = outcomes
            .iter()
            .filter(|o| **o == ReactionOutcome::Added)
            .count();
        assert_eq!(added, 1);
        assert_eq!(row_count(&pool), 1);
    }
}
