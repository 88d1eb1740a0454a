use rusqlite::{params, Connection};

use super::posts::ensure_post_exists;
use crate::db::{
    self,
    models::{from_micros, Comment, CommentId, PostId, UserId, Viewer},
};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub const MAX_COMMENT_CHARS: usize = 500;

pub fn add_comment(
    pool: &DbPool,
    author: &Viewer,
    post_id: PostId,
    body: &str,
) -> AppResult<CommentId> {
    let author_id = author.require()?;
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::InvalidInput("Comment cannot be empty".into()));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Comment must be {} characters or less",
            MAX_COMMENT_CHARS
        )));
    }

    let comment_id = db::write(pool, |tx| {
        ensure_post_exists(tx, post_id)?;
        let created_at = db::next_timestamp(tx, "comments")?;
        tx.execute(
            "INSERT INTO comments (post_id, author_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![post_id.0, author_id.as_str(), body, created_at],
        )?;
        Ok(CommentId(tx.last_insert_rowid()))
    })?;

    tracing::info!(comment_id = %comment_id, post_id = %post_id, "Added comment");
    Ok(comment_id)
}

/// Comments on one post in the order they were written.
pub fn list_comments(conn: &Connection, post_id: PostId) -> AppResult<Vec<Comment>> {
    ensure_post_exists(conn, post_id)?;

    let mut stmt = conn.prepare(
        "SELECT c.id, c.author_id, u.username, c.body, c.created_at
         FROM comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.id ASC",
    )?;

    let comments = stmt
        .query_map(params![post_id.0], |row| {
            Ok(Comment {
                id: CommentId(row.get(0)?),
                post_id,
                author_id: UserId(row.get(1)?),
                author_username: row.get(2)?,
                body: row.get(3)?,
                created_at: from_micros(row.get(4)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_user, test_pool};
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

    #[test]
    fn comments_come_back_in_order_added() {
        let (_tmp, pool, post) = setup();
        let bodies = ["one", "two", "three", "four"];
        for (i, body) in bodies.iter().enumerate() {
            let who = if i % 2 == 0 { "u-bob" } else { "u-alice" };
            add_comment(&pool, &user(who), post, body).unwrap();
        }

        let conn = pool.get().unwrap();
        let listed: Vec<String> = list_comments(&conn, post)
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(listed, bodies);
    }

    #[test]
    fn equal_timestamps_fall_back_to_id() {
        let (_tmp, pool, post) = setup();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO comments (post_id, author_id, body, created_at) VALUES (?1, 'u-bob', 'later', 2000)",
            params![post.0],
        )
        .unwrap();
        for body in ["first", "second"] {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, body, created_at) VALUES (?1, 'u-bob', ?2, 1000)",
                params![post.0, body],
            )
            .unwrap();
        }

        let listed: Vec<String> = list_comments(&conn, post)
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(listed, vec!["first", "second", "later"]);
    }

    #[test]
    fn comment_carries_author() {
        let (_tmp, pool, post) = setup();
        add_comment(&pool, &user("u-bob"), post, "hi alice").unwrap();
        let conn = pool.get().unwrap();
        let comments = list_comments(&conn, post).unwrap();
        assert_eq!(comments[0].author_username, "bob");
        assert_eq!(comments[0].post_id, post);
    }

    #[test]
    fn anonymous_cannot_comment() {
        let (_tmp, pool, post) = setup();
        assert!(matches!(
            add_comment(&pool, &Viewer::Anonymous, post, "hi"),
            Err(AppError::Unauthorized)
        ));
        let conn = pool.get().unwrap();
        assert!(list_comments(&conn, post).unwrap().is_empty());
    }

    #[test]
    fn unknown_post_is_not_found() {
        let (_tmp, pool, _post) = setup();
        assert!(matches!(
            add_comment(&pool, &user("u-bob"), PostId(424242), "hi"),
            Err(AppError::NotFound)
        ));
        let conn = pool.get().unwrap();
        assert!(matches!(
            list_comments(&conn, PostId(424242)),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn empty_comment_is_invalid() {
        let (_tmp, pool, post) = setup();
        assert!(matches!(
            add_comment(&pool, &user("u-bob"), post, "  "),
            Err(AppError::InvalidInput(_))
        ));
        let long = "c".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(
            add_comment(&pool, &user("u-bob"), post, &long),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn identity_is_checked_before_input() {
        let (_tmp, pool, _post) = setup();
        assert!(matches!(
            add_comment(&pool, &Viewer::Anonymous, PostId(424242), ""),
            Err(AppError::Unauthorized)
        ));
    }
}
