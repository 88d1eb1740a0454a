use rusqlite::Connection;

use crate::db::models::{FeedItem, ReactionKind, Viewer};
use crate::error::AppResult;
use crate::ledger::{comments, posts, reactions};

/// Compose every post with its comments, counts and the viewer's own reactions.
///
/// Run this on a single read transaction (see `db::read`) so a write that
/// commits halfway through assembly is either fully visible or not at all.
pub fn assemble_feed(conn: &Connection, viewer: &Viewer) -> AppResult<Vec<FeedItem>> {
    let posts = posts::list_posts(conn)?;
    let mut items = Vec::with_capacity(posts.len());

    for post in posts {
        let comments = comments::list_comments(conn, post.id)?;
        let counts = reactions::counts(conn, post.id)?;
        let mine = match viewer.user_id() {
            Some(user_id) => reactions::reacted_kinds(conn, post.id, user_id)?,
            None => Default::default(),
        };
        let viewer_reacted = ReactionKind::ALL
            .iter()
            .map(|kind| (*kind, mine.contains(kind)))
            .collect();

        items.push(FeedItem {
            post,
            comments,
            counts,
            viewer_reacted,
        });
    }

    Ok(items)
}
