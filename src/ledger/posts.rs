use rusqlite::{params, Connection, Row};

use crate::db::{
    self,
    models::{from_micros, Post, PostId, UserId, Viewer},
};
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub const MAX_POST_CHARS: usize = 2000;

/// Append a post by the viewer. The body is stored trimmed.
pub fn create_post(pool: &DbPool, author: &Viewer, body: &str) -> AppResult<PostId> {
    let author_id = author.require()?;
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::InvalidInput("Post body cannot be empty".into()));
    }
    if body.chars().count() > MAX_POST_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Post body must be {} characters or less",
            MAX_POST_CHARS
        )));
    }

    let post_id = db::write(pool, |tx| {
        let created_at = db::next_timestamp(tx, "posts")?;
        tx.execute(
            "INSERT INTO posts (author_id, body, created_at) VALUES (?1, ?2, ?3)",
            params![author_id.as_str(), body, created_at],
        )?;
        Ok(PostId(tx.last_insert_rowid()))
    })?;

    tracing::info!(post_id = %post_id, author_id = %author_id, "Created post");
    Ok(post_id)
}

/// All posts, newest first. Equal timestamps fall back to id, newest first.
pub fn list_posts(conn: &Connection) -> AppResult<Vec<Post>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.author_id, u.username, p.body, p.created_at
         FROM posts p
         JOIN users u ON u.id = p.author_id
         ORDER BY p.created_at DESC, p.id DESC",
    )?;

    let posts = stmt
        .query_map([], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

/// `NotFound` unless the post exists.
pub fn ensure_post_exists(conn: &Connection, post_id: PostId) -> AppResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
        params![post_id.0],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: PostId(row.get(0)?),
        author_id: UserId(row.get(1)?),
        author_username: row.get(2)?,
        body: row.get(3)?,
        created_at: from_micros(row.get(4)?),
    })
}
