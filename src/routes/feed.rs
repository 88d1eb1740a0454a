use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::models::{FeedItem, PostId, ReactionKind};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::Html;
use crate::state::AppState;

// --- View structs ---

pub struct FeedPost {
    pub id: i64,
    pub username: String,
    pub body: String,
    pub created_at: String,
    pub reactions: Vec<ReactionButton>,
    pub comments: Vec<FeedComment>,
}

pub struct ReactionButton {
    pub kind: &'static str,
    pub emoji: &'static str,
    pub count: i64,
    pub reacted: bool,
}

pub struct FeedComment {
    pub username: String,
    pub body: String,
    pub created_at: String,
}

// --- Templates ---

#[derive(Template)]
#[template(path = "pages/feed.html")]
pub struct FeedTemplate {
    pub posts: Vec<FeedPost>,
    pub username: Option<String>,
}

// --- Forms ---

#[derive(Deserialize)]
pub struct CreatePostForm {
    pub body: String,
}

#[derive(Deserialize)]
pub struct ReactionForm {
    pub kind: String,
}

#[derive(Deserialize)]
pub struct CreateCommentForm {
    pub body: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(feed_page))
        .route("/posts", post(create_post))
        .route("/posts/{id}/comments", post(create_comment))
        .route("/posts/{id}/reactions", post(react))
        .route("/posts/{id}/reactions/delete", post(unreact))
}

// --- Handlers ---

async fn feed_page(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Html<FeedTemplate>> {
    let username = match viewer.user_id() {
        Some(id) => Some(state.social.username_of(id)?),
        None => None,
    };
    let items = state.social.assemble_feed(&viewer)?;
    let posts = items.into_iter().map(to_view).collect();

    Ok(Html(FeedTemplate { posts, username }))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CreatePostForm>,
) -> AppResult<Response> {
    state.social.create_post(&user.viewer(), &form.body)?;
    Ok(Redirect::to("/").into_response())
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<CreateCommentForm>,
) -> AppResult<Response> {
    state
        .social
        .add_comment(&user.viewer(), PostId(post_id), &form.body)?;
    Ok(Redirect::to("/").into_response())
}

async fn react(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<ReactionForm>,
) -> AppResult<Response> {
    state
        .social
        .react(&user.viewer(), PostId(post_id), &form.kind)?;
    Ok(Redirect::to("/").into_response())
}

async fn unreact(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
    Form(form): Form<ReactionForm>,
) -> AppResult<Response> {
    state
        .social
        .unreact(&user.viewer(), PostId(post_id), &form.kind)?;
    Ok(Redirect::to("/").into_response())
}

// --- View mapping ---

fn to_view(item: FeedItem) -> FeedPost {
    let reactions = ReactionKind::ALL
        .iter()
        .map(|kind| ReactionButton {
            kind: kind.as_str(),
            emoji: kind.emoji(),
            count: item.counts.get(kind).copied().unwrap_or(0),
            reacted: item.viewer_reacted.get(kind).copied().unwrap_or(false),
        })
        .collect();

    let comments = item
        .comments
        .into_iter()
        .map(|c| FeedComment {
            username: c.author_username,
            body: c.body,
            created_at: format_relative_time(&c.created_at),
        })
        .collect();

    FeedPost {
        id: item.post.id.0,
        username: item.post.author_username,
        body: item.post.body,
        created_at: format_relative_time(&item.post.created_at),
        reactions,
        comments,
    }
}

// --- Time formatting ---

pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}

// --- Tests ---
