use async_graphql::*;

use crate::db::models::{PostId, Viewer};
use crate::graphql::types::{reaction_counts, CommentNode, FeedEntry, Me, PostNode, ReactionCount};
use crate::social::Social;

static ANONYMOUS: Viewer = Viewer::Anonymous;

/// The viewer attached to the request, anonymous when none was attached.
pub(crate) fn viewer<'a>(ctx: &'a Context<'_>) -> &'a Viewer {
    ctx.data_opt::<Viewer>().unwrap_or(&ANONYMOUS)
}

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Every post, newest first, with comments and reaction counts
    async fn feed(&self, ctx: &Context<'_>) -> Result<Vec<FeedEntry>> {
        let social = ctx.data::<Social>()?;
        let items = social.assemble_feed(viewer(ctx)).map_err(|e| e.extend())?;
        Ok(items.into_iter().map(Into::into).collect())
    }

    /// Every post, newest first
    async fn posts(&self, ctx: &Context<'_>) -> Result<Vec<PostNode>> {
        let social = ctx.data::<Social>()?;
        let posts = social.list_posts().map_err(|e| e.extend())?;
        Ok(posts.into_iter().map(Into::into).collect())
    }

    /// Comments on one post, oldest first
    async fn comments(&self, ctx: &Context<'_>, post_id: i64) -> Result<Vec<CommentNode>> {
        let social = ctx.data::<Social>()?;
        let comments = social
            .list_comments(PostId(post_id))
            .map_err(|e| e.extend())?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    /// Distinct-user reaction counts for one post
    async fn reaction_counts(&self, ctx: &Context<'_>, post_id: i64) -> Result<Vec<ReactionCount>> {
        let social = ctx.data::<Social>()?;
        let counts = social.counts(PostId(post_id)).map_err(|e| e.extend())?;
        Ok(reaction_counts(&counts, |_| false))
    }

    /// The logged-in user, or null for anonymous requests
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<Me>> {
        let social = ctx.data::<Social>()?;
        match viewer(ctx).user_id() {
            Some(id) => {
                let username = social.username_of(id).map_err(|e| e.extend())?;
                Ok(Some(Me {
                    id: id.to_string(),
                    username,
                }))
            }
            None => Ok(None),
        }
    }
}
