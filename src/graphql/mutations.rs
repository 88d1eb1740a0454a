use async_graphql::*;

use crate::db::models::{PostId, ReactionKind, ReactionOutcome, UnreactOutcome};
use crate::graphql::queries::viewer;
use crate::social::Social;

/// GraphQL Mutation root. Every field requires an authenticated viewer.
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Publish a post; returns its id
    async fn create_post(&self, ctx: &Context<'_>, body: String) -> Result<i64> {
        let social = ctx.data::<Social>()?;
        let id = social
            .create_post(viewer(ctx), &body)
            .map_err(|e| e.extend())?;
        Ok(id.0)
    }

    /// Comment on a post; returns the comment id
    async fn add_comment(&self, ctx: &Context<'_>, post_id: i64, body: String) -> Result<i64> {
        let social = ctx.data::<Social>()?;
        let id = social
            .add_comment(viewer(ctx), PostId(post_id), &body)
            .map_err(|e| e.extend())?;
        Ok(id.0)
    }

    /// React to a post. Reacting twice with the same kind is a no-op.
    async fn react(
        &self,
        ctx: &Context<'_>,
        post_id: i64,
        kind: ReactionKind,
    ) -> Result<ReactionOutcome> {
        let social = ctx.data::<Social>()?;
        social
            .react(viewer(ctx), PostId(post_id), kind.as_str())
            .map_err(|e| e.extend())
    }

    /// Withdraw one reaction kind from a post
    async fn unreact(
        &self,
        ctx: &Context<'_>,
        post_id: i64,
        kind: ReactionKind,
    ) -> Result<UnreactOutcome> {
        let social = ctx.data::<Social>()?;
        social
            .unreact(viewer(ctx), PostId(post_id), kind.as_str())
            .map_err(|e| e.extend())
    }
}
