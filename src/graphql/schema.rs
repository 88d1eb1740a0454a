use async_graphql::{EmptySubscription, Schema};

use super::mutations::MutationRoot;
use super::queries::QueryRoot;

/// GraphQL Schema type
pub type FeedSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the GraphQL schema. `Social` and the request's `Viewer` are attached per request.
pub fn build_schema() -> FeedSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}
