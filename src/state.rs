use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::graphql::FeedSchema;
use crate::social::Social;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub social: Social,
    pub config: Config,
    pub graphql_schema: FeedSchema,
}
