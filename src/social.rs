use crate::auth::{credentials, SessionAuthority, SessionToken};
use crate::db::{
    self,
    models::{
        Comment, CommentId, FeedItem, Post, PostId, ReactionCounts, ReactionKind,
        ReactionOutcome, UnreactOutcome, UserId, Viewer,
    },
};
use crate::error::AppResult;
use crate::feed;
use crate::ledger::{comments, posts, reactions};
use crate::state::DbPool;

/// Settings the core needs from its host. Never read from the environment here.
#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub session_secret: String,
    pub session_hours: u64,
    pub bcrypt_cost: u32,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            session_secret: crate::auth::session::generate_secret(),
            session_hours: 720,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// The operations the presentation layer may call.
#[derive(Clone)]
pub struct Social {
    pool: DbPool,
    sessions: SessionAuthority,
    bcrypt_cost: u32,
}

impl Social {
    pub fn new(pool: DbPool, config: SocialConfig) -> Self {
        Self {
            sessions: SessionAuthority::new(&config.session_secret, config.session_hours),
            bcrypt_cost: config.bcrypt_cost,
            pool,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    // --- Identity ---

    pub fn register(&self, username: &str, password: &str) -> AppResult<UserId> {
        credentials::register(&self.pool, username, password, self.bcrypt_cost)
    }

    /// Verify credentials and open a session.
    pub fn login(&self, username: &str, password: &str) -> AppResult<(UserId, SessionToken)> {
        let user_id = credentials::verify(&self.pool, username, password)?;
        let token = self.sessions.issue(&self.pool, &user_id)?;
        tracing::info!(user_id = %user_id, "Logged in");
        Ok((user_id, token))
    }

    /// Register and immediately open a session.
    pub fn register_and_login(
        &self,
        username: &str,
        password: &str,
    ) -> AppResult<(UserId, SessionToken)> {
        let user_id = self.register(username, password)?;
        let token = self.sessions.issue(&self.pool, &user_id)?;
        Ok((user_id, token))
    }

    pub fn logout(&self, token: &str) -> AppResult<()> {
        self.sessions.revoke(&self.pool, token)?;
        tracing::info!("Logged out");
        Ok(())
    }

    pub fn current_user(&self, token: Option<&str>) -> AppResult<Viewer> {
        self.sessions.resolve(&self.pool, token)
    }

    pub fn username_of(&self, user_id: &UserId) -> AppResult<String> {
        let conn = self.pool.get()?;
        credentials::username_of(&conn, user_id)
    }

    pub fn purge_expired_sessions(&self) -> AppResult<usize> {
        self.sessions.purge_expired(&self.pool)
    }

    // --- Content ---

    pub fn create_post(&self, author: &Viewer, body: &str) -> AppResult<PostId> {
        posts::create_post(&self.pool, author, body)
    }

    pub fn list_posts(&self) -> AppResult<Vec<Post>> {
        db::read(&self.pool, posts::list_posts)
    }

    pub fn add_comment(&self, author: &Viewer, post_id: PostId, body: &str) -> AppResult<CommentId> {
        comments::add_comment(&self.pool, author, post_id, body)
    }

    pub fn list_comments(&self, post_id: PostId) -> AppResult<Vec<Comment>> {
        db::read(&self.pool, |conn| comments::list_comments(conn, post_id))
    }

    // --- Reactions ---

    /// `kind` is the raw value from the caller: `thumbs_up`, `heart` or the emoji.
    pub fn react(&self, viewer: &Viewer, post_id: PostId, kind: &str) -> AppResult<ReactionOutcome> {
        viewer.require()?;
        let kind: ReactionKind = kind.parse()?;
        reactions::react(&self.pool, viewer, post_id, kind)
    }

    pub fn unreact(&self, viewer: &Viewer, post_id: PostId, kind: &str) -> AppResult<UnreactOutcome> {
        viewer.require()?;
        let kind: ReactionKind = kind.parse()?;
        reactions::unreact(&self.pool, viewer, post_id, kind)
    }

    pub fn counts(&self, post_id: PostId) -> AppResult<ReactionCounts> {
        db::read(&self.pool, |conn| reactions::counts(conn, post_id))
    }

    // --- Aggregate read ---

    pub fn assemble_feed(&self, viewer: &Viewer) -> AppResult<Vec<FeedItem>> {
        db::read(&self.pool, |conn| feed::assemble_feed(conn, viewer))
    }
}
