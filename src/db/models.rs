use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who is making a request. Browsing is allowed for everyone; writes need a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(UserId),
}

impl Viewer {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Viewer::User(id) => Some(id),
            Viewer::Anonymous => None,
        }
    }

    /// The authenticated user, or `Unauthorized`.
    pub fn require(&self) -> Result<&UserId, AppError> {
        self.user_id().ok_or(AppError::Unauthorized)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Viewer::Anonymous)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    async_graphql::Enum,
)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    ThumbsUp,
    Heart,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 2] = [ReactionKind::ThumbsUp, ReactionKind::Heart];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::ThumbsUp => "thumbs_up",
            ReactionKind::Heart => "heart",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ReactionKind::ThumbsUp => "👍",
            ReactionKind::Heart => "❤️",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "thumbs_up" | "THUMBS_UP" | "👍" => Ok(ReactionKind::ThumbsUp),
            // Accept the heart with and without the emoji variation selector
            "heart" | "HEART" | "❤️" | "❤" => Ok(ReactionKind::Heart),
            other => Err(AppError::InvalidInput(format!(
                "Unknown reaction kind: {}",
                other
            ))),
        }
    }
}

impl ToSql for ReactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ReactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e: AppError| FromSqlError::Other(Box::new(e)))
    }
}

/// Result of `react`. A repeated reaction is a defined outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum)]
pub enum ReactionOutcome {
    Added,
    AlreadyReacted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, async_graphql::Enum)]
pub enum UnreactOutcome {
    Removed,
    NotReacted,
}

/// Distinct users per kind. Every kind is present; kinds nobody used map to 0.
pub type ReactionCounts = BTreeMap<ReactionKind, i64>;

/// One post with its comments and reaction aggregates, as seen by one viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub counts: ReactionCounts,
    pub viewer_reacted: BTreeMap<ReactionKind, bool>,
}

/// Convert stored microseconds back to a UTC timestamp.
pub(crate) fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_kind_parses_names_and_emoji() {
        assert_eq!("thumbs_up".parse::<ReactionKind>().unwrap(), ReactionKind::ThumbsUp);
        assert_eq!("👍".parse::<ReactionKind>().unwrap(), ReactionKind::ThumbsUp);
        assert_eq!("heart".parse::<ReactionKind>().unwrap(), ReactionKind::Heart);
        assert_eq!("❤️".parse::<ReactionKind>().unwrap(), ReactionKind::Heart);
        assert_eq!(" HEART ".parse::<ReactionKind>().unwrap(), ReactionKind::Heart);
    }

    #[test]
    fn reaction_kind_rejects_unknown() {
        let err = "laugh".parse::<ReactionKind>().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(matches!(
            "".parse::<ReactionKind>(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn reaction_kind_round_trips_through_display() {
        for kind in ReactionKind::ALL {
            assert_eq!(kind.to_string().parse::<ReactionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn viewer_require() {
        assert!(matches!(
            Viewer::Anonymous.require(),
            Err(AppError::Unauthorized)
        ));
        let viewer = Viewer::User(UserId::new("u1"));
        assert_eq!(viewer.require().unwrap().as_str(), "u1");
        assert!(!viewer.is_anonymous());
    }

    #[test]
    fn micros_convert_to_utc() {
        let dt = from_micros(1_700_000_000_123_456);
        assert_eq!(dt.timestamp_micros(), 1_700_000_000_123_456);
    }
}
