use async_graphql::*;
use chrono::{DateTime, Utc};

use crate::db::models::{Comment, FeedItem, Post, ReactionCounts, ReactionKind};

/// A post as exposed over GraphQL
#[derive(Clone, Debug, SimpleObject)]
pub struct PostNode {
    pub id: i64,

    /// Username of the author
    pub author: String,

    pub body: String,

    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostNode {
    fn from(post: Post) -> Self {
        PostNode {
            id: post.id.0,
            author: post.author_username,
            body: post.body,
            created_at: post.created_at,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct CommentNode {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentNode {
    fn from(comment: Comment) -> Self {
        CommentNode {
            id: comment.id.0,
            post_id: comment.post_id.0,
            author: comment.author_username,
            body: comment.body,
            created_at: comment.created_at,
        }
    }
}

/// Number of distinct users who reacted with one kind
#[derive(Clone, Debug, SimpleObject)]
pub struct ReactionCount {
    pub kind: ReactionKind,
    pub count: i64,

    /// Whether the requesting viewer is one of them. Always false for anonymous viewers.
    pub viewer_reacted: bool,
}

/// Flatten a counts map into one entry per kind, in `ReactionKind::ALL` order.
pub fn reaction_counts(
    counts: &ReactionCounts,
    reacted: impl Fn(ReactionKind) -> bool,
) -> Vec<ReactionCount> {
    ReactionKind::ALL
        .iter()
        .map(|&kind| ReactionCount {
            kind,
            count: counts.get(&kind).copied().unwrap_or(0),
            viewer_reacted: reacted(kind),
        })
        .collect()
}

/// One entry of the assembled feed
#[derive(Clone, Debug, SimpleObject)]
pub struct FeedEntry {
    pub post: PostNode,

    /// Oldest first
    pub comments: Vec<CommentNode>,

    pub reactions: Vec<ReactionCount>,
}

impl From<FeedItem> for FeedEntry {
    fn from(item: FeedItem) -> Self {
        let reactions = reaction_counts(&item.counts, |kind| {
            item.viewer_reacted.get(&kind).copied().unwrap_or(false)
        });
        FeedEntry {
            post: item.post.into(),
            comments: item.comments.into_iter().map(Into::into).collect(),
            reactions,
        }
    }
}

/// The authenticated caller
#[derive(Clone, Debug, SimpleObject)]
pub struct Me {
    pub id: String,
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{PostId, UserId};
    use std::collections::BTreeMap;

    fn post() -> Post {
        Post {
            id: PostId(7),
            author_id: UserId::new("u1"),
            author_username: "alice".to_string(),
            body: "hello".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn feed_entry_lists_every_kind() {
        let mut counts = BTreeMap::new();
        counts.insert(ReactionKind::Heart, 2);
        let mut viewer_reacted = BTreeMap::new();
        viewer_reacted.insert(ReactionKind::Heart, true);

        let entry = FeedEntry::from(FeedItem {
            post: post(),
            comments: vec![],
            counts,
            viewer_reacted,
        });

        assert_eq!(entry.post.id, 7);
        assert_eq!(entry.post.author, "alice");
        assert_eq!(entry.reactions.len(), 2);
        assert_eq!(entry.reactions[0].kind, ReactionKind::ThumbsUp);
        assert_eq!(entry.reactions[0].count, 0);
        assert!(!entry.reactions[0].viewer_reacted);
        assert_eq!(entry.reactions[1].count, 2);
        assert!(entry.reactions[1].viewer_reacted);
    }
}
