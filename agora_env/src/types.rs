//! Common types for the Agora environment abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a simulated agent (the platform `user_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a post (the platform `post_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub u64);

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one controller run.
///
/// Every `start()` mints a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A post as stored by the platform. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub post_id: PostId,
    pub author_id: AgentId,
    pub content: String,

    /// Creation time in Unix milliseconds; `None` when the stored value
    /// could not be read.
    pub created_at_ms: Option<u64>,
}

impl Post {
    /// Creates a post with a known creation time.
    pub fn new(post_id: u64, author_id: u64, content: impl Into<String>, created_at_ms: u64) -> Self {
        Self {
            post_id: PostId(post_id),
            author_id: AgentId(author_id),
            content: content.into(),
            created_at_ms: Some(created_at_ms),
        }
    }

    /// Creates a post from a raw stored timestamp (see [`parse_timestamp_ms`]).
    pub fn with_raw_timestamp(
        post_id: u64,
        author_id: u64,
        content: impl Into<String>,
        raw_created_at: &str,
    ) -> Self {
        Self {
            post_id: PostId(post_id),
            author_id: AgentId(author_id),
            content: content.into(),
            created_at_ms: parse_timestamp_ms(raw_created_at),
        }
    }

    /// True if the post existed at `cutoff_ms`. Unreadable timestamps count
    /// as existing.
    pub fn visible_at(&self, cutoff_ms: u64) -> bool {
        self.created_at_ms.map_or(true, |t| t <= cutoff_ms)
    }
}

/// Parses a stored timestamp into Unix milliseconds.
///
/// Accepts integer milliseconds (`"1704067200000"`) and fractional seconds
/// (`"1704067200.25"`). Anything else is malformed and yields `None`.
pub fn parse_timestamp_ms(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ms) = raw.parse::<u64>() {
        return Some(ms);
    }
    if raw.contains('.') {
        let secs: f64 = raw.parse().ok()?;
        if secs.is_finite() && secs >= 0.0 {
            return Some((secs * 1000.0).round() as u64);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_ms() {
        assert_eq!(parse_timestamp_ms("1704067200000"), Some(1_704_067_200_000));
        assert_eq!(parse_timestamp_ms(" 42 "), Some(42));
        assert_eq!(parse_timestamp_ms("1704067200.25"), Some(1_704_067_200_250));
        assert_eq!(parse_timestamp_ms(""), None);
        assert_eq!(parse_timestamp_ms("yesterday"), None);
        assert_eq!(parse_timestamp_ms("-5"), None);
        assert_eq!(parse_timestamp_ms("-5.0"), None);
    }

    #[test]
    fn test_post_visibility() {
        let post = Post::new(1, 2, "hello", 1_000);
        assert!(post.visible_at(1_000));
        assert!(post.visible_at(2_000));
        assert!(!post.visible_at(999));

        let malformed = Post::with_raw_timestamp(2, 2, "hi", "not a time");
        assert_eq!(malformed.created_at_ms, None);
        assert!(malformed.visible_at(0));
    }

    #[test]
    fn test_run_id_display_is_short() {
        let id = RunId::new();
        assert_eq!(id.to_string().len(), 8);
        assert_ne!(RunId::new(), id);
    }
}
