//! Message-related entity definitions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum message body length in characters, counted after trimming.
pub const MAX_BODY_CHARS: usize = 1000;

/// Trailing window, in hours, within which a message counts as recent.
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// A message sent within a conversation.
///
/// Sender, conversation, and sent timestamp are fixed at creation; only
/// the body can change afterwards, and only through the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: Uuid,
    /// Conversation this message belongs to.
    pub conversation_id: Uuid,
    /// User who sent the message.
    pub sender_id: Uuid,
    /// Message text, stored trimmed.
    pub body: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message.
    pub fn new(conversation_id: Uuid, sender_id: Uuid, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            body: body.into(),
            sent_at: Utc::now(),
        }
    }

    /// Whether the trimmed body is non-empty.
    pub fn has_content(&self) -> bool {
        !self.body.trim().is_empty()
    }

    /// Whether the message was sent within the trailing recency window.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        self.sent_at >= now - Duration::hours(RECENT_WINDOW_HOURS)
    }
}
