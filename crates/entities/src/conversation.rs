//! Conversation-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation between two or more users.
///
/// The participant set never contains duplicates; the store rejects any
/// creation or mutation that would violate that. A conversation owns its
/// messages: deleting it deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier.
    pub id: Uuid,
    /// Participant user IDs, duplicate-free.
    pub participants: Vec<Uuid>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a new conversation with the given participants.
    pub fn new(participants: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            participants,
            created_at: Utc::now(),
        }
    }

    /// Whether the given user is a current participant.
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// Number of current participants.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_creation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conversation = Conversation::new(vec![a, b]);

        assert_eq!(conversation.participant_count(), 2);
        assert!(conversation.has_participant(a));
        assert!(conversation.has_participant(b));
        assert!(!conversation.has_participant(Uuid::new_v4()));
    }
}
