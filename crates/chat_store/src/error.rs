//! Chat store error types.

use entities::MAX_BODY_CHARS;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during chat store operations.
#[derive(Debug, Error)]
pub enum ChatStoreError {
    /// Entity not found.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Email address already registered.
    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    /// Username already taken.
    #[error("username already taken: {username}")]
    DuplicateUsername { username: String },

    /// The same user appears more than once in a participant list.
    #[error("duplicate participant: {user_id}")]
    DuplicateParticipant { user_id: Uuid },

    /// Participant list is unusable as given.
    #[error("invalid participants: {reason}")]
    InvalidParticipants { reason: String },

    /// Sender is not a participant of the target conversation.
    #[error("user {user_id} is not a participant of conversation {conversation_id}")]
    NotParticipant {
        user_id: Uuid,
        conversation_id: Uuid,
    },

    /// Acting user is not the message's original sender.
    #[error("user {user_id} is not the sender of message {message_id}")]
    NotSender { user_id: Uuid, message_id: Uuid },

    /// A participant may not remove themselves when they are the last one.
    #[error("cannot remove yourself as the last remaining participant")]
    LastParticipantSelfRemoval,

    /// A removal may not leave a conversation without participants.
    #[error("removal would leave conversation {conversation_id} without participants")]
    CannotEmptyConversation { conversation_id: Uuid },

    /// User is still referenced by conversations or messages.
    #[error("user {id} is still referenced by conversations or messages")]
    UserInUse { id: Uuid },

    /// Message body is empty after trimming.
    #[error("message body is empty")]
    EmptyBody,

    /// Message body exceeds the maximum length after trimming.
    #[error("message body is {length} characters, maximum is {max}")]
    BodyTooLong { length: usize, max: usize },

    /// Actor is not permitted to perform the operation.
    #[error("operation not permitted for this actor")]
    Unauthorized,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Fault surfaced unmodified from the storage driver; retrying is the
    /// caller's policy, not the core's.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ChatStoreError {
    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a body too long error for the given trimmed length.
    pub fn body_too_long(length: usize) -> Self {
        Self::BodyTooLong {
            length,
            max: MAX_BODY_CHARS,
        }
    }

    /// Creates an invalid participants error.
    pub fn invalid_participants(reason: impl Into<String>) -> Self {
        Self::InvalidParticipants {
            reason: reason.into(),
        }
    }
}

/// Result type for chat store operations.
pub type ChatStoreResult<T> = Result<T, ChatStoreError>;
