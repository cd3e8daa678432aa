//! Chat store trait definition.

use async_trait::async_trait;
use entities::{Conversation, Message, Role, User};
use uuid::Uuid;

use crate::{
    ChatStoreResult, ConversationFilter, ConversationOrder, MessageFilter, MessageOrder, Page,
    PageRequest, SortDirection, UserFilter, UserOrder,
};

/// Input for registering a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Optional phone number.
    pub phone_number: Option<String>,
    /// Account role.
    pub role: Role,
}

impl NewUser {
    /// Creates a registration input with the default role.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone_number: None,
            role: Role::default(),
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets the phone number.
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }
}

/// Mutable user fields; unset fields are left unchanged.
///
/// Identifier and creation timestamp are immutable and so have no
/// counterpart here.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New username.
    pub username: Option<String>,
    /// New email address.
    pub email: Option<String>,
    /// New first name.
    pub first_name: Option<String>,
    /// New last name.
    pub last_name: Option<String>,
    /// New phone number.
    pub phone_number: Option<String>,
    /// New role.
    pub role: Option<Role>,
}

impl UserUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the first name.
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    /// Sets the last name.
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Sets the phone number.
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

/// Trait for chat storage operations.
///
/// Every operation either returns a fully populated entity/collection or
/// fails with a [`crate::ChatStoreError`]; there are no partial
/// successes. Implementations enforce data-integrity invariants only —
/// authorization is the service layer's job.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // =========================================================================
    // Identity registry
    // =========================================================================

    /// Registers a new user; email and username must be unique.
    async fn register_user(&self, new_user: NewUser) -> ChatStoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: Uuid) -> ChatStoreResult<User>;

    /// Applies an update to a user; uniqueness checks exclude the user
    /// itself.
    async fn update_user(&self, id: Uuid, update: UserUpdate) -> ChatStoreResult<User>;

    /// Deletes a user; fails while the user is referenced by any
    /// conversation or message.
    async fn delete_user(&self, id: Uuid) -> ChatStoreResult<()>;

    /// Searches users with the given filter, ordering, and page.
    async fn search_users(
        &self,
        filter: &UserFilter,
        order: UserOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<User>>;

    // =========================================================================
    // Conversation store
    // =========================================================================

    /// Creates a conversation from at least two distinct participant IDs;
    /// the creator is unioned in if absent.
    async fn create_conversation(
        &self,
        participant_ids: &[Uuid],
        creator_id: Uuid,
    ) -> ChatStoreResult<Conversation>;

    /// Gets a conversation by ID.
    async fn get_conversation(&self, id: Uuid) -> ChatStoreResult<Conversation>;

    /// Adds a participant; re-adding an existing participant is a no-op.
    async fn add_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        acting_user_id: Uuid,
    ) -> ChatStoreResult<Conversation>;

    /// Removes a participant; a removal that would empty the conversation
    /// is rejected, and removing a non-member is a no-op.
    async fn remove_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        acting_user_id: Uuid,
    ) -> ChatStoreResult<Conversation>;

    /// Deletes a conversation and, in the same atomic unit, every message
    /// that belongs to it.
    async fn delete_conversation(&self, id: Uuid) -> ChatStoreResult<()>;

    /// Lists the conversations a user participates in, newest first.
    async fn list_conversations_for_participant(
        &self,
        user_id: Uuid,
    ) -> ChatStoreResult<Vec<Conversation>>;

    /// Searches conversations with the given filter, ordering, and page.
    async fn search_conversations(
        &self,
        filter: &ConversationFilter,
        order: ConversationOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<Conversation>>;

    // =========================================================================
    // Message store
    // =========================================================================

    /// Creates a message; the sender must currently participate in the
    /// conversation, and the body is trimmed before validation and
    /// storage.
    async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> ChatStoreResult<Message>;

    /// Gets a message by ID.
    async fn get_message(&self, id: Uuid) -> ChatStoreResult<Message>;

    /// Replaces a message body; only the original sender may do so, and
    /// only the body changes.
    async fn update_message(
        &self,
        id: Uuid,
        acting_user_id: Uuid,
        new_body: &str,
    ) -> ChatStoreResult<Message>;

    /// Deletes a message; only the original sender may do so.
    async fn delete_message(&self, id: Uuid, acting_user_id: Uuid) -> ChatStoreResult<()>;

    /// Lists a conversation's messages with the given filter, ordering,
    /// and page; newest first by default, with a stable ID tie-break.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        filter: &MessageFilter,
        order: MessageOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<Message>>;
}
