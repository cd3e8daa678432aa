//! Actor-facing service gateway.
//!
//! [`ChatService`] is the surface the request layer consumes. It runs
//! the access-control evaluator before every gated store call, so
//! `Unauthorized` always wins over entity-level validation errors, and
//! it owns the bounded query cache for message listings.

use access::{Operation, Resource, can_access};
use entities::{Conversation, Message, User};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    ChatStore, ChatStoreError, ChatStoreResult, ConversationFilter, ConversationOrder,
    DEFAULT_CACHE_CAPACITY, MessageFilter, MessageOrder, NewUser, Page, PageRequest, QueryCache,
    SortDirection, UserFilter, UserOrder, UserUpdate,
};

/// Deny-before-validate gateway over a [`ChatStore`].
pub struct ChatService<S: ChatStore> {
    store: S,
    cache: RwLock<QueryCache>,
}

#[derive(Serialize)]
struct MessageQueryKey<'a> {
    conversation_id: Uuid,
    filter: &'a MessageFilter,
    order: MessageOrder,
    direction: SortDirection,
    page: PageRequest,
}

impl<S: ChatStore> ChatService<S> {
    /// Creates a service with the default cache capacity.
    pub fn new(store: S) -> Self {
        Self::with_cache_capacity(store, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a service with an explicit cache capacity.
    pub fn with_cache_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            cache: RwLock::new(QueryCache::new(capacity)),
        }
    }

    /// The underlying store, for callers that operate outside the
    /// actor-gated surface (internal tooling, tests).
    pub fn store(&self) -> &S {
        &self.store
    }

    fn require_actor(actor: Option<Uuid>) -> ChatStoreResult<Uuid> {
        actor.ok_or(ChatStoreError::Unauthorized)
    }

    /// Loads a message together with its conversation for evaluation.
    async fn message_with_conversation(
        &self,
        message_id: Uuid,
    ) -> ChatStoreResult<(Message, Conversation)> {
        let message = self.store.get_message(message_id).await?;
        let conversation = self.store.get_conversation(message.conversation_id).await?;
        Ok((message, conversation))
    }

    // =========================================================================
    // Identity registry
    // =========================================================================

    /// Registers a new user. Registration is open: it is how actors come
    /// to exist.
    pub async fn register_user(&self, new_user: NewUser) -> ChatStoreResult<User> {
        let user = self.store.register_user(new_user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Gets a user record.
    pub async fn get_user(&self, actor: Option<Uuid>, id: Uuid) -> ChatStoreResult<User> {
        Self::require_actor(actor)?;
        self.store.get_user(id).await
    }

    /// Updates a user; actors may only update themselves.
    pub async fn update_user(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        update: UserUpdate,
    ) -> ChatStoreResult<User> {
        let actor_id = Self::require_actor(actor)?;
        if actor_id != id {
            return Err(ChatStoreError::Unauthorized);
        }
        let user = self.store.update_user(id, update).await?;
        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Deletes a user; actors may only delete themselves.
    pub async fn delete_user(&self, actor: Option<Uuid>, id: Uuid) -> ChatStoreResult<()> {
        let actor_id = Self::require_actor(actor)?;
        if actor_id != id {
            return Err(ChatStoreError::Unauthorized);
        }
        self.store.delete_user(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Searches users.
    pub async fn search_users(
        &self,
        actor: Option<Uuid>,
        filter: &UserFilter,
        order: UserOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<User>> {
        Self::require_actor(actor)?;
        self.store.search_users(filter, order, direction, page).await
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    /// Creates a conversation with the actor as creator.
    pub async fn create_conversation(
        &self,
        actor: Option<Uuid>,
        participant_ids: &[Uuid],
    ) -> ChatStoreResult<Conversation> {
        let creator_id = Self::require_actor(actor)?;
        let conversation = self
            .store
            .create_conversation(participant_ids, creator_id)
            .await?;
        tracing::info!(
            conversation_id = %conversation.id,
            participants = conversation.participant_count(),
            "Conversation created"
        );
        Ok(conversation)
    }

    /// Gets a conversation the actor participates in.
    pub async fn get_conversation(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
    ) -> ChatStoreResult<Conversation> {
        let actor_id = Self::require_actor(actor)?;
        let conversation = self.store.get_conversation(id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Conversation(&conversation),
            Operation::Read,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }
        Ok(conversation)
    }

    /// Adds a participant to a conversation the actor participates in.
    pub async fn add_participant(
        &self,
        actor: Option<Uuid>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> ChatStoreResult<Conversation> {
        let actor_id = Self::require_actor(actor)?;
        let conversation = self.store.get_conversation(conversation_id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Conversation(&conversation),
            Operation::AddParticipant,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }
        let conversation = self
            .store
            .add_participant(conversation_id, user_id, actor_id)
            .await?;
        tracing::info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            "Participant added"
        );
        Ok(conversation)
    }

    /// Removes a participant from a conversation the actor participates
    /// in.
    pub async fn remove_participant(
        &self,
        actor: Option<Uuid>,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> ChatStoreResult<Conversation> {
        let actor_id = Self::require_actor(actor)?;
        let conversation = self.store.get_conversation(conversation_id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Conversation(&conversation),
            Operation::RemoveParticipant,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }
        let conversation = self
            .store
            .remove_participant(conversation_id, user_id, actor_id)
            .await?;
        tracing::info!(
            conversation_id = %conversation_id,
            user_id = %user_id,
            "Participant removed"
        );
        Ok(conversation)
    }

    /// Lists the actor's own conversations, newest first.
    pub async fn list_conversations(
        &self,
        actor: Option<Uuid>,
    ) -> ChatStoreResult<Vec<Conversation>> {
        let actor_id = Self::require_actor(actor)?;
        self.store.list_conversations_for_participant(actor_id).await
    }

    /// Searches conversations; results are always scoped to the actor's
    /// own conversations, whatever the filter says.
    pub async fn search_conversations(
        &self,
        actor: Option<Uuid>,
        filter: &ConversationFilter,
        order: ConversationOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<Conversation>> {
        let actor_id = Self::require_actor(actor)?;
        let mut scoped = filter.clone();
        scoped.participant_id = Some(actor_id);
        self.store
            .search_conversations(&scoped, order, direction, page)
            .await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Sends a message as the actor into a conversation they participate
    /// in.
    pub async fn send_message(
        &self,
        actor: Option<Uuid>,
        conversation_id: Uuid,
        body: &str,
    ) -> ChatStoreResult<Message> {
        let actor_id = Self::require_actor(actor)?;
        let conversation = self.store.get_conversation(conversation_id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Conversation(&conversation),
            Operation::Read,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }

        // senders are always the actor; impersonation is not a parameter
        let message = self
            .store
            .create_message(conversation_id, actor_id, body)
            .await?;
        self.cache.write().await.invalidate_conversation(conversation_id);
        tracing::info!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            "Message sent"
        );
        Ok(message)
    }

    /// Gets a message from a conversation the actor participates in.
    pub async fn get_message(&self, actor: Option<Uuid>, id: Uuid) -> ChatStoreResult<Message> {
        let actor_id = Self::require_actor(actor)?;
        let (message, conversation) = self.message_with_conversation(id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Message {
                message: &message,
                conversation: &conversation,
            },
            Operation::Read,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }
        Ok(message)
    }

    /// Replaces the body of a message the actor sent.
    pub async fn update_message(
        &self,
        actor: Option<Uuid>,
        id: Uuid,
        new_body: &str,
    ) -> ChatStoreResult<Message> {
        let actor_id = Self::require_actor(actor)?;
        let (message, conversation) = self.message_with_conversation(id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Message {
                message: &message,
                conversation: &conversation,
            },
            Operation::Update,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }

        let message = self.store.update_message(id, actor_id, new_body).await?;
        self.cache
            .write()
            .await
            .invalidate_conversation(message.conversation_id);
        tracing::info!(message_id = %id, "Message updated");
        Ok(message)
    }

    /// Deletes a message the actor sent.
    pub async fn delete_message(&self, actor: Option<Uuid>, id: Uuid) -> ChatStoreResult<()> {
        let actor_id = Self::require_actor(actor)?;
        let (message, conversation) = self.message_with_conversation(id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Message {
                message: &message,
                conversation: &conversation,
            },
            Operation::Delete,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }

        self.store.delete_message(id, actor_id).await?;
        self.cache
            .write()
            .await
            .invalidate_conversation(message.conversation_id);
        tracing::info!(message_id = %id, "Message deleted");
        Ok(())
    }

    /// Lists messages in a conversation the actor participates in.
    ///
    /// Results are served from the query cache when an identical query
    /// was answered since the conversation last changed.
    pub async fn list_messages(
        &self,
        actor: Option<Uuid>,
        conversation_id: Uuid,
        filter: &MessageFilter,
        order: MessageOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<Message>> {
        let actor_id = Self::require_actor(actor)?;
        let conversation = self.store.get_conversation(conversation_id).await?;
        if !can_access(
            Some(actor_id),
            Resource::Conversation(&conversation),
            Operation::Read,
        ) {
            return Err(ChatStoreError::Unauthorized);
        }

        let key = serde_json::to_string(&MessageQueryKey {
            conversation_id,
            filter,
            order,
            direction,
            page,
        })?;
        if let Some(cached) = self.cache.read().await.get(&key) {
            return Ok(cached);
        }

        let result = self
            .store
            .list_messages(conversation_id, filter, order, direction, page)
            .await?;
        self.cache
            .write()
            .await
            .insert(key, conversation_id, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryChatStore;

    async fn service_with_conversation() -> (ChatService<MemoryChatStore>, User, User, Conversation)
    {
        let service = ChatService::new(MemoryChatStore::new());
        let a = service
            .register_user(NewUser::new("alice", "alice@example.com", "Alice", "A"))
            .await
            .unwrap();
        let b = service
            .register_user(NewUser::new("bob", "bob@example.com", "Bob", "B"))
            .await
            .unwrap();
        let conversation = service
            .create_conversation(Some(a.id), &[a.id, b.id])
            .await
            .unwrap();
        (service, a, b, conversation)
    }

    #[tokio::test]
    async fn test_anonymous_actor_cannot_probe_existence() {
        let (service, _, _, conversation) = service_with_conversation().await;

        // a real id and a bogus one fail identically for anonymous actors
        let result = service.get_conversation(None, conversation.id).await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));
        let result = service.get_conversation(None, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));
        let result = service.get_message(None, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));
        let result = service.send_message(None, conversation.id, "hi").await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_outsider_denied_before_validation() {
        let (service, a, _, conversation) = service_with_conversation().await;
        let outsider = service
            .register_user(NewUser::new("mallory", "mallory@example.com", "Mal", "M"))
            .await
            .unwrap();

        let result = service.get_conversation(Some(outsider.id), conversation.id).await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));

        // an empty body would be EmptyBody for a participant, but the
        // outsider never gets that far
        let result = service
            .send_message(Some(outsider.id), conversation.id, "   ")
            .await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));

        let message = service
            .send_message(Some(a.id), conversation.id, "hello")
            .await
            .unwrap();
        let result = service
            .update_message(Some(outsider.id), message.id, "   ")
            .await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_send_and_update_message_end_to_end() {
        let (service, a, b, conversation) = service_with_conversation().await;
        assert_eq!(conversation.participant_count(), 2);

        let message = service
            .send_message(Some(a.id), conversation.id, "hello")
            .await
            .unwrap();
        assert_eq!(message.sender_id, a.id);
        assert_eq!(message.body, "hello");

        // b participates, so the evaluator denies the edit rather than
        // letting the store report NotSender
        let result = service.update_message(Some(b.id), message.id, "mine now").await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));

        let updated = service
            .update_message(Some(a.id), message.id, "hello again")
            .await
            .unwrap();
        assert_eq!(updated.body, "hello again");
        assert_eq!(updated.sender_id, a.id);
    }

    #[tokio::test]
    async fn test_participant_management_via_service() {
        let (service, a, b, conversation) = service_with_conversation().await;
        let c = service
            .register_user(NewUser::new("carol", "carol@example.com", "Carol", "C"))
            .await
            .unwrap();

        // only participants may invite
        let result = service
            .add_participant(Some(c.id), conversation.id, c.id)
            .await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));

        let updated = service
            .add_participant(Some(a.id), conversation.id, c.id)
            .await
            .unwrap();
        assert_eq!(updated.participant_count(), 3);

        let updated = service
            .remove_participant(Some(b.id), conversation.id, c.id)
            .await
            .unwrap();
        assert_eq!(updated.participant_count(), 2);
    }

    #[tokio::test]
    async fn test_self_removal_guard_surfaces_through_service() {
        let service = ChatService::new(MemoryChatStore::new());
        let a = service
            .register_user(NewUser::new("alice", "alice@example.com", "Alice", "A"))
            .await
            .unwrap();
        let b = service
            .register_user(NewUser::new("bob", "bob@example.com", "Bob", "B"))
            .await
            .unwrap();
        let conversation = service
            .create_conversation(Some(a.id), &[a.id, b.id])
            .await
            .unwrap();

        service
            .remove_participant(Some(a.id), conversation.id, b.id)
            .await
            .unwrap();
        let result = service
            .remove_participant(Some(a.id), conversation.id, a.id)
            .await;
        assert!(matches!(
            result,
            Err(ChatStoreError::LastParticipantSelfRemoval)
        ));
    }

    #[tokio::test]
    async fn test_users_may_only_update_themselves() {
        let (service, a, b, _) = service_with_conversation().await;

        let result = service
            .update_user(Some(a.id), b.id, UserUpdate::new().with_first_name("Hacked"))
            .await;
        assert!(matches!(result, Err(ChatStoreError::Unauthorized)));

        let updated = service
            .update_user(Some(a.id), a.id, UserUpdate::new().with_first_name("Alicia"))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Alicia");
    }

    #[tokio::test]
    async fn test_search_conversations_scoped_to_actor() {
        let (service, a, b, _) = service_with_conversation().await;
        let c = service
            .register_user(NewUser::new("carol", "carol@example.com", "Carol", "C"))
            .await
            .unwrap();
        service
            .create_conversation(Some(b.id), &[b.id, c.id])
            .await
            .unwrap();

        // a participates in one conversation; the filter cannot widen that
        let page = service
            .search_conversations(
                Some(a.id),
                &ConversationFilter::new(),
                ConversationOrder::CreatedAt,
                SortDirection::Descending,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = service
            .search_conversations(
                Some(c.id),
                &ConversationFilter::new().with_participant(a.id),
                ConversationOrder::CreatedAt,
                SortDirection::Descending,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items[0].has_participant(c.id));
    }

    #[tokio::test]
    async fn test_list_messages_caches_until_mutation() {
        let (service, a, _, conversation) = service_with_conversation().await;
        service
            .send_message(Some(a.id), conversation.id, "first")
            .await
            .unwrap();

        let filter = MessageFilter::new();
        let page = service
            .list_messages(
                Some(a.id),
                conversation.id,
                &filter,
                MessageOrder::SentAt,
                SortDirection::Descending,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        // a write that bypasses the service is invisible: the page is
        // served from cache
        service
            .store()
            .create_message(conversation.id, a.id, "sneaky")
            .await
            .unwrap();
        let page = service
            .list_messages(
                Some(a.id),
                conversation.id,
                &filter,
                MessageOrder::SentAt,
                SortDirection::Descending,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        // a service-level write invalidates and the next read is fresh
        service
            .send_message(Some(a.id), conversation.id, "second")
            .await
            .unwrap();
        let page = service
            .list_messages(
                Some(a.id),
                conversation.id,
                &filter,
                MessageOrder::SentAt,
                SortDirection::Descending,
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items[0].body, "second");
    }

    #[tokio::test]
    async fn test_list_conversations_returns_only_own() {
        let (service, a, b, conversation) = service_with_conversation().await;
        let c = service
            .register_user(NewUser::new("carol", "carol@example.com", "Carol", "C"))
            .await
            .unwrap();
        let other = service
            .create_conversation(Some(b.id), &[b.id, c.id])
            .await
            .unwrap();

        let listed = service.list_conversations(Some(a.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, conversation.id);

        let listed = service.list_conversations(Some(b.id)).await.unwrap();
        assert_eq!(listed.len(), 2);

        let listed = service.list_conversations(Some(c.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, other.id);
    }
}
