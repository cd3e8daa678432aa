//! In-memory chat store implementation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use entities::{Conversation, MAX_BODY_CHARS, Message, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    ChatStore, ChatStoreError, ChatStoreResult, ConversationFilter, ConversationOrder,
    MessageFilter, MessageOrder, NewUser, Page, PageRequest, SortDirection, UserFilter, UserOrder,
    UserUpdate, paginate,
};

/// In-memory chat store.
///
/// Each collection sits behind its own `RwLock`; writers on a collection
/// serialize, readers run concurrently, and a read racing a write sees
/// either the pre- or post-write state. Operations that span collections
/// acquire guards in users → conversations → messages order and hold
/// them for the whole critical section, so cross-entity invariants hold
/// atomically.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    conversations: Arc<RwLock<HashMap<Uuid, Conversation>>>,
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
}

impl MemoryChatStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Trims a body and enforces the non-empty and length invariants.
fn normalize_body(body: &str) -> ChatStoreResult<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ChatStoreError::EmptyBody);
    }
    let length = trimmed.chars().count();
    if length > MAX_BODY_CHARS {
        return Err(ChatStoreError::body_too_long(length));
    }
    Ok(trimmed.to_string())
}

fn apply_direction<T>(items: &mut [T], direction: SortDirection) {
    if direction == SortDirection::Descending {
        items.reverse();
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    // =========================================================================
    // Identity registry
    // =========================================================================

    async fn register_user(&self, new_user: NewUser) -> ChatStoreResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(ChatStoreError::DuplicateEmail {
                email: new_user.email,
            });
        }
        if users.values().any(|u| u.username == new_user.username) {
            return Err(ChatStoreError::DuplicateUsername {
                username: new_user.username,
            });
        }

        let mut user = User::new(
            new_user.username,
            new_user.email,
            new_user.first_name,
            new_user.last_name,
        )
        .with_role(new_user.role);
        if let Some(phone_number) = new_user.phone_number {
            user = user.with_phone_number(phone_number);
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> ChatStoreResult<User> {
        let users = self.users.read().await;
        users
            .get(&id)
            .cloned()
            .ok_or_else(|| ChatStoreError::not_found("User", id))
    }

    async fn update_user(&self, id: Uuid, update: UserUpdate) -> ChatStoreResult<User> {
        let mut users = self.users.write().await;

        if !users.contains_key(&id) {
            return Err(ChatStoreError::not_found("User", id));
        }
        if let Some(ref email) = update.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(ChatStoreError::DuplicateEmail {
                    email: email.clone(),
                });
            }
        }
        if let Some(ref username) = update.username {
            if users.values().any(|u| u.id != id && &u.username == username) {
                return Err(ChatStoreError::DuplicateUsername {
                    username: username.clone(),
                });
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Err(ChatStoreError::not_found("User", id));
        };
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(phone_number) = update.phone_number {
            user.phone_number = Some(phone_number);
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> ChatStoreResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&id) {
            return Err(ChatStoreError::not_found("User", id));
        }

        // RESTRICT policy: a referenced user cannot be deleted
        let conversations = self.conversations.read().await;
        if conversations.values().any(|c| c.has_participant(id)) {
            return Err(ChatStoreError::UserInUse { id });
        }
        let messages = self.messages.read().await;
        if messages.values().any(|m| m.sender_id == id) {
            return Err(ChatStoreError::UserInUse { id });
        }

        users.remove(&id);
        Ok(())
    }

    async fn search_users(
        &self,
        filter: &UserFilter,
        order: UserOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<User>> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();

        match order {
            UserOrder::CreatedAt => {
                result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            }
            UserOrder::Username => {
                result.sort_by(|a, b| a.username.cmp(&b.username).then(a.id.cmp(&b.id)));
            }
        }
        apply_direction(&mut result, direction);

        Ok(paginate(result, page))
    }

    // =========================================================================
    // Conversation store
    // =========================================================================

    async fn create_conversation(
        &self,
        participant_ids: &[Uuid],
        creator_id: Uuid,
    ) -> ChatStoreResult<Conversation> {
        let users = self.users.read().await;
        let mut conversations = self.conversations.write().await;

        let mut seen = HashSet::with_capacity(participant_ids.len());
        for id in participant_ids {
            if !seen.insert(*id) {
                return Err(ChatStoreError::DuplicateParticipant { user_id: *id });
            }
        }
        if seen.len() < 2 {
            return Err(ChatStoreError::invalid_participants(format!(
                "at least 2 distinct participants required, got {}",
                seen.len()
            )));
        }
        if !users.contains_key(&creator_id) {
            return Err(ChatStoreError::not_found("User", creator_id));
        }
        for id in participant_ids {
            if !users.contains_key(id) {
                return Err(ChatStoreError::invalid_participants(format!(
                    "unknown user: {id}"
                )));
            }
        }

        // set assignment and creator inclusion are one atomic unit
        let mut participants = participant_ids.to_vec();
        if !participants.contains(&creator_id) {
            participants.push(creator_id);
        }
        let conversation = Conversation::new(participants);
        conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn get_conversation(&self, id: Uuid) -> ChatStoreResult<Conversation> {
        let conversations = self.conversations.read().await;
        conversations
            .get(&id)
            .cloned()
            .ok_or_else(|| ChatStoreError::not_found("Conversation", id))
    }

    async fn add_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        _acting_user_id: Uuid,
    ) -> ChatStoreResult<Conversation> {
        // the acting user's participation is the evaluator's concern
        let users = self.users.read().await;
        let mut conversations = self.conversations.write().await;

        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| ChatStoreError::not_found("Conversation", conversation_id))?;
        if !users.contains_key(&user_id) {
            return Err(ChatStoreError::not_found("User", user_id));
        }

        if !conversation.has_participant(user_id) {
            conversation.participants.push(user_id);
        }
        Ok(conversation.clone())
    }

    async fn remove_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        acting_user_id: Uuid,
    ) -> ChatStoreResult<Conversation> {
        let users = self.users.read().await;
        let mut conversations = self.conversations.write().await;

        let conversation = conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| ChatStoreError::not_found("Conversation", conversation_id))?;
        if !users.contains_key(&user_id) {
            return Err(ChatStoreError::not_found("User", user_id));
        }

        if conversation.has_participant(user_id) && conversation.participant_count() == 1 {
            if user_id == acting_user_id {
                return Err(ChatStoreError::LastParticipantSelfRemoval);
            }
            return Err(ChatStoreError::CannotEmptyConversation { conversation_id });
        }

        // removing a non-member is a no-op
        conversation.participants.retain(|p| *p != user_id);
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, id: Uuid) -> ChatStoreResult<()> {
        let mut conversations = self.conversations.write().await;
        let mut messages = self.messages.write().await;

        if conversations.remove(&id).is_none() {
            return Err(ChatStoreError::not_found("Conversation", id));
        }
        // explicit cascade: the conversation owns its messages
        messages.retain(|_, m| m.conversation_id != id);
        Ok(())
    }

    async fn list_conversations_for_participant(
        &self,
        user_id: Uuid,
    ) -> ChatStoreResult<Vec<Conversation>> {
        let conversations = self.conversations.read().await;
        let mut result: Vec<Conversation> = conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn search_conversations(
        &self,
        filter: &ConversationFilter,
        order: ConversationOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<Conversation>> {
        let users = self.users.read().await;
        let conversations = self.conversations.read().await;
        let messages = self.messages.read().await;
        let now = Utc::now();

        let mut result: Vec<Conversation> = conversations
            .values()
            .filter(|c| {
                let participants: Vec<&User> = c
                    .participants
                    .iter()
                    .filter_map(|id| users.get(id))
                    .collect();
                let last_message_at = messages
                    .values()
                    .filter(|m| m.conversation_id == c.id)
                    .map(|m| m.sent_at)
                    .max();
                filter.matches(c, &participants, last_message_at, now)
            })
            .cloned()
            .collect();

        match order {
            ConversationOrder::CreatedAt => {
                result.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            }
        }
        apply_direction(&mut result, direction);

        Ok(paginate(result, page))
    }

    // =========================================================================
    // Message store
    // =========================================================================

    async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> ChatStoreResult<Message> {
        let users = self.users.read().await;
        let conversations = self.conversations.read().await;
        let mut messages = self.messages.write().await;

        let conversation = conversations
            .get(&conversation_id)
            .ok_or_else(|| ChatStoreError::not_found("Conversation", conversation_id))?;
        if !users.contains_key(&sender_id) {
            return Err(ChatStoreError::not_found("User", sender_id));
        }
        if !conversation.has_participant(sender_id) {
            return Err(ChatStoreError::NotParticipant {
                user_id: sender_id,
                conversation_id,
            });
        }
        let body = normalize_body(body)?;

        let message = Message::new(conversation_id, sender_id, body);
        messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: Uuid) -> ChatStoreResult<Message> {
        let messages = self.messages.read().await;
        messages
            .get(&id)
            .cloned()
            .ok_or_else(|| ChatStoreError::not_found("Message", id))
    }

    async fn update_message(
        &self,
        id: Uuid,
        acting_user_id: Uuid,
        new_body: &str,
    ) -> ChatStoreResult<Message> {
        let mut messages = self.messages.write().await;

        let message = messages
            .get_mut(&id)
            .ok_or_else(|| ChatStoreError::not_found("Message", id))?;
        if message.sender_id != acting_user_id {
            return Err(ChatStoreError::NotSender {
                user_id: acting_user_id,
                message_id: id,
            });
        }
        let body = normalize_body(new_body)?;

        // sender, conversation, and sent timestamp never change
        message.body = body;
        Ok(message.clone())
    }

    async fn delete_message(&self, id: Uuid, acting_user_id: Uuid) -> ChatStoreResult<()> {
        let mut messages = self.messages.write().await;

        let message = messages
            .get(&id)
            .ok_or_else(|| ChatStoreError::not_found("Message", id))?;
        if message.sender_id != acting_user_id {
            return Err(ChatStoreError::NotSender {
                user_id: acting_user_id,
                message_id: id,
            });
        }

        messages.remove(&id);
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        filter: &MessageFilter,
        order: MessageOrder,
        direction: SortDirection,
        page: PageRequest,
    ) -> ChatStoreResult<Page<Message>> {
        let users = self.users.read().await;
        let conversations = self.conversations.read().await;
        let messages = self.messages.read().await;

        if !conversations.contains_key(&conversation_id) {
            return Err(ChatStoreError::not_found("Conversation", conversation_id));
        }

        let mut result: Vec<Message> = messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| match users.get(&m.sender_id) {
                Some(sender) => filter.matches(m, sender),
                None => false,
            })
            .cloned()
            .collect();

        match order {
            MessageOrder::SentAt => {
                result.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));
            }
            MessageOrder::SenderUsername => {
                result.sort_by(|a, b| {
                    let username_a = users.get(&a.sender_id).map_or("", |u| u.username.as_str());
                    let username_b = users.get(&b.sender_id).map_or("", |u| u.username.as_str());
                    username_a.cmp(username_b).then(a.id.cmp(&b.id))
                });
            }
        }
        apply_direction(&mut result, direction);

        Ok(paginate(result, page))
    }
}
