//! Query filters, ordering, and pagination for list operations.
//!
//! Filters are conjunctive: every set field must match. Substring
//! matching on text fields is case-insensitive; the full-name filter ORs
//! across its whitespace-separated terms.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use entities::{Conversation, Message, RECENT_WINDOW_HOURS, Role, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default number of items per page when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Sort direction for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Fields a message listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrder {
    #[default]
    SentAt,
    SenderUsername,
}

/// Fields a conversation listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationOrder {
    #[default]
    CreatedAt,
}

/// Fields a user listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserOrder {
    #[default]
    CreatedAt,
    Username,
}

/// Offset/limit request for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of matching items to skip.
    pub offset: u32,
    /// Maximum number of items to return.
    pub limit: u32,
}

impl PageRequest {
    /// Creates a page request.
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus the metadata callers need to page statelessly.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub total: u32,
    /// Offset this page was requested at.
    pub offset: u32,
    /// Limit this page was requested with.
    pub limit: u32,
}

impl<T> Page<T> {
    /// Offset of the next page, or `None` when this page is the last.
    pub fn next_offset(&self) -> Option<u32> {
        let end = self.offset + self.items.len() as u32;
        (end < self.total).then_some(end)
    }
}

/// Applies offset/limit to an already filtered, ordered result set.
pub fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u32;
    let items = items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect();
    Page {
        items,
        total,
        offset: page.offset,
        limit: page.limit,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Filter over messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageFilter {
    /// Sent at or after this instant.
    pub sent_after: Option<DateTime<Utc>>,
    /// Sent at or before this instant.
    pub sent_before: Option<DateTime<Utc>>,
    /// Sent on this calendar date (UTC).
    pub sent_on: Option<NaiveDate>,
    /// Sent by exactly this user.
    pub sender_id: Option<Uuid>,
    /// Sender's username contains this substring.
    pub sender_username: Option<String>,
    /// Belongs to exactly this conversation.
    pub conversation_id: Option<Uuid>,
    /// Body contains this substring.
    pub body_contains: Option<String>,
    /// Whether the trimmed body is non-empty.
    pub has_content: Option<bool>,
}

impl MessageFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by minimum sent time, inclusive.
    pub fn with_sent_after(mut self, instant: DateTime<Utc>) -> Self {
        self.sent_after = Some(instant);
        self
    }

    /// Filters by maximum sent time, inclusive.
    pub fn with_sent_before(mut self, instant: DateTime<Utc>) -> Self {
        self.sent_before = Some(instant);
        self
    }

    /// Filters by calendar date of the sent time.
    pub fn with_sent_on(mut self, date: NaiveDate) -> Self {
        self.sent_on = Some(date);
        self
    }

    /// Filters by sender ID.
    pub fn with_sender(mut self, sender_id: Uuid) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    /// Filters by sender username substring.
    pub fn with_sender_username(mut self, needle: impl Into<String>) -> Self {
        self.sender_username = Some(needle.into());
        self
    }

    /// Filters by conversation ID.
    pub fn with_conversation(mut self, conversation_id: Uuid) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Filters by body substring.
    pub fn with_body_contains(mut self, needle: impl Into<String>) -> Self {
        self.body_contains = Some(needle.into());
        self
    }

    /// Filters by whether the trimmed body is non-empty.
    pub fn with_has_content(mut self, has_content: bool) -> Self {
        self.has_content = Some(has_content);
        self
    }

    /// Whether `message`, sent by `sender`, passes every set predicate.
    pub fn matches(&self, message: &Message, sender: &User) -> bool {
        if let Some(after) = self.sent_after {
            if message.sent_at < after {
                return false;
            }
        }
        if let Some(before) = self.sent_before {
            if message.sent_at > before {
                return false;
            }
        }
        if let Some(date) = self.sent_on {
            if message.sent_at.date_naive() != date {
                return false;
            }
        }
        if let Some(sender_id) = self.sender_id {
            if message.sender_id != sender_id {
                return false;
            }
        }
        if let Some(ref needle) = self.sender_username {
            if !contains_ci(&sender.username, needle) {
                return false;
            }
        }
        if let Some(conversation_id) = self.conversation_id {
            if message.conversation_id != conversation_id {
                return false;
            }
        }
        if let Some(ref needle) = self.body_contains {
            if !contains_ci(&message.body, needle) {
                return false;
            }
        }
        if let Some(wants_content) = self.has_content {
            if message.has_content() != wants_content {
                return false;
            }
        }
        true
    }
}

/// Filter over conversations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationFilter {
    /// Created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Created at or before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Has exactly this user as a participant.
    pub participant_id: Option<Uuid>,
    /// Some participant's username contains this substring.
    pub participant_username: Option<String>,
    /// Exact participant count.
    pub participant_count: Option<usize>,
    /// Minimum participant count, inclusive.
    pub participant_count_min: Option<usize>,
    /// Maximum participant count, inclusive.
    pub participant_count_max: Option<usize>,
    /// Whether any message arrived within the trailing recency window.
    pub has_recent_activity: Option<bool>,
}

impl ConversationFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by minimum creation time, inclusive.
    pub fn with_created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    /// Filters by maximum creation time, inclusive.
    pub fn with_created_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_before = Some(instant);
        self
    }

    /// Filters by participant ID.
    pub fn with_participant(mut self, participant_id: Uuid) -> Self {
        self.participant_id = Some(participant_id);
        self
    }

    /// Filters by participant username substring.
    pub fn with_participant_username(mut self, needle: impl Into<String>) -> Self {
        self.participant_username = Some(needle.into());
        self
    }

    /// Filters by exact participant count.
    pub fn with_participant_count(mut self, count: usize) -> Self {
        self.participant_count = Some(count);
        self
    }

    /// Filters by minimum participant count.
    pub fn with_participant_count_min(mut self, count: usize) -> Self {
        self.participant_count_min = Some(count);
        self
    }

    /// Filters by maximum participant count.
    pub fn with_participant_count_max(mut self, count: usize) -> Self {
        self.participant_count_max = Some(count);
        self
    }

    /// Filters by recent activity.
    pub fn with_recent_activity(mut self, has_recent_activity: bool) -> Self {
        self.has_recent_activity = Some(has_recent_activity);
        self
    }

    /// Whether `conversation` passes every set predicate.
    ///
    /// `participants` are the resolved participant records,
    /// `last_message_at` is the newest message timestamp (if any), and
    /// `now` anchors the recency window.
    pub fn matches(
        &self,
        conversation: &Conversation,
        participants: &[&User],
        last_message_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if let Some(after) = self.created_after {
            if conversation.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if conversation.created_at > before {
                return false;
            }
        }
        if let Some(participant_id) = self.participant_id {
            if !conversation.has_participant(participant_id) {
                return false;
            }
        }
        if let Some(ref needle) = self.participant_username {
            if !participants.iter().any(|p| contains_ci(&p.username, needle)) {
                return false;
            }
        }
        if let Some(count) = self.participant_count {
            if conversation.participant_count() != count {
                return false;
            }
        }
        if let Some(min) = self.participant_count_min {
            if conversation.participant_count() < min {
                return false;
            }
        }
        if let Some(max) = self.participant_count_max {
            if conversation.participant_count() > max {
                return false;
            }
        }
        if let Some(wants_recent) = self.has_recent_activity {
            let cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
            let is_recent = last_message_at.is_some_and(|sent_at| sent_at >= cutoff);
            if is_recent != wants_recent {
                return false;
            }
        }
        true
    }
}

/// Filter over users.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFilter {
    /// Username contains this substring.
    pub username_contains: Option<String>,
    /// Email contains this substring.
    pub email_contains: Option<String>,
    /// Any whitespace-separated term matches first or last name.
    pub full_name: Option<String>,
    /// Exact role.
    pub role: Option<Role>,
    /// Created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Created at or before this instant.
    pub created_before: Option<DateTime<Utc>>,
}

impl UserFilter {
    /// Creates a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by username substring.
    pub fn with_username_contains(mut self, needle: impl Into<String>) -> Self {
        self.username_contains = Some(needle.into());
        self
    }

    /// Filters by email substring.
    pub fn with_email_contains(mut self, needle: impl Into<String>) -> Self {
        self.email_contains = Some(needle.into());
        self
    }

    /// Filters by full name terms.
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    /// Filters by role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Filters by minimum creation time, inclusive.
    pub fn with_created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    /// Filters by maximum creation time, inclusive.
    pub fn with_created_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_before = Some(instant);
        self
    }

    /// Whether `user` passes every set predicate.
    pub fn matches(&self, user: &User) -> bool {
        if let Some(ref needle) = self.username_contains {
            if !contains_ci(&user.username, needle) {
                return false;
            }
        }
        if let Some(ref needle) = self.email_contains {
            if !contains_ci(&user.email, needle) {
                return false;
            }
        }
        if let Some(ref name) = self.full_name {
            // OR across sub-terms: "jane doe" matches on either name part
            let mut terms = name.split_whitespace().peekable();
            if terms.peek().is_some()
                && !terms.any(|term| {
                    contains_ci(&user.first_name, term) || contains_ci(&user.last_name, term)
                })
            {
                return false;
            }
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if user.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if user.created_at > before {
                return false;
            }
        }
        true
    }
}
