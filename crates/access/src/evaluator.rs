//! Permit/deny rules for conversation and message access.

use entities::{Conversation, Message};
use uuid::Uuid;

/// Operations gated by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// View a resource or list its contents.
    Read,
    /// Modify a resource.
    Update,
    /// Remove a resource.
    Delete,
    /// Add a user to a conversation's participant set.
    AddParticipant,
    /// Remove a user from a conversation's participant set.
    RemoveParticipant,
}

/// A resource under evaluation, carrying the data each rule needs.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// A conversation.
    Conversation(&'a Conversation),
    /// A message together with its conversation.
    Message {
        /// The message itself.
        message: &'a Message,
        /// The conversation the message belongs to.
        conversation: &'a Conversation,
    },
}

/// Decides whether `actor` may perform `operation` on `resource`.
///
/// Rules, in order:
/// 1. Anonymous actors are denied everything.
/// 2. Conversation reads and participant changes require the actor to be
///    a current participant.
/// 3. Message reads require participation in the message's conversation;
///    updates and deletes additionally require being the original sender.
/// 4. Everything else is denied.
pub fn can_access(actor: Option<Uuid>, resource: Resource<'_>, operation: Operation) -> bool {
    let Some(actor) = actor else {
        return false;
    };

    match resource {
        Resource::Conversation(conversation) => match operation {
            Operation::Read | Operation::AddParticipant | Operation::RemoveParticipant => {
                conversation.has_participant(actor)
            }
            Operation::Update | Operation::Delete => false,
        },
        Resource::Message {
            message,
            conversation,
        } => match operation {
            Operation::Read => conversation.has_participant(actor),
            Operation::Update | Operation::Delete => {
                message.sender_id == actor && conversation.has_participant(actor)
            }
            Operation::AddParticipant | Operation::RemoveParticipant => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> (Uuid, Uuid, Uuid, Conversation, Message) {
        let sender = Uuid::new_v4();
        let participant = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let conversation = Conversation::new(vec![sender, participant]);
        let message = Message::new(conversation.id, sender, "hello");
        (sender, participant, outsider, conversation, message)
    }

    #[test]
    fn test_anonymous_actor_denied_everything() {
        let (_, _, _, conversation, message) = fixtures();

        for operation in [
            Operation::Read,
            Operation::Update,
            Operation::Delete,
            Operation::AddParticipant,
            Operation::RemoveParticipant,
        ] {
            assert!(!can_access(
                None,
                Resource::Conversation(&conversation),
                operation
            ));
            assert!(!can_access(
                None,
                Resource::Message {
                    message: &message,
                    conversation: &conversation,
                },
                operation
            ));
        }
    }

    #[test]
    fn test_conversation_rules() {
        let (sender, participant, outsider, conversation, _) = fixtures();
        let resource = Resource::Conversation(&conversation);

        for actor in [sender, participant] {
            assert!(can_access(Some(actor), resource, Operation::Read));
            assert!(can_access(Some(actor), resource, Operation::AddParticipant));
            assert!(can_access(
                Some(actor),
                resource,
                Operation::RemoveParticipant
            ));
        }
        assert!(!can_access(Some(outsider), resource, Operation::Read));
        assert!(!can_access(
            Some(outsider),
            resource,
            Operation::AddParticipant
        ));

        // update/delete on conversations fall through to the default deny
        assert!(!can_access(Some(sender), resource, Operation::Update));
        assert!(!can_access(Some(sender), resource, Operation::Delete));
    }

    #[test]
    fn test_message_read_requires_participation() {
        let (sender, participant, outsider, conversation, message) = fixtures();
        let resource = Resource::Message {
            message: &message,
            conversation: &conversation,
        };

        assert!(can_access(Some(sender), resource, Operation::Read));
        assert!(can_access(Some(participant), resource, Operation::Read));
        assert!(!can_access(Some(outsider), resource, Operation::Read));
    }

    #[test]
    fn test_message_mutation_requires_sender() {
        let (sender, participant, outsider, conversation, message) = fixtures();
        let resource = Resource::Message {
            message: &message,
            conversation: &conversation,
        };

        assert!(can_access(Some(sender), resource, Operation::Update));
        assert!(can_access(Some(sender), resource, Operation::Delete));
        assert!(!can_access(Some(participant), resource, Operation::Update));
        assert!(!can_access(Some(participant), resource, Operation::Delete));
        assert!(!can_access(Some(outsider), resource, Operation::Delete));
    }

    #[test]
    fn test_sender_removed_from_conversation_loses_mutation_rights() {
        let (sender, participant, _, mut conversation, message) = fixtures();
        conversation.participants.retain(|p| *p != sender);

        let resource = Resource::Message {
            message: &message,
            conversation: &conversation,
        };

        assert!(!can_access(Some(sender), resource, Operation::Update));
        assert!(!can_access(Some(sender), resource, Operation::Delete));
        assert!(can_access(Some(participant), resource, Operation::Read));
    }

    #[test]
    fn test_participant_changes_never_apply_to_messages() {
        let (sender, _, _, conversation, message) = fixtures();
        let resource = Resource::Message {
            message: &message,
            conversation: &conversation,
        };

        assert!(!can_access(Some(sender), resource, Operation::AddParticipant));
        assert!(!can_access(
            Some(sender),
            resource,
            Operation::RemoveParticipant
        ));
    }
}
