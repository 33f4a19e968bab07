//! In-process account event bus.
//!
//! Handlers publish [`AccountEvent`]s after a state change commits; the
//! [`Notifier`](crate::Notifier) subscribes and mails the affected user.
//! Fan-out is a `tokio::sync::broadcast` channel, so publishing never blocks
//! a request and an event with no subscribers is simply dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use cortexa_core::types::DbId;

/// Something that happened to a user account and may warrant an e-mail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountEvent {
    TherapistApproved {
        user_id: DbId,
        email: String,
    },
    TherapistRejected {
        user_id: DbId,
        email: String,
        reason: Option<String>,
    },
    PasswordResetRequested {
        user_id: DbId,
        email: String,
        otp: String,
        expires_in_minutes: i64,
    },
}

impl AccountEvent {
    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TherapistApproved { .. } => "therapist.approved",
            Self::TherapistRejected { .. } => "therapist.rejected",
            Self::PasswordResetRequested { .. } => "password.reset_requested",
        }
    }

    pub fn user_id(&self) -> DbId {
        match self {
            Self::TherapistApproved { user_id, .. }
            | Self::TherapistRejected { user_id, .. }
            | Self::PasswordResetRequested { user_id, .. } => *user_id,
        }
    }

    /// Address the notification goes to.
    pub fn recipient(&self) -> &str {
        match self {
            Self::TherapistApproved { email, .. }
            | Self::TherapistRejected { email, .. }
            | Self::PasswordResetRequested { email, .. } => email,
        }
    }
}

/// An event as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub event: AccountEvent,
    /// The user whose action caused the event, when it was not the
    /// account owner (an admin deciding a therapist request).
    pub actor_user_id: Option<DbId>,
    pub occurred_at: DateTime<Utc>,
}

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out hub shared as `Arc<EventBus>`.
///
/// A receiver that falls more than the channel capacity behind observes
/// `RecvError::Lagged` and loses the oldest events.
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: AccountEvent, actor_user_id: Option<DbId>) {
        tracing::debug!(
            event = event.name(),
            user_id = event.user_id(),
            "Publishing account event"
        );
        // Err only means nobody is subscribed.
        let _ = self.sender.send(Envelope {
            event,
            actor_user_id,
            occurred_at: Utc::now(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approved() -> AccountEvent {
        AccountEvent::TherapistApproved {
            user_id: 42,
            email: "t@example.com".into(),
        }
    }

    #[tokio::test]
    async fn subscribers_each_get_the_envelope() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(approved(), Some(7));

        let a = first.recv().await.expect("first subscriber");
        let b = second.recv().await.expect("second subscriber");
        assert_eq!(a.event, approved());
        assert_eq!(a.actor_user_id, Some(7));
        assert_eq!(b.event.recipient(), "t@example.com");
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        EventBus::default().publish(approved(), None);
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let json = serde_json::to_value(AccountEvent::TherapistRejected {
            user_id: 3,
            email: "x@example.com".into(),
            reason: None,
        })
        .unwrap();
        assert_eq!(json["type"], "therapist_rejected");
        assert_eq!(json["user_id"], 3);
    }

    #[test]
    fn accessors_cover_every_variant() {
        let reset = AccountEvent::PasswordResetRequested {
            user_id: 9,
            email: "p@example.com".into(),
            otp: "123456".into(),
            expires_in_minutes: 10,
        };
        assert_eq!(reset.name(), "password.reset_requested");
        assert_eq!(reset.user_id(), 9);
        assert_eq!(reset.recipient(), "p@example.com");
    }
}
