//! Turns account events into notification e-mails.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bus::{AccountEvent, Envelope};
use crate::delivery::email::{EmailDelivery, EmailMessage};

/// The e-mail for an event.
pub fn render(event: &AccountEvent) -> EmailMessage {
    let (subject, body) = match event {
        AccountEvent::TherapistApproved { .. } => (
            "Your Therapist Account Has Been Approved",
            "Your therapist account has been approved! \
             You can now access the therapist dashboard."
                .to_string(),
        ),
        AccountEvent::TherapistRejected { reason, .. } => {
            let tail = match reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                Some(reason) => format!("Reason: {reason}"),
                None => "Please contact support for more information.".to_string(),
            };
            (
                "Your Therapist Account Registration",
                format!("Your therapist account registration has been rejected. {tail}"),
            )
        }
        AccountEvent::PasswordResetRequested {
            otp,
            expires_in_minutes,
            ..
        } => (
            "Password Reset Code",
            format!(
                "Your password reset code is {otp}. \
                 It expires in {expires_in_minutes} minutes. \
                 If you did not request a reset, you can ignore this email."
            ),
        ),
    };
    EmailMessage {
        to: event.recipient().to_string(),
        subject: subject.to_string(),
        body,
    }
}

/// Background service delivering notification e-mails.
pub struct Notifier;

impl Notifier {
    /// Deliver e-mails until every bus handle is dropped.
    ///
    /// Each send runs on its own task so a slow relay never stalls the loop.
    /// Without a delivery channel the rendered message is logged and dropped.
    pub async fn run(
        delivery: Option<Arc<EmailDelivery>>,
        mut receiver: broadcast::Receiver<Envelope>,
    ) {
        loop {
            let envelope = match receiver.recv().await {
                Ok(envelope) => envelope,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notifier lagged, some emails were not sent");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notifier shutting down");
                    break;
                }
            };

            let message = render(&envelope.event);
            let Some(delivery) = &delivery else {
                tracing::debug!(
                    event = envelope.event.name(),
                    to = %message.to,
                    "Email delivery not configured, notification skipped"
                );
                continue;
            };
            let delivery = Arc::clone(delivery);
            tokio::spawn(async move {
                if let Err(e) = delivery.deliver(&message).await {
                    tracing::error!(
                        error = %e,
                        to = %message.to,
                        "Failed to deliver notification email"
                    );
                }
            });
        }
    }
}
