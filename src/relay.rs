//! Fan-out of one inbound message to every administrator chat.

use anyhow::Context;
use tracing::{debug, error, warn};

use crate::config::{MessagesConfig, ADMINS_ENV};
use crate::platform::{IncomingMessage, Messenger, TextFormat};
use crate::registry::{ChatRef, Recipients};

/// Label used when the sender has neither a handle nor a first name.
pub const UNKNOWN_SENDER: &str = "Unknown user";

/// Human-readable sender label: `@handle`, else first name, else [`UNKNOWN_SENDER`].
pub fn sender_label(username: Option<&str>, first_name: Option<&str>) -> String {
    match (
        username.filter(|u| !u.is_empty()),
        first_name.filter(|n| !n.is_empty()),
    ) {
        (Some(handle), _) => format!("@{handle}"),
        (None, Some(name)) => name.to_string(),
        (None, None) => UNKNOWN_SENDER.to_string(),
    }
}

#[derive(Debug, Default)]
pub struct DeliveryOutcome {
    pub delivered: usize,
    pub failures: Vec<(ChatRef, String)>,
}

impl DeliveryOutcome {
    pub fn any_delivered(&self) -> bool {
        self.delivered > 0
    }
}

/// Deliver `msg` to each recipient in order: a sender notice, then a forward.
///
/// A failure at either step marks that recipient failed and moves on to the next
/// one. Nothing is retried and a sent notice is not withdrawn.
pub async fn fan_out(
    messenger: &dyn Messenger,
    recipients: &Recipients,
    messages: &MessagesConfig,
    msg: &IncomingMessage,
) -> DeliveryOutcome {
    let sender = sender_label(msg.username.as_deref(), msg.first_name.as_deref());
    let notice = messages.sender_notice(&sender);
    let origin = msg.chat();

    let mut outcome = DeliveryOutcome::default();
    for recipient in recipients.iter() {
        let attempt = async {
            messenger
                .send_text(recipient, &notice, TextFormat::Plain)
                .await
                .context("sending sender notice")?;
            messenger
                .forward(recipient, &origin, msg.message_id)
                .await
                .context("forwarding message")
        };

        match attempt.await {
            Ok(()) => {
                debug!("Relayed message {} from {} to {}", msg.message_id, sender, recipient);
                outcome.delivered += 1;
            }
            Err(e) => {
                let reason = format!("{e:#}");
                warn!("Failed to relay to {}: {}", recipient, reason);
                outcome.failures.push((recipient.clone(), reason));
            }
        }
    }
    outcome
}

/// Relay `msg` to all recipients and send the sender a single acknowledgement.
///
/// The reply only says whether delivery succeeded; recipients and errors go to
/// the log.
pub async fn relay(
    messenger: &dyn Messenger,
    recipients: &Recipients,
    messages: &MessagesConfig,
    msg: &IncomingMessage,
) -> DeliveryOutcome {
    let outcome = if recipients.is_empty() {
        error!("{} is not configured, dropping message {}", ADMINS_ENV, msg.message_id);
        DeliveryOutcome::default()
    } else {
        let outcome = fan_out(messenger, recipients, messages, msg).await;
        if !outcome.any_delivered() {
            error!(
                "Message {} was not delivered to any admin: {:?}",
                msg.message_id, outcome.failures
            );
        }
        outcome
    };

    let reply = if outcome.any_delivered() {
        &messages.delivered
    } else {
        &messages.failed
    };
    if let Err(e) = messenger
        .send_text(&msg.chat(), reply, TextFormat::Plain)
        .await
    {
        error!("Failed to reply to chat {}: {:#}", msg.chat_id, e);
    }

    outcome
}
