use std::sync::Arc;

use anyhow::Result;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::platform::{IncomingMessage, Messenger, TextFormat};
use crate::relay;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
    #[command(description = "show your chat ID")]
    MyId,
}

/// How an incoming message is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Command(Command),
    Relay,
    /// Unknown command, or a command addressed to another bot.
    Ignore,
}

/// Shared application state
pub struct AppState {
    config: Config,
    messenger: Arc<dyn Messenger>,
    bot_username: String,
}

impl AppState {
    pub fn new(config: Config, messenger: Arc<dyn Messenger>, bot_username: String) -> Self {
        Self {
            config,
            messenger,
            bot_username: bot_username.to_lowercase(),
        }
    }

    /// Only messages the platform marked as starting with a bot command are
    /// treated as commands; everything else is relayed.
    pub fn route(&self, msg: &IncomingMessage) -> Route {
        let Some(command) = msg.command.as_deref() else {
            return Route::Relay;
        };
        match Command::parse(&command.to_lowercase(), &self.bot_username) {
            Ok(cmd) => Route::Command(cmd),
            Err(e) => {
                debug!("Ignoring command {:?}: {}", command, e);
                Route::Ignore
            }
        }
    }

    /// Route and handle one message. Errors are logged, never returned.
    pub async fn handle(&self, msg: &IncomingMessage) {
        let result = match self.route(msg) {
            Route::Command(Command::Start) => self.greet(msg).await,
            Route::Command(Command::MyId) => self.my_id(msg).await,
            Route::Relay => {
                let outcome = relay::relay(
                    self.messenger.as_ref(),
                    &self.config.recipients,
                    &self.config.messages,
                    msg,
                )
                .await;
                info!(
                    "Message {} from chat {}: delivered to {}/{} admins",
                    msg.message_id,
                    msg.chat_id,
                    outcome.delivered,
                    self.config.recipients.len()
                );
                Ok(())
            }
            Route::Ignore => Ok(()),
        };

        if let Err(e) = result {
            error!("Failed to handle message {}: {:#}", msg.message_id, e);
        }
    }

    async fn greet(&self, msg: &IncomingMessage) -> Result<()> {
        self.messenger
            .send_text(&msg.chat(), &self.config.messages.greeting, TextFormat::Plain)
            .await
    }

    async fn my_id(&self, msg: &IncomingMessage) -> Result<()> {
        self.messenger
            .send_text(
                &msg.chat(),
                &format!("Your chat ID: <code>{}</code>", msg.chat_id),
                TextFormat::Html,
            )
            .await
    }
}
