use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{MessageEntity, MessageEntityKind, MessageId, ParseMode, Recipient};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::bot::{AppState, Command};
use crate::config::Config;
use crate::platform::{IncomingMessage, Messenger, TextFormat};
use crate::registry::ChatRef;

/// Telegram Bot API implementation of [`Messenger`].
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Numeric chat ids map to `ChatId`, `@name` to a channel username.
fn tg_recipient(chat: &ChatRef) -> Result<Recipient> {
    let raw = chat.as_str();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    if raw.len() > 1 && raw.starts_with('@') {
        return Ok(Recipient::ChannelUsername(raw.to_string()));
    }
    bail!("invalid chat identifier: {raw:?}")
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, to: &ChatRef, text: &str, format: TextFormat) -> Result<()> {
        let request = self.bot.send_message(tg_recipient(to)?, text);
        match format {
            TextFormat::Plain => request.await?,
            TextFormat::Html => request.parse_mode(ParseMode::Html).await?,
        };
        Ok(())
    }

    async fn forward(&self, to: &ChatRef, from: &ChatRef, message_id: i32) -> Result<()> {
        self.bot
            .forward_message(tg_recipient(to)?, tg_recipient(from)?, MessageId(message_id))
            .await?;
        Ok(())
    }
}

/// Text covered by a `bot_command` entity at offset 0, if any.
///
/// Entity offsets and lengths count UTF-16 code units.
fn leading_command(text: &str, entities: &[MessageEntity]) -> Option<String> {
    let entity = entities
        .iter()
        .find(|e| e.offset == 0 && matches!(e.kind, MessageEntityKind::BotCommand))?;

    let mut units = 0;
    let mut end = 0;
    for (idx, ch) in text.char_indices() {
        if units >= entity.length {
            break;
        }
        units += ch.len_utf16();
        end = idx + ch.len_utf8();
    }
    (end > 0).then(|| text[..end].to_string())
}

fn to_incoming(msg: &Message) -> IncomingMessage {
    let user = msg.from.as_ref();
    let text = msg.text();
    let command = match (text, msg.entities()) {
        (Some(text), Some(entities)) => leading_command(text, entities),
        _ => None,
    };
    IncomingMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        username: user.and_then(|u| u.username.clone()),
        first_name: user.map(|u| u.first_name.clone()),
        text: text.map(str::to_string),
        command,
    }
}

/// Run the Telegram bot platform
pub async fn run(config: Config) -> Result<()> {
    let bot = Bot::new(&config.bot_token);

    info!("Starting Telegram platform...");

    let me = bot.get_me().await?;
    let username = me.username().to_string();
    info!("Logged in as @{}", username);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(config, messenger, username));

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    state.handle(&to_incoming(&msg)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_recipient() {
        let r = tg_recipient(&ChatRef::new("-1001234567890")).unwrap();
        assert_eq!(r, Recipient::Id(ChatId(-1001234567890)));
    }

    #[test]
    fn test_channel_recipient() {
        let r = tg_recipient(&ChatRef::new("@news")).unwrap();
        assert_eq!(r, Recipient::ChannelUsername("@news".to_string()));
    }

    fn command_entity(offset: usize, length: usize) -> MessageEntity {
        MessageEntity::new(MessageEntityKind::BotCommand, offset, length)
    }

    #[test]
    fn test_leading_command_uses_entity_span() {
        let entities = [command_entity(0, 15)];
        assert_eq!(
            leading_command("/start@MyBot_42 payload", &entities).as_deref(),
            Some("/start@MyBot_42")
        );
        assert_eq!(
            leading_command("/Start", &[command_entity(0, 6)]).as_deref(),
            Some("/Start")
        );
    }

    #[test]
    fn test_leading_command_requires_entity_at_start() {
        // Telegram marks no command in "/привет" or "/ hello".
        assert_eq!(leading_command("/привет", &[]), None);
        assert_eq!(leading_command("/ hello", &[]), None);
        assert_eq!(leading_command("see /start", &[command_entity(4, 6)]), None);

        let bold = MessageEntity::new(MessageEntityKind::Bold, 0, 6);
        assert_eq!(leading_command("/start", &[bold]), None);
    }

    #[test]
    fn test_leading_command_counts_utf16_units() {
        // "😀" is two UTF-16 units; the entity covers only "/a".
        let entities = [command_entity(0, 2)];
        assert_eq!(leading_command("/a😀", &entities).as_deref(), Some("/a"));
    }

    #[test]
    fn test_invalid_recipient() {
        assert!(tg_recipient(&ChatRef::new("admin")).is_err());
        assert!(tg_recipient(&ChatRef::new("@")).is_err());
    }
}
