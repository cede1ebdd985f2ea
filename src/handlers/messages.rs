use std::error::Error;
use teloxide::prelude::*;

use crate::bot_state::BotState;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if let Some(text) = msg.text() {
        // Known commands were already consumed by the command branch;
        // anything else starting with '/' gets the static guidance.
        if text.starts_with('/') {
            bot.send_message(
                msg.chat.id,
                "I'm not sure how to respond.\n💡 Type /book to book an appointment \
                 or ask your questions.",
            )
            .await?;
            return Ok(());
        }

        for reply in state.engine.handle_message(msg.chat.id, text).await {
            bot.send_message(msg.chat.id, reply).await?;
        }
    } else {
        bot.send_message(
            msg.chat.id,
            "👋 Please send a text message: ask a question or type /book to \
             book an appointment.",
        )
        .await?;
    }
    Ok(())
}
