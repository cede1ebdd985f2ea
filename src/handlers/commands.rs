use std::error::Error;
use teloxide::{prelude::*, utils::command::BotCommands};

use crate::bot_state::BotState;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start working with the bot")]
    Start,
    #[command(description = "show help")]
    Help,
    #[command(description = "book an appointment")]
    Book,
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match cmd {
        Command::Start => handle_start(bot, msg).await?,
        Command::Help => handle_help(bot, msg).await?,
        Command::Book => {
            for reply in state.engine.start_booking(msg.chat.id).await {
                bot.send_message(msg.chat.id, reply).await?;
            }
        }
    }
    Ok(())
}

async fn handle_start(bot: Bot, msg: Message) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        msg.chat.id,
        "👋 Welcome to the Clinic Booking Bot!\n\
         Type /book to start appointment booking, \
         or just ask your questions.",
    )
    .await?;
    Ok(())
}

async fn handle_help(bot: Bot, msg: Message) -> Result<(), Box<dyn Error + Send + Sync>> {
    bot.send_message(
        msg.chat.id,
        "ℹ️ How it works:\n\
         /book – start appointment booking\n\
         back – return to the previous booking step\n\
         stop – cancel the booking process\n\n\
         Outside of booking you can just ask questions about the clinic, \
         or write \"cancel\" / \"reschedule\" if you need a callback about \
         an existing appointment.",
    )
    .await?;
    Ok(())
}
