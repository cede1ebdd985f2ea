pub mod commands;
pub mod messages;

pub use commands::{command_handler, Command};
pub use messages::message_handler;
