pub mod bot_state;
pub mod database;
pub mod flow;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod payment;
