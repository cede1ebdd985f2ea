use std::env;
use std::sync::Arc;

use teloxide::prelude::*;

use clinic_booking_bot::bot_state::{BotState, SessionMap};
use clinic_booking_bot::database::{BookingStore, Database};
use clinic_booking_bot::flow::{BookingEngine, FaqAnswers};
use clinic_booking_bot::handlers::{command_handler, message_handler, Command};
use clinic_booking_bot::llm::FaqClient;
use clinic_booking_bot::payment::{self, PaymentState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::init();
    log::info!("Starting clinic booking bot with PostgreSQL...");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let db = Database::new(&database_url).await?;
    db.init().await?;
    log::info!("✅ Database initialized");

    let payment_base =
        env::var("PAYMENT_SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let sessions = SessionMap::new();
    let store: Arc<dyn BookingStore> = Arc::new(db);
    let faq: Arc<dyn FaqAnswers> = Arc::new(FaqClient::from_env()?);
    let engine = Arc::new(BookingEngine::new(
        store.clone(),
        faq,
        sessions.clone(),
        payment_base,
    ));
    let state = BotState::new(engine, sessions.clone());

    let bot = Bot::from_env();

    // Payment confirmation surface runs next to the dispatcher.
    let pay_state = PaymentState {
        bot: bot.clone(),
        store,
        sessions,
    };
    tokio::spawn(async move {
        if let Err(e) = payment::serve(pay_state, port).await {
            log::error!("❌ Payment server stopped: {}", e);
        }
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler));

    log::info!("🚀 Starting dispatcher...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
