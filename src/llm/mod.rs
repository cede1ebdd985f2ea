pub mod config;

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use teloxide::types::ChatId;

use anyhow::Result;

use crate::flow::FaqAnswers;
use crate::llm::config::{FaqRequest, FaqResponse};

const RETRIES: u32 = 1;
const FAQ_SERVICE_HOST_ENV: &str = "FAQ_SERVICE_HOST";

/// Fixed apology used whenever the FAQ service is unreachable or returns
/// nothing useful.
pub const FAQ_FALLBACK: &str = "Sorry, I could not find an answer to your question.";

/// Client for the external retrieval-augmented FAQ service. The service
/// owns the document index, the embeddings and the language model; the bot
/// only sends the question with the session id and relays the answer.
pub struct FaqClient {
    client: ClientWithMiddleware,
    host: String,
}

impl FaqClient {
    pub fn from_env() -> Result<Self> {
        let host = env::var(FAQ_SERVICE_HOST_ENV)?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(RETRIES);
        let client = ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client, host })
    }

    async fn ask(&self, chat_id: ChatId, question: &str) -> Result<String> {
        let request = FaqRequest {
            session_id: chat_id.0,
            question: question.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/answer", self.host))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        let text = response.text().await?;
        let response = serde_json::from_str::<FaqResponse>(&text)?;

        Ok(response.answer.unwrap_or_default())
    }
}

#[async_trait]
impl FaqAnswers for FaqClient {
    async fn answer_question(&self, chat_id: ChatId, text: &str) -> String {
        match self.ask(chat_id, text).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => FAQ_FALLBACK.to_string(),
            Err(e) => {
                log::error!("❌ FAQ service error for chat {}: {}", chat_id, e);
                FAQ_FALLBACK.to_string()
            }
        }
    }
}
