use serde::{Deserialize, Serialize};

/// Request sent to the external RAG/FAQ service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaqRequest {
    pub session_id: i64,
    pub question: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaqResponse {
    pub answer: Option<String>,
}
