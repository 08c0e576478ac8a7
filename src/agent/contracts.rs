use crate::execution::value::RawResultSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

pub const DENIED_ANSWER: &str = "I cannot process this request as it may contain sensitive information or potentially harmful content. Please ask questions related to tax data analysis only.";
pub const GENERIC_ERROR_ANSWER: &str = "I apologize, but I encountered an error processing your request. Please try rephrasing your question.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub question: String,
    pub session_id: Uuid,
    #[serde(default)]
    pub taxpayer_id: Option<Uuid>,
}

impl QueryRequest {
    /// New request in a fresh session.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: Uuid::new_v4(),
            taxpayer_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_taxpayer(mut self, taxpayer_id: Uuid) -> Self {
        self.taxpayer_id = Some(taxpayer_id);
        self
    }
}

/// The only value returned across the agent boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub answer_text: String,
    pub sql: Option<String>,
    pub data: Option<RawResultSet>,
    pub confidence: Option<f64>,
    pub execution_time_ms: Option<u64>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl QueryResponse {
    /// Apology for denied or blocked requests; the reason stays internal in `error_message`.
    pub fn refusal(violation: String, started: Instant) -> Self {
        Self::failure(DENIED_ANSWER, violation, started)
    }

    pub fn error(detail: String, started: Instant) -> Self {
        Self::failure(GENERIC_ERROR_ANSWER, detail, started)
    }

    fn failure(answer: &str, detail: String, started: Instant) -> Self {
        Self {
            answer_text: answer.to_string(),
            sql: None,
            data: None,
            confidence: None,
            execution_time_ms: Some(elapsed_ms(started)),
            error_message: Some(detail),
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_message.is_some()
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
