use crate::config::{LlmConfig, LlmProvider};
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A single-turn chat completion: one system message, one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text completion capability used by the generator and the composer.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AgentError::Llm(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        match self.config.provider {
            LlmProvider::OpenAi => format!("{}/chat/completions", self.config.base_url),
            LlmProvider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.config.base_url, self.config.model, self.config.api_version
            ),
        }
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        // Azure takes the deployment from the URL
        if self.config.provider == LlmProvider::OpenAi {
            body["model"] = serde_json::json!(self.config.model);
        }
        body
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = self.request_body(&request);
        debug!(
            "LLM request: max_tokens={}, temperature={}",
            request.max_tokens, request.temperature
        );

        let builder = self.http.post(self.endpoint()).json(&body);
        let builder = match self.config.provider {
            LlmProvider::OpenAi => {
                builder.header("Authorization", format!("Bearer {}", self.config.api_key))
            }
            LlmProvider::Azure => builder.header("api-key", self.config.api_key.as_str()),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response body.
pub fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(AgentError::Llm(format!("LLM API error: {}", error)));
    }

    let choice = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| AgentError::Llm("Empty choices array in LLM response".to_string()))?;

    match choice.get("finish_reason").and_then(|r| r.as_str()) {
        Some("length") => warn!("LLM response was truncated due to length limit"),
        Some("content_filter") => {
            return Err(AgentError::Llm(
                "LLM response was filtered by content policy".to_string(),
            ))
        }
        _ => {}
    }

    let content = choice["message"]["content"]
        .as_str()
        .ok_or_else(|| AgentError::Llm("No content in LLM response".to_string()))?;

    if content.is_empty() {
        return Err(AgentError::Llm("Empty content in LLM response".to_string()));
    }
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(provider: LlmProvider) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: "test-key".to_string(),
            base_url: "https://example.test".to_string(),
            model: "tax-mini".to_string(),
            api_version: "2024-02-01".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "sys".to_string(),
            user_prompt: "user".to_string(),
            max_tokens: 800,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_openai_endpoint_and_body() {
        let client = LlmClient::new(config(LlmProvider::OpenAi)).unwrap();
        assert_eq!(client.endpoint(), "https://example.test/chat/completions");

        let body = client.request_body(&request());
        assert_eq!(body["model"], "tax-mini");
        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }

    #[test]
    fn test_azure_endpoint_uses_deployment() {
        let client = LlmClient::new(config(LlmProvider::Azure)).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.test/openai/deployments/tax-mini/chat/completions?api-version=2024-02-01"
        );
        assert!(client.request_body(&request()).get("model").is_none());
    }

    #[test]
    fn test_extract_content() {
        let body = serde_json::json!({
            "choices": [{"message": {"content": "SELECT 1"}, "finish_reason": "stop"}]
        });
        assert_eq!(extract_content(&body).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_extract_content_errors() {
        let filtered = serde_json::json!({
            "choices": [{"message": {"content": "x"}, "finish_reason": "content_filter"}]
        });
        assert!(extract_content(&filtered).is_err());
        assert!(extract_content(&serde_json::json!({"choices": []})).is_err());
        assert!(extract_content(&serde_json::json!({"error": {"message": "bad key"}})).is_err());
    }
}
