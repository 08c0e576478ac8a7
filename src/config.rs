//! Runtime configuration
//!
//! Values come from the process environment (optionally seeded from a `.env` file by the binary).

use crate::error::{AgentError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Azure,
}

impl LlmProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "" => Ok(LlmProvider::OpenAi),
            "azure" | "azure-openai" => Ok(LlmProvider::Azure),
            other => Err(AgentError::Config(format!(
                "Unknown LLM_PROVIDER '{}' (expected 'openai' or 'azure')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    /// OpenAI-compatible base URL, or the Azure resource endpoint.
    pub base_url: String,
    /// Model name, or the Azure deployment name.
    pub model: String,
    pub api_version: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub statement_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub log_path: Option<PathBuf>,
    pub record_blocked_sql: bool,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub database: DatabaseConfig,
    pub audit: AuditConfig,
    pub schema_catalog_path: Option<PathBuf>,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            llm: LlmConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            audit: AuditConfig::from_env()?,
            schema_catalog_path: optional_var("SCHEMA_CATALOG_PATH").map(PathBuf::from),
        })
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        let provider = LlmProvider::parse(&optional_var("LLM_PROVIDER").unwrap_or_default())?;

        let api_key = first_var(&["LLM_API_KEY", "OPENAI_API_KEY", "AZURE_OPENAI_KEY"])
            .ok_or_else(|| AgentError::Config("LLM_API_KEY (or OPENAI_API_KEY) is not set".to_string()))?;

        let base_url = match provider {
            LlmProvider::OpenAi => {
                first_var(&["LLM_BASE_URL"]).unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            }
            LlmProvider::Azure => first_var(&["LLM_BASE_URL", "AZURE_OPENAI_ENDPOINT"])
                .ok_or_else(|| AgentError::Config("AZURE_OPENAI_ENDPOINT is not set".to_string()))?,
        };

        let model = first_var(&["LLM_MODEL", "AZURE_OPENAI_DEPLOYMENT"])
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            provider,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_version: optional_var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            timeout: Duration::from_secs(parse_var("LLM_TIMEOUT_SECS", 60)?),
        })
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        let url = optional_var("DATABASE_URL")
            .ok_or_else(|| AgentError::Config("DATABASE_URL is not set".to_string()))?;
        Ok(Self {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", 10)?,
            statement_timeout: Duration::from_secs(parse_var("DB_STATEMENT_TIMEOUT_SECS", 30)?),
        })
    }
}

impl AuditConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_path: optional_var("AUDIT_LOG_PATH").map(PathBuf::from),
            record_blocked_sql: parse_var("AUDIT_BLOCKED_SQL", false)?,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn first_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| optional_var(name))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match optional_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("Invalid value for {}: '{}'", name, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!(LlmProvider::parse("").unwrap(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::parse("OpenAI").unwrap(), LlmProvider::OpenAi);
        assert_eq!(LlmProvider::parse(" azure ").unwrap(), LlmProvider::Azure);
        assert!(matches!(
            LlmProvider::parse("bedrock"),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: u32 = parse_var("TAX_QUERY_AGENT_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
