//! Response Composer
//!
//! Second completion call of a request: turns structured results (or the schema
//! summary, for informational questions) into a short client-facing answer.

use crate::error::Result;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::schema::SchemaCatalog;
use crate::structuring::StructuredQueryResult;
use std::sync::Arc;
use tracing::info;

const ANSWER_MAX_TOKENS: u32 = 800;
const ANSWER_TEMPERATURE: f32 = 0.2;
const CAPABILITIES_MAX_TOKENS: u32 = 600;
const CAPABILITIES_TEMPERATURE: f32 = 0.3;

const ANSWER_SYSTEM_PROMPT: &str = r#"You are an expert tax data analysis assistant. Analyze the query results and provide a clear, concise response that directly answers the user's question.

RESPONSE GUIDELINES:
1. **Be Direct**: Answer the specific question asked, don't over-explain
2. **Use Data**: Reference actual numbers and values from the results
3. **Be Concise**: Keep responses brief and to the point
4. **Professional Tone**: Use clear, professional language
5. **Client-Friendly**: Never mention technical details like SQL, database queries, or system restrictions
6. **Handle Missing Data Gracefully**: If data is unavailable, simply state that the information is not available without technical explanations

RESPONSE FORMAT:
- Start with the direct answer to the question
- Include specific data points from the results
- Add brief context or insights if helpful
- If data is missing, say "The information for [specific time period/data] is not currently available"
- Keep it under 200 words unless complex analysis is needed

TONE: Professional, direct, and helpful. Avoid technical jargon or system details. Focus on the user's tax information, not how it's retrieved."#;

pub struct ResponseComposer {
    llm: Arc<dyn CompletionClient>,
    catalog: Arc<SchemaCatalog>,
}

impl ResponseComposer {
    pub fn new(llm: Arc<dyn CompletionClient>, catalog: Arc<SchemaCatalog>) -> Self {
        Self { llm, catalog }
    }

    /// Answer a data question from its structured results. The reply is returned verbatim.
    pub async fn compose(&self, question: &str, result: &StructuredQueryResult) -> Result<String> {
        let request = answer_request(question, result)?;
        let answer = self.llm.complete(request).await?;
        info!(
            "Composed answer for {} ({} records)",
            result.category,
            result.records.len()
        );
        Ok(answer)
    }

    /// Answer an informational question about what the assistant can do.
    pub async fn compose_capabilities(&self, question: &str) -> Result<String> {
        let request = capabilities_request(question, &self.catalog.summary());
        let answer = self.llm.complete(request).await?;
        info!("Composed capabilities answer");
        Ok(answer)
    }
}

fn answer_request(question: &str, result: &StructuredQueryResult) -> Result<CompletionRequest> {
    let results_json = serde_json::to_string_pretty(result)?;
    Ok(CompletionRequest {
        system_prompt: ANSWER_SYSTEM_PROMPT.to_string(),
        user_prompt: format!(
            "USER QUESTION: {question}\n\n\
             QUERY RESULTS: {results_json}\n\n\
             TASK: Provide a direct, concise answer to the user's question based on the query results. \
             Be specific with numbers and data points. If no data is available, simply state that the \
             information is not currently available without mentioning technical details."
        ),
        max_tokens: ANSWER_MAX_TOKENS,
        temperature: ANSWER_TEMPERATURE,
    })
}

fn capabilities_request(question: &str, schema_summary: &str) -> CompletionRequest {
    let system_prompt = format!(
        r#"You are a helpful tax data analysis assistant. The user is asking about your capabilities or how to use the system.

DATABASE SCHEMA AVAILABLE:
{schema_summary}

RESPONSE GUIDELINES:
1. **Be Accurate**: Only mention capabilities that are actually available based on the database schema
2. **Be Specific**: Give concrete examples of questions they can ask
3. **Be Helpful**: Provide clear, actionable guidance
4. **Be Honest**: Don't make up capabilities that don't exist

CAPABILITIES TO HIGHLIGHT:
- Income analysis (total income, income by source, year-over-year comparisons)
- Tax return data analysis (AGI, taxable income, deductions, credits)
- Property analysis (property values, locations, types)
- Asset analysis (asset values, types, descriptions)
- Dependent information (names, ages, relationships)
- Year-over-year comparisons and trends
- Tax liability and payment analysis

RESPONSE FORMAT:
- Start with a brief overview of what you can help with
- Provide 3-5 specific example questions they can ask
- Mention any limitations or requirements (like needing specific taxpayer data)
- Keep it concise and practical

TONE: Helpful, accurate, and encouraging. Focus on what they CAN do, not what they can't."#
    );

    CompletionRequest {
        system_prompt,
        user_prompt: format!(
            "USER QUESTION: {question}\n\n\
             TASK: Provide a helpful response about your capabilities based on the actual database schema. \
             Give specific examples of questions they can ask about their tax data."
        ),
        max_tokens: CAPABILITIES_MAX_TOKENS,
        temperature: CAPABILITIES_TEMPERATURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::value::{RawRow, ScalarValue};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct EchoLlm {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionClient for EchoLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            Ok("You own two properties.".to_string())
        }
    }

    fn composer() -> (ResponseComposer, Arc<EchoLlm>) {
        let llm = Arc::new(EchoLlm::default());
        let composer = ResponseComposer::new(llm.clone(), Arc::new(SchemaCatalog::tax_default()));
        (composer, llm)
    }

    #[tokio::test]
    async fn test_compose_sends_structured_json() {
        let (composer, llm) = composer();
        let rows = vec![RawRow::from_pairs(vec![
            ("Address", ScalarValue::from("12 Elm St")),
            ("CurrentValue", ScalarValue::from(450000.0)),
        ])];
        let result = StructuredQueryResult::build(
            "SELECT Address, CurrentValue FROM Properties",
            rows,
            "Show me all my properties",
        );

        let answer = composer.compose("Show me all my properties", &result).await.unwrap();
        assert_eq!(answer, "You own two properties.");

        let requests = llm.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.max_tokens, 800);
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
        assert!(request.user_prompt.starts_with("USER QUESTION: Show me all my properties"));
        assert!(request.user_prompt.contains("\"category\": \"PropertyAnalysis\""));
        assert!(request.user_prompt.contains("\"address\": \"12 Elm St\""));
        assert!(request.system_prompt.contains("Keep it under 200 words"));
    }

    #[tokio::test]
    async fn test_capabilities_prompt_embeds_schema_summary() {
        let (composer, llm) = composer();
        composer.compose_capabilities("What can you ask me about?").await.unwrap();

        let requests = llm.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.max_tokens, 600);
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert!(request.system_prompt.contains("DATABASE SCHEMA SUMMARY:"));
        assert!(request.user_prompt.contains("What can you ask me about?"));
    }
}
