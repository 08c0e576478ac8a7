//! SQL Generator
//!
//! Builds the schema-grounded generation prompt and asks the completion capability
//! for a single SELECT statement, or the `NO_QUERY` sentinel.

use crate::error::Result;
use crate::llm::{CompletionClient, CompletionRequest};
use crate::schema::SchemaCatalog;
use crate::security::SecurityPolicy;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub const NO_QUERY_SENTINEL: &str = "NO_QUERY";

const GENERATION_MAX_TOKENS: u32 = 800;
const GENERATION_TEMPERATURE: f32 = 0.1;

/// Interpretation of the generator's raw reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedSql {
    /// Informational question; answer without touching the database.
    NoQuery,
    Statement(String),
}

impl GeneratedSql {
    /// Case-insensitive exact match on the trimmed text selects the sentinel.
    pub fn from_reply(reply: &str) -> Self {
        if reply.trim().eq_ignore_ascii_case(NO_QUERY_SENTINEL) {
            GeneratedSql::NoQuery
        } else {
            GeneratedSql::Statement(reply.to_string())
        }
    }
}

pub struct SqlGenerator {
    llm: Arc<dyn CompletionClient>,
    catalog: Arc<SchemaCatalog>,
    policy: Arc<SecurityPolicy>,
}

impl SqlGenerator {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        catalog: Arc<SchemaCatalog>,
        policy: Arc<SecurityPolicy>,
    ) -> Self {
        Self {
            llm,
            catalog,
            policy,
        }
    }

    /// Returns the model reply verbatim; the caller decides whether it is the sentinel.
    pub async fn generate(&self, question: &str, taxpayer_id: Option<Uuid>) -> Result<String> {
        let request = CompletionRequest {
            system_prompt: self.system_prompt(taxpayer_id)?,
            user_prompt: question.to_string(),
            max_tokens: GENERATION_MAX_TOKENS,
            temperature: GENERATION_TEMPERATURE,
        };

        let reply = self.llm.complete(request).await?;
        info!("Generated SQL: {}", reply.trim());
        Ok(reply)
    }

    /// Deterministic for a given catalog, policy and taxpayer id.
    pub fn system_prompt(&self, taxpayer_id: Option<Uuid>) -> Result<String> {
        let schema_summary = self.catalog.summary();
        let schema_document = self.catalog.document()?;

        let taxpayer_filter = match taxpayer_id {
            Some(id) => format!(
                "IMPORTANT: This query is for a specific taxpayer (ID: {id}).\n\
                 Always include WHERE clauses to filter by TaxpayerId = '{id}' when querying taxpayer-specific data."
            ),
            None => String::new(),
        };

        let safe_aliases = self.policy.safe_alias_lines();
        let (first_aliases, rest_aliases) = safe_aliases.split_at(safe_aliases.len().min(3));

        Ok(format!(
            r#"You are an expert SQL query generator for tax data analysis. You have access to the complete database schema and knowledge base.

DATABASE STRUCTURE OVERVIEW:
{schema_summary}

DETAILED SCHEMA DOCUMENT:
{schema_document}

QUERY GENERATION GUIDELINES:

1. **Table Relationships & Data Location:**
   - TaxReturns table contains the main financial data (TotalIncome, AGI, TaxableIncome, etc.)
   - IncomeSources table contains detailed income breakdowns linked to TaxReturns
   - Properties, Assets, Dependents are linked directly to Taxpayers
   - Always use proper JOINs based on foreign key relationships

2. **Income Analysis Patterns:**
   - For total income: Use TaxReturns.TotalIncome (main field) or SUM(IncomeSources.Amount) for detailed breakdown
   - For income by source: JOIN IncomeSources with TaxReturns
   - For year comparisons: Filter by TaxReturns.TaxYear

3. **Query Structure:**
   - The database is PostgreSQL: write PostgreSQL dialect only (LIMIT n, not TOP n; no [bracketed] identifiers)
   - Use exact table and column names from schema
   - Apply proper WHERE clauses for taxpayer and year filtering
   - Use appropriate aggregate functions (SUM, AVG, COUNT, MAX, MIN)
   - Handle NULL values with COALESCE
   - Use ORDER BY for meaningful data presentation
   - Do not select record timestamp columns (CreatedAt, UpdatedAt)

4. **Safe Aliases (CRITICAL):**
   - Use: {first_aliases}
   - Use: {rest_aliases}
   - NEVER use reserved keywords: IS, AS, ON, IN, BY, OR, AND, etc.

5. **Security Requirements:**
   - ONLY generate SELECT statements
   - NEVER access SSN, passwords, or sensitive personal data
   - NEVER generate DROP, DELETE, INSERT, UPDATE, or ALTER statements
   - Always filter by TaxpayerId for specific taxpayer queries

6. **Response Format:**
   - If the question requires actual database data (income, properties, assets, etc.), generate a SQL query
   - If the question is informational/general ("what can I ask", "how to use", etc.), respond with "{NO_QUERY_SENTINEL}"
   - Only generate SQL for questions that need real data from the database

{taxpayer_filter}

Generate ONLY a clean, safe SELECT query that directly answers the user's question, OR respond with "{NO_QUERY_SENTINEL}" if no database query is needed. No explanations or comments."#,
            first_aliases = first_aliases.join(", "),
            rest_aliases = rest_aliases.join(", "),
        ))
    }
}
