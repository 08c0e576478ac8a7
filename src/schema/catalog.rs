//! Schema Catalog
//!
//! Read-only description of the tax database used only as prompt context:
//! tables, columns, relationships, example questions and query guidelines.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    pub name: String,
    pub description: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub relationships: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleQuery {
    pub question: String,
    pub sql: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCatalog {
    pub database_name: String,
    pub description: String,
    pub tables: Vec<TableSpec>,
    #[serde(default)]
    pub common_queries: Vec<ExampleQuery>,
    #[serde(default)]
    pub query_guidelines: Vec<String>,
}

impl SchemaCatalog {
    /// Load a catalog document from JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::Schema(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let catalog: SchemaCatalog = serde_json::from_str(&content).map_err(|e| {
            AgentError::Schema(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        if catalog.tables.is_empty() {
            return Err(AgentError::Schema(format!(
                "Catalog {} declares no tables",
                path.display()
            )));
        }
        Ok(catalog)
    }

    /// Built-in catalog for the tax assistant database.
    pub fn tax_default() -> Self {
        let col = |name: &str, data_type: &str, description: &str| ColumnSpec {
            name: name.to_string(),
            data_type: data_type.to_string(),
            description: description.to_string(),
        };
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let tables = vec![
            TableSpec {
                name: "Taxpayers".to_string(),
                description: "Core taxpayer information and personal details".to_string(),
                columns: vec![
                    col("Id", "Guid", "Primary key, unique identifier"),
                    col("FirstName", "string", "Taxpayer's first name"),
                    col("LastName", "string", "Taxpayer's last name"),
                    col("Email", "string", "Primary email address"),
                    col("PhoneNumber", "string", "Contact phone number"),
                    col("Ssn", "string", "Social Security Number (encrypted)"),
                    col("CreatedAt", "DateTime", "Account creation timestamp"),
                    col("LastLoginAt", "DateTime?", "Last login timestamp"),
                    col("IsActive", "bool", "Account active status"),
                ],
                relationships: strings(&[
                    "One-to-Many with TaxReturns",
                    "One-to-Many with Properties",
                    "One-to-Many with Assets",
                    "One-to-Many with Dependents",
                ]),
            },
            TableSpec {
                name: "TaxReturns".to_string(),
                description: "Annual tax return summaries and financial data".to_string(),
                columns: vec![
                    col("Id", "Guid", "Primary key, unique identifier"),
                    col("TaxpayerId", "Guid", "Foreign key to Taxpayers table"),
                    col("TaxYear", "int", "Tax year (e.g., 2023, 2022)"),
                    col("FilingStatus", "string", "Filing status (Single, Married Filing Joint, etc.)"),
                    col("AGI", "decimal", "Adjusted Gross Income"),
                    col("TotalIncome", "decimal", "Total income before adjustments"),
                    col("TaxableIncome", "decimal", "Taxable income after deductions"),
                    col("Deductions", "decimal", "Total deductions claimed"),
                    col("TaxLiability", "decimal", "Total tax liability"),
                    col("TaxCredits", "decimal", "Total tax credits"),
                    col("TaxPaid", "decimal", "Total tax paid"),
                    col("Refund", "decimal", "Refund amount"),
                    col("BalanceDue", "decimal", "Balance due amount"),
                    col("CreatedAt", "DateTime", "Record creation timestamp"),
                    col("UpdatedAt", "DateTime?", "Last update timestamp"),
                ],
                relationships: strings(&["Many-to-One with Taxpayers", "One-to-Many with IncomeSources"]),
            },
            TableSpec {
                name: "IncomeSources".to_string(),
                description: "Detailed income breakdown by source and category".to_string(),
                columns: vec![
                    col("Id", "Guid", "Primary key, unique identifier"),
                    col("ReturnId", "Guid", "Foreign key to TaxReturns table"),
                    col(
                        "Type",
                        "string",
                        "Income type (Wages, Interest, Dividends, Capital Gains, Rental Income, Business Income)",
                    ),
                    col("Amount", "decimal", "Income amount for this source"),
                    col("Description", "string", "Additional description or details"),
                    col("CreatedAt", "DateTime", "Record creation timestamp"),
                    col("UpdatedAt", "DateTime?", "Last update timestamp"),
                ],
                relationships: strings(&["Many-to-One with TaxReturns"]),
            },
            TableSpec {
                name: "Properties".to_string(),
                description: "Real estate properties and investment properties".to_string(),
                columns: vec![
                    col("Id", "Guid", "Primary key, unique identifier"),
                    col("TaxpayerId", "Guid", "Foreign key to Taxpayers table"),
                    col("Address", "string", "Property address"),
                    col("Type", "string", "Property type (Primary Residence, Rental Property, Commercial)"),
                    col("PurchaseYear", "int", "Year property was purchased"),
                    col("PurchasePrice", "decimal", "Original purchase price"),
                    col("CurrentValue", "decimal", "Current estimated value"),
                    col("MortgageBalance", "decimal", "Remaining mortgage balance"),
                    col("RentalIncome", "decimal?", "Annual rental income (if applicable)"),
                    col("Expenses", "decimal?", "Property-related expenses"),
                    col("Notes", "string", "Additional notes or comments"),
                    col("CreatedAt", "DateTime", "Record creation timestamp"),
                    col("UpdatedAt", "DateTime?", "Last update timestamp"),
                ],
                relationships: strings(&["Many-to-One with Taxpayers"]),
            },
            TableSpec {
                name: "Assets".to_string(),
                description: "Non-real estate assets and investments".to_string(),
                columns: vec![
                    col("Id", "Guid", "Primary key, unique identifier"),
                    col("TaxpayerId", "Guid", "Foreign key to Taxpayers table"),
                    col("Type", "string", "Asset type (Stock Portfolio, Crypto, Car, 401k, Roth IRA, etc.)"),
                    col("Description", "string", "Asset description or name"),
                    col("PurchaseYear", "int", "Year asset was acquired"),
                    col("PurchaseValue", "decimal", "Original purchase or contribution value"),
                    col("CurrentValue", "decimal", "Current market value"),
                    col("AnnualReturn", "decimal?", "Annual return percentage"),
                    col("Notes", "string", "Additional notes or comments"),
                    col("CreatedAt", "DateTime", "Record creation timestamp"),
                    col("UpdatedAt", "DateTime?", "Last update timestamp"),
                ],
                relationships: strings(&["Many-to-One with Taxpayers"]),
            },
            TableSpec {
                name: "Dependents".to_string(),
                description: "Tax dependents and family members".to_string(),
                columns: vec![
                    col("Id", "Guid", "Primary key, unique identifier"),
                    col("TaxpayerId", "Guid", "Foreign key to Taxpayers table"),
                    col("Name", "string", "Dependent's full name"),
                    col("DateOfBirth", "DateTime", "Dependent's date of birth"),
                    col("Relationship", "string", "Relationship to taxpayer (Daughter, Son, Parent, etc.)"),
                    col("EligibleForCredit", "bool", "Whether dependent is eligible for tax credits"),
                    col("Ssn", "string", "Dependent's Social Security Number (encrypted)"),
                    col("Notes", "string", "Additional notes or comments"),
                    col("CreatedAt", "DateTime", "Record creation timestamp"),
                    col("UpdatedAt", "DateTime?", "Last update timestamp"),
                ],
                relationships: strings(&["Many-to-One with Taxpayers"]),
            },
        ];

        let example = |question: &str, sql: &str, description: &str| ExampleQuery {
            question: question.to_string(),
            sql: sql.to_string(),
            description: description.to_string(),
        };

        Self {
            database_name: "IRSAssistantDb".to_string(),
            description: "Tax data analysis database for the IRS assistant".to_string(),
            tables,
            common_queries: vec![
                example(
                    "What was my total income last year?",
                    "SELECT SUM(Amount) as TotalIncome FROM IncomeSources WHERE ReturnId IN (SELECT Id FROM TaxReturns WHERE TaxYear = 2023)",
                    "Gets total income from all sources for the most recent tax year",
                ),
                example(
                    "Show me all my properties and their current values",
                    "SELECT Address, Type, CurrentValue, MortgageBalance, (CurrentValue - MortgageBalance) as Equity FROM Properties",
                    "Lists all properties with their current values and equity",
                ),
                example(
                    "What are my tax credits for dependents?",
                    "SELECT Name, Relationship, EligibleForCredit FROM Dependents WHERE EligibleForCredit = true",
                    "Shows all dependents eligible for tax credits",
                ),
                example(
                    "Compare my income between 2022 and 2023",
                    "SELECT TaxYear, SUM(Amount) as TotalIncome FROM IncomeSources inc JOIN TaxReturns ret ON inc.ReturnId = ret.Id WHERE ret.TaxYear IN (2022, 2023) GROUP BY TaxYear ORDER BY TaxYear",
                    "Compares total income across different tax years",
                ),
            ],
            query_guidelines: strings(&[
                "Always use proper JOINs to connect related tables",
                "Filter by TaxpayerId when analyzing specific taxpayer data",
                "Use appropriate aggregate functions (SUM, AVG, COUNT, MAX, MIN)",
                "Include proper WHERE clauses for year filtering",
                "Use ORDER BY for meaningful data presentation",
                "Handle NULL values appropriately with COALESCE",
                "Use decimal precision for monetary calculations",
                "Consider tax year comparisons and trends",
            ]),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Detailed schema document embedded into the generation prompt.
    pub fn document(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Short human-readable overview: key columns per table, relationships, common patterns.
    pub fn summary(&self) -> String {
        let mut out = String::from("DATABASE SCHEMA SUMMARY:\n");
        for table in &self.tables {
            let key_columns: Vec<&str> = table
                .columns
                .iter()
                .filter(|c| !is_sensitive_column(&c.name))
                .take(5)
                .map(|c| c.name.as_str())
                .collect();
            out.push_str(&format!(
                "- {}: {} ({}, etc.)\n",
                table.name,
                table.description,
                key_columns.join(", ")
            ));
        }

        out.push_str("\nKEY RELATIONSHIPS:\n");
        for table in &self.tables {
            for rel in table.relationships.iter().filter(|r| r.starts_with("One-to-Many")) {
                let target = rel.trim_start_matches("One-to-Many with ").trim();
                out.push_str(&format!("- {} → {} (One-to-Many)\n", table.name, target));
            }
        }

        if !self.common_queries.is_empty() {
            out.push_str("\nCOMMON QUERY PATTERNS:\n");
            for q in &self.common_queries {
                out.push_str(&format!("- {}: {}\n", q.question, q.description));
            }
        }
        out
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::tax_default()
    }
}

fn is_sensitive_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "ssn" || lower.contains("password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_catalog_tables() {
        let catalog = SchemaCatalog::tax_default();
        let names: Vec<&str> = catalog.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Taxpayers", "TaxReturns", "IncomeSources", "Properties", "Assets", "Dependents"]
        );
        assert_eq!(catalog.common_queries.len(), 4);
        assert_eq!(catalog.query_guidelines.len(), 8);
        assert!(catalog.table("properties").is_some());
    }

    #[test]
    fn test_summary_hides_sensitive_columns() {
        let summary = SchemaCatalog::tax_default().summary();
        assert!(summary.starts_with("DATABASE SCHEMA SUMMARY:"));
        assert!(summary.contains("- Properties: Real estate properties"));
        assert!(summary.contains("- Taxpayers → TaxReturns (One-to-Many)"));
        assert!(summary.contains("- TaxReturns → IncomeSources (One-to-Many)"));
        assert!(!summary.contains("Ssn"));
    }

    #[test]
    fn test_document_round_trips_through_load() {
        let catalog = SchemaCatalog::tax_default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", catalog.document().unwrap()).unwrap();

        let loaded = SchemaCatalog::load(file.path()).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn test_load_rejects_empty_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"databaseName":"x","description":"y","tables":[]}}"#
        )
        .unwrap();
        let err = SchemaCatalog::load(file.path()).unwrap_err();
        assert!(matches!(err, AgentError::Schema(_)));
    }
}
