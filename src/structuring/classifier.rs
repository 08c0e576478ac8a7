//! Result classification
//!
//! Ordered keyword rules over the lower-cased SQL text and question.
//! First matching rule wins; there is no scoring.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryCategory {
    Unknown,
    IncomeAnalysis,
    PropertyAnalysis,
    AssetAnalysis,
    DependentAnalysis,
    TaxLiabilityAnalysis,
    ComparisonAnalysis,
    TrendAnalysis,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::Unknown => "Unknown",
            QueryCategory::IncomeAnalysis => "IncomeAnalysis",
            QueryCategory::PropertyAnalysis => "PropertyAnalysis",
            QueryCategory::AssetAnalysis => "AssetAnalysis",
            QueryCategory::DependentAnalysis => "DependentAnalysis",
            QueryCategory::TaxLiabilityAnalysis => "TaxLiabilityAnalysis",
            QueryCategory::ComparisonAnalysis => "ComparisonAnalysis",
            QueryCategory::TrendAnalysis => "TrendAnalysis",
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Rule = fn(&str, &str) -> bool;

/// Precedence order is part of the contract.
const RULES: &[(QueryCategory, Rule)] = &[
    (QueryCategory::IncomeAnalysis, is_income),
    (QueryCategory::PropertyAnalysis, is_property),
    (QueryCategory::AssetAnalysis, is_asset),
    (QueryCategory::DependentAnalysis, is_dependent),
    (QueryCategory::TaxLiabilityAnalysis, is_tax_liability),
    (QueryCategory::ComparisonAnalysis, is_comparison),
    (QueryCategory::TrendAnalysis, is_trend),
];

pub fn classify(sql: &str, question: &str) -> QueryCategory {
    let sql = sql.to_lowercase();
    let question = question.to_lowercase();

    RULES
        .iter()
        .find(|(_, rule)| rule(&sql, &question))
        .map(|(category, _)| *category)
        .unwrap_or(QueryCategory::Unknown)
}

fn is_income(sql: &str, q: &str) -> bool {
    (sql.contains("sum") && sql.contains("income"))
        || (q.contains("income") && (q.contains("total") || q.contains("last year")))
}

fn is_property(sql: &str, q: &str) -> bool {
    mentions_any(sql, &["property", "properties"])
        || mentions_any(q, &["property", "properties", "real estate"])
}

fn is_asset(sql: &str, q: &str) -> bool {
    mentions_any(sql, &["asset"]) || mentions_any(q, &["asset", "investment"])
}

fn is_dependent(sql: &str, q: &str) -> bool {
    mentions_any(sql, &["dependent"]) || mentions_any(q, &["dependent", "child"])
}

fn is_tax_liability(sql: &str, q: &str) -> bool {
    let liability = |text: &str| {
        text.contains("tax") && (text.contains("liability") || text.contains("refund"))
    };
    liability(sql) || liability(q)
}

fn is_comparison(sql: &str, q: &str) -> bool {
    sql.contains("group by") || q.contains("compare")
}

fn is_trend(sql: &str, q: &str) -> bool {
    (sql.contains("order by") && sql.contains("year")) || q.contains("trend") || q.contains("growth")
}

fn mentions_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_income_beats_property() {
        let sql = "SELECT SUM(RentalIncome) FROM Properties";
        assert_eq!(classify(sql, "rental numbers"), QueryCategory::IncomeAnalysis);
    }

    #[test]
    fn test_income_from_question() {
        assert_eq!(
            classify("SELECT 1", "What was my total income?"),
            QueryCategory::IncomeAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "income last year"),
            QueryCategory::IncomeAnalysis
        );
        // "income" alone is not enough
        assert_eq!(classify("SELECT 1", "my income"), QueryCategory::Unknown);
    }

    #[test]
    fn test_property_asset_dependent() {
        assert_eq!(
            classify(
                "SELECT Address FROM Properties WHERE TaxpayerId = '1'",
                "Show me all my properties"
            ),
            QueryCategory::PropertyAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "real estate holdings"),
            QueryCategory::PropertyAnalysis
        );
        assert_eq!(
            classify("SELECT Type FROM Assets", "what do I own"),
            QueryCategory::AssetAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "my investment accounts"),
            QueryCategory::AssetAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "how many children do I claim"),
            QueryCategory::DependentAnalysis
        );
    }

    #[test]
    fn test_tax_liability() {
        assert_eq!(
            classify("SELECT TaxLiability FROM TaxReturns", "what do I owe"),
            QueryCategory::TaxLiabilityAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "when is my tax refund"),
            QueryCategory::TaxLiabilityAnalysis
        );
    }

    #[test]
    fn test_comparison_and_trend() {
        assert_eq!(
            classify("SELECT TaxYear, AVG(AGI) FROM TaxReturns GROUP BY TaxYear", "agi"),
            QueryCategory::ComparisonAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "compare 2022 with 2023"),
            QueryCategory::ComparisonAnalysis
        );
        assert_eq!(
            classify("SELECT TaxYear, AGI FROM TaxReturns ORDER BY TaxYear", "agi"),
            QueryCategory::TrendAnalysis
        );
        assert_eq!(
            classify("SELECT 1", "agi growth"),
            QueryCategory::TrendAnalysis
        );
    }

    #[test]
    fn test_unknown_and_determinism() {
        let sql = "SELECT FilingStatus FROM TaxReturns";
        assert_eq!(classify(sql, "filing status?"), QueryCategory::Unknown);
        for _ in 0..3 {
            assert_eq!(classify(sql, "filing status?"), QueryCategory::Unknown);
        }
    }
}
