//! Result structuring
//!
//! Maps raw rows into [`StructuredRecord`]s by case-insensitive column name.
//! Record `i` is derived from row `i` only. Unmatched columns are dropped.

use crate::execution::value::{RawResultSet, RawRow};
use crate::structuring::classifier::{classify, QueryCategory};
use crate::structuring::record::{QueryMetadata, RecordField, StructuredQueryResult, StructuredRecord};
use chrono::Utc;
use tracing::info;

type FieldTable = &'static [(&'static str, RecordField)];

const INCOME_FIELDS: FieldTable = &[
    ("totalincome", RecordField::FinancialAmount),
    ("amount", RecordField::FinancialAmount),
    ("year", RecordField::Year),
    ("taxyear", RecordField::Year),
    ("type", RecordField::Category),
    ("percentage", RecordField::Percentage),
    ("growth", RecordField::GrowthRate),
    ("growthrate", RecordField::GrowthRate),
];

const PROPERTY_FIELDS: FieldTable = &[
    ("address", RecordField::Address),
    ("type", RecordField::Category),
    ("currentvalue", RecordField::CurrentValue),
    ("purchaseprice", RecordField::PurchaseValue),
    ("mortgagebalance", RecordField::MortgageBalance),
    ("rentalincome", RecordField::RentalIncome),
    ("equity", RecordField::Equity),
];

const ASSET_FIELDS: FieldTable = &[
    ("type", RecordField::Category),
    ("description", RecordField::Description),
    ("currentvalue", RecordField::CurrentValue),
    ("purchasevalue", RecordField::PurchaseValue),
    ("annualreturn", RecordField::AnnualReturn),
];

const DEPENDENT_FIELDS: FieldTable = &[
    ("name", RecordField::Name),
    ("relationship", RecordField::Relationship),
    ("dateofbirth", RecordField::DateOfBirth),
    ("eligibleforcredit", RecordField::EligibleForCredit),
    ("estimatedcredit", RecordField::EstimatedCredit),
];

const TAX_LIABILITY_FIELDS: FieldTable = &[
    ("taxyear", RecordField::Year),
    ("totalincome", RecordField::FinancialAmount),
    ("agi", RecordField::Agi),
    ("taxableincome", RecordField::TaxableIncome),
    ("taxliability", RecordField::TaxLiability),
    ("taxcredits", RecordField::TaxCredits),
    ("taxpaid", RecordField::TaxPaid),
    ("refund", RecordField::Refund),
    ("effectiverate", RecordField::EffectiveRate),
];

pub fn structure(rows: &[RawRow], category: QueryCategory) -> Vec<StructuredRecord> {
    match category {
        QueryCategory::IncomeAnalysis => map_rows(rows, INCOME_FIELDS),
        QueryCategory::PropertyAnalysis => map_rows(rows, PROPERTY_FIELDS),
        QueryCategory::AssetAnalysis => map_rows(rows, ASSET_FIELDS),
        QueryCategory::DependentAnalysis => map_rows(rows, DEPENDENT_FIELDS),
        QueryCategory::TaxLiabilityAnalysis => map_rows(rows, TAX_LIABILITY_FIELDS),
        QueryCategory::ComparisonAnalysis | QueryCategory::TrendAnalysis | QueryCategory::Unknown => {
            rows.iter().map(generic_record).collect()
        }
    }
}

fn map_rows(rows: &[RawRow], table: FieldTable) -> Vec<StructuredRecord> {
    rows.iter()
        .map(|row| {
            let mut record = StructuredRecord::default();
            for (column, value) in row.iter() {
                let key = column.to_lowercase();
                if let Some((_, field)) = table.iter().find(|(name, _)| *name == key) {
                    record.assign(*field, value);
                }
            }
            record
        })
        .collect()
}

/// Substring-based fallback; the first matching clause wins per column.
fn generic_record(row: &RawRow) -> StructuredRecord {
    let mut record = StructuredRecord::default();
    for (column, value) in row.iter() {
        let key = column.to_lowercase();
        let field = if key.contains("amount") || key.contains("value") || key.contains("income") {
            RecordField::FinancialAmount
        } else if key.contains("year") {
            RecordField::Year
        } else if key.contains("type") || key.contains("category") {
            RecordField::Category
        } else if key.contains("name") {
            RecordField::Name
        } else {
            continue;
        };
        record.assign(field, value);
    }
    record
}

fn has_financial_columns(rows: &[RawRow]) -> bool {
    rows.iter().any(|row| {
        row.column_names().any(|name| {
            let key = name.to_lowercase();
            key.contains("amount") || key.contains("value") || key.contains("income")
        })
    })
}

impl StructuredQueryResult {
    /// Classify, structure and describe one result set.
    pub fn build(sql: &str, rows: RawResultSet, question: &str) -> Self {
        let category = classify(sql, question);
        let records = structure(&rows, category);
        info!(
            "Structured {} rows as {} ({} records)",
            rows.len(),
            category,
            records.len()
        );

        let metadata = QueryMetadata {
            category,
            record_count: rows.len(),
            generated_at: Utc::now(),
            sql_text: sql.to_string(),
            has_financial_data: has_financial_columns(&rows),
            data_quality: if rows.is_empty() { "No Data" } else { "Good" }.to_string(),
        };

        Self {
            category,
            records,
            metadata,
            raw_rows: rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::executor::error_row;
    use crate::execution::value::ScalarValue;
    use chrono::NaiveDate;

    fn property_rows() -> RawResultSet {
        vec![
            RawRow::from_pairs(vec![
                ("Address", ScalarValue::from("12 Elm St")),
                ("Type", ScalarValue::from("Primary Residence")),
                ("CurrentValue", ScalarValue::from(450000.0)),
                ("MortgageBalance", ScalarValue::from(210000.0)),
                ("Equity", ScalarValue::from(240000.0)),
            ]),
            RawRow::from_pairs(vec![
                ("ADDRESS", ScalarValue::from("7 Pine Rd")),
                ("type", ScalarValue::from("Rental Property")),
                ("currentvalue", ScalarValue::from(310000.0)),
                ("MortgageBalance", ScalarValue::Null),
                ("RentalIncome", ScalarValue::from(24000.0)),
            ]),
        ]
    }

    #[test]
    fn test_property_mapping_is_case_insensitive() {
        let records = structure(&property_rows(), QueryCategory::PropertyAnalysis);
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].address, "12 Elm St");
        assert_eq!(records[0].category, "Primary Residence");
        assert_eq!(records[0].current_value, 450000.0);
        assert_eq!(records[0].mortgage_balance, 210000.0);
        assert_eq!(records[0].equity, 240000.0);

        assert_eq!(records[1].address, "7 Pine Rd");
        assert_eq!(records[1].current_value, 310000.0);
        assert_eq!(records[1].mortgage_balance, 0.0);
        assert_eq!(records[1].rental_income, 24000.0);
        // not part of the property table
        assert_eq!(records[1].financial_amount, 0.0);
    }

    #[test]
    fn test_income_mapping() {
        let rows = vec![RawRow::from_pairs(vec![
            ("TaxYear", ScalarValue::from(2023)),
            ("TotalIncome", ScalarValue::from("98500.25")),
            ("GrowthRate", ScalarValue::from(4.5)),
            ("Ignored", ScalarValue::from("x")),
        ])];
        let records = structure(&rows, QueryCategory::IncomeAnalysis);
        assert_eq!(records[0].year, 2023);
        assert_eq!(records[0].financial_amount, 98500.25);
        assert_eq!(records[0].growth_rate, 4.5);
    }

    #[test]
    fn test_dependent_mapping() {
        let rows = vec![RawRow::from_pairs(vec![
            ("Name", ScalarValue::from("Ava")),
            ("Relationship", ScalarValue::from("Daughter")),
            ("DateOfBirth", ScalarValue::from("2015-03-02")),
            ("EligibleForCredit", ScalarValue::from(true)),
        ])];
        let records = structure(&rows, QueryCategory::DependentAnalysis);
        assert_eq!(records[0].name, "Ava");
        assert_eq!(records[0].relationship, "Daughter");
        assert_eq!(records[0].date_of_birth, NaiveDate::from_ymd_opt(2015, 3, 2));
        assert!(records[0].eligible_for_credit);
    }

    #[test]
    fn test_tax_liability_mapping() {
        let rows = vec![RawRow::from_pairs(vec![
            ("taxyear", ScalarValue::from(2022)),
            ("AGI", ScalarValue::from(88000.0)),
            ("TaxLiability", ScalarValue::from(12000.0)),
            ("Refund", ScalarValue::from(800.0)),
        ])];
        let records = structure(&rows, QueryCategory::TaxLiabilityAnalysis);
        assert_eq!(records[0].year, 2022);
        assert_eq!(records[0].agi, 88000.0);
        assert_eq!(records[0].tax_liability, 12000.0);
        assert_eq!(records[0].refund, 800.0);
    }

    #[test]
    fn test_generic_fallback() {
        let rows = vec![RawRow::from_pairs(vec![
            ("TaxYear", ScalarValue::from(2023)),
            ("IncomeType", ScalarValue::from(500.0)),
            ("FilingStatus", ScalarValue::from("Single")),
            ("CategoryName", ScalarValue::from("Wages")),
            ("FirstName", ScalarValue::from("Jo")),
        ])];
        for category in [
            QueryCategory::ComparisonAnalysis,
            QueryCategory::TrendAnalysis,
            QueryCategory::Unknown,
        ] {
            let records = structure(&rows, category);
            assert_eq!(records[0].year, 2023);
            // "income" is tested before "type"
            assert_eq!(records[0].financial_amount, 500.0);
            // "category" is tested before "name"
            assert_eq!(records[0].category, "Wages");
            assert_eq!(records[0].name, "Jo");
        }
    }

    #[test]
    fn test_structuring_is_idempotent() {
        let rows = property_rows();
        for category in [QueryCategory::PropertyAnalysis, QueryCategory::Unknown] {
            assert_eq!(structure(&rows, category), structure(&rows, category));
        }
    }

    #[test]
    fn test_error_row_structures_without_panic() {
        let rows = vec![error_row("timeout")];
        let records = structure(&rows, QueryCategory::PropertyAnalysis);
        assert_eq!(records, vec![StructuredRecord::default()]);
    }

    #[test]
    fn test_build_metadata() {
        let sql = "SELECT Address, CurrentValue FROM Properties";
        let result = StructuredQueryResult::build(sql, property_rows(), "Show me all my properties");
        assert_eq!(result.category, QueryCategory::PropertyAnalysis);
        assert_eq!(result.metadata.record_count, 2);
        assert_eq!(result.metadata.sql_text, sql);
        assert!(result.metadata.has_financial_data);
        assert_eq!(result.metadata.data_quality, "Good");
        assert_eq!(result.raw_rows.len(), 2);

        let empty = StructuredQueryResult::build(sql, Vec::new(), "Show me all my properties");
        assert_eq!(empty.metadata.data_quality, "No Data");
        assert!(!empty.metadata.has_financial_data);
        assert!(empty.records.is_empty());
    }
}
