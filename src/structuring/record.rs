use crate::execution::value::{RawResultSet, ScalarValue};
use crate::structuring::classifier::QueryCategory;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Category-typed view of one raw row. Fields not relevant to the active category
/// keep their zero/empty defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecord {
    // Financial data
    pub financial_amount: f64,
    pub current_value: f64,
    pub purchase_value: f64,
    pub mortgage_balance: f64,
    pub rental_income: f64,
    pub equity: f64,
    pub tax_liability: f64,
    pub tax_credits: f64,
    pub tax_paid: f64,
    pub refund: f64,
    pub agi: f64,
    pub taxable_income: f64,
    pub effective_rate: f64,
    pub estimated_credit: f64,
    pub annual_return: f64,
    pub percentage: f64,
    pub growth_rate: f64,

    // Categorical data
    pub category: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub relationship: String,

    // Temporal data
    pub year: i32,
    pub date_of_birth: Option<NaiveDate>,

    pub eligible_for_credit: bool,
}

/// Addressable record fields, used by the per-category mapping tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    FinancialAmount,
    CurrentValue,
    PurchaseValue,
    MortgageBalance,
    RentalIncome,
    Equity,
    TaxLiability,
    TaxCredits,
    TaxPaid,
    Refund,
    Agi,
    TaxableIncome,
    EffectiveRate,
    EstimatedCredit,
    AnnualReturn,
    Percentage,
    GrowthRate,
    Category,
    Name,
    Description,
    Address,
    Relationship,
    Year,
    DateOfBirth,
    EligibleForCredit,
}

impl StructuredRecord {
    pub fn assign(&mut self, field: RecordField, value: &ScalarValue) {
        match field {
            RecordField::FinancialAmount => self.financial_amount = value.as_f64(),
            RecordField::CurrentValue => self.current_value = value.as_f64(),
            RecordField::PurchaseValue => self.purchase_value = value.as_f64(),
            RecordField::MortgageBalance => self.mortgage_balance = value.as_f64(),
            RecordField::RentalIncome => self.rental_income = value.as_f64(),
            RecordField::Equity => self.equity = value.as_f64(),
            RecordField::TaxLiability => self.tax_liability = value.as_f64(),
            RecordField::TaxCredits => self.tax_credits = value.as_f64(),
            RecordField::TaxPaid => self.tax_paid = value.as_f64(),
            RecordField::Refund => self.refund = value.as_f64(),
            RecordField::Agi => self.agi = value.as_f64(),
            RecordField::TaxableIncome => self.taxable_income = value.as_f64(),
            RecordField::EffectiveRate => self.effective_rate = value.as_f64(),
            RecordField::EstimatedCredit => self.estimated_credit = value.as_f64(),
            RecordField::AnnualReturn => self.annual_return = value.as_f64(),
            RecordField::Percentage => self.percentage = value.as_f64(),
            RecordField::GrowthRate => self.growth_rate = value.as_f64(),
            RecordField::Category => self.category = value.as_text(),
            RecordField::Name => self.name = value.as_text(),
            RecordField::Description => self.description = value.as_text(),
            RecordField::Address => self.address = value.as_text(),
            RecordField::Relationship => self.relationship = value.as_text(),
            RecordField::Year => self.year = value.as_i32(),
            // unparseable dates leave the field untouched
            RecordField::DateOfBirth => {
                if let Some(date) = value.as_date() {
                    self.date_of_birth = Some(date);
                }
            }
            RecordField::EligibleForCredit => self.eligible_for_credit = value.as_bool(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub category: QueryCategory,
    pub record_count: usize,
    pub generated_at: DateTime<Utc>,
    pub sql_text: String,
    pub has_financial_data: bool,
    pub data_quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQueryResult {
    pub category: QueryCategory,
    pub records: Vec<StructuredRecord>,
    pub metadata: QueryMetadata,
    /// Kept for diagnostics.
    pub raw_rows: RawResultSet,
}
