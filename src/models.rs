//! Core data models for the profile wizard

use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResidentStatus {
    #[default]
    #[serde(rename = "resident")]
    Resident,
    #[serde(rename = "non-resident")]
    NonResident,
    #[serde(rename = "resident-but-not-ordinary", alias = "resident-not-ordinary")]
    ResidentNotOrdinary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaxRegime {
    Old,
    New,
}

/// The three backend analyses the wizard can trigger from the Review step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Interpret,
    ComputeTax,
    Checklist,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::Interpret,
        AnalysisKind::ComputeTax,
        AnalysisKind::Checklist,
    ];
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

//
// ================= Profile =================
//

/// Whole rupee amounts serialize as JSON integers (`1200000`, not
/// `1200000.0`). Fractional and non-finite values keep the float encoding.
pub mod amount {
    use serde::Serializer;

    // 2^53, the largest range where every integer is an exact f64
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT {
            serializer.serialize_i64(*value as i64)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn serialize_opt<S: Serializer>(
        value: &Option<f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Six income heads. Field names match the backend contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IncomeBreakdown {
    #[serde(serialize_with = "amount::serialize")]
    pub salary: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub business: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub interest: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub rental: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub capital_gains: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub other: f64,
}

/// Five deduction categories. Field names match the backend contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeductionInputs {
    #[serde(serialize_with = "amount::serialize")]
    pub section_80c: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub section_80d: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub section_24b: f64,
    #[serde(serialize_with = "amount::serialize")]
    pub nps_80ccd1b: f64,
    #[serde(rename = "other_deductions", serialize_with = "amount::serialize")]
    pub other: f64,
}

/// Everything the wizard tracks about the filer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileState {
    pub financial_year: String,
    pub age: i64,
    pub resident_status: ResidentStatus,
    /// `None` lets the backend compare both regimes.
    pub regime_preference: Option<TaxRegime>,
    pub income: IncomeBreakdown,
    pub deductions: DeductionInputs,
}

pub const DEFAULT_FINANCIAL_YEAR: &str = "2024-25";
pub const DEFAULT_AGE: i64 = 30;
pub const DEFAULT_SALARY: f64 = 1_200_000.0;
pub const DEFAULT_INTEREST: f64 = 20_000.0;

impl Default for ProfileState {
    fn default() -> Self {
        Self {
            financial_year: DEFAULT_FINANCIAL_YEAR.to_string(),
            age: DEFAULT_AGE,
            resident_status: ResidentStatus::Resident,
            regime_preference: None,
            income: IncomeBreakdown {
                salary: DEFAULT_SALARY,
                interest: DEFAULT_INTEREST,
                ..IncomeBreakdown::default()
            },
            deductions: DeductionInputs::default(),
        }
    }
}

//
// ================= Tax results =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegimeResult {
    pub regime: TaxRegime,
    pub gross_total_income: f64,
    pub deductions: f64,
    pub taxable_income: f64,
    pub tax_before_cess: f64,
    pub cess: f64,
    pub total_tax: f64,
    pub effective_rate_percent: f64,
}

/// What the compute-tax action leaves in its result slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaxSummary {
    #[serde(rename = "old_regime")]
    pub old: Option<RegimeResult>,
    #[serde(rename = "new_regime")]
    pub new: Option<RegimeResult>,
    pub warnings: Vec<String>,
}

/// The three independent result slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResults {
    pub interpretation: Option<String>,
    pub tax_summary: Option<TaxSummary>,
    pub checklist: Option<String>,
}

impl fmt::Display for ResidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResidentStatus::Resident => "resident",
            ResidentStatus::NonResident => "non-resident",
            ResidentStatus::ResidentNotOrdinary => "resident-but-not-ordinary",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaxRegime::Old => "old",
            TaxRegime::New => "new",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisKind::Interpret => "interpret",
            AnalysisKind::ComputeTax => "compute_tax",
            AnalysisKind::Checklist => "checklist",
        };
        write!(f, "{}", s)
    }
}
