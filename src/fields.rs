//! Editable fields and the input layer
//!
//! Maps form inputs onto `ProfileState`. Numeric inputs behave like an HTML
//! number input: empty reads as zero, anything unparsable as NaN. No range
//! checks happen here; see `validation` for non-blocking warnings.

use crate::error::WizardError;
use crate::models::{ProfileState, ResidentStatus, TaxRegime, DEFAULT_AGE};
use crate::steps::Step;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    FinancialYear,
    Age,
    ResidentStatus,
    RegimePreference,
    Salary,
    Business,
    Interest,
    Rental,
    CapitalGains,
    OtherIncome,
    Section80c,
    Section80d,
    Section24b,
    Nps80ccd1b,
    OtherDeductions,
}

const PROFILE_FIELDS: &[FieldKey] = &[
    FieldKey::FinancialYear,
    FieldKey::Age,
    FieldKey::ResidentStatus,
    FieldKey::RegimePreference,
];

const INCOME_FIELDS: &[FieldKey] = &[
    FieldKey::Salary,
    FieldKey::Business,
    FieldKey::Interest,
    FieldKey::Rental,
    FieldKey::CapitalGains,
    FieldKey::OtherIncome,
];

const DEDUCTION_FIELDS: &[FieldKey] = &[
    FieldKey::Section80c,
    FieldKey::Section80d,
    FieldKey::Section24b,
    FieldKey::Nps80ccd1b,
    FieldKey::OtherDeductions,
];

/// Fields rendered on a step. Review has none.
pub fn fields_for(step: Step) -> &'static [FieldKey] {
    match step {
        Step::Profile => PROFILE_FIELDS,
        Step::Income => INCOME_FIELDS,
        Step::Deductions => DEDUCTION_FIELDS,
        Step::Review => &[],
    }
}

impl FieldKey {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKey::FinancialYear => "financial_year",
            FieldKey::Age => "age",
            FieldKey::ResidentStatus => "resident_status",
            FieldKey::RegimePreference => "regime_preference",
            FieldKey::Salary => "salary",
            FieldKey::Business => "business",
            FieldKey::Interest => "interest",
            FieldKey::Rental => "rental",
            FieldKey::CapitalGains => "capital_gains",
            FieldKey::OtherIncome => "other_income",
            FieldKey::Section80c => "section_80c",
            FieldKey::Section80d => "section_80d",
            FieldKey::Section24b => "section_24b",
            FieldKey::Nps80ccd1b => "nps_80ccd1b",
            FieldKey::OtherDeductions => "other_deductions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKey::FinancialYear => "Financial Year",
            FieldKey::Age => "Age",
            FieldKey::ResidentStatus => "Resident status",
            FieldKey::RegimePreference => "Preferred regime",
            FieldKey::Salary => "Salary income (₹)",
            FieldKey::Business => "Business / professional (₹)",
            FieldKey::Interest => "Interest income (₹)",
            FieldKey::Rental => "Rental income (₹)",
            FieldKey::CapitalGains => "Capital gains (₹)",
            FieldKey::OtherIncome => "Other income (₹)",
            FieldKey::Section80c => "80C investments (₹)",
            FieldKey::Section80d => "80D medical insurance (₹)",
            FieldKey::Section24b => "24(b) home loan interest (₹)",
            FieldKey::Nps80ccd1b => "80CCD(1B) NPS (₹)",
            FieldKey::OtherDeductions => "Other deductions (₹)",
        }
    }

    pub fn step(&self) -> Step {
        if PROFILE_FIELDS.contains(self) {
            Step::Profile
        } else if INCOME_FIELDS.contains(self) {
            Step::Income
        } else {
            Step::Deductions
        }
    }

    /// Current value as the input widget would display it.
    pub fn display_value(&self, profile: &ProfileState) -> String {
        match self {
            FieldKey::FinancialYear => profile.financial_year.clone(),
            FieldKey::Age => profile.age.to_string(),
            FieldKey::ResidentStatus => profile.resident_status.to_string(),
            FieldKey::RegimePreference => profile
                .regime_preference
                .map(|r| r.to_string())
                .unwrap_or_default(),
            _ => self.amount(profile).map(|v| v.to_string()).unwrap_or_default(),
        }
    }

    fn amount(&self, profile: &ProfileState) -> Option<f64> {
        let income = &profile.income;
        let deductions = &profile.deductions;
        match self {
            FieldKey::Salary => Some(income.salary),
            FieldKey::Business => Some(income.business),
            FieldKey::Interest => Some(income.interest),
            FieldKey::Rental => Some(income.rental),
            FieldKey::CapitalGains => Some(income.capital_gains),
            FieldKey::OtherIncome => Some(income.other),
            FieldKey::Section80c => Some(deductions.section_80c),
            FieldKey::Section80d => Some(deductions.section_80d),
            FieldKey::Section24b => Some(deductions.section_24b),
            FieldKey::Nps80ccd1b => Some(deductions.nps_80ccd1b),
            FieldKey::OtherDeductions => Some(deductions.other),
            _ => None,
        }
    }

    fn amount_mut<'a>(&self, profile: &'a mut ProfileState) -> Option<&'a mut f64> {
        let ProfileState {
            income, deductions, ..
        } = profile;
        match self {
            FieldKey::Salary => Some(&mut income.salary),
            FieldKey::Business => Some(&mut income.business),
            FieldKey::Interest => Some(&mut income.interest),
            FieldKey::Rental => Some(&mut income.rental),
            FieldKey::CapitalGains => Some(&mut income.capital_gains),
            FieldKey::OtherIncome => Some(&mut income.other),
            FieldKey::Section80c => Some(&mut deductions.section_80c),
            FieldKey::Section80d => Some(&mut deductions.section_80d),
            FieldKey::Section24b => Some(&mut deductions.section_24b),
            FieldKey::Nps80ccd1b => Some(&mut deductions.nps_80ccd1b),
            FieldKey::OtherDeductions => Some(&mut deductions.other),
            _ => None,
        }
    }

    /// Apply raw widget input to the profile.
    ///
    /// Select-backed fields reject values outside their option list; free
    /// text and numeric fields accept anything.
    pub fn apply(&self, profile: &mut ProfileState, raw: &str) -> Result<()> {
        match self {
            FieldKey::FinancialYear => profile.financial_year = raw.to_string(),
            FieldKey::Age => profile.age = coerce_age(raw),
            FieldKey::ResidentStatus => {
                profile.resident_status = parse_option::<ResidentStatus>(*self, raw)?;
            }
            FieldKey::RegimePreference => {
                profile.regime_preference = if raw.is_empty() {
                    None
                } else {
                    Some(parse_option::<TaxRegime>(*self, raw)?)
                };
            }
            _ => {
                if let Some(slot) = self.amount_mut(profile) {
                    *slot = coerce_number(raw);
                }
            }
        }
        Ok(())
    }
}

impl FromStr for FieldKey {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self> {
        PROFILE_FIELDS
            .iter()
            .chain(INCOME_FIELDS)
            .chain(DEDUCTION_FIELDS)
            .find(|key| key.name() == s)
            .copied()
            .ok_or_else(|| WizardError::UnknownField(s.to_string()))
    }
}

fn parse_option<T: serde::de::DeserializeOwned>(field: FieldKey, raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|_| {
        WizardError::InvalidValue {
            field: field.name().to_string(),
            value: raw.to_string(),
        }
    })
}

/// Number-input coercion: blank is 0, garbage is NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Ages are whole years. A non-numeric age would not survive a reload, so
/// it lands on the default immediately.
fn coerce_age(raw: &str) -> i64 {
    let value = coerce_number(raw);
    if value.is_finite() {
        value.trunc() as i64
    } else {
        DEFAULT_AGE
    }
}
