//! Canonical profile payload
//!
//! The nested shape the backend's tax and AI services expect.
//! Always derived from `ProfileState`, never stored.

use crate::models::{DeductionInputs, IncomeBreakdown, ProfileState, ResidentStatus, TaxRegime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalProfilePayload {
    pub fy: String,
    pub age: i64,
    pub resident_status: ResidentStatus,
    /// Serialized as `null` when the filer lets the backend compare.
    pub regime_preference: Option<TaxRegime>,
    pub income: IncomeBreakdown,
    pub deductions: DeductionInputs,
}

/// Build the canonical payload. Pure and total: values pass through untouched.
pub fn build(profile: &ProfileState) -> CanonicalProfilePayload {
    CanonicalProfilePayload {
        fy: profile.financial_year.clone(),
        age: profile.age,
        resident_status: profile.resident_status,
        regime_preference: profile.regime_preference,
        income: profile.income.clone(),
        deductions: profile.deductions.clone(),
    }
}

impl From<&ProfileState> for CanonicalProfilePayload {
    fn from(profile: &ProfileState) -> Self {
        build(profile)
    }
}
