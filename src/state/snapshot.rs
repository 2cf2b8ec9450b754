//! Wizard snapshot and persistence adapter
//!
//! The snapshot is the flat projection of `ProfileState` written on every
//! edit. Hydration is total: a missing, corrupt or partially valid snapshot
//! yields a fully populated profile.

use super::SnapshotStore;
use crate::models::{
    amount, DeductionInputs, IncomeBreakdown, ProfileState, ResidentStatus, TaxRegime,
    DEFAULT_AGE, DEFAULT_FINANCIAL_YEAR, DEFAULT_SALARY,
};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Flat persisted layout. Keys are kept stable across releases; there is no
/// schema version, so every field is read leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WizardSnapshot {
    #[serde(deserialize_with = "lenient")]
    pub fy: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub age: Option<i64>,
    #[serde(rename = "residentStatus", deserialize_with = "lenient")]
    pub resident_status: Option<ResidentStatus>,
    #[serde(rename = "regimePref", deserialize_with = "lenient")]
    pub regime_pref: Option<TaxRegime>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub salary: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub business: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub interest: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub rental: Option<f64>,
    #[serde(
        rename = "capitalGains",
        deserialize_with = "lenient",
        serialize_with = "amount::serialize_opt"
    )]
    pub capital_gains: Option<f64>,
    #[serde(
        rename = "otherIncome",
        deserialize_with = "lenient",
        serialize_with = "amount::serialize_opt"
    )]
    pub other_income: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub d80c: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub d80d: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub d24b: Option<f64>,
    #[serde(deserialize_with = "lenient", serialize_with = "amount::serialize_opt")]
    pub nps: Option<f64>,
    #[serde(
        rename = "otherDed",
        deserialize_with = "lenient",
        serialize_with = "amount::serialize_opt"
    )]
    pub other_ded: Option<f64>,
}

/// A field that fails to parse reads as absent instead of failing the snapshot.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl WizardSnapshot {
    /// Parse stored text. Anything that is not a JSON object is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Apply per-field defaults. Income and deduction heads other than
    /// salary default to zero when absent from a stored snapshot.
    pub fn into_profile(self) -> ProfileState {
        ProfileState {
            financial_year: self.fy.unwrap_or_else(|| DEFAULT_FINANCIAL_YEAR.to_string()),
            age: self.age.unwrap_or(DEFAULT_AGE),
            resident_status: self.resident_status.unwrap_or_default(),
            regime_preference: self.regime_pref,
            income: IncomeBreakdown {
                salary: self.salary.unwrap_or(DEFAULT_SALARY),
                business: self.business.unwrap_or(0.0),
                interest: self.interest.unwrap_or(0.0),
                rental: self.rental.unwrap_or(0.0),
                capital_gains: self.capital_gains.unwrap_or(0.0),
                other: self.other_income.unwrap_or(0.0),
            },
            deductions: DeductionInputs {
                section_80c: self.d80c.unwrap_or(0.0),
                section_80d: self.d80d.unwrap_or(0.0),
                section_24b: self.d24b.unwrap_or(0.0),
                nps_80ccd1b: self.nps.unwrap_or(0.0),
                other: self.other_ded.unwrap_or(0.0),
            },
        }
    }
}

impl From<&ProfileState> for WizardSnapshot {
    fn from(profile: &ProfileState) -> Self {
        Self {
            fy: Some(profile.financial_year.clone()),
            age: Some(profile.age),
            resident_status: Some(profile.resident_status),
            regime_pref: profile.regime_preference,
            salary: Some(profile.income.salary),
            business: Some(profile.income.business),
            interest: Some(profile.income.interest),
            rental: Some(profile.income.rental),
            capital_gains: Some(profile.income.capital_gains),
            other_income: Some(profile.income.other),
            d80c: Some(profile.deductions.section_80c),
            d80d: Some(profile.deductions.section_80d),
            d24b: Some(profile.deductions.section_24b),
            nps: Some(profile.deductions.nps_80ccd1b),
            other_ded: Some(profile.deductions.other),
        }
    }
}

/// Reads and writes the wizard snapshot under a single storage key.
pub struct PersistenceAdapter {
    store: Box<dyn SnapshotStore>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(store: Box<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the stored profile. Never fails.
    pub fn hydrate(&self) -> ProfileState {
        let raw = match self.store.load(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored snapshot, using defaults");
                return ProfileState::default();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Snapshot read failed, using defaults");
                return ProfileState::default();
            }
        };

        match WizardSnapshot::parse(&raw) {
            Some(snapshot) => {
                debug!(key = %self.key, "Hydrated profile from snapshot");
                snapshot.into_profile()
            }
            None => {
                warn!(key = %self.key, "Stored snapshot unparsable, using defaults");
                ProfileState::default()
            }
        }
    }

    /// Overwrite the stored snapshot with the full profile.
    pub fn persist(&self, profile: &ProfileState) -> Result<()> {
        let text = serde_json::to_string(&WizardSnapshot::from(profile))?;
        self.store.save(&self.key, &text)?;
        debug!(key = %self.key, bytes = text.len(), "Snapshot persisted");
        Ok(())
    }

    /// Raw stored text, if any.
    pub fn stored_text(&self) -> Result<Option<String>> {
        self.store.load(&self.key)
    }
}
