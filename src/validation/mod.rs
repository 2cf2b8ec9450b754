//! Profile validation
//!
//! Rules-based checks over `ProfileState`. Violations are advisory: they are
//! shown next to the Review payload and never block a build or a request.

use crate::models::ProfileState;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const SECTION_80C_CAP: f64 = 150_000.0;
pub const NPS_80CCD1B_CAP: f64 = 50_000.0;
/// Age band the backend accepts.
pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Violation {
    pub rule: String,
    pub field: Option<String>,
    pub severity: Severity,
    pub message: String,
}

/// Trait for validation rules
pub trait ProfileRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn severity(&self) -> Severity;

    /// Each returned pair is `(field, message)`.
    fn check(&self, profile: &ProfileState) -> Vec<(Option<&'static str>, String)>;
}

/// Validation engine that runs every registered rule
pub struct ValidationEngine {
    rules: Vec<Box<dyn ProfileRule>>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ProfileRule>) {
        self.rules.push(rule);
    }

    pub fn validate(&self, profile: &ProfileState) -> Vec<Violation> {
        let mut violations = Vec::new();

        for rule in &self.rules {
            for (field, message) in rule.check(profile) {
                violations.push(Violation {
                    rule: rule.name().to_string(),
                    field: field.map(str::to_string),
                    severity: rule.severity(),
                    message,
                });
            }
        }

        debug!(
            rule_count = self.rules.len(),
            violations = violations.len(),
            "Profile validated"
        );

        violations
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn amounts(profile: &ProfileState) -> [(&'static str, f64); 11] {
    let i = &profile.income;
    let d = &profile.deductions;
    [
        ("salary", i.salary),
        ("business", i.business),
        ("interest", i.interest),
        ("rental", i.rental),
        ("capital_gains", i.capital_gains),
        ("other_income", i.other),
        ("section_80c", d.section_80c),
        ("section_80d", d.section_80d),
        ("section_24b", d.section_24b),
        ("nps_80ccd1b", d.nps_80ccd1b),
        ("other_deductions", d.other),
    ]
}

//
// ========== Rules ==========
//

/// Rule: every amount is a finite number
pub struct FiniteAmountsRule;

impl ProfileRule for FiniteAmountsRule {
    fn name(&self) -> &'static str {
        "finite_amounts"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, profile: &ProfileState) -> Vec<(Option<&'static str>, String)> {
        amounts(profile)
            .into_iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(field, _)| (Some(field), format!("{} is not a number", field)))
            .collect()
    }
}

/// Rule: amounts are not negative
pub struct NonNegativeAmountsRule;

impl ProfileRule for NonNegativeAmountsRule {
    fn name(&self) -> &'static str {
        "non_negative_amounts"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, profile: &ProfileState) -> Vec<(Option<&'static str>, String)> {
        amounts(profile)
            .into_iter()
            .filter(|(_, v)| *v < 0.0)
            .map(|(field, v)| (Some(field), format!("{} is negative ({})", field, v)))
            .collect()
    }
}

/// Rule: age within the band the backend accepts
pub struct AgeRangeRule;

impl ProfileRule for AgeRangeRule {
    fn name(&self) -> &'static str {
        "age_range"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, profile: &ProfileState) -> Vec<(Option<&'static str>, String)> {
        if (MIN_AGE..=MAX_AGE).contains(&profile.age) {
            return Vec::new();
        }
        vec![(
            Some("age"),
            format!(
                "age {} is outside {}-{}; the backend will reject this profile",
                profile.age, MIN_AGE, MAX_AGE
            ),
        )]
    }
}

/// Rule: financial year looks like `2024-25`
pub struct FinancialYearFormatRule;

impl FinancialYearFormatRule {
    fn is_well_formed(fy: &str) -> bool {
        let Some((start, end)) = fy.split_once('-') else {
            return false;
        };
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if start.len() != 4 || end.len() != 2 || !all_digits(start) || !all_digits(end) {
            return false;
        }
        let (Ok(start), Ok(end)) = (start.parse::<u32>(), end.parse::<u32>()) else {
            return false;
        };
        (start + 1) % 100 == end
    }
}

impl ProfileRule for FinancialYearFormatRule {
    fn name(&self) -> &'static str {
        "financial_year_format"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, profile: &ProfileState) -> Vec<(Option<&'static str>, String)> {
        if Self::is_well_formed(&profile.financial_year) {
            Vec::new()
        } else {
            vec![(
                Some("financial_year"),
                format!(
                    "financial year '{}' is not in YYYY-YY form",
                    profile.financial_year
                ),
            )]
        }
    }
}

/// Rule: statutory caps on 80C and 80CCD(1B)
pub struct DeductionCapsRule;

impl ProfileRule for DeductionCapsRule {
    fn name(&self) -> &'static str {
        "deduction_caps"
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn check(&self, profile: &ProfileState) -> Vec<(Option<&'static str>, String)> {
        let d = &profile.deductions;
        let mut out = Vec::new();
        if d.section_80c > SECTION_80C_CAP {
            out.push((
                Some("section_80c"),
                format!(
                    "80C claim ₹{} exceeds the ₹{} cap; only the cap counts under the old regime",
                    d.section_80c, SECTION_80C_CAP
                ),
            ));
        }
        if d.nps_80ccd1b > NPS_80CCD1B_CAP {
            out.push((
                Some("nps_80ccd1b"),
                format!(
                    "80CCD(1B) claim ₹{} exceeds the ₹{} cap",
                    d.nps_80ccd1b, NPS_80CCD1B_CAP
                ),
            ));
        }
        out
    }
}

/// Create a validation engine with the standard rules
pub fn create_default_validation_engine() -> ValidationEngine {
    let mut engine = ValidationEngine::new();
    engine.add_rule(Box::new(FiniteAmountsRule));
    engine.add_rule(Box::new(NonNegativeAmountsRule));
    engine.add_rule(Box::new(AgeRangeRule));
    engine.add_rule(Box::new(FinancialYearFormatRule));
    engine.add_rule(Box::new(DeductionCapsRule));
    engine
}

/// Pure profile → violations, using the standard rules.
pub fn validate(profile: &ProfileState) -> Vec<Violation> {
    create_default_validation_engine().validate(profile)
}

//
// ================= Tests =================
//
