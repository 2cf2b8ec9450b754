//! Review-step rendering
//!
//! Text views over the canonical payload and the analysis slots.

use crate::models::{AnalysisResults, RegimeResult, TaxSummary};
use crate::payload::CanonicalProfilePayload;
use crate::Result;

/// Pretty JSON of the payload exactly as the backend receives it.
pub fn review_json(payload: &CanonicalProfilePayload) -> Result<String> {
    Ok(serde_json::to_string_pretty(payload)?)
}

/// Indian digit grouping: `1234567.5` → `12,34,567.5`.
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return amount.to_string();
    }

    let rounded = (amount * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

    let mut grouped = String::new();
    let len = whole.len();
    for (i, ch) in whole.chars().enumerate() {
        let remaining = len - i;
        if i > 0 && (remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0)) {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let fraction = fraction.trim_end_matches('0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn render_regime(title: &str, result: &RegimeResult) -> String {
    format!(
        "{}\n  Total tax: ₹{}\n  Effective rate: {:.2}%\n",
        title,
        format_inr(result.total_tax),
        result.effective_rate_percent
    )
}

pub fn render_tax_summary(summary: &TaxSummary) -> String {
    let mut out = String::new();

    if let Some(old) = &summary.old {
        out.push_str(&render_regime("Old regime", old));
    }
    if let Some(new) = &summary.new {
        out.push_str(&render_regime("New regime", new));
    }
    for warning in &summary.warnings {
        out.push_str(&format!("• {}\n", warning));
    }

    out
}

/// All populated result slots, in Review-step order.
pub fn render_results(results: &AnalysisResults) -> String {
    let mut sections = Vec::new();

    if let Some(text) = &results.interpretation {
        sections.push(text.clone());
    }
    if let Some(summary) = &results.tax_summary {
        sections.push(render_tax_summary(summary).trim_end().to_string());
    }
    if let Some(checklist) = &results.checklist {
        sections.push(format!("Filing checklist (AI-generated)\n{}", checklist));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProfileState, TaxRegime};
    use crate::payload::build;

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(0.0), "0");
        assert_eq!(format_inr(999.0), "999");
        assert_eq!(format_inr(1000.0), "1,000");
        assert_eq!(format_inr(100000.0), "1,00,000");
        assert_eq!(format_inr(1234567.5), "12,34,567.5");
        assert_eq!(format_inr(-93600.0), "-93,600");
        assert_eq!(format_inr(12.346), "12.35");
    }

    #[test]
    fn test_review_json_is_canonical() {
        let text = review_json(&build(&ProfileState::default())).unwrap();
        assert!(text.contains("\"resident_status\": \"resident\""));
        assert!(text.contains("\"regime_preference\": null"));
        assert!(text.contains("\"salary\": 1200000,"));
        assert!(text.contains("\"other_deductions\": 0\n"));
    }

    #[test]
    fn test_render_tax_summary() {
        let summary = TaxSummary {
            old: Some(RegimeResult {
                regime: TaxRegime::Old,
                gross_total_income: 1_220_000.0,
                deductions: 330_000.0,
                taxable_income: 890_000.0,
                tax_before_cess: 90_000.0,
                cess: 3_600.0,
                total_tax: 93_600.0,
                effective_rate_percent: 7.672,
            }),
            new: None,
            warnings: vec!["Check 80D".to_string()],
        };

        assert_eq!(
            render_tax_summary(&summary),
            "Old regime\n  Total tax: ₹93,600\n  Effective rate: 7.67%\n• Check 80D\n"
        );
    }

    #[test]
    fn test_render_results_skips_empty_slots() {
        let results = AnalysisResults {
            interpretation: None,
            tax_summary: None,
            checklist: Some("1. Collect Form 16".to_string()),
        };
        assert_eq!(
            render_results(&results),
            "Filing checklist (AI-generated)\n1. Collect Form 16"
        );
        assert_eq!(render_results(&AnalysisResults::default()), "");
    }
}
