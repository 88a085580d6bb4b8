//! Natural-language reasons behind an assessment.
//!
//! Two interchangeable strategies: fixed threshold rules over the applicant
//! record, or a templated prompt delegated to a [`TextGenerator`]. Neither one
//! fails the request; problems turn into user-facing text.

use crate::models::{ApplicantForm, ApplicantRecord, RiskLabel};
use crate::text_generation::TextGenerator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Score at or above which the rules look for strengths instead of risks.
pub const POSITIVE_SCORE_THRESHOLD: f64 = 680.0;
pub const MAX_RULE_REASONS: usize = 4;
pub const MAX_MODEL_LINES: usize = 5;

pub const LONG_MEMBERSHIP: &str = "Long-standing platform membership (over 10 years) signals stability.";
pub const HIGH_COMPLETION: &str = "Excellent job completion rate (above 95%).";
pub const HIGH_RATING: &str = "Outstanding average customer rating (above 4.5).";
pub const HIGH_CONSISTENCY: &str = "Highly consistent working pattern.";
pub const GENERIC_POSITIVE: &str = "Overall profile supports a good credit standing.";

pub const HIGH_DEBT_RATIO: &str = "Requested loan exceeds five times monthly income (high debt ratio).";
pub const SHORT_EXPERIENCE: &str = "Limited work experience (less than 2 years).";
pub const MANY_CANCELLATIONS: &str = "High number of job cancellations.";
pub const MANY_INACTIVE_DAYS: &str = "More than 15 inactive days in the last 30 days.";
pub const MANY_REJECTIONS: &str = "Frequent job rejections in the last 30 days.";
pub const GENERIC_NEGATIVE: &str = "Credit score is below the preferred threshold.";

/// Which strategy produces reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasonStrategy {
    Rules,
    Model,
}

impl FromStr for ReasonStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" | "rule" => Ok(ReasonStrategy::Rules),
            "model" | "llm" => Ok(ReasonStrategy::Model),
            other => Err(format!("unknown reason strategy '{}', expected rules or model", other)),
        }
    }
}

impl fmt::Display for ReasonStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonStrategy::Rules => f.write_str("rules"),
            ReasonStrategy::Model => f.write_str("model"),
        }
    }
}

/// Where the reasons on a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSource {
    Rules,
    Model,
    /// The external call failed and a fallback message was used.
    Fallback,
    /// Inputs were incomplete so the external service was not called.
    Validation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Explanation {
    pub lines: Vec<String>,
    pub source: ReasonSource,
}

/// Rule-based reasons for a score.
pub fn rule_reasons(score: f64, record: &ApplicantRecord) -> Vec<String> {
    let checks: Vec<(bool, &str)> = if score >= POSITIVE_SCORE_THRESHOLD {
        vec![
            (record.membership_duration_months > 120.0, LONG_MEMBERSHIP),
            (record.job_completion_rate > 95.0, HIGH_COMPLETION),
            (record.customer_rating_avg > 4.5, HIGH_RATING),
            (record.work_consistency_index > 0.9, HIGH_CONSISTENCY),
        ]
    } else {
        vec![
            (
                record.monthly_income > 0.0 && record.loan_amount > 5.0 * record.monthly_income,
                HIGH_DEBT_RATIO,
            ),
            (record.work_experience < 2.0, SHORT_EXPERIENCE),
            (record.job_cancellation_count > 10.0, MANY_CANCELLATIONS),
            (record.inactive_days_last_30 > 15.0, MANY_INACTIVE_DAYS),
            (record.rejected_jobs_last_30 > 5.0, MANY_REJECTIONS),
        ]
    };

    let reasons: Vec<String> = checks
        .into_iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, message)| message.to_string())
        .take(MAX_RULE_REASONS)
        .collect();

    if !reasons.is_empty() {
        return reasons;
    }

    let generic = if score >= POSITIVE_SCORE_THRESHOLD {
        GENERIC_POSITIVE
    } else {
        GENERIC_NEGATIVE
    };
    vec![generic.to_string()]
}

fn text(value: &Option<String>) -> Option<String> {
    value.clone()
}

fn number(value: Option<f64>) -> Option<String> {
    value.map(|v| v.to_string())
}

/// Labelled applicant fields in prompt order; `None` marks a missing input.
fn prompt_fields(form: &ApplicantForm) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("Gender", text(&form.gender)),
        ("Age", number(form.age)),
        ("Occupation", text(&form.occupation)),
        ("Education", text(&form.education)),
        ("Marital status", text(&form.marital_status)),
        ("Work experience (years)", number(form.work_experience)),
        ("Certificate", text(&form.certificate)),
        ("Region", text(&form.region)),
        ("Monthly income", number(form.monthly_income)),
        ("Loan amount", number(form.loan_amount)),
        ("Loan purpose", text(&form.loan_purpose)),
        ("Home ownership", text(&form.home_ownership)),
        ("Dependents", number(form.dependents)),
        ("Job completion rate (%)", number(form.job_completion_rate)),
        ("On-time rate (%)", number(form.on_time_rate)),
        ("Average response time (mins)", number(form.avg_response_time_mins)),
        ("Average customer rating", number(form.customer_rating_avg)),
        ("Job acceptance rate (%)", number(form.job_acceptance_rate)),
        ("Job cancellation count", number(form.job_cancellation_count)),
        ("Weekly active days", number(form.weekly_active_days)),
        ("Membership duration (months)", number(form.membership_duration_months)),
        ("Simulated credit score", number(form.simulated_credit_score)),
        ("Work consistency index", number(form.work_consistency_index)),
        ("Inactive days (last 30)", number(form.inactive_days_last_30)),
        ("Rejected jobs (last 30)", number(form.rejected_jobs_last_30)),
    ]
}

/// Labels of applicant fields the explanation prompt needs but lacks.
pub fn missing_prompt_fields(form: &ApplicantForm) -> Vec<&'static str> {
    prompt_fields(form)
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(label, _)| label)
        .collect()
}

/// Build the explanation prompt. Returns `None` if any field is missing.
pub fn build_prompt(form: &ApplicantForm, label: RiskLabel) -> Option<String> {
    let mut prompt = String::from("Applicant profile:\n");
    for (name, value) in prompt_fields(form) {
        prompt.push_str(&format!("- {}: {}\n", name, value?));
    }
    prompt.push_str(&format!(
        "\nModel prediction: class {} ({}).\n\n",
        label.code(),
        label.status()
    ));
    prompt.push_str(&format!(
        "Explain this credit assessment to the applicant in at most {} short lines, \
         using these headings in order:\n\
         Strengths: ...\n\
         Cautions: ...\n\
         Key drivers: ...\n\
         How to improve: ...\n\
         Do not say whether the loan should be approved or rejected.",
        MAX_MODEL_LINES
    ));
    Some(prompt)
}

/// Reasons delegated to an external text generator.
///
/// Incomplete input short-circuits with a validation message and never
/// reaches the generator. Generator failures become fallback text.
pub async fn model_reasons<G: TextGenerator>(
    generator: &G,
    form: &ApplicantForm,
    label: RiskLabel,
) -> Explanation {
    let Some(prompt) = build_prompt(form, label) else {
        let missing = missing_prompt_fields(form);
        tracing::info!("Skipping explanation call, missing fields: {:?}", missing);
        return Explanation {
            lines: vec![format!(
                "Please complete all applicant fields before requesting an explanation (missing: {}).",
                missing.join(", ")
            )],
            source: ReasonSource::Validation,
        };
    };

    match generator.complete(&prompt).await {
        Ok(text) => {
            let lines: Vec<String> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .take(MAX_MODEL_LINES)
                .map(String::from)
                .collect();
            Explanation {
                lines,
                source: ReasonSource::Model,
            }
        }
        Err(e) => {
            tracing::warn!("Falling back after explanation failure: {}", e);
            Explanation {
                lines: vec![e.fallback_message().to_string()],
                source: ReasonSource::Fallback,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::assemble;
    use crate::text_generation::CompletionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Generator stub that records calls and replays a canned outcome.
    struct StubGenerator {
        calls: AtomicUsize,
        outcome: Result<String, CompletionError>,
    }

    impl StubGenerator {
        fn new(outcome: Result<String, CompletionError>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome,
            }
        }
    }

    impl TextGenerator for StubGenerator {
        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn record(form: &ApplicantForm) -> ApplicantRecord {
        assemble(form, true).unwrap()
    }

    #[test]
    fn test_long_membership_only() {
        let mut form = ApplicantForm::sample();
        form.membership_duration_months = Some(130.0);

        let reasons = rule_reasons(700.0, &record(&form));
        assert_eq!(reasons, vec![LONG_MEMBERSHIP.to_string()]);
    }

    #[test]
    fn test_high_debt_ratio_only() {
        let mut form = ApplicantForm::sample();
        form.loan_amount = Some(100_000.0);
        form.monthly_income = Some(10_000.0);

        let reasons = rule_reasons(500.0, &record(&form));
        assert_eq!(reasons, vec![HIGH_DEBT_RATIO.to_string()]);
    }

    #[test]
    fn test_zero_income_skips_debt_ratio() {
        let mut form = ApplicantForm::sample();
        form.monthly_income = Some(0.0);
        form.loan_amount = Some(100_000.0);

        let reasons = rule_reasons(500.0, &record(&form));
        assert_eq!(reasons, vec![GENERIC_NEGATIVE.to_string()]);
    }

    #[test]
    fn test_generic_messages() {
        let sample = record(&ApplicantForm::sample());
        assert_eq!(rule_reasons(680.0, &sample), vec![GENERIC_POSITIVE.to_string()]);
        assert_eq!(rule_reasons(679.0, &sample), vec![GENERIC_NEGATIVE.to_string()]);
    }

    #[test]
    fn test_negative_reasons_capped_at_four() {
        let mut form = ApplicantForm::sample();
        form.loan_amount = Some(1_000_000.0);
        form.work_experience = Some(1.0);
        form.job_cancellation_count = Some(20.0);
        form.inactive_days_last_30 = Some(20.0);
        form.rejected_jobs_last_30 = Some(10.0);

        let reasons = rule_reasons(450.0, &record(&form));
        assert_eq!(
            reasons,
            vec![
                HIGH_DEBT_RATIO.to_string(),
                SHORT_EXPERIENCE.to_string(),
                MANY_CANCELLATIONS.to_string(),
                MANY_INACTIVE_DAYS.to_string(),
            ]
        );
    }

    #[test]
    fn test_all_positive_reasons_in_order() {
        let mut form = ApplicantForm::sample();
        form.membership_duration_months = Some(200.0);
        form.job_completion_rate = Some(99.0);
        form.customer_rating_avg = Some(4.9);
        form.work_consistency_index = Some(0.95);

        let reasons = rule_reasons(800.0, &record(&form));
        assert_eq!(
            reasons,
            vec![
                LONG_MEMBERSHIP.to_string(),
                HIGH_COMPLETION.to_string(),
                HIGH_RATING.to_string(),
                HIGH_CONSISTENCY.to_string(),
            ]
        );
    }

    #[test]
    fn test_prompt_embeds_fields_and_label() {
        let prompt = build_prompt(&ApplicantForm::sample(), RiskLabel::NeedsReview).unwrap();

        assert!(prompt.contains("- Occupation: Private"));
        assert!(prompt.contains("- Simulated credit score: 600"));
        assert!(prompt.contains("class 2 (needs review)"));
        assert!(prompt.contains("Do not say whether the loan should be approved or rejected."));
        assert!(!prompt.contains("W-0001"));
    }

    #[tokio::test]
    async fn test_missing_field_skips_generator() {
        let stub = StubGenerator::new(Ok("should not be used".to_string()));
        let mut form = ApplicantForm::sample();
        form.on_time_rate = None;

        let explanation = model_reasons(&stub, &form, RiskLabel::LowRisk).await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
        assert_eq!(explanation.source, ReasonSource::Validation);
        assert!(explanation.lines[0].contains("On-time rate (%)"));
    }

    #[tokio::test]
    async fn test_model_text_is_trimmed_to_five_lines() {
        let text = "Strengths: a\n\nCautions: b\nKey drivers: c\nHow to improve: d\nExtra: e\nMore: f";
        let stub = StubGenerator::new(Ok(text.to_string()));

        let explanation = model_reasons(&stub, &ApplicantForm::sample(), RiskLabel::LowRisk).await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(explanation.source, ReasonSource::Model);
        assert_eq!(explanation.lines.len(), MAX_MODEL_LINES);
        assert_eq!(explanation.lines[1], "Cautions: b");
    }

    #[tokio::test]
    async fn test_generator_failure_becomes_fallback() {
        let stub = StubGenerator::new(Err(CompletionError::RateLimited("429".to_string())));

        let explanation = model_reasons(&stub, &ApplicantForm::sample(), RiskLabel::HighRisk).await;

        assert_eq!(explanation.source, ReasonSource::Fallback);
        assert_eq!(
            explanation.lines,
            vec![CompletionError::RateLimited(String::new()).fallback_message().to_string()]
        );
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("rules".parse::<ReasonStrategy>().unwrap(), ReasonStrategy::Rules);
        assert_eq!("LLM".parse::<ReasonStrategy>().unwrap(), ReasonStrategy::Model);
        assert!("magic".parse::<ReasonStrategy>().is_err());
    }
}
