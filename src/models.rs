use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

// ============ Request Models ============

/// Raw applicant input as submitted by the form or the JSON API.
///
/// Every field is optional at this stage; the feature assembler decides what
/// is required. Empty form fields deserialize to `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ApplicantForm {
    /// Free-text identifier echoed on the report. Never a model feature.
    #[serde(deserialize_with = "empty_string_as_none")]
    pub worker_id: Option<String>,

    #[serde(deserialize_with = "empty_string_as_none")]
    pub gender: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub age: Option<f64>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub occupation: Option<String>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub education: Option<String>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub marital_status: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub work_experience: Option<f64>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub certificate: Option<String>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub region: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_income: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub loan_amount: Option<f64>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub loan_purpose: Option<String>,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub home_ownership: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dependents: Option<f64>,

    #[serde(deserialize_with = "lenient_f64")]
    pub job_completion_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub on_time_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub avg_response_time_mins: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub customer_rating_avg: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub job_acceptance_rate: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub job_cancellation_count: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub weekly_active_days: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub membership_duration_months: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub simulated_credit_score: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub work_consistency_index: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub inactive_days_last_30: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rejected_jobs_last_30: Option<f64>,
}

impl ApplicantForm {
    /// A complete, in-range applicant matching the form's default widget values.
    pub fn sample() -> Self {
        Self {
            worker_id: Some("W-0001".to_string()),
            gender: Some("Male".to_string()),
            age: Some(30.0),
            occupation: Some("Private".to_string()),
            education: Some("Vocational".to_string()),
            marital_status: Some("Single".to_string()),
            work_experience: Some(5.0),
            certificate: Some("Yes".to_string()),
            region: Some("North".to_string()),
            monthly_income: Some(25000.0),
            loan_amount: Some(10000.0),
            loan_purpose: Some("business".to_string()),
            home_ownership: Some("own".to_string()),
            dependents: Some(1.0),
            job_completion_rate: Some(85.0),
            on_time_rate: Some(90.0),
            avg_response_time_mins: Some(10.0),
            customer_rating_avg: Some(4.2),
            job_acceptance_rate: Some(80.0),
            job_cancellation_count: Some(2.0),
            weekly_active_days: Some(5.0),
            membership_duration_months: Some(24.0),
            simulated_credit_score: Some(600.0),
            work_consistency_index: Some(0.75),
            inactive_days_last_30: Some(3.0),
            rejected_jobs_last_30: Some(1.0),
        }
    }
}

/// Accepts JSON numbers, numeric strings (urlencoded forms) and blanks.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not a number", s))),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

// ============ Pipeline Models ============

/// The canonical flat attribute set for one prediction request.
///
/// Categorical fields hold their integer codes. `simulated_credit_score` is
/// `Some` only for model variants trained with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub gender: u8,
    pub age: f64,
    pub occupation: u8,
    pub education: u8,
    pub marital_status: u8,
    pub work_experience: f64,
    pub certificate: u8,
    pub region: u8,
    pub monthly_income: f64,
    pub loan_amount: f64,
    pub loan_purpose: u8,
    pub home_ownership: u8,
    pub dependents: f64,
    pub job_completion_rate: f64,
    pub on_time_rate: f64,
    pub avg_response_time_mins: f64,
    pub customer_rating_avg: f64,
    pub job_acceptance_rate: f64,
    pub job_cancellation_count: f64,
    pub weekly_active_days: f64,
    pub membership_duration_months: f64,
    pub simulated_credit_score: Option<f64>,
    pub work_consistency_index: f64,
    pub inactive_days_last_30: f64,
    pub rejected_jobs_last_30: f64,
}

/// A single row of model input: named columns with their values, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeatureVector {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: f64) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Value of a column, if present.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.values[idx])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

/// Predicted loan-risk class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    /// Class 0: high risk, reject.
    HighRisk,
    /// Class 1: low risk, approve.
    LowRisk,
    /// Class 2: needs further review.
    NeedsReview,
}

impl RiskLabel {
    pub const ALL: [RiskLabel; 3] = [RiskLabel::HighRisk, RiskLabel::LowRisk, RiskLabel::NeedsReview];

    pub fn code(&self) -> u8 {
        match self {
            RiskLabel::HighRisk => 0,
            RiskLabel::LowRisk => 1,
            RiskLabel::NeedsReview => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RiskLabel::HighRisk),
            1 => Some(RiskLabel::LowRisk),
            2 => Some(RiskLabel::NeedsReview),
            _ => None,
        }
    }

    /// Status text shown on the report.
    pub fn status(&self) -> &'static str {
        match self {
            RiskLabel::HighRisk => "high risk/reject",
            RiskLabel::LowRisk => "low risk/approve",
            RiskLabel::NeedsReview => "needs review",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.status())
    }
}

/// Output of the classifier for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: RiskLabel,
    /// Class values in the model's own ordering.
    pub classes: Vec<u8>,
    /// Probabilities aligned with `classes`.
    pub probabilities: Vec<f64>,
}

impl PredictionResult {
    /// Probability of a class, looked up by class value rather than position.
    pub fn probability_of(&self, label: RiskLabel) -> f64 {
        self.classes
            .iter()
            .position(|c| *c == label.code())
            .and_then(|idx| self.probabilities.get(idx).copied())
            .unwrap_or(0.0)
    }

    /// Maximum class probability.
    pub fn confidence(&self) -> f64 {
        self.probabilities.iter().copied().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_accepts_urlencoded_strings_and_blanks() {
        let form: ApplicantForm =
            serde_json::from_value(serde_json::json!({
                "age": "42",
                "monthly_income": "",
                "gender": "  ",
                "region": "South",
            }))
            .unwrap();

        assert_eq!(form.age, Some(42.0));
        assert_eq!(form.monthly_income, None);
        assert_eq!(form.gender, None);
        assert_eq!(form.region.as_deref(), Some("South"));
        assert_eq!(form.loan_amount, None);
    }

    #[test]
    fn test_form_rejects_garbage_numbers() {
        let result: Result<ApplicantForm, _> =
            serde_json::from_value(serde_json::json!({ "age": "forty" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_probability_lookup_follows_class_order() {
        let prediction = PredictionResult {
            label: RiskLabel::LowRisk,
            classes: vec![2, 0, 1],
            probabilities: vec![0.1, 0.3, 0.6],
        };

        assert_eq!(prediction.probability_of(RiskLabel::HighRisk), 0.3);
        assert_eq!(prediction.probability_of(RiskLabel::NeedsReview), 0.1);
        assert_eq!(prediction.confidence(), 0.6);
    }

    #[test]
    fn test_risk_label_codes() {
        for label in RiskLabel::ALL {
            assert_eq!(RiskLabel::from_code(label.code()), Some(label));
        }
        assert_eq!(RiskLabel::from_code(3), None);
        assert_eq!(RiskLabel::HighRisk.status(), "high risk/reject");
    }
}
