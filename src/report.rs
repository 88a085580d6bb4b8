//! Report composer: combines prediction, grade and reasons into the structure
//! returned by the JSON API and rendered on the HTML pages.

use crate::classifier::ModelVariant;
use crate::encoding::CategoricalField;
use crate::features::NumericField;
use crate::grading::{Grade, GRADE_BANDS};
use crate::models::{ApplicantForm, PredictionResult, RiskLabel};
use crate::reasons::{Explanation, ReasonSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============ Report Models ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GradeView {
    pub code: String,
    pub description: String,
}

impl From<Grade> for GradeView {
    fn from(grade: Grade) -> Self {
        Self {
            code: grade.code.to_string(),
            description: grade.description.to_string(),
        }
    }
}

/// One row of the static score-to-grade table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GradeBandView {
    pub code: String,
    pub min_score: u16,
    pub max_score: u16,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassProbability {
    pub class: u8,
    pub label: RiskLabel,
    pub probability: f64,
}

/// Everything shown to the user for one assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub worker_id: Option<String>,
    pub model_variant: String,
    pub risk_label: RiskLabel,
    pub risk_code: u8,
    pub status: String,
    /// Probability of class 0 (high risk/reject).
    pub reject_probability: f64,
    /// Highest class probability.
    pub confidence: f64,
    /// Per-class probabilities in the model's class order.
    pub probabilities: Vec<ClassProbability>,
    pub credit_score: f64,
    pub grade: GradeView,
    pub grade_table: Vec<GradeBandView>,
    pub reasons: Vec<String>,
    pub reason_source: ReasonSource,
}

/// The static grade table in display order.
pub fn grade_table() -> Vec<GradeBandView> {
    GRADE_BANDS
        .iter()
        .map(|band| GradeBandView {
            code: band.code.to_string(),
            min_score: band.min_score,
            max_score: band.max_score,
            description: band.description.to_string(),
        })
        .collect()
}

/// Assemble a report from the pipeline outputs.
pub fn compose(
    worker_id: Option<String>,
    variant: ModelVariant,
    prediction: &PredictionResult,
    credit_score: f64,
    grade: Grade,
    explanation: Explanation,
) -> AssessmentReport {
    let probabilities = prediction
        .classes
        .iter()
        .zip(&prediction.probabilities)
        .filter_map(|(class, probability)| {
            RiskLabel::from_code(*class).map(|label| ClassProbability {
                class: *class,
                label,
                probability: *probability,
            })
        })
        .collect();

    AssessmentReport {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        worker_id,
        model_variant: variant.name().to_string(),
        risk_label: prediction.label,
        risk_code: prediction.label.code(),
        status: prediction.label.status().to_string(),
        reject_probability: prediction.probability_of(RiskLabel::HighRisk),
        confidence: prediction.confidence(),
        probabilities,
        credit_score,
        grade: grade.into(),
        grade_table: grade_table(),
        reasons: explanation.lines,
        reason_source: explanation.source,
    }
}

// ============ HTML Rendering ============

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f4f6f8; color: #1f2933; }
main { max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
h1 { font-size: 1.6rem; }
.card { background: #fff; border-radius: 8px; padding: 1.25rem 1.5rem; margin-bottom: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: .75rem 1.25rem; }
label { display: block; font-size: .85rem; font-weight: 600; margin-bottom: .2rem; }
input, select { width: 100%; padding: .4rem; border: 1px solid #cbd2d9; border-radius: 4px; box-sizing: border-box; }
button { margin-top: 1rem; padding: .6rem 1.4rem; background: #2563eb; color: #fff; border: 0; border-radius: 4px; font-size: 1rem; cursor: pointer; }
.error { background: #fde8e8; color: #9b1c1c; }
.label-0 { color: #c81e1e; } .label-1 { color: #057a55; } .label-2 { color: #b45309; }
.grade { font-size: 2rem; font-weight: 700; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: .35rem .5rem; border-bottom: 1px solid #e4e7eb; }
tr.current { background: #e1effe; font-weight: 600; }
.muted { color: #616e7c; font-size: .85rem; }
"#;

/// Escape text for safe inclusion in HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n<main>\n{}\n</main>\n</body>\n</html>\n",
        escape_html(title),
        STYLE,
        body
    )
}

enum Input<'a> {
    Text(Option<&'a str>),
    Select(CategoricalField, Option<&'a str>),
    Number(NumericField, Option<f64>, &'static str),
}

/// Form inputs as (field name, caption, widget), grouped the way the page shows them.
fn form_sections(form: &ApplicantForm) -> Vec<(&'static str, Vec<(&'static str, &'static str, Input<'_>)>)> {
    use CategoricalField as C;
    use Input::{Number, Select, Text};
    use NumericField as N;

    vec![
        (
            "Applicant",
            vec![
                ("worker_id", "Worker ID", Text(form.worker_id.as_deref())),
                ("gender", "Gender", Select(C::Gender, form.gender.as_deref())),
                ("age", "Age", Number(N::Age, form.age, "1")),
                ("occupation", "Occupation", Select(C::Occupation, form.occupation.as_deref())),
                ("education", "Education", Select(C::Education, form.education.as_deref())),
                (
                    "marital_status",
                    "Marital status",
                    Select(C::MaritalStatus, form.marital_status.as_deref()),
                ),
                (
                    "work_experience",
                    "Work experience (years)",
                    Number(N::WorkExperience, form.work_experience, "1"),
                ),
                ("certificate", "Certificate", Select(C::Certificate, form.certificate.as_deref())),
                ("region", "Region", Select(C::Region, form.region.as_deref())),
                ("dependents", "Dependents", Number(N::Dependents, form.dependents, "1")),
            ],
        ),
        (
            "Loan",
            vec![
                (
                    "monthly_income",
                    "Monthly income",
                    Number(N::MonthlyIncome, form.monthly_income, "any"),
                ),
                ("loan_amount", "Loan amount", Number(N::LoanAmount, form.loan_amount, "any")),
                ("loan_purpose", "Loan purpose", Select(C::LoanPurpose, form.loan_purpose.as_deref())),
                (
                    "home_ownership",
                    "Home ownership",
                    Select(C::HomeOwnership, form.home_ownership.as_deref()),
                ),
                (
                    "simulated_credit_score",
                    "Simulated credit score",
                    Number(N::SimulatedCreditScore, form.simulated_credit_score, "1"),
                ),
            ],
        ),
        (
            "Platform activity",
            vec![
                (
                    "job_completion_rate",
                    "Job completion rate (%)",
                    Number(N::JobCompletionRate, form.job_completion_rate, "any"),
                ),
                ("on_time_rate", "On-time rate (%)", Number(N::OnTimeRate, form.on_time_rate, "any")),
                (
                    "avg_response_time_mins",
                    "Average response time (mins)",
                    Number(N::AvgResponseTimeMins, form.avg_response_time_mins, "any"),
                ),
                (
                    "customer_rating_avg",
                    "Average customer rating",
                    Number(N::CustomerRatingAvg, form.customer_rating_avg, "0.1"),
                ),
                (
                    "job_acceptance_rate",
                    "Job acceptance rate (%)",
                    Number(N::JobAcceptanceRate, form.job_acceptance_rate, "any"),
                ),
                (
                    "job_cancellation_count",
                    "Job cancellations",
                    Number(N::JobCancellationCount, form.job_cancellation_count, "1"),
                ),
                (
                    "weekly_active_days",
                    "Weekly active days",
                    Number(N::WeeklyActiveDays, form.weekly_active_days, "1"),
                ),
                (
                    "membership_duration_months",
                    "Membership duration (months)",
                    Number(N::MembershipDurationMonths, form.membership_duration_months, "1"),
                ),
                (
                    "work_consistency_index",
                    "Work consistency index",
                    Number(N::WorkConsistencyIndex, form.work_consistency_index, "0.01"),
                ),
                (
                    "inactive_days_last_30",
                    "Inactive days (last 30)",
                    Number(N::InactiveDaysLast30, form.inactive_days_last_30, "1"),
                ),
                (
                    "rejected_jobs_last_30",
                    "Rejected jobs (last 30)",
                    Number(N::RejectedJobsLast30, form.rejected_jobs_last_30, "1"),
                ),
            ],
        ),
    ]
}

fn render_input(name: &str, caption: &str, input: &Input<'_>) -> String {
    let widget = match input {
        Input::Text(value) => format!(
            "<input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\">",
            escape_html(value.unwrap_or_default())
        ),
        Input::Select(field, selected) => {
            let options: String = field
                .levels()
                .map(|level| {
                    let marker = if *selected == Some(level) { " selected" } else { "" };
                    format!(
                        "<option value=\"{0}\"{1}>{0}</option>",
                        escape_html(level),
                        marker
                    )
                })
                .collect();
            format!("<select id=\"{name}\" name=\"{name}\">{}</select>", options)
        }
        Input::Number(field, value, step) => {
            let (min, max) = field.bounds();
            let max_attr = max.map(|m| format!(" max=\"{}\"", m)).unwrap_or_default();
            let value = value.map(|v| v.to_string()).unwrap_or_default();
            format!(
                "<input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{}\"{} step=\"{}\" value=\"{}\">",
                min, max_attr, step, value
            )
        }
    };
    format!(
        "<div><label for=\"{}\">{}</label>{}</div>",
        name,
        escape_html(caption),
        widget
    )
}

/// The applicant form, pre-filled from `form`, with an optional error banner.
pub fn render_form(form: &ApplicantForm, variant: ModelVariant, error: Option<&str>) -> String {
    let mut body = String::from("<h1>Gig worker loan risk assessment</h1>\n");
    body.push_str(&format!(
        "<p class=\"muted\">Active model: {}</p>\n",
        escape_html(variant.name())
    ));

    if let Some(message) = error {
        body.push_str(&format!(
            "<div class=\"card error\"><strong>Could not assess this applicant:</strong> {}</div>\n",
            escape_html(message)
        ));
    }

    body.push_str("<form method=\"post\" action=\"/assess\">\n");
    for (title, inputs) in form_sections(form) {
        body.push_str(&format!("<div class=\"card\"><h2>{}</h2><div class=\"grid\">", title));
        for (name, caption, input) in &inputs {
            body.push_str(&render_input(name, caption, input));
        }
        body.push_str("</div></div>\n");
    }
    body.push_str("<button type=\"submit\">Assess</button>\n</form>");

    page("Loan risk assessment", &body)
}

/// The report page for a finished assessment.
pub fn render_report(report: &AssessmentReport) -> String {
    let mut body = String::from("<h1>Assessment report</h1>\n");
    body.push_str(&format!(
        "<p class=\"muted\">Report {} &middot; {} &middot; model {}{}</p>\n",
        report.id,
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        escape_html(&report.model_variant),
        report
            .worker_id
            .as_deref()
            .map(|w| format!(" &middot; worker {}", escape_html(w)))
            .unwrap_or_default()
    ));

    body.push_str(&format!(
        "<div class=\"card\"><h2>Prediction</h2>\
         <p class=\"grade label-{}\">{}</p>\
         <p>Reject probability: {:.1}% &middot; Confidence: {:.1}%</p><table>\
         <tr><th>Class</th><th>Status</th><th>Probability</th></tr>",
        report.risk_code,
        escape_html(&report.status),
        report.reject_probability * 100.0,
        report.confidence * 100.0
    ));
    for p in &report.probabilities {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            p.class,
            p.label.status(),
            p.probability * 100.0
        ));
    }
    body.push_str("</table></div>\n");

    body.push_str(&format!(
        "<div class=\"card\"><h2>Credit grade</h2>\
         <p><span class=\"grade\">{}</span> {} (score {})</p><table>\
         <tr><th>Grade</th><th>Score range</th><th>Description</th></tr>",
        escape_html(&report.grade.code),
        escape_html(&report.grade.description),
        report.credit_score
    ));
    for band in &report.grade_table {
        let class = if band.code == report.grade.code { " class=\"current\"" } else { "" };
        body.push_str(&format!(
            "<tr{}><td>{}</td><td>{} - {}</td><td>{}</td></tr>",
            class,
            escape_html(&band.code),
            band.min_score,
            band.max_score,
            escape_html(&band.description)
        ));
    }
    body.push_str("</table></div>\n");

    body.push_str("<div class=\"card\"><h2>Reasons</h2><ul>");
    for line in &report.reasons {
        body.push_str(&format!("<li>{}</li>", escape_html(line)));
    }
    body.push_str("</ul></div>\n<p><a href=\"/\">New assessment</a></p>");

    page("Assessment report", &body)
}
