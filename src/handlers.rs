use crate::assessment::assess;
use crate::classifier::{LoadedModel, ModelKind};
use crate::config::Config;
use crate::errors::AppError;
use crate::models::ApplicantForm;
use crate::report::{grade_table, render_form, render_report, AssessmentReport, GradeBandView};
use crate::text_generation::LlmClient;
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    response::Html,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The model loaded at startup.
    pub model: LoadedModel,
    /// Client for the text-generation service (only when an API key is set).
    pub llm: Option<LlmClient>,
}

impl AppState {
    async fn run(&self, form: &ApplicantForm) -> Result<AssessmentReport, AppError> {
        assess(
            &self.model,
            self.llm.as_ref(),
            self.config.reason_strategy,
            form,
        )
        .await
    }
}

/// Description of the active model.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelInfo {
    pub variant: String,
    pub includes_credit_score: bool,
    /// `raw_feature` or `one_hot_aligned`.
    pub family: String,
    pub classes: Vec<u8>,
    pub feature_schema: Vec<String>,
    pub reason_strategy: String,
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with service status and active model.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "loan-risk-api",
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.model.variant.name(),
        })),
    )
}

/// GET /
///
/// The applicant form, pre-filled with sample values.
pub async fn form_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_form(&ApplicantForm::sample(), state.model.variant, None))
}

/// POST /assess
///
/// Form submission from the HTML page. Errors re-render the form with the
/// submitted values and a message in place of the report. A body that cannot
/// be decoded re-renders an empty form.
pub async fn assess_form(
    State(state): State<Arc<AppState>>,
    payload: Result<Form<ApplicantForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let form = match payload {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::info!("Rejected undecodable form submission: {}", rejection.body_text());
            let page = render_form(
                &ApplicantForm::default(),
                state.model.variant,
                Some(&rejection.body_text()),
            );
            return (StatusCode::BAD_REQUEST, Html(page));
        }
    };
    tracing::info!("POST /assess - worker {:?}", form.worker_id);

    match state.run(&form).await {
        Ok(report) => (StatusCode::OK, Html(render_report(&report))),
        Err(e) => {
            let status = if e.is_input_error() {
                tracing::info!("Rejected form submission: {}", e);
                StatusCode::BAD_REQUEST
            } else {
                tracing::error!("Assessment failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let page = render_form(&form, state.model.variant, Some(&e.user_message()));
            (status, Html(page))
        }
    }
}

/// POST /api/v1/assessments
///
/// Runs the assessment pipeline on a JSON applicant.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - Applicant attributes; the same fields as the HTML form.
///
/// # Returns
///
/// * `Result<Json<AssessmentReport>, AppError>` - The report, or a 400 for invalid
///   or undecodable input.
#[utoipa::path(
    post,
    path = "/api/v1/assessments",
    request_body = ApplicantForm,
    responses(
        (status = 200, description = "Assessment report", body = AssessmentReport),
        (status = 400, description = "Missing, unknown, malformed or out-of-range input"),
        (status = 500, description = "Classifier failure")
    )
)]
pub async fn create_assessment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ApplicantForm>, JsonRejection>,
) -> Result<Json<AssessmentReport>, AppError> {
    let Json(form) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    tracing::info!("POST /api/v1/assessments - worker {:?}", form.worker_id);

    let report = state.run(&form).await?;

    tracing::info!(
        "Report {} issued: {} / grade {}",
        report.id,
        report.status,
        report.grade.code
    );

    Ok(Json(report))
}

/// GET /api/v1/grades
#[utoipa::path(
    get,
    path = "/api/v1/grades",
    responses((status = 200, description = "Static score-to-grade table", body = Vec<GradeBandView>))
)]
pub async fn list_grades() -> Json<Vec<GradeBandView>> {
    Json(grade_table())
}

/// GET /api/v1/model
#[utoipa::path(
    get,
    path = "/api/v1/model",
    responses((status = 200, description = "Active model description", body = ModelInfo))
)]
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let model = &state.model;
    let family = match model.kind {
        ModelKind::RawFeature => "raw_feature",
        ModelKind::OneHotAligned(_) => "one_hot_aligned",
    };

    Json(ModelInfo {
        variant: model.variant.name().to_string(),
        includes_credit_score: model.variant.includes_credit_score(),
        family: family.to_string(),
        classes: model.classifier.classes().to_vec(),
        feature_schema: model.feature_schema(),
        reason_strategy: state.config.reason_strategy.to_string(),
    })
}
