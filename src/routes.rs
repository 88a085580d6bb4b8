use crate::handlers::{self, AppState, ModelInfo};
use crate::models::{ApplicantForm, RiskLabel};
use crate::reasons::ReasonSource;
use crate::report::{AssessmentReport, ClassProbability, GradeBandView, GradeView};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

/// Request size limit for form and JSON submissions.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::create_assessment, handlers::list_grades, handlers::model_info),
    components(schemas(
        ApplicantForm,
        AssessmentReport,
        ClassProbability,
        GradeView,
        GradeBandView,
        ModelInfo,
        RiskLabel,
        ReasonSource
    )),
    info(title = "Loan Risk API", description = "Gig-worker loan risk assessment")
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
async fn serve_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Serves the Swagger UI HTML page, configured to load `serve_openapi_spec`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Loan Risk API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Build the application router.
///
/// `/health` bypasses the body limit and rate limiting. The per-IP limiter
/// reads the peer address, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()` when it is enabled.
pub fn create_router(state: Arc<AppState>) -> Router {
    let per_second = state.config.rate_limit_per_second;

    let mut protected_routes: Router<Arc<AppState>> = Router::new()
        // HTML form
        .route("/", get(handlers::form_page))
        .route("/assess", post(handlers::assess_form))
        // API endpoints
        .route("/api/v1/assessments", post(handlers::create_assessment))
        .route("/api/v1/grades", get(handlers::list_grades))
        .route("/api/v1/model", get(handlers::model_info))
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.json", get(serve_openapi_spec))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    if per_second > 0 {
        let burst = u32::try_from(per_second.saturating_mul(2)).unwrap_or(u32::MAX);
        match GovernorConfigBuilder::default()
            .per_second(per_second)
            .burst_size(burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
        {
            Some(governor_conf) => {
                protected_routes = protected_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
                    config: Arc::new(governor_conf),
                }));
                tracing::info!("Rate limiting enabled: {} req/s per IP, burst {}", per_second, burst);
            }
            None => tracing::warn!("Invalid rate limit settings, rate limiting disabled"),
        }
    } else {
        tracing::warn!("Rate limiting disabled");
    }

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
