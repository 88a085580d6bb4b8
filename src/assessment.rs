//! The assessment pipeline: assemble, optionally align, predict, grade,
//! explain and compose.

use crate::alignment::align;
use crate::classifier::{LoadedModel, ModelKind};
use crate::errors::{AppError, ResultExt};
use crate::features::{assemble, NumericField};
use crate::grading::grade;
use crate::models::{ApplicantForm, ApplicantRecord, FeatureVector, PredictionResult};
use crate::reasons::{model_reasons, rule_reasons, Explanation, ReasonSource, ReasonStrategy};
use crate::report::{compose, AssessmentReport};
use crate::text_generation::TextGenerator;

pub const NO_GENERATOR_MESSAGE: &str =
    "Explanation unavailable: no text-generation service is configured.";

/// Build the model input row for a record according to the model family.
pub fn prepare_features(model: &LoadedModel, record: &ApplicantRecord) -> FeatureVector {
    match &model.kind {
        ModelKind::RawFeature => record.to_raw_features(),
        ModelKind::OneHotAligned(schema) => align(record, schema),
    }
}

/// Assemble and predict. Request-local errors abort here.
pub fn predict(
    model: &LoadedModel,
    form: &ApplicantForm,
) -> Result<(ApplicantRecord, PredictionResult), AppError> {
    let record = assemble(form, model.variant.includes_credit_score())?;
    let features = prepare_features(model, &record);
    let prediction = model
        .classifier
        .predict(&features)
        .with_context(|| format!("predicting with {}", model.variant))?;

    tracing::debug!(
        "Predicted {} over {} features (probabilities {:?})",
        prediction.label,
        features.len(),
        prediction.probabilities
    );

    Ok((record, prediction))
}

/// Run the full pipeline for one submission.
///
/// Only input problems and classifier faults fail the request. A failing or
/// missing text generator degrades to fallback text on the report.
pub async fn assess<G: TextGenerator>(
    model: &LoadedModel,
    generator: Option<&G>,
    strategy: ReasonStrategy,
    form: &ApplicantForm,
) -> Result<AssessmentReport, AppError> {
    let (record, prediction) = predict(model, form)?;

    // The grade always uses the submitted score, even when the model was
    // trained without it.
    let score = NumericField::SimulatedCreditScore.require(form.simulated_credit_score)?;
    let grade = grade(score);

    let explanation = match (strategy, generator) {
        (ReasonStrategy::Rules, _) => Explanation {
            lines: rule_reasons(score, &record),
            source: ReasonSource::Rules,
        },
        (ReasonStrategy::Model, Some(generator)) => model_reasons(generator, form, prediction.label).await,
        (ReasonStrategy::Model, None) => {
            tracing::warn!("Model reasons requested but no text generator is configured");
            Explanation {
                lines: vec![NO_GENERATOR_MESSAGE.to_string()],
                source: ReasonSource::Fallback,
            }
        }
    };

    tracing::info!(
        "Assessment complete: {} / grade {} / reasons from {:?}",
        prediction.label,
        grade.code,
        explanation.source
    );

    Ok(compose(
        form.worker_id.clone(),
        model.variant,
        &prediction,
        score,
        grade,
        explanation,
    ))
}
