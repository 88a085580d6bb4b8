//! Load a model artifact and score the sample applicant.
//!
//! Usage: check-model [variant] [model_dir]
//!
//! Defaults come from MODEL_VARIANT and MODEL_DIR. Exits non-zero when the
//! artifact is unusable.

use loan_risk_api::assessment::{predict, prepare_features};
use loan_risk_api::classifier::{LoadedModel, ModelKind, ModelVariant};
use loan_risk_api::models::{ApplicantForm, RiskLabel};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_risk_api=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let variant: ModelVariant = args
        .next()
        .or_else(|| std::env::var("MODEL_VARIANT").ok())
        .unwrap_or_else(|| ModelVariant::RandomForestCreditScore.name().to_string())
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    let model_dir = args
        .next()
        .or_else(|| std::env::var("MODEL_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("models"));

    let model = LoadedModel::load(&model_dir, variant).map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("Variant:        {}", model.variant);
    println!(
        "Family:         {}",
        match model.kind {
            ModelKind::RawFeature => "raw feature codes",
            ModelKind::OneHotAligned(_) => "one-hot aligned",
        }
    );
    println!("Credit score:   {}", model.variant.includes_credit_score());
    println!("Classes:        {:?}", model.classifier.classes());
    println!("Feature schema: {} columns", model.feature_schema().len());
    for (idx, column) in model.feature_schema().iter().enumerate() {
        println!("  {:>2}. {}", idx + 1, column);
    }

    let (record, prediction) =
        predict(&model, &ApplicantForm::sample()).map_err(|e| anyhow::anyhow!("{}", e))?;
    let features = prepare_features(&model, &record);

    println!();
    println!("Sample applicant ({} features):", features.len());
    println!("  Label:      {}", prediction.label);
    for label in RiskLabel::ALL {
        println!("  P({:<16}) = {:.4}", label.status(), prediction.probability_of(label));
    }
    println!("  Confidence: {:.4}", prediction.confidence());

    Ok(())
}
