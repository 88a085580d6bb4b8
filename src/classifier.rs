//! Model artifacts and the classifier seam.
//!
//! The pipeline only sees [`Classifier`]: a fixed class ordering plus a
//! probability vector per feature row. The bundled implementation evaluates a
//! multinomial linear model exported to JSON.

use crate::errors::AppError;
use crate::features::raw_feature_columns;
use crate::models::{FeatureVector, PredictionResult, RiskLabel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// The closed set of model artifacts the service can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelVariant {
    RandomForestCreditScore,
    RandomForestNoCreditScore,
    XgboostOneHotCreditScore,
    XgboostOneHotNoCreditScore,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 4] = [
        ModelVariant::RandomForestCreditScore,
        ModelVariant::RandomForestNoCreditScore,
        ModelVariant::XgboostOneHotCreditScore,
        ModelVariant::XgboostOneHotNoCreditScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::RandomForestCreditScore => "randomforest_credit_score",
            ModelVariant::RandomForestNoCreditScore => "randomforest_no_credit_score",
            ModelVariant::XgboostOneHotCreditScore => "xgboost_onehot_credit_score",
            ModelVariant::XgboostOneHotNoCreditScore => "xgboost_onehot_no_credit_score",
        }
    }

    pub fn file_name(&self) -> String {
        format!("loan_model_{}.json", self.name())
    }

    /// Whether the simulated credit score was a training feature.
    pub fn includes_credit_score(&self) -> bool {
        matches!(
            self,
            ModelVariant::RandomForestCreditScore | ModelVariant::XgboostOneHotCreditScore
        )
    }

    /// Whether inputs must be one-hot expanded and aligned before prediction.
    pub fn requires_one_hot(&self) -> bool {
        matches!(
            self,
            ModelVariant::XgboostOneHotCreditScore | ModelVariant::XgboostOneHotNoCreditScore
        )
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelVariant::ALL
            .into_iter()
            .find(|v| v.name() == s.trim())
            .ok_or_else(|| {
                let names: Vec<&str> = ModelVariant::ALL.iter().map(|v| v.name()).collect();
                format!("unknown model variant '{}', expected one of {}", s, names.join(", "))
            })
    }
}

impl TryFrom<String> for ModelVariant {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelVariant> for String {
    fn from(value: ModelVariant) -> Self {
        value.name().to_string()
    }
}

/// How a model family expects its input row to be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelKind {
    /// Categorical codes used as numeric columns in training order.
    RawFeature,
    /// Drop-first one-hot indicators aligned to the artifact's schema.
    OneHotAligned(Vec<String>),
}

/// A trained classifier with a fixed class ordering.
pub trait Classifier: Send + Sync {
    /// Class values, in the order `predict_proba` reports them.
    fn classes(&self) -> &[u8];

    /// Per-class probabilities for one feature row.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, AppError>;

    /// Predicted label and probabilities. The label is the most probable class.
    fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, AppError> {
        let probabilities = self.predict_proba(features)?;
        let classes = self.classes().to_vec();
        if classes.is_empty() {
            return Err(AppError::InternalError("classifier reports no classes".to_string()));
        }
        if probabilities.len() != classes.len() {
            return Err(AppError::InternalError(format!(
                "classifier returned {} probabilities for {} classes",
                probabilities.len(),
                classes.len()
            )));
        }

        let best = probabilities
            .iter()
            .enumerate()
            .fold(0, |best, (idx, p)| if *p > probabilities[best] { idx } else { best });
        let label = RiskLabel::from_code(classes[best]).ok_or_else(|| {
            AppError::InternalError(format!("classifier produced unknown class {}", classes[best]))
        })?;

        Ok(PredictionResult {
            label,
            classes,
            probabilities,
        })
    }
}

/// JSON export of a multinomial linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub classes: Vec<u8>,
    pub feature_names: Vec<String>,
    /// One row per class, one column per feature.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearArtifact {
    /// Check internal consistency: every class is a known risk label exactly
    /// once, and matrix dimensions agree.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = self.classes.clone();
        seen.sort_unstable();
        if seen != vec![0u8, 1, 2] {
            return Err(format!("classes must be a permutation of [0, 1, 2], got {:?}", self.classes));
        }
        if self.feature_names.is_empty() {
            return Err("feature_names is empty".to_string());
        }
        if self.coefficients.len() != self.classes.len() || self.intercepts.len() != self.classes.len() {
            return Err("coefficients and intercepts need one entry per class".to_string());
        }
        if let Some(row) = self
            .coefficients
            .iter()
            .find(|row| row.len() != self.feature_names.len())
        {
            return Err(format!(
                "coefficient row has {} entries for {} features",
                row.len(),
                self.feature_names.len()
            ));
        }
        Ok(())
    }
}

impl Classifier for LinearArtifact {
    fn classes(&self) -> &[u8] {
        &self.classes
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, AppError> {
        if features.columns != self.feature_names {
            return Err(AppError::InternalError(
                "feature columns do not match the model's training columns".to_string(),
            ));
        }

        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(weights, bias)| {
                weights
                    .iter()
                    .zip(&features.values)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + bias
            })
            .collect();

        Ok(softmax(&logits))
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// The active model: which variant it is, how to feed it, and the classifier.
#[derive(Clone)]
pub struct LoadedModel {
    pub variant: ModelVariant,
    pub kind: ModelKind,
    pub classifier: Arc<dyn Classifier>,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("variant", &self.variant)
            .field("kind", &self.kind)
            .field("classes", &self.classifier.classes())
            .finish()
    }
}

impl LoadedModel {
    pub fn new(variant: ModelVariant, kind: ModelKind, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            variant,
            kind,
            classifier,
        }
    }

    /// Load and validate a variant's artifact from `model_dir`.
    ///
    /// Any failure is `ModelArtifactMissing`: without a usable artifact no
    /// prediction is possible.
    pub fn load(model_dir: &Path, variant: ModelVariant) -> Result<Self, AppError> {
        let path = model_dir.join(variant.file_name());
        tracing::info!("Loading model artifact {}", path.display());

        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AppError::ModelArtifactMissing(format!("cannot read {}: {}", path.display(), e))
        })?;
        let artifact: LinearArtifact = serde_json::from_str(&raw).map_err(|e| {
            AppError::ModelArtifactMissing(format!("cannot parse {}: {}", path.display(), e))
        })?;

        Self::from_artifact(variant, artifact)
    }

    /// Validate an in-memory artifact against what the variant implies.
    pub fn from_artifact(variant: ModelVariant, artifact: LinearArtifact) -> Result<Self, AppError> {
        artifact
            .validate()
            .map_err(|e| AppError::ModelArtifactMissing(format!("{}: {}", variant, e)))?;

        let kind = if variant.requires_one_hot() {
            ModelKind::OneHotAligned(artifact.feature_names.clone())
        } else {
            let expected = raw_feature_columns(variant.includes_credit_score());
            if artifact.feature_names != expected {
                return Err(AppError::ModelArtifactMissing(format!(
                    "{}: feature_names do not match the raw column layout",
                    variant
                )));
            }
            ModelKind::RawFeature
        };

        tracing::info!(
            "Model {} ready: {} features, classes {:?}",
            variant,
            artifact.feature_names.len(),
            artifact.classes
        );

        Ok(Self::new(variant, kind, Arc::new(artifact)))
    }

    /// Column names the model consumes, in order.
    pub fn feature_schema(&self) -> Vec<String> {
        match &self.kind {
            ModelKind::RawFeature => raw_feature_columns(self.variant.includes_credit_score())
                .into_iter()
                .map(String::from)
                .collect(),
            ModelKind::OneHotAligned(schema) => schema.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(feature_names: Vec<String>) -> LinearArtifact {
        let n = feature_names.len();
        LinearArtifact {
            classes: vec![0, 1, 2],
            feature_names,
            coefficients: vec![vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            intercepts: vec![0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn test_variant_names_round_trip() {
        for variant in ModelVariant::ALL {
            assert_eq!(variant.name().parse::<ModelVariant>().unwrap(), variant);
        }
        assert!("logistic".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn test_variant_implications() {
        assert!(ModelVariant::RandomForestCreditScore.includes_credit_score());
        assert!(!ModelVariant::RandomForestCreditScore.requires_one_hot());
        assert!(!ModelVariant::XgboostOneHotNoCreditScore.includes_credit_score());
        assert!(ModelVariant::XgboostOneHotNoCreditScore.requires_one_hot());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);

        let probs = softmax(&[1000.0, 1000.0, -1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_predict_picks_most_probable_class() {
        let names = vec!["a".to_string(), "b".to_string()];
        let model = artifact(names.clone());
        let row = FeatureVector {
            columns: names,
            values: vec![3.0, 4.0],
        };

        let prediction = model.predict(&row).unwrap();
        assert_eq!(prediction.label, RiskLabel::LowRisk);
        assert_eq!(prediction.probabilities.len(), 3);
    }

    struct NoClasses;

    impl Classifier for NoClasses {
        fn classes(&self) -> &[u8] {
            &[]
        }

        fn predict_proba(&self, _features: &FeatureVector) -> Result<Vec<f64>, AppError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_predict_without_classes_is_internal_error() {
        let err = NoClasses.predict(&FeatureVector::new()).unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }

    #[test]
    fn test_predict_rejects_mismatched_columns() {
        let model = artifact(vec!["a".to_string()]);
        let row = FeatureVector {
            columns: vec!["b".to_string()],
            values: vec![1.0],
        };
        assert!(model.predict_proba(&row).is_err());
    }

    #[test]
    fn test_artifact_validation() {
        let mut bad = artifact(vec!["a".to_string()]);
        bad.classes = vec![0, 1, 1];
        assert!(bad.validate().is_err());

        let mut bad = artifact(vec!["a".to_string()]);
        bad.coefficients[1] = vec![0.0, 0.0];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_raw_variant_requires_raw_layout() {
        let wrong = artifact(vec!["Age".to_string()]);
        let err = LoadedModel::from_artifact(ModelVariant::RandomForestCreditScore, wrong).unwrap_err();
        assert!(matches!(err, AppError::ModelArtifactMissing(_)));

        let columns = raw_feature_columns(false)
            .into_iter()
            .map(String::from)
            .collect();
        let model =
            LoadedModel::from_artifact(ModelVariant::RandomForestNoCreditScore, artifact(columns)).unwrap();
        assert_eq!(model.kind, ModelKind::RawFeature);
    }

    #[test]
    fn test_one_hot_variant_takes_schema_from_artifact() {
        let schema = vec!["Age".to_string(), "Region_West".to_string()];
        let model =
            LoadedModel::from_artifact(ModelVariant::XgboostOneHotCreditScore, artifact(schema.clone()))
                .unwrap();
        assert_eq!(model.kind, ModelKind::OneHotAligned(schema.clone()));
        assert_eq!(model.feature_schema(), schema);
    }

    #[test]
    fn test_missing_file_is_fatal_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedModel::load(dir.path(), ModelVariant::RandomForestCreditScore).unwrap_err();
        assert!(matches!(err, AppError::ModelArtifactMissing(_)));
    }
}
