//! Feature aligner for the one-hot model family.
//!
//! Categorical fields are expanded with drop-first encoding: the first value
//! of each enumeration is the reference level and gets no column. The
//! expansion is then reconciled against the model's expected schema. Columns
//! the model expects but the expansion lacks are zero-filled, and columns the
//! model never saw are dropped. A schema mismatch is absorbed here, never
//! raised.

use crate::features::RecordValue;
use crate::models::{ApplicantRecord, FeatureVector};

/// Expand categorical fields of a record into `{field}_{value}` indicators.
pub fn one_hot(record: &ApplicantRecord) -> FeatureVector {
    let mut row = FeatureVector::new();
    for (column, value) in record.entries() {
        match value {
            RecordValue::Number(n) => row.push(column, n),
            RecordValue::Category(field, code) => {
                let selected = field.label(code);
                for level in field.levels().skip(1) {
                    let hot = if selected == Some(level) { 1.0 } else { 0.0 };
                    row.push(format!("{}_{}", column, level), hot);
                }
            }
        }
    }
    row
}

/// Reconcile a feature row against an expected schema.
///
/// The output columns equal `schema` exactly, in order. Values are carried
/// over by column name; expected columns absent from `row` are 0.
pub fn align_vector(row: &FeatureVector, schema: &[String]) -> FeatureVector {
    let mut aligned = FeatureVector::new();
    for column in schema {
        aligned.push(column.clone(), row.get(column).unwrap_or(0.0));
    }

    let dropped = row.columns.iter().filter(|c| !schema.contains(c)).count();
    if dropped > 0 {
        tracing::debug!("Dropped {} column(s) absent from the expected schema", dropped);
    }

    aligned
}

/// One-hot expand a record and align it to `schema`.
pub fn align(record: &ApplicantRecord, schema: &[String]) -> FeatureVector {
    align_vector(&one_hot(record), schema)
}
