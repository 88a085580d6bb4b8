//! Categorical encoder.
//!
//! Maps the human-readable values offered by the applicant form to the small
//! integer codes the models were trained on. The tables are closed: any value
//! outside a field's enumeration is rejected with `AppError::UnknownCategory`.

use crate::errors::AppError;
use serde::{Deserialize, Serialize};

const GENDER: &[(&str, u8)] = &[("Male", 0), ("Female", 1)];
const OCCUPATION: &[(&str, u8)] = &[
    ("Private", 0),
    ("Government", 1),
    ("Freelancer", 2),
    ("Unemployed", 3),
];
const EDUCATION: &[(&str, u8)] = &[
    ("Vocational", 0),
    ("Secondary", 1),
    ("Primary", 2),
    ("None", 3),
];
const MARITAL_STATUS: &[(&str, u8)] = &[("Single", 0), ("Married", 1), ("Divorced", 2)];
const REGION: &[(&str, u8)] = &[
    ("North", 0),
    ("Central", 1),
    ("South", 2),
    ("East", 3),
    ("West", 4),
];
const CERTIFICATE: &[(&str, u8)] = &[("Yes", 0), ("No", 1)];
const LOAN_PURPOSE: &[(&str, u8)] = &[("business", 0), ("personal", 1)];
const HOME_OWNERSHIP: &[(&str, u8)] = &[("own", 0), ("rent", 1)];

/// The categorical inputs of an applicant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoricalField {
    Gender,
    Occupation,
    Education,
    MaritalStatus,
    Region,
    Certificate,
    LoanPurpose,
    HomeOwnership,
}

impl CategoricalField {
    /// All categorical fields in training column order.
    pub const ALL: [CategoricalField; 8] = [
        CategoricalField::Gender,
        CategoricalField::Occupation,
        CategoricalField::Education,
        CategoricalField::MaritalStatus,
        CategoricalField::Certificate,
        CategoricalField::Region,
        CategoricalField::LoanPurpose,
        CategoricalField::HomeOwnership,
    ];

    /// Column name used in the training data.
    pub fn column(&self) -> &'static str {
        match self {
            CategoricalField::Gender => "Gender",
            CategoricalField::Occupation => "Occupation",
            CategoricalField::Education => "Education",
            CategoricalField::MaritalStatus => "Marital_Status",
            CategoricalField::Region => "Region",
            CategoricalField::Certificate => "Certificate",
            CategoricalField::LoanPurpose => "loan_purpose",
            CategoricalField::HomeOwnership => "home_ownership",
        }
    }

    fn table(&self) -> &'static [(&'static str, u8)] {
        match self {
            CategoricalField::Gender => GENDER,
            CategoricalField::Occupation => OCCUPATION,
            CategoricalField::Education => EDUCATION,
            CategoricalField::MaritalStatus => MARITAL_STATUS,
            CategoricalField::Region => REGION,
            CategoricalField::Certificate => CERTIFICATE,
            CategoricalField::LoanPurpose => LOAN_PURPOSE,
            CategoricalField::HomeOwnership => HOME_OWNERSHIP,
        }
    }

    /// Enumerated values in table order. The first one is the reference level
    /// of the drop-first one-hot scheme.
    pub fn levels(&self) -> impl Iterator<Item = &'static str> {
        self.table().iter().map(|(label, _)| *label)
    }

    /// Human-readable value for a code, if the code is defined.
    pub fn label(&self, code: u8) -> Option<&'static str> {
        self.table()
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(label, _)| *label)
    }
}

/// Encode a categorical value into its integer code.
///
/// Matching is exact, as the form only ever submits the labels it offered.
pub fn encode(field: CategoricalField, value: &str) -> Result<u8, AppError> {
    field
        .table()
        .iter()
        .find(|(label, _)| *label == value)
        .map(|(_, code)| *code)
        .ok_or_else(|| AppError::UnknownCategory {
            field: field.column().to_string(),
            value: value.to_string(),
        })
}
