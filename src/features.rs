//! Feature assembler.
//!
//! Turns raw form values into an [`ApplicantRecord`] and lays a record out as
//! the raw-code feature row consumed by the raw-feature model family.

use crate::encoding::{encode, CategoricalField};
use crate::errors::AppError;
use crate::models::{ApplicantForm, ApplicantRecord, FeatureVector};

/// Numeric inputs with their training column names and allowed ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Age,
    WorkExperience,
    MonthlyIncome,
    LoanAmount,
    Dependents,
    JobCompletionRate,
    OnTimeRate,
    AvgResponseTimeMins,
    CustomerRatingAvg,
    JobAcceptanceRate,
    JobCancellationCount,
    WeeklyActiveDays,
    MembershipDurationMonths,
    SimulatedCreditScore,
    WorkConsistencyIndex,
    InactiveDaysLast30,
    RejectedJobsLast30,
}

impl NumericField {
    pub fn column(&self) -> &'static str {
        match self {
            NumericField::Age => "Age",
            NumericField::WorkExperience => "Work_Experience",
            NumericField::MonthlyIncome => "Monthly_Income",
            NumericField::LoanAmount => "Loan_Amount",
            NumericField::Dependents => "dependents",
            NumericField::JobCompletionRate => "job_completion_rate",
            NumericField::OnTimeRate => "on_time_rate",
            NumericField::AvgResponseTimeMins => "avg_response_time_mins",
            NumericField::CustomerRatingAvg => "customer_rating_avg",
            NumericField::JobAcceptanceRate => "job_acceptance_rate",
            NumericField::JobCancellationCount => "job_cancellation_count",
            NumericField::WeeklyActiveDays => "weekly_active_days",
            NumericField::MembershipDurationMonths => "membership_duration_months",
            NumericField::SimulatedCreditScore => "simulated_credit_score",
            NumericField::WorkConsistencyIndex => "work_consistency_index",
            NumericField::InactiveDaysLast30 => "inactive_days_last_30",
            NumericField::RejectedJobsLast30 => "rejected_jobs_last_30",
        }
    }

    /// Inclusive lower bound and optional inclusive upper bound.
    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self {
            NumericField::Age => (18.0, Some(70.0)),
            NumericField::WorkExperience => (0.0, Some(40.0)),
            NumericField::MonthlyIncome => (0.0, None),
            NumericField::LoanAmount => (0.0, None),
            NumericField::Dependents => (0.0, Some(10.0)),
            NumericField::JobCompletionRate => (0.0, Some(100.0)),
            NumericField::OnTimeRate => (0.0, Some(100.0)),
            NumericField::AvgResponseTimeMins => (0.0, None),
            NumericField::CustomerRatingAvg => (0.0, Some(5.0)),
            NumericField::JobAcceptanceRate => (0.0, Some(100.0)),
            NumericField::JobCancellationCount => (0.0, Some(100.0)),
            NumericField::WeeklyActiveDays => (0.0, Some(7.0)),
            NumericField::MembershipDurationMonths => (0.0, Some(240.0)),
            NumericField::SimulatedCreditScore => (400.0, Some(900.0)),
            NumericField::WorkConsistencyIndex => (0.0, Some(1.0)),
            NumericField::InactiveDaysLast30 => (0.0, Some(30.0)),
            NumericField::RejectedJobsLast30 => (0.0, Some(30.0)),
        }
    }

    /// Require a value to be present, finite and within bounds.
    pub fn require(&self, value: Option<f64>) -> Result<f64, AppError> {
        let value = value.ok_or_else(|| AppError::MissingField(self.column().to_string()))?;
        let (min, max) = self.bounds();
        let in_range = value.is_finite() && value >= min && max.map_or(true, |m| value <= m);
        if !in_range {
            return Err(AppError::OutOfRange {
                field: self.column().to_string(),
                value,
            });
        }
        Ok(value)
    }
}

fn require_category(field: CategoricalField, value: Option<&str>) -> Result<u8, AppError> {
    let value = value.ok_or_else(|| AppError::MissingField(field.column().to_string()))?;
    encode(field, value)
}

/// Build an applicant record from raw inputs.
///
/// The simulated credit score is only read, and only required, when
/// `include_credit_score` is set.
pub fn assemble(form: &ApplicantForm, include_credit_score: bool) -> Result<ApplicantRecord, AppError> {
    use CategoricalField as C;
    use NumericField as N;

    let simulated_credit_score = if include_credit_score {
        Some(N::SimulatedCreditScore.require(form.simulated_credit_score)?)
    } else {
        None
    };

    Ok(ApplicantRecord {
        gender: require_category(C::Gender, form.gender.as_deref())?,
        age: N::Age.require(form.age)?,
        occupation: require_category(C::Occupation, form.occupation.as_deref())?,
        education: require_category(C::Education, form.education.as_deref())?,
        marital_status: require_category(C::MaritalStatus, form.marital_status.as_deref())?,
        work_experience: N::WorkExperience.require(form.work_experience)?,
        certificate: require_category(C::Certificate, form.certificate.as_deref())?,
        region: require_category(C::Region, form.region.as_deref())?,
        monthly_income: N::MonthlyIncome.require(form.monthly_income)?,
        loan_amount: N::LoanAmount.require(form.loan_amount)?,
        loan_purpose: require_category(C::LoanPurpose, form.loan_purpose.as_deref())?,
        home_ownership: require_category(C::HomeOwnership, form.home_ownership.as_deref())?,
        dependents: N::Dependents.require(form.dependents)?,
        job_completion_rate: N::JobCompletionRate.require(form.job_completion_rate)?,
        on_time_rate: N::OnTimeRate.require(form.on_time_rate)?,
        avg_response_time_mins: N::AvgResponseTimeMins.require(form.avg_response_time_mins)?,
        customer_rating_avg: N::CustomerRatingAvg.require(form.customer_rating_avg)?,
        job_acceptance_rate: N::JobAcceptanceRate.require(form.job_acceptance_rate)?,
        job_cancellation_count: N::JobCancellationCount.require(form.job_cancellation_count)?,
        weekly_active_days: N::WeeklyActiveDays.require(form.weekly_active_days)?,
        membership_duration_months: N::MembershipDurationMonths
            .require(form.membership_duration_months)?,
        simulated_credit_score,
        work_consistency_index: N::WorkConsistencyIndex.require(form.work_consistency_index)?,
        inactive_days_last_30: N::InactiveDaysLast30.require(form.inactive_days_last_30)?,
        rejected_jobs_last_30: N::RejectedJobsLast30.require(form.rejected_jobs_last_30)?,
    })
}

/// A record column: either a categorical code or a numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordValue {
    Category(CategoricalField, u8),
    Number(f64),
}

impl ApplicantRecord {
    /// Columns in training order. The credit score column is omitted when the
    /// record was assembled without it.
    pub fn entries(&self) -> Vec<(&'static str, RecordValue)> {
        use CategoricalField as C;
        use NumericField as N;
        use RecordValue::{Category, Number};

        let mut entries = vec![
            (C::Gender.column(), Category(C::Gender, self.gender)),
            (N::Age.column(), Number(self.age)),
            (C::Occupation.column(), Category(C::Occupation, self.occupation)),
            (C::Education.column(), Category(C::Education, self.education)),
            (C::MaritalStatus.column(), Category(C::MaritalStatus, self.marital_status)),
            (N::WorkExperience.column(), Number(self.work_experience)),
            (C::Certificate.column(), Category(C::Certificate, self.certificate)),
            (C::Region.column(), Category(C::Region, self.region)),
            (N::MonthlyIncome.column(), Number(self.monthly_income)),
            (N::LoanAmount.column(), Number(self.loan_amount)),
            (C::LoanPurpose.column(), Category(C::LoanPurpose, self.loan_purpose)),
            (C::HomeOwnership.column(), Category(C::HomeOwnership, self.home_ownership)),
            (N::Dependents.column(), Number(self.dependents)),
            (N::JobCompletionRate.column(), Number(self.job_completion_rate)),
            (N::OnTimeRate.column(), Number(self.on_time_rate)),
            (N::AvgResponseTimeMins.column(), Number(self.avg_response_time_mins)),
            (N::CustomerRatingAvg.column(), Number(self.customer_rating_avg)),
            (N::JobAcceptanceRate.column(), Number(self.job_acceptance_rate)),
            (N::JobCancellationCount.column(), Number(self.job_cancellation_count)),
            (N::WeeklyActiveDays.column(), Number(self.weekly_active_days)),
            (N::MembershipDurationMonths.column(), Number(self.membership_duration_months)),
        ];
        if let Some(score) = self.simulated_credit_score {
            entries.push((N::SimulatedCreditScore.column(), Number(score)));
        }
        entries.extend([
            (N::WorkConsistencyIndex.column(), Number(self.work_consistency_index)),
            (N::InactiveDaysLast30.column(), Number(self.inactive_days_last_30)),
            (N::RejectedJobsLast30.column(), Number(self.rejected_jobs_last_30)),
        ]);
        entries
    }

    /// Feature row for the raw-feature model family: categorical codes are
    /// used directly as numeric values.
    pub fn to_raw_features(&self) -> FeatureVector {
        let mut row = FeatureVector::new();
        for (column, value) in self.entries() {
            let number = match value {
                RecordValue::Category(_, code) => f64::from(code),
                RecordValue::Number(n) => n,
            };
            row.push(column, number);
        }
        row
    }
}

/// Column order expected by raw-feature models of the given shape.
pub fn raw_feature_columns(include_credit_score: bool) -> Vec<&'static str> {
    RAW_COLUMNS
        .iter()
        .copied()
        .filter(|c| include_credit_score || *c != NumericField::SimulatedCreditScore.column())
        .collect()
}

const RAW_COLUMNS: [&str; 25] = [
    "Gender",
    "Age",
    "Occupation",
    "Education",
    "Marital_Status",
    "Work_Experience",
    "Certificate",
    "Region",
    "Monthly_Income",
    "Loan_Amount",
    "loan_purpose",
    "home_ownership",
    "dependents",
    "job_completion_rate",
    "on_time_rate",
    "avg_response_time_mins",
    "customer_rating_avg",
    "job_acceptance_rate",
    "job_cancellation_count",
    "weekly_active_days",
    "membership_duration_months",
    "simulated_credit_score",
    "work_consistency_index",
    "inactive_days_last_30",
    "rejected_jobs_last_30",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_with_credit_score() {
        let record = assemble(&ApplicantForm::sample(), true).unwrap();

        assert_eq!(record.simulated_credit_score, Some(600.0));
        assert_eq!(record.gender, 0);
        assert_eq!(record.monthly_income, 25000.0);

        let row = record.to_raw_features();
        assert_eq!(row.len(), 25);
        assert_eq!(row.columns[0], "Gender");
        assert_eq!(row.columns[21], "simulated_credit_score");
        assert_eq!(row.get("simulated_credit_score"), Some(600.0));
    }

    #[test]
    fn test_assemble_without_credit_score_ignores_it() {
        let mut form = ApplicantForm::sample();
        form.simulated_credit_score = None;

        let record = assemble(&form, false).unwrap();
        assert_eq!(record.simulated_credit_score, None);

        let row = record.to_raw_features();
        assert_eq!(row.len(), 24);
        assert_eq!(row.get("simulated_credit_score"), None);
    }

    #[test]
    fn test_missing_field() {
        let mut form = ApplicantForm::sample();
        form.loan_amount = None;
        assert_eq!(
            assemble(&form, true).unwrap_err(),
            AppError::MissingField("Loan_Amount".to_string())
        );

        let mut form = ApplicantForm::sample();
        form.simulated_credit_score = None;
        assert_eq!(
            assemble(&form, true).unwrap_err(),
            AppError::MissingField("simulated_credit_score".to_string())
        );
    }

    #[test]
    fn test_unknown_category_propagates() {
        let mut form = ApplicantForm::sample();
        form.occupation = Some("Astronaut".to_string());
        assert!(matches!(
            assemble(&form, false),
            Err(AppError::UnknownCategory { .. })
        ));
    }

    #[test]
    fn test_out_of_range() {
        let mut form = ApplicantForm::sample();
        form.age = Some(17.0);
        assert!(matches!(
            assemble(&form, true),
            Err(AppError::OutOfRange { ref field, .. }) if field == "Age"
        ));

        let mut form = ApplicantForm::sample();
        form.customer_rating_avg = Some(f64::NAN);
        assert!(assemble(&form, true).is_err());

        // Unbounded above.
        let mut form = ApplicantForm::sample();
        form.loan_amount = Some(1e9);
        assert!(assemble(&form, true).is_ok());
    }

    #[test]
    fn test_raw_feature_columns_match_record_layout() {
        let with = raw_feature_columns(true);
        let without = raw_feature_columns(false);

        assert_eq!(with.len(), without.len() + 1);
        assert!(!without.contains(&"simulated_credit_score"));

        let row = assemble(&ApplicantForm::sample(), true)
            .unwrap()
            .to_raw_features();
        assert_eq!(row.columns, with);
    }
}
