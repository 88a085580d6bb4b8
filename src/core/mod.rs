// Domain-layer modules and shared errors/models
pub mod pipeline {
    pub use crate::assessment::*;
}

pub mod features {
    pub use crate::alignment::*;
    pub use crate::encoding::*;
    pub use crate::features::*;
}

pub mod grading {
    pub use crate::grading::*;
}

pub mod reasons {
    pub use crate::reasons::*;
}

pub mod models {
    pub use crate::models::*;
    pub use crate::report::{AssessmentReport, ClassProbability, GradeBandView, GradeView};
}

pub mod errors {
    pub use crate::errors::*;
}
