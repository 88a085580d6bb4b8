//! Credit-score grade bands.

use serde::Serialize;

/// One row of the static grade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeBand {
    pub code: &'static str,
    pub min_score: u16,
    pub max_score: u16,
    pub description: &'static str,
}

/// Grade bands in descending score order. Contiguous and exhaustive over
/// [300, 900].
pub const GRADE_BANDS: [GradeBand; 7] = [
    GradeBand {
        code: "AA",
        min_score: 753,
        max_score: 900,
        description: "Excellent credit, lowest risk",
    },
    GradeBand {
        code: "BB",
        min_score: 725,
        max_score: 752,
        description: "Very good credit, low risk",
    },
    GradeBand {
        code: "CC",
        min_score: 699,
        max_score: 724,
        description: "Good credit, moderate risk",
    },
    GradeBand {
        code: "DD",
        min_score: 681,
        max_score: 698,
        description: "Fair credit, watch list",
    },
    GradeBand {
        code: "EE",
        min_score: 666,
        max_score: 680,
        description: "Below average credit, elevated risk",
    },
    GradeBand {
        code: "FF",
        min_score: 616,
        max_score: 665,
        description: "Poor credit, high risk",
    },
    GradeBand {
        code: "HH",
        min_score: 300,
        max_score: 615,
        description: "Very poor credit, highest risk",
    },
];

pub const NOT_RATABLE_CODE: &str = "N/A";
pub const NOT_RATABLE_DESCRIPTION: &str = "not ratable";

/// Result of grading a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub code: &'static str,
    pub description: &'static str,
}

impl Grade {
    pub fn is_ratable(&self) -> bool {
        self.code != NOT_RATABLE_CODE
    }
}

/// Map a score to its grade band.
///
/// Fractional scores fall into the band whose lower bound they reach. Scores
/// outside [300, 900] and non-finite values are not ratable.
pub fn grade(score: f64) -> Grade {
    if !score.is_finite() || score > 900.0 {
        return not_ratable();
    }

    GRADE_BANDS
        .iter()
        .find(|band| score >= f64::from(band.min_score))
        .map(|band| Grade {
            code: band.code,
            description: band.description,
        })
        .unwrap_or_else(not_ratable)
}

fn not_ratable() -> Grade {
    Grade {
        code: NOT_RATABLE_CODE,
        description: NOT_RATABLE_DESCRIPTION,
    }
}
