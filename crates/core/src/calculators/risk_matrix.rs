//! 3x3 probability/impact risk matrix.

use serde::{Deserialize, Serialize};

use super::{CalculatorError, RiskLevel};

/// Score lower bounds for Critical, High and Medium.
const SCORE_THRESHOLDS: [u32; 3] = [6, 4, 2];

/// Low / Medium / High on one axis of the matrix, stored as 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Likelihood(u8);

impl Likelihood {
    pub const LOW: Likelihood = Likelihood(1);
    pub const MEDIUM: Likelihood = Likelihood(2);
    pub const HIGH: Likelihood = Likelihood(3);

    /// # Errors
    ///
    /// Returns `CalculatorError::OutOfRange` unless `1 <= value <= 3`.
    pub fn new(axis: &'static str, value: u8) -> Result<Self, CalculatorError> {
        if (1..=3).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CalculatorError::OutOfRange {
                factor: axis,
                value,
                min: 1,
                max: 3,
            })
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Likelihood {
    type Error = CalculatorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new("likelihood", value)
    }
}

impl From<Likelihood> for u8 {
    fn from(value: Likelihood) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub level: RiskLevel,
}

impl RiskAssessment {
    #[must_use]
    pub fn new(probability: Likelihood, impact: Likelihood) -> Self {
        let score = probability.0 * impact.0;
        Self {
            score,
            level: RiskLevel::bucket(u32::from(score), SCORE_THRESHOLDS),
        }
    }
}

/// `probability * impact`: >=6 Critical, >=4 High, >=2 Medium, else Low.
///
/// # Errors
///
/// Returns `CalculatorError::OutOfRange` if either axis is outside 1-3.
pub fn classify(probability: u8, impact: u8) -> Result<RiskAssessment, CalculatorError> {
    Ok(RiskAssessment::new(
        Likelihood::new("probability", probability)?,
        Likelihood::new("impact", impact)?,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardCategory {
    Biological,
    Chemical,
    Physical,
}

/// A worked hazard placed on the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskScenario {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub probability: Likelihood,
    pub impact: Likelihood,
    pub category: HazardCategory,
}

impl RiskScenario {
    #[must_use]
    pub fn assessment(&self) -> RiskAssessment {
        RiskAssessment::new(self.probability, self.impact)
    }
}

/// Scenarios shown alongside the matrix.
pub static SCENARIOS: [RiskScenario; 5] = [
    RiskScenario {
        id: "mold",
        title: "Mold Contamination",
        description: "Improper drying conditions leading to mold growth",
        probability: Likelihood::MEDIUM,
        impact: Likelihood::HIGH,
        category: HazardCategory::Biological,
    },
    RiskScenario {
        id: "pesticide",
        title: "Pesticide Residue",
        description: "Excessive pesticide application during cultivation",
        probability: Likelihood::MEDIUM,
        impact: Likelihood::HIGH,
        category: HazardCategory::Chemical,
    },
    RiskScenario {
        id: "metal",
        title: "Metal Fragment",
        description: "Equipment wear causing metal contamination",
        probability: Likelihood::LOW,
        impact: Likelihood::MEDIUM,
        category: HazardCategory::Physical,
    },
    RiskScenario {
        id: "solvent",
        title: "Residual Solvents",
        description: "Incomplete solvent removal during extraction",
        probability: Likelihood::MEDIUM,
        impact: Likelihood::MEDIUM,
        category: HazardCategory::Chemical,
    },
    RiskScenario {
        id: "bacteria",
        title: "Bacterial Growth",
        description: "Poor sanitation leading to bacterial contamination",
        probability: Likelihood::LOW,
        impact: Likelihood::HIGH,
        category: HazardCategory::Biological,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_of_the_matrix() {
        let worst = classify(3, 3).unwrap();
        assert_eq!(worst.score, 9);
        assert_eq!(worst.level, RiskLevel::Critical);

        let best = classify(1, 1).unwrap();
        assert_eq!(best.score, 1);
        assert_eq!(best.level, RiskLevel::Low);
    }

    #[test]
    fn every_cell_buckets_by_score() {
        for probability in 1..=3 {
            for impact in 1..=3 {
                let result = classify(probability, impact).unwrap();
                let expected = match probability * impact {
                    6..=9 => RiskLevel::Critical,
                    4..=5 => RiskLevel::High,
                    2..=3 => RiskLevel::Medium,
                    _ => RiskLevel::Low,
                };
                assert_eq!(result.level, expected, "p={probability} i={impact}");
            }
        }
    }

    #[test]
    fn rejects_values_off_the_grid() {
        assert!(matches!(
            classify(0, 2),
            Err(CalculatorError::OutOfRange { factor: "probability", .. })
        ));
        assert!(matches!(
            classify(2, 4),
            Err(CalculatorError::OutOfRange { factor: "impact", .. })
        ));
    }

    #[test]
    fn scenarios_classify_as_taught() {
        let levels: Vec<(&str, RiskLevel)> = SCENARIOS
            .iter()
            .map(|s| (s.id, s.assessment().level))
            .collect();
        assert_eq!(
            levels,
            vec![
                ("mold", RiskLevel::Critical),
                ("pesticide", RiskLevel::Critical),
                ("metal", RiskLevel::Medium),
                ("solvent", RiskLevel::High),
                ("bacteria", RiskLevel::Medium),
            ]
        );
    }
}
