//! Deterministic widgets embedded in course sections.
//!
//! Every function here is pure and synchronous; invalid input is either
//! defaulted (free-text THC readings) or rejected with [`CalculatorError`].

pub mod fmea;
pub mod haccp;
pub mod risk_matrix;
pub mod thc;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fmea::{Factor, FmeaAssessment, FmeaEntry, FmeaEntryDraft, FmeaWorksheet, Rating};
pub use haccp::{
    Answer, ControlPoint, DecisionNode, DecisionTree, DecisionTreeError, Traversal, WorkedExample,
};
pub use risk_matrix::{HazardCategory, Likelihood, RiskAssessment, RiskScenario};
pub use thc::ThcResult;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CalculatorError {
    #[error("{factor} must be between {min} and {max}, got {value}")]
    OutOfRange {
        factor: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("no worksheet entry with id {0}")]
    UnknownEntry(u64),
}

/// Four-step priority scale shared by the FMEA and risk-matrix widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    /// First threshold (checked from the highest) that `value` reaches.
    ///
    /// `thresholds` lists the inclusive lower bounds of Critical, High and
    /// Medium, in that order.
    pub(crate) fn bucket(value: u32, thresholds: [u32; 3]) -> Self {
        let [critical, high, medium] = thresholds;
        if value >= critical {
            RiskLevel::Critical
        } else if value >= high {
            RiskLevel::High
        } else if value >= medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_uses_inclusive_lower_bounds() {
        let thresholds = [500, 200, 100];
        assert_eq!(RiskLevel::bucket(500, thresholds), RiskLevel::Critical);
        assert_eq!(RiskLevel::bucket(499, thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::bucket(200, thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::bucket(100, thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::bucket(99, thresholds), RiskLevel::Low);
    }

    #[test]
    fn serializes_as_label() {
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"Critical\"");
        assert_eq!(RiskLevel::Medium.to_string(), "Medium");
    }
}
