//! Calculator requests. Stateless, so they never touch storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use course_core::calculators::haccp::WORKED_EXAMPLES;
use course_core::calculators::risk_matrix::SCENARIOS;
use course_core::calculators::{
    Answer, CalculatorError, ControlPoint, DecisionNode, DecisionTree, FmeaAssessment, FmeaEntry,
    FmeaEntryDraft, FmeaWorksheet, Likelihood, Rating, RiskAssessment, RiskLevel, RiskScenario,
    Traversal, WorkedExample, thc,
};

use super::error::{ApiError, FieldError};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ThcPayload {
    /// Delta-9 THC percent, as a number or free text.
    pub delta9: Option<Value>,
    /// THCA percent, as a number or free text.
    pub thca: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RpnPayload {
    pub severity: Option<i64>,
    pub occurrence: Option<i64>,
    pub detection: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RiskPayload {
    pub probability: Option<i64>,
    pub impact: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HaccpPayload {
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// One worksheet row as sent by a client; ratings default to 5.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetRow {
    pub process_step: Option<String>,
    pub failure_mode: Option<String>,
    pub effect: Option<String>,
    pub cause: Option<String>,
    pub severity: Option<i64>,
    pub occurrence: Option<i64>,
    pub detection: Option<i64>,
}

/// Rows to rank. Without `entries` the course's drying-process example is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorksheetPayload {
    pub entries: Option<Vec<WorksheetRow>>,
}

/// A recorded HACCP node path, e.g. one of the worked examples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReplayPayload {
    #[serde(default)]
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThcReport {
    pub total_thc: f64,
    pub compliant: bool,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpnReport {
    pub rpn: u32,
    pub level: RiskLevel,
    pub recommended_action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HaccpReport {
    pub path: Vec<&'static str>,
    pub current: &'static DecisionNode,
    pub result: Option<ControlPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorksheetReport {
    /// Rows by descending RPN.
    pub ranked: Vec<FmeaEntry>,
    pub csv: String,
}

impl From<&Traversal> for HaccpReport {
    fn from(traversal: &Traversal) -> Self {
        Self {
            path: traversal.path(),
            current: traversal.current(),
            result: traversal.result(),
        }
    }
}

fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn calculator_field(field: &str, err: &CalculatorError) -> FieldError {
    FieldError::new(field, err.to_string())
}

impl ThcPayload {
    /// Blank or unreadable inputs count as zero, so this never fails.
    #[must_use]
    pub fn calculate(&self) -> ThcReport {
        let result = thc::total_thc_from_input(
            text_of(self.delta9.as_ref()).as_deref(),
            text_of(self.thca.as_ref()).as_deref(),
        );
        ThcReport {
            total_thc: result.total_thc,
            compliant: result.compliant,
            display: result.display_total(),
        }
    }
}

impl RpnPayload {
    /// Missing factors default to 5.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for each factor outside 1-10.
    pub fn calculate(&self) -> Result<RpnReport, ApiError> {
        let mut errors = Vec::new();
        let mut rating = |factor: &'static str, raw: Option<i64>| {
            let value = match raw.map(u8::try_from) {
                None => None,
                Some(Ok(value)) => Some(value),
                Some(Err(_)) => {
                    errors.push(FieldError::new(factor, "must be between 1 and 10"));
                    return None;
                }
            };
            Rating::or_default(factor, value)
                .map_err(|err| errors.push(calculator_field(factor, &err)))
                .ok()
        };
        let severity = rating("severity", self.severity);
        let occurrence = rating("occurrence", self.occurrence);
        let detection = rating("detection", self.detection);

        let (Some(severity), Some(occurrence), Some(detection)) = (severity, occurrence, detection)
        else {
            return Err(ApiError::Validation(errors));
        };
        let assessment = FmeaAssessment::new(severity, occurrence, detection);
        Ok(RpnReport {
            rpn: assessment.rpn,
            level: assessment.level,
            recommended_action: assessment.recommended_action(),
        })
    }
}

impl RiskPayload {
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a missing axis or one outside 1-3.
    pub fn calculate(&self) -> Result<RiskAssessment, ApiError> {
        let mut errors = Vec::new();
        let mut axis = |field: &'static str, raw: Option<i64>| {
            let Some(raw) = raw else {
                errors.push(FieldError::new(field, "Required"));
                return None;
            };
            let value = u8::try_from(raw).unwrap_or(0);
            Likelihood::new(field, value)
                .map_err(|err| {
                    errors.push(FieldError::new(
                        field,
                        match err {
                            CalculatorError::OutOfRange { min, max, .. } => {
                                format!("must be between {min} and {max}")
                            }
                            other => other.to_string(),
                        },
                    ));
                })
                .ok()
        };
        let probability = axis("probability", self.probability);
        let impact = axis("impact", self.impact);

        let (Some(probability), Some(impact)) = (probability, impact) else {
            return Err(ApiError::Validation(errors));
        };
        Ok(RiskAssessment::new(probability, impact))
    }
}

impl HaccpPayload {
    /// Walk the HACCP tree from the first question.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` when answers continue past a result.
    pub fn calculate(&self) -> Result<HaccpReport, ApiError> {
        let mut traversal = DecisionTree::haccp().traverse();
        for (index, answer) in self.answers.iter().enumerate() {
            traversal
                .answer(*answer)
                .map_err(|err| ApiError::invalid(format!("answers.{index}"), err.to_string()))?;
        }
        Ok(HaccpReport::from(&traversal))
    }
}

impl ReplayPayload {
    /// Check a recorded path edge by edge and report where it ends.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` on `path` when the path leaves the tree.
    pub fn calculate(&self) -> Result<HaccpReport, ApiError> {
        let traversal = DecisionTree::haccp()
            .replay(&self.path)
            .map_err(|err| ApiError::invalid("path", err.to_string()))?;
        Ok(HaccpReport::from(&traversal))
    }
}

impl WorksheetRow {
    fn draft(&self, index: usize, errors: &mut Vec<FieldError>) -> Option<FmeaEntryDraft> {
        let mut rating = |field: &'static str, raw: Option<i64>| {
            let Some(raw) = raw else {
                return Some(None);
            };
            let value = u8::try_from(raw)
                .ok()
                .filter(|value| Rating::new(field, *value).is_ok());
            if value.is_none() {
                errors.push(FieldError::new(
                    format!("entries.{index}.{field}"),
                    "must be between 1 and 10",
                ));
            }
            value.map(Some)
        };
        let severity = rating("severity", self.severity);
        let occurrence = rating("occurrence", self.occurrence);
        let detection = rating("detection", self.detection);
        Some(FmeaEntryDraft {
            process_step: self.process_step.clone().unwrap_or_default(),
            failure_mode: self.failure_mode.clone().unwrap_or_default(),
            effect: self.effect.clone().unwrap_or_default(),
            cause: self.cause.clone().unwrap_or_default(),
            severity: severity?,
            occurrence: occurrence?,
            detection: detection?,
        })
    }
}

impl WorksheetPayload {
    /// Build a worksheet from the rows, rank it and export it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` with `entries.<index>.<field>` for every
    /// blank process step or failure mode and every rating outside 1-10.
    pub fn calculate(&self) -> Result<WorksheetReport, ApiError> {
        let Some(rows) = &self.entries else {
            return Ok(WorksheetReport::from(&FmeaWorksheet::default()));
        };

        let mut sheet = FmeaWorksheet::empty();
        let mut errors = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let Some(draft) = row.draft(index, &mut errors) else {
                continue;
            };
            if let Err(err) = sheet.add(draft) {
                let field = match &err {
                    CalculatorError::MissingField(field) => *field,
                    CalculatorError::OutOfRange { factor, .. } => *factor,
                    _ => "entries",
                };
                errors.push(FieldError::new(
                    format!("entries.{index}.{field}"),
                    err.to_string(),
                ));
            }
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }
        Ok(WorksheetReport::from(&sheet))
    }
}

impl From<&FmeaWorksheet> for WorksheetReport {
    fn from(sheet: &FmeaWorksheet) -> Self {
        Self {
            ranked: sheet.ranked().into_iter().cloned().collect(),
            csv: sheet.to_csv(),
        }
    }
}

/// A built-in hazard with its place on the risk matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    #[serde(flatten)]
    pub scenario: &'static RiskScenario,
    pub assessment: RiskAssessment,
}

#[must_use]
pub fn risk_scenarios() -> Vec<ScenarioReport> {
    SCENARIOS
        .iter()
        .map(|scenario| ScenarioReport {
            scenario,
            assessment: scenario.assessment(),
        })
        .collect()
}

/// HACCP walkthroughs from the course material.
#[must_use]
pub fn haccp_examples() -> &'static [WorkedExample] {
    &WORKED_EXAMPLES
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(err: ApiError) -> Vec<String> {
        match err {
            ApiError::Validation(details) => details.into_iter().map(|d| d.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn thc_accepts_numbers_and_text() {
        let report = ThcPayload {
            delta9: Some(json!(0.15)),
            thca: Some(json!("0.05")),
        }
        .calculate();
        assert!(report.compliant);
        assert_eq!(report.display, "0.194%");

        let blank = ThcPayload::default().calculate();
        assert_eq!(blank.total_thc, 0.0);
    }

    #[test]
    fn rpn_defaults_and_rejects() {
        let report = RpnPayload::default().calculate().unwrap();
        assert_eq!(report.rpn, 125);
        assert_eq!(report.level, RiskLevel::Medium);

        let report = RpnPayload {
            severity: Some(10),
            occurrence: Some(10),
            detection: Some(6),
        }
        .calculate()
        .unwrap();
        assert_eq!(report.rpn, 600);
        assert_eq!(report.recommended_action, "Stop process immediately");

        let err = RpnPayload {
            severity: Some(0),
            occurrence: Some(300),
            detection: Some(4),
        }
        .calculate()
        .unwrap_err();
        assert_eq!(fields(err), ["severity", "occurrence"]);
    }

    #[test]
    fn risk_requires_both_axes() {
        let err = RiskPayload {
            probability: Some(2),
            impact: None,
        }
        .calculate()
        .unwrap_err();
        assert_eq!(fields(err), ["impact"]);

        let err = RiskPayload {
            probability: Some(-1),
            impact: Some(4),
        }
        .calculate()
        .unwrap_err();
        assert_eq!(fields(err), ["probability", "impact"]);

        let ok = RiskPayload {
            probability: Some(3),
            impact: Some(3),
        }
        .calculate()
        .unwrap();
        assert_eq!(ok.level, RiskLevel::Critical);
    }

    #[test]
    fn haccp_walk_reports_path_and_overrun() {
        use Answer::*;
        let report = HaccpPayload {
            answers: vec![Yes, Yes, Yes, No, No],
        }
        .calculate()
        .unwrap();
        assert_eq!(report.path, ["start", "q1", "q2", "q3", "q4", "ccp"]);
        assert_eq!(report.result, Some(ControlPoint::Ccp));

        let err = HaccpPayload {
            answers: vec![No, No, Yes],
        }
        .calculate()
        .unwrap_err();
        assert_eq!(fields(err), ["answers.2"]);
    }

    #[test]
    fn worksheet_ranks_and_exports() {
        let seeded = WorksheetPayload::default().calculate().unwrap();
        assert_eq!(seeded.ranked.len(), 1);
        assert!(seeded.csv.ends_with(",84,Low"));

        let payload: WorksheetPayload = serde_json::from_value(json!({
            "entries": [
                { "processStep": "Packaging", "failureMode": "Seal leak", "severity": 4, "occurrence": 2, "detection": 2 },
                { "processStep": "Extraction", "failureMode": "Solvent residue", "severity": 9, "occurrence": 6, "detection": 5 },
            ]
        }))
        .unwrap();
        let report = payload.calculate().unwrap();
        let order: Vec<u32> = report.ranked.iter().map(|e| e.rpn).collect();
        assert_eq!(order, [270, 16]);
        assert_eq!(report.csv.lines().count(), 3);
    }

    #[test]
    fn worksheet_reports_every_bad_row() {
        let rows = vec![
            WorksheetRow {
                process_step: Some("Drying".into()),
                ..WorksheetRow::default()
            },
            WorksheetRow {
                process_step: Some("Curing".into()),
                failure_mode: Some("Mold".into()),
                severity: Some(11),
                detection: Some(-2),
                ..WorksheetRow::default()
            },
        ];
        let err = WorksheetPayload {
            entries: Some(rows),
        }
        .calculate()
        .unwrap_err();
        assert_eq!(
            fields(err),
            [
                "entries.0.failureMode",
                "entries.1.severity",
                "entries.1.detection"
            ]
        );
    }

    #[test]
    fn replay_follows_recorded_paths() {
        for example in haccp_examples() {
            let report = ReplayPayload {
                path: example.steps.iter().map(|s| (*s).to_string()).collect(),
            }
            .calculate()
            .unwrap();
            assert_eq!(report.result, Some(example.result));
        }

        let err = ReplayPayload {
            path: vec!["start".into(), "q1".into(), "ccp".into()],
        }
        .calculate()
        .unwrap_err();
        assert_eq!(fields(err), ["path"]);
    }

    #[test]
    fn reference_data_is_exposed() {
        assert_eq!(risk_scenarios().len(), 5);
        assert_eq!(haccp_examples().len(), 3);
    }
}
