//! Failure Mode and Effects Analysis: risk priority numbers and a worksheet.

use serde::{Deserialize, Serialize};

use super::{CalculatorError, RiskLevel};

/// RPN lower bounds for Critical, High and Medium.
const RPN_THRESHOLDS: [u32; 3] = [500, 200, 100];

const CSV_HEADER: &str =
    "Process Step,Failure Mode,Effect,Cause,Severity,Occurrence,Detection,RPN,Risk Level";

//
// ─── RATING ────────────────────────────────────────────────────────────────────
//

/// A severity, occurrence or detection score on the 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// Value used when the learner leaves a slider untouched.
    pub const DEFAULT: Rating = Rating(5);

    /// # Errors
    ///
    /// Returns `CalculatorError::OutOfRange` unless `1 <= value <= 10`.
    pub fn new(factor: &'static str, value: u8) -> Result<Self, CalculatorError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CalculatorError::OutOfRange {
                factor,
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    /// Like [`Rating::new`], but an absent value falls back to [`Rating::DEFAULT`].
    ///
    /// # Errors
    ///
    /// Returns `CalculatorError::OutOfRange` for a present, out-of-range value.
    pub fn or_default(factor: &'static str, value: Option<u8>) -> Result<Self, CalculatorError> {
        value.map_or(Ok(Self::DEFAULT), |v| Self::new(factor, v))
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = CalculatorError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new("rating", value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

//
// ─── ASSESSMENT ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmeaAssessment {
    pub rpn: u32,
    pub level: RiskLevel,
}

impl FmeaAssessment {
    #[must_use]
    pub fn new(severity: Rating, occurrence: Rating, detection: Rating) -> Self {
        let rpn = u32::from(severity.0) * u32::from(occurrence.0) * u32::from(detection.0);
        Self {
            rpn,
            level: level_for_rpn(rpn),
        }
    }

    /// What the team should do about a failure mode at this level.
    #[must_use]
    pub fn recommended_action(&self) -> &'static str {
        match self.level {
            RiskLevel::Critical => "Stop process immediately",
            RiskLevel::High => "Immediate action required",
            RiskLevel::Medium => "Enhanced controls needed",
            RiskLevel::Low => "Routine monitoring",
        }
    }
}

/// `severity * occurrence * detection`, each on the 1-10 scale.
///
/// # Errors
///
/// Returns `CalculatorError::OutOfRange` naming the first factor outside 1-10.
pub fn assess(severity: u8, occurrence: u8, detection: u8) -> Result<FmeaAssessment, CalculatorError> {
    Ok(FmeaAssessment::new(
        Rating::new("severity", severity)?,
        Rating::new("occurrence", occurrence)?,
        Rating::new("detection", detection)?,
    ))
}

/// Bucket an RPN: >=500 Critical, >=200 High, >=100 Medium, else Low.
#[must_use]
pub fn level_for_rpn(rpn: u32) -> RiskLevel {
    RiskLevel::bucket(rpn, RPN_THRESHOLDS)
}

//
// ─── WORKSHEET ─────────────────────────────────────────────────────────────────
//

/// Learner input for a new worksheet row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FmeaEntryDraft {
    pub process_step: String,
    pub failure_mode: String,
    pub effect: String,
    pub cause: String,
    pub severity: Option<u8>,
    pub occurrence: Option<u8>,
    pub detection: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmeaEntry {
    pub id: u64,
    pub process_step: String,
    pub failure_mode: String,
    pub effect: String,
    pub cause: String,
    pub severity: Rating,
    pub occurrence: Rating,
    pub detection: Rating,
    pub rpn: u32,
}

impl FmeaEntry {
    #[must_use]
    pub fn assessment(&self) -> FmeaAssessment {
        FmeaAssessment::new(self.severity, self.occurrence, self.detection)
    }

    fn refresh_rpn(&mut self) {
        self.rpn = self.assessment().rpn;
    }

    fn csv_row(&self) -> String {
        [
            csv_field(&self.process_step),
            csv_field(&self.failure_mode),
            csv_field(&self.effect),
            csv_field(&self.cause),
            self.severity.value().to_string(),
            self.occurrence.value().to_string(),
            self.detection.value().to_string(),
            self.rpn.to_string(),
            self.assessment().level.to_string(),
        ]
        .join(",")
    }
}

/// Which factor [`FmeaWorksheet::update_rating`] changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Severity,
    Occurrence,
    Detection,
}

impl Factor {
    fn name(self) -> &'static str {
        match self {
            Factor::Severity => "severity",
            Factor::Occurrence => "occurrence",
            Factor::Detection => "detection",
        }
    }
}

/// Ordered list of failure modes under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmeaWorksheet {
    entries: Vec<FmeaEntry>,
    next_id: u64,
}

impl Default for FmeaWorksheet {
    /// Starts with the drying-process example used in the course.
    fn default() -> Self {
        let mut sheet = Self::empty();
        let example = FmeaEntryDraft {
            process_step: "Drying Process".into(),
            failure_mode: "Temperature too high".into(),
            effect: "Product degradation".into(),
            cause: "Thermostat malfunction".into(),
            severity: Some(7),
            occurrence: Some(3),
            detection: Some(4),
        };
        // Fixed, in-range example data.
        if let Ok(entry) = sheet.build_entry(example) {
            sheet.entries.push(entry);
        }
        sheet
    }
}

impl FmeaWorksheet {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[FmeaEntry] {
        &self.entries
    }

    /// Append a row; unset ratings default to 5.
    ///
    /// # Errors
    ///
    /// Returns `CalculatorError::MissingField` when the process step or failure
    /// mode is blank, and `CalculatorError::OutOfRange` for a bad rating.
    pub fn add(&mut self, draft: FmeaEntryDraft) -> Result<&FmeaEntry, CalculatorError> {
        let entry = self.build_entry(draft)?;
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Change one rating of an existing row and recompute its RPN.
    ///
    /// # Errors
    ///
    /// Returns `CalculatorError::UnknownEntry` or `CalculatorError::OutOfRange`.
    pub fn update_rating(
        &mut self,
        id: u64,
        factor: Factor,
        value: u8,
    ) -> Result<&FmeaEntry, CalculatorError> {
        let rating = Rating::new(factor.name(), value)?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(CalculatorError::UnknownEntry(id))?;
        match factor {
            Factor::Severity => entry.severity = rating,
            Factor::Occurrence => entry.occurrence = rating,
            Factor::Detection => entry.detection = rating,
        }
        entry.refresh_rpn();
        Ok(entry)
    }

    /// Remove a row. Returns whether it existed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Rows by descending RPN; ties keep insertion order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&FmeaEntry> {
        let mut rows: Vec<&FmeaEntry> = self.entries.iter().collect();
        rows.sort_by(|a, b| b.rpn.cmp(&a.rpn));
        rows
    }

    /// Export as CSV with a header row.
    #[must_use]
    pub fn to_csv(&self) -> String {
        std::iter::once(CSV_HEADER.to_owned())
            .chain(self.entries.iter().map(FmeaEntry::csv_row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn build_entry(&mut self, draft: FmeaEntryDraft) -> Result<FmeaEntry, CalculatorError> {
        if draft.process_step.trim().is_empty() {
            return Err(CalculatorError::MissingField("processStep"));
        }
        if draft.failure_mode.trim().is_empty() {
            return Err(CalculatorError::MissingField("failureMode"));
        }
        let severity = Rating::or_default("severity", draft.severity)?;
        let occurrence = Rating::or_default("occurrence", draft.occurrence)?;
        let detection = Rating::or_default("detection", draft.detection)?;

        let id = self.next_id;
        self.next_id += 1;

        let mut entry = FmeaEntry {
            id,
            process_step: draft.process_step,
            failure_mode: draft.failure_mode,
            effect: draft.effect,
            cause: draft.cause,
            severity,
            occurrence,
            detection,
            rpn: 0,
        };
        entry.refresh_rpn();
        Ok(entry)
    }
}

/// Quote a field if it would otherwise break the row.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
