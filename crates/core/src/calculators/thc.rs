//! Total THC compliance for hemp lab results.

use serde::{Deserialize, Serialize};

/// Mass ratio of THC produced by decarboxylating THCA.
pub const THCA_CONVERSION_FACTOR: f64 = 0.877;

/// Federal hemp limit on total THC, in percent dry weight.
pub const HEMP_TOTAL_THC_LIMIT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThcResult {
    pub total_thc: f64,
    pub compliant: bool,
}

impl ThcResult {
    /// Total THC as shown to learners, e.g. `"0.194%"`.
    #[must_use]
    pub fn display_total(&self) -> String {
        format!("{:.3}%", self.total_thc)
    }
}

/// `total = thca * 0.877 + delta9`; compliant when `total <= 0.3`.
#[must_use]
pub fn total_thc(delta9_percent: f64, thca_percent: f64) -> ThcResult {
    let total_thc = thca_percent * THCA_CONVERSION_FACTOR + delta9_percent;
    ThcResult {
        total_thc,
        compliant: total_thc <= HEMP_TOTAL_THC_LIMIT,
    }
}

/// Same as [`total_thc`] but from raw form input; blank or unreadable fields
/// count as 0.
#[must_use]
pub fn total_thc_from_input(delta9: Option<&str>, thca: Option<&str>) -> ThcResult {
    total_thc(parse_percent(delta9), parse_percent(thca))
}

/// Read the leading number of `input` (`"0.25 %"` reads as 0.25).
///
/// Returns 0 for missing, empty, non-numeric, or non-finite input.
#[must_use]
pub fn parse_percent(input: Option<&str>) -> f64 {
    let Some(text) = input.map(str::trim).filter(|t| !t.is_empty()) else {
        return 0.0;
    };

    let numeric_len = text
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);

    // Longest prefix that parses wins, so "1e" reads as 1 and "0.3.1" as 0.3.
    (1..=numeric_len)
        .rev()
        .find_map(|end| text[..end].parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
