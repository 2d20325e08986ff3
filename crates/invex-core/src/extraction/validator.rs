//! Parsing of raw LLM responses into JSON.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

lazy_static! {
    // Markdown code fence around the whole answer, optionally tagged `json`.
    static ref CODE_FENCE: Regex = Regex::new(
        r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$"
    ).unwrap();

    static ref TRAILING_COMMA: Regex = Regex::new(
        r",(\s*[}\]])"
    ).unwrap();

    // A whole bare value of 5+ digits, such as a bill number with leading
    // zeros. Must end at a delimiter so decimals and text inside strings
    // are left alone.
    static ref BARE_LONG_NUMBER: Regex = Regex::new(
        r"(:\s)(\d{5,})(\s*[,}\]])"
    ).unwrap();
}

/// Turns raw model output into a JSON value, optionally repairing common
/// formatting slips first.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidator {
    repair: bool,
}

impl Default for ResponseValidator {
    fn default() -> Self {
        Self { repair: true }
    }
}

impl ResponseValidator {
    pub fn with_repair(repair: bool) -> Self {
        Self { repair }
    }

    /// Parse `raw` as JSON. Returns `None` when neither the raw text nor its
    /// repaired form parses.
    pub fn validate(&self, raw: &str) -> Option<Value> {
        let err = match serde_json::from_str::<Value>(raw) {
            Ok(value) => return Some(value),
            Err(e) => e,
        };

        if !self.repair {
            debug!("Response is not valid JSON and repair is disabled: {}", err);
            return None;
        }

        match repair(raw) {
            Some(value) => {
                debug!("Response parsed after repair");
                Some(value)
            }
            None => {
                debug!("Response is not valid JSON after repair: {}", err);
                None
            }
        }
    }
}

/// Apply each fix in turn, stopping at the first text that parses.
fn repair(raw: &str) -> Option<Value> {
    let unfenced = match CODE_FENCE.captures(raw) {
        Some(caps) => caps[1].to_string(),
        None => raw.to_string(),
    };
    if let Ok(value) = serde_json::from_str(&unfenced) {
        return Some(value);
    }

    let no_trailing = TRAILING_COMMA.replace_all(&unfenced, "$1");
    if let Ok(value) = serde_json::from_str(&no_trailing) {
        return Some(value);
    }

    let quoted = BARE_LONG_NUMBER.replace_all(&no_trailing, "${1}\"${2}\"${3}");
    serde_json::from_str(&quoted).ok()
}
