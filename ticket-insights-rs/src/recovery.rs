//! JSON recovery from free-form model output
//!
//! Model responses are asked to be JSON but regularly arrive wrapped in a
//! Markdown fence, followed by commentary, or cut off by the token limit.
//! `recover_json` runs a fixed cascade and returns the first value that
//! parses:
//!
//! 1. unwrap a leading code fence (and its `json` tag)
//! 2. parse the text directly
//! 3. parse up to and including the last `}` or `]`
//! 4. scan with string/escape awareness and parse each prefix that ends where
//!    both brace and bracket depth return to zero

use serde_json::Value;

use crate::error::{PipelineError, Result};

const FENCE: &str = "```";

/// Which cascade step produced the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMethod {
    /// The (unfenced) text parsed as is
    Direct,
    /// Parsed after cutting at the last closing brace or bracket
    Truncated,
    /// Parsed as a balanced prefix found by scanning
    Scanned,
}

/// A recovered value plus diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub value: Value,
    pub method: RecoveryMethod,
    /// Whether a leading code fence was removed first
    pub fenced: bool,
}

/// Recover a JSON value from model output
pub fn recover_json(text: &str) -> Result<Value> {
    recover_json_with_method(text).map(|recovered| recovered.value)
}

/// Recover a JSON value and report how it was found
pub fn recover_json_with_method(text: &str) -> Result<Recovered> {
    let (content, fenced) = unfence(text);

    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return Ok(Recovered {
            value,
            method: RecoveryMethod::Direct,
            fenced,
        });
    }

    if let Some(value) = parse_to_last_close(content) {
        log::debug!("Recovered JSON by truncating trailing text");
        return Ok(Recovered {
            value,
            method: RecoveryMethod::Truncated,
            fenced,
        });
    }

    if let Some(value) = scan_balanced_prefix(content) {
        log::debug!("Recovered JSON from a balanced prefix");
        return Ok(Recovered {
            value,
            method: RecoveryMethod::Scanned,
            fenced,
        });
    }

    Err(PipelineError::recovery_failed(content))
}

/// Trim and, if the text opens with a fence, keep what is inside it
fn unfence(text: &str) -> (&str, bool) {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return (trimmed, false);
    };

    // Up to the closing fence, or the end if the response was cut off
    let inner = match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let inner = inner
        .strip_prefix("json")
        .or_else(|| inner.strip_prefix("JSON"))
        .unwrap_or(inner);

    (inner.trim(), true)
}

fn parse_to_last_close(content: &str) -> Option<Value> {
    let last_close = match (content.rfind('}'), content.rfind(']')) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => return None,
    };

    // A close at position 0 leaves nothing worth parsing
    if last_close == 0 {
        return None;
    }

    serde_json::from_str(&content[..=last_close]).ok()
}

fn scan_balanced_prefix(content: &str) -> Option<Value> {
    let mut braces: i64 = 0;
    let mut brackets: i64 = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in content.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }

        if c == '"' {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        match c {
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => continue,
        }

        if braces == 0 && brackets == 0 && (c == '}' || c == ']') {
            if let Ok(value) = serde_json::from_str(&content[..=i]) {
                return Some(value);
            }
        }
    }

    None
}
