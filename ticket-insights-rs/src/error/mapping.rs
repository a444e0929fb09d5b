//! Error mapping for the inference HTTP API
//!
//! Converts Anthropic error responses and bare HTTP statuses into the
//! normalized PipelineError taxonomy, deciding retryability along the way.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, PipelineError};
use crate::util::truncate_string;

/// Anthropic returns 529 when the API is temporarily overloaded
pub const STATUS_OVERLOADED: u16 = 529;

/// Map an Anthropic API error body to a PipelineError
///
/// Expected shape: `{"type": "error", "error": {"type": "...", "message": "..."}}`
pub fn map_anthropic_error(
    status: StatusCode,
    json: &Value,
    context: &mut ErrorContext,
) -> PipelineError {
    context.service = "anthropic".to_string();
    context.status_code = Some(status.as_u16());

    let (error_type, message) = match json.get("error") {
        Some(error) => (
            error.get("type").and_then(|t| t.as_str()),
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown Anthropic error"),
        ),
        None => (
            None,
            json.get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error"),
        ),
    };

    if let Some(error_type) = error_type {
        context.error_code = Some(error_type.to_string());
    }

    // The error type is more specific than the status when both are present
    match error_type {
        Some("authentication_error") => PipelineError::authentication(message),
        Some("permission_error") => PipelineError::authorization(message),
        Some("rate_limit_error") => PipelineError::rate_limit(message),
        Some("overloaded_error") | Some("api_error") => PipelineError::server(message),
        Some("not_found_error") => PipelineError::not_found(message),
        Some("invalid_request_error") if status == StatusCode::BAD_REQUEST => {
            PipelineError::validation(message)
        }
        _ => error_for_status(status, message.to_string()),
    }
}

/// Map a generic HTTP error to a PipelineError
pub fn map_http_error(status: StatusCode, body: &str, context: &mut ErrorContext) -> PipelineError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if context.service == "anthropic" || json.get("error").map_or(false, Value::is_object) {
            return map_anthropic_error(status, &json, context);
        }

        let message = json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(|m| m.as_str())
            .unwrap_or(body);
        context.status_code = Some(status.as_u16());
        return error_for_status(status, message.to_string());
    }

    context.status_code = Some(status.as_u16());

    // Fallback to status-based mapping
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, truncate_string(body, 100))
    };

    error_for_status(status, message)
}

fn error_for_status(status: StatusCode, message: String) -> PipelineError {
    match status.as_u16() {
        400 => PipelineError::validation(message),
        401 => PipelineError::authentication(message),
        403 => PipelineError::authorization(message),
        404 => PipelineError::not_found(message),
        408 => PipelineError::timeout(message),
        429 => PipelineError::rate_limit(message),
        500..=599 => PipelineError::server(message),
        _ => PipelineError::service(message),
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        STATUS_OVERLOADED => "overloaded",
        500..=599 => "server",
        _ => "unknown",
    }
}

/// Determine if an HTTP status code indicates a retryable error
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}
