//! Error types surfaced by the API client and form validation.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single request/response round trip.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 401. The stored session has already been cleared.
    #[error("not authenticated")]
    Unauthorized {
        /// Optional `detail` from the response body.
        detail: Option<String>,
    },
    /// Any other non-success status, with the backend's JSON body untouched.
    #[error("request rejected with status {status}")]
    Rejected {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Structured error payload, `Value::Null` when the body was empty or not JSON.
        body: Value,
    },
    /// Connection, timeout or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Human readable message supplied by the backend, if any.
    ///
    /// Prefers `detail`, then the first `non_field_errors` entry, then the
    /// first message found under any field key.
    pub fn detail(&self) -> Option<String> {
        match self {
            ApiError::Unauthorized { detail } => detail.clone(),
            ApiError::Rejected { body, .. } => extract_detail(body),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }

    /// Message to show the user, falling back to `fallback` when the backend
    /// gave nothing usable.
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or_else(|| fallback.to_string())
    }

    /// True for the 401 case, which callers recover from by re-routing to login.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }
}

pub(crate) fn extract_detail(body: &Value) -> Option<String> {
    let object = match body {
        Value::Object(map) => map,
        Value::Array(items) => return items.iter().find_map(first_message),
        _ => return None,
    };

    if let Some(detail) = object.get("detail").and_then(first_message) {
        return Some(detail);
    }
    if let Some(message) = object.get("non_field_errors").and_then(first_message) {
        return Some(message);
    }
    object.iter().find_map(|(field, value)| {
        first_message(value).map(|message| format!("{field}: {message}"))
    })
}

fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

/// Client-side presence/format failure detected before a form is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A required field is blank.
    #[error("{0} is required")]
    Missing(&'static str),
    /// The email field does not look like an address.
    #[error("enter a valid email address")]
    InvalidEmail,
    /// The date field is not `YYYY-MM-DD`.
    #[error("{0} must be a date in YYYY-MM-DD format")]
    InvalidDate(&'static str),
    /// Submission attempted while a previous one is still in flight.
    #[error("a save is already in progress")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(body: Value) -> ApiError {
        ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            body,
        }
    }

    #[test]
    fn detail_key_wins() {
        let err = rejected(json!({
            "detail": "Cannot delete course while students exist.",
            "name": ["ignored"]
        }));
        assert_eq!(
            err.detail().as_deref(),
            Some("Cannot delete course while students exist.")
        );
    }

    #[test]
    fn falls_back_to_non_field_errors_then_fields() {
        let err = rejected(json!({
            "non_field_errors": ["Student cannot enroll in subjects outside their course."]
        }));
        assert_eq!(
            err.detail().as_deref(),
            Some("Student cannot enroll in subjects outside their course.")
        );

        let err = rejected(json!({"email": ["student with this email already exists."]}));
        assert_eq!(
            err.detail().as_deref(),
            Some("email: student with this email already exists.")
        );
    }

    #[test]
    fn bare_string_body_is_not_a_detail() {
        let err = rejected(Value::String("<h1>Server Error (500)</h1>".to_string()));
        assert_eq!(err.detail(), None);
        assert_eq!(err.user_message("Failed to save."), "Failed to save.");
    }

    #[test]
    fn empty_body_uses_fallback() {
        let err = rejected(Value::Null);
        assert_eq!(err.detail(), None);
        assert_eq!(err.user_message("Failed to save."), "Failed to save.");
    }
}
