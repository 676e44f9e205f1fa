//! Error types shared by the transport, session, and action layers.

use serde::Deserialize;

pub const STATUS_UNAUTHORIZED: u16 = 401;

/// Where a request failed. Callers never branch on this to decide how to
/// surface the failure; it exists for logging and for session recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Transport,
    Http,
    Decode,
}

impl ApiErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Http => "http",
            Self::Decode => "decode",
        }
    }
}

/// Uniform failure for every remote call. `Display` is the user-facing text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, or 0 when no response was received.
    pub status_code: u16,
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status_code: 0,
            kind: ApiErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn decode(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            kind: ApiErrorKind::Decode,
            message: message.into(),
        }
    }

    /// Builds the error for a non-2xx response from its raw body.
    #[must_use]
    pub fn from_http_response(status_code: u16, body: &[u8]) -> Self {
        let message = error_message_from_body(body)
            .unwrap_or_else(|| generic_failure_message(status_code));
        Self {
            status_code,
            kind: ApiErrorKind::Http,
            message,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Http && self.status_code == STATUS_UNAUTHORIZED
    }
}

#[must_use]
pub fn generic_failure_message(status_code: u16) -> String {
    format!("Request failed ({status_code})")
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Validation(Vec<ValidationIssue>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct ValidationIssue {
    #[serde(default)]
    msg: Option<String>,
}

fn error_message_from_body(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    let from_detail = match parsed.detail {
        Some(ErrorDetail::Text(text)) => non_empty(&text),
        Some(ErrorDetail::Validation(issues)) => {
            let joined = issues
                .iter()
                .filter_map(|issue| issue.msg.as_deref().and_then(non_empty))
                .collect::<Vec<_>>()
                .join("; ");
            non_empty(&joined)
        }
        Some(ErrorDetail::Other(_)) | None => None,
    };
    from_detail.or_else(|| parsed.message.as_deref().and_then(non_empty))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Rejected user input, caught before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Email must not be empty")]
    EmptyEmail,
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Name must be at least {min} characters")]
    NameTooShort { min: usize },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Action {action} requires argument '{argument}'")]
    MissingArgument {
        action: &'static str,
        argument: &'static str,
    },
    #[error("Action {action} has invalid argument '{argument}': {value}")]
    InvalidArgument {
        action: &'static str,
        argument: &'static str,
        value: String,
    },
}

/// Failure of a user-triggered operation: either bad input or a failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_becomes_message() {
        let error = ApiError::from_http_response(403, br#"{"detail":"Forbidden"}"#);
        assert_eq!(error.to_string(), "Forbidden");
        assert_eq!(error.kind, ApiErrorKind::Http);
        assert_eq!(error.status_code, 403);
    }

    #[test]
    fn validation_details_are_joined() {
        let body = br#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"},{"msg":"field required"}]}"#;
        let error = ApiError::from_http_response(422, body);
        assert_eq!(
            error.message,
            "value is not a valid email address; field required"
        );
    }

    #[test]
    fn message_field_is_used_without_detail() {
        let error = ApiError::from_http_response(500, br#"{"message":"database offline"}"#);
        assert_eq!(error.message, "database offline");
    }

    #[test]
    fn empty_or_unparseable_body_falls_back_to_generic() {
        assert_eq!(
            ApiError::from_http_response(502, b"").message,
            "Request failed (502)"
        );
        assert_eq!(
            ApiError::from_http_response(500, b"<html>oops</html>").message,
            "Request failed (500)"
        );
        assert_eq!(
            ApiError::from_http_response(400, br#"{"detail":"   "}"#).message,
            "Request failed (400)"
        );
    }

    #[test]
    fn only_http_401_counts_as_unauthorized() {
        assert!(ApiError::from_http_response(401, b"").is_unauthorized());
        assert!(!ApiError::from_http_response(403, b"").is_unauthorized());
        assert!(!ApiError::transport("connection refused").is_unauthorized());
    }
}
