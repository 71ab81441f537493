use serde_json::Value;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

const NETWORK_NOTICE: &str = "Network error. Please check your connection and try again.";
const GENERIC_NOTICE: &str = "Something went wrong. Please try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected { status: u16, message: Option<String> },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Builds a rejection from a non-2xx body, pulling out the server's
    /// `message` or, failing that, the first validation error.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| server_message(&value));
        ApiError::Rejected { status, message }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => NETWORK_NOTICE.to_string(),
            ApiError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::Rejected { message: None, .. } | ApiError::Decode(_) => {
                GENERIC_NOTICE.to_string()
            }
            ApiError::InvalidUrl(url) => format!("Invalid server address: {url}"),
        }
    }
}

fn server_message(body: &Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        if !message.trim().is_empty() {
            return Some(message.to_string());
        }
    }
    // Laravel-style validation payload: {"errors": {"field": ["first problem", ..]}}
    let errors = body.get("errors")?.as_object()?;
    errors.values().find_map(|entry| match entry {
        Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_string),
        Value::String(text) => Some(text.clone()),
        _ => None,
    })
}
