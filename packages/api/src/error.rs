//! API error taxonomy and user-facing message normalisation.

use serde::Deserialize;
use thiserror::Error;

/// Failure of a remote call.
///
/// Stores treat [`ApiError::Transport`] and [`ApiError::Rejected`] the same way;
/// only the message text differs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("request rejected ({status}){}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The request was refused locally before being sent.
    #[error("{0}")]
    Invalid(String),
}

impl ApiError {
    /// The message carried by this error, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Transport(m) | ApiError::Invalid(m) => Some(m.as_str()).filter(|m| !m.is_empty()),
            ApiError::Rejected { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
            ApiError::Decode(_) => None,
        }
    }

    /// Normalise to a displayable string, using `fallback` when the error has no message.
    pub fn user_message(&self, fallback: &str) -> String {
        self.message().unwrap_or(fallback).to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize)]
struct DetailItem {
    msg: String,
}

/// Extract the display message from an error response body.
///
/// The backend reports errors as `{"detail": "..."}`, or for request validation
/// failures as `{"detail": [{"msg": "...", ...}, ...]}`. Anything else yields `None`.
pub fn message_from_body(body: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match body.detail {
        Detail::Text(text) => text,
        Detail::Items(items) => items
            .into_iter()
            .map(|item| item.msg)
            .collect::<Vec<_>>()
            .join("; "),
    };
    Some(message).filter(|m| !m.trim().is_empty())
}
