//! Unified client error model and mapping helpers.
//! Every screen and the API client report failures through `AppError`; the CLI only needs
//! `requires_sign_in` and `inline_message` to decide between a redirect and an inline message.

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Io { code: String, message: String },
    Remote { code: String, message: String },
    Internal { code: String, message: String },
}

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Io { code, .. }
            | AppError::Remote { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Io { message, .. }
            | AppError::Remote { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn remote<S: Into<String>>(code: S, msg: S) -> Self { AppError::Remote { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map a non-success backend status to an error. 401 and 403 are deliberately merged:
    /// the client cannot tell a bad token from a missing permission.
    pub fn from_http_status(status: u16, detail: &str) -> Self {
        let detail = if detail.trim().is_empty() { format!("HTTP {}", status) } else { detail.trim().to_string() };
        match status {
            401 | 403 => AppError::auth("session_invalidated".to_string(), detail),
            404 => AppError::not_found("not_found".to_string(), detail),
            409 => AppError::conflict("conflict".to_string(), detail),
            400 | 422 => AppError::user("rejected".to_string(), detail),
            s if s >= 500 => AppError::remote("server_error".to_string(), detail),
            _ => AppError::remote("unexpected_status".to_string(), detail),
        }
    }

    /// Missing, expired and undecodable tokens as well as backend 401/403 all end the session.
    pub fn requires_sign_in(&self) -> bool { matches!(self, AppError::Auth { .. }) }

    /// Text shown next to the failed action.
    pub fn inline_message(&self) -> String {
        match self {
            AppError::UserInput { message, .. } => message.clone(),
            AppError::NotFound { .. } => "The requested item could not be found.".to_string(),
            AppError::Auth { code, message } if code == "invalid_credentials" => message.clone(),
            AppError::Auth { .. } => "Your session has ended. Please sign in again.".to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Remote { code: "invalid_response".into(), message: err.to_string() };
        }
        if let Some(status) = err.status() {
            return AppError::from_http_status(status.as_u16(), &err.to_string());
        }
        AppError::Io { code: "network".into(), message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "io".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Remote { code: "invalid_json".into(), message: err.to_string() }
    }
}

impl From<crate::identity::TokenError> for AppError {
    fn from(err: crate::identity::TokenError) -> Self {
        AppError::Auth { code: "invalid_token".into(), message: err.to_string() }
    }
}
