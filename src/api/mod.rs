//! Wire models and client seams for the remote notes service.
//!
//! The controller only talks to the service through [`AuthClient`] and
//! [`NoteClient`], so tests can swap in fakes and simulate rejected or
//! unreachable servers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod http;

pub use http::HttpClient;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Body of a create or update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "userId", deserialize_with = "string_or_number")]
    pub user_id: String,
    pub name: String,
}

/// Failure payload returned by the service on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request rejected with status {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("network error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text shown in the general error slot.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ApiError::Rejected { .. } => GENERIC_ERROR_MESSAGE.to_string(),
            ApiError::Transport(_) | ApiError::Decode(_) => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

pub trait AuthClient {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError>;
}

pub trait NoteClient {
    fn list_notes(&self, token: &str) -> Result<Vec<Note>, ApiError>;
    fn create_note(&self, token: &str, draft: &NoteDraft) -> Result<Note, ApiError>;
    fn update_note(&self, token: &str, id: &str, draft: &NoteDraft) -> Result<Note, ApiError>;
    fn delete_note(&self, token: &str, id: &str) -> Result<(), ApiError>;
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}
