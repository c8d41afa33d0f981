use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;

use super::{
    ApiError, AuthClient, AuthResponse, ErrorPayload, LoginRequest, Note, NoteClient, NoteDraft,
    SignupRequest,
};
use crate::config::ApiOptions;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("parsing base url {base_url}"))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("notes-remote/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;
        Ok(Self { client, base_url })
    }

    pub fn from_options(options: &ApiOptions) -> Result<Self> {
        Self::new(&options.base_url, options.request_timeout())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Transport(format!("base url {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        let status = response.status();
        tracing::debug!(url = %response.url(), status = status.as_u16(), "response received");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let payload: ErrorPayload = serde_json::from_str(&body).unwrap_or_default();
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message: payload.message,
        })
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request)?;
        response
            .json::<T>()
            .map_err(|err| ApiError::Decode(err.to_string()))
    }
}

impl AuthClient for HttpClient {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["api", "login"])?;
        self.send_json(self.client.post(url).json(request))
    }

    fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["api", "signup"])?;
        self.send_json(self.client.post(url).json(request))
    }
}

impl NoteClient for HttpClient {
    fn list_notes(&self, token: &str) -> Result<Vec<Note>, ApiError> {
        let url = self.endpoint(&["api", "notes"])?;
        self.send_json(self.client.get(url).bearer_auth(token))
    }

    fn create_note(&self, token: &str, draft: &NoteDraft) -> Result<Note, ApiError> {
        let url = self.endpoint(&["api", "notes"])?;
        self.send_json(self.client.post(url).bearer_auth(token).json(draft))
    }

    fn update_note(&self, token: &str, id: &str, draft: &NoteDraft) -> Result<Note, ApiError> {
        let url = self.endpoint(&["api", "notes", id])?;
        self.send_json(self.client.put(url).bearer_auth(token).json(draft))
    }

    fn delete_note(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "notes", id])?;
        self.send(self.client.delete(url).bearer_auth(token))
            .map(|_| ())
    }
}
