//! Scripted stand-in for the remote service used by controller and worker tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::api::{
    ApiError, AuthClient, AuthResponse, LoginRequest, Note, NoteClient, NoteDraft, SignupRequest,
};

#[derive(Default)]
struct Script {
    calls: Vec<String>,
    auth: VecDeque<Result<AuthResponse, ApiError>>,
    lists: VecDeque<Result<Vec<Note>, ApiError>>,
    saves: VecDeque<Result<Note, ApiError>>,
    deletes: VecDeque<Result<(), ApiError>>,
}

#[derive(Clone, Default)]
pub struct FakeClient {
    script: Arc<Mutex<Script>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_auth(&self, result: Result<AuthResponse, ApiError>) -> &Self {
        self.script.lock().auth.push_back(result);
        self
    }

    pub fn push_list(&self, result: Result<Vec<Note>, ApiError>) -> &Self {
        self.script.lock().lists.push_back(result);
        self
    }

    pub fn push_save(&self, result: Result<Note, ApiError>) -> &Self {
        self.script.lock().saves.push_back(result);
        self
    }

    pub fn push_delete(&self, result: Result<(), ApiError>) -> &Self {
        self.script.lock().deletes.push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }

    fn record(&self, call: String) -> parking_lot::MutexGuard<'_, Script> {
        let mut script = self.script.lock();
        script.calls.push(call);
        script
    }
}

fn unscripted() -> ApiError {
    ApiError::Transport("no scripted response".into())
}

impl AuthClient for FakeClient {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let mut script = self.record(format!("login {}", request.email));
        script.auth.pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    fn signup(&self, request: &SignupRequest) -> Result<AuthResponse, ApiError> {
        let mut script = self.record(format!("signup {} {}", request.name, request.email));
        script.auth.pop_front().unwrap_or_else(|| Err(unscripted()))
    }
}

impl NoteClient for FakeClient {
    fn list_notes(&self, token: &str) -> Result<Vec<Note>, ApiError> {
        let mut script = self.record(format!("list Bearer {token}"));
        script.lists.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn create_note(&self, token: &str, draft: &NoteDraft) -> Result<Note, ApiError> {
        let mut script = self.record(format!("create Bearer {token} {}", draft.title));
        script.saves.pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    fn update_note(&self, token: &str, id: &str, draft: &NoteDraft) -> Result<Note, ApiError> {
        let mut script = self.record(format!("update Bearer {token} {id} {}", draft.title));
        script.saves.pop_front().unwrap_or_else(|| Err(unscripted()))
    }

    fn delete_note(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let mut script = self.record(format!("delete Bearer {token} {id}"));
        script.deletes.pop_front().unwrap_or(Ok(()))
    }
}

pub fn note(id: &str, title: &str, content: &str) -> Note {
    Note {
        id: id.into(),
        title: title.into(),
        content: content.into(),
        updated_at: Some("2024-03-05T10:00:00.000Z".into()),
        created_at: None,
    }
}

pub fn auth(token: &str, user_id: &str, name: &str) -> AuthResponse {
    AuthResponse {
        token: token.into(),
        user_id: user_id.into(),
        name: name.into(),
    }
}
