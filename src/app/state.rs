use unicode_segmentation::UnicodeSegmentation;

use crate::api::{ApiError, AuthResponse, LoginRequest, Note, NoteDraft, SignupRequest};
use crate::app::validation::{validate_auth, validate_note, AuthMode, Field, ValidationErrors};
use crate::search::filter_notes;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Notes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub name: String,
    pub email: String,
    pub password: String,
    pub title: String,
    pub content: String,
}

impl FormState {
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::Title => &self.title,
            Field::Content => &self.content,
            Field::General => "",
        }
    }

    fn slot_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Name => Some(&mut self.name),
            Field::Email => Some(&mut self.email),
            Field::Password => Some(&mut self.password),
            Field::Title => Some(&mut self.title),
            Field::Content => Some(&mut self.content),
            Field::General => None,
        }
    }

    fn clear_note_fields(&mut self) {
        self.title.clear();
        self.content.clear();
    }
}

/// Network work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Login(LoginRequest),
    Signup(SignupRequest),
    FetchNotes {
        token: String,
    },
    CreateNote {
        token: String,
        draft: NoteDraft,
    },
    UpdateNote {
        token: String,
        id: String,
        draft: NoteDraft,
    },
    DeleteNote {
        token: String,
        id: String,
    },
}

impl Request {
    pub fn label(&self) -> &'static str {
        match self {
            Request::Login(_) => "login",
            Request::Signup(_) => "signup",
            Request::FetchNotes { .. } => "fetch-notes",
            Request::CreateNote { .. } => "create-note",
            Request::UpdateNote { .. } => "update-note",
            Request::DeleteNote { .. } => "delete-note",
        }
    }
}

/// Result of executing a [`Request`], fed back through [`AppState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Authenticated(Result<AuthResponse, ApiError>),
    NotesLoaded {
        token: String,
        result: Result<Vec<Note>, ApiError>,
    },
    NoteSaved {
        token: String,
        target: Option<String>,
        result: Result<Note, ApiError>,
    },
    NoteDeleted {
        token: String,
        id: String,
        result: Result<(), ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Send(Request),
    Persist(Session),
    ClearSession,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub auth_mode: AuthMode,
    pub form: FormState,
    pub errors: ValidationErrors,
    pub notes: Vec<Note>,
    pub search_term: String,
    pub selected: usize,
    pub status_message: Option<String>,
    session: Option<Session>,
    editing: Option<String>,
    pending_delete: Option<String>,
    in_flight: usize,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        if self.is_authenticated() {
            Screen::Notes
        } else {
            Screen::Auth
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| !session.token.is_empty())
            .unwrap_or(false)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn editing_note(&self) -> Option<&Note> {
        let id = self.editing.as_deref()?;
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn pending_delete(&self) -> Option<&Note> {
        let id = self.pending_delete.as_deref()?;
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    /// Adopts a previously persisted session and asks for its notes.
    pub fn restore_session(&mut self, stored: Option<Session>) -> Vec<Effect> {
        let Some(session) = stored.filter(|s| !s.token.is_empty()) else {
            return Vec::new();
        };
        tracing::info!(user_id = %session.user_id, "restoring saved session");
        self.session = Some(session);
        self.load_notes().into_iter().collect()
    }

    pub fn load_notes(&mut self) -> Option<Effect> {
        let token = self.session.as_ref()?.token.clone();
        Some(self.send(Request::FetchNotes { token }))
    }

    // ---- form input ----

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        if let Some(slot) = self.form.slot_mut(field) {
            *slot = value.into();
            self.errors.remove(field);
        }
    }

    pub fn push_char(&mut self, field: Field, ch: char) {
        if let Some(slot) = self.form.slot_mut(field) {
            slot.push(ch);
            self.errors.remove(field);
        }
    }

    pub fn pop_char(&mut self, field: Field) {
        if let Some(slot) = self.form.slot_mut(field) {
            if let Some((idx, _)) = slot.grapheme_indices(true).next_back() {
                slot.truncate(idx);
                self.errors.remove(field);
            }
        }
    }

    pub fn toggle_auth_mode(&mut self) {
        self.auth_mode = self.auth_mode.toggled();
        self.errors.clear();
    }

    // ---- authentication ----

    pub fn submit_auth(&mut self) -> Vec<Effect> {
        let errors = validate_auth(
            self.auth_mode,
            &self.form.name,
            &self.form.email,
            &self.form.password,
        );
        if !errors.is_empty() {
            self.errors = errors;
            return Vec::new();
        }
        self.errors.clear();
        let request = match self.auth_mode {
            AuthMode::Login => Request::Login(LoginRequest {
                email: self.form.email.clone(),
                password: self.form.password.clone(),
            }),
            AuthMode::Signup => Request::Signup(SignupRequest {
                name: self.form.name.clone(),
                email: self.form.email.clone(),
                password: self.form.password.clone(),
            }),
        };
        vec![self.send(request)]
    }

    pub fn logout(&mut self) -> Vec<Effect> {
        if let Some(session) = &self.session {
            tracing::info!(user_id = %session.user_id, "logging out");
        }
        self.session = None;
        self.notes.clear();
        self.form = FormState::default();
        self.errors.clear();
        self.editing = None;
        self.pending_delete = None;
        self.search_term.clear();
        self.selected = 0;
        self.in_flight = 0;
        self.status_message = None;
        vec![Effect::ClearSession]
    }

    // ---- notes ----

    pub fn begin_edit(&mut self, id: &str) -> bool {
        let Some(note) = self.notes.iter().find(|note| note.id == id) else {
            return false;
        };
        self.form.title = note.title.clone();
        self.form.content = note.content.clone();
        self.editing = Some(note.id.clone());
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.form.clear_note_fields();
    }

    pub fn submit_note(&mut self) -> Vec<Effect> {
        let errors = validate_note(&self.form.title, &self.form.content);
        if !errors.is_empty() {
            self.errors = errors;
            return Vec::new();
        }
        self.errors.clear();
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return Vec::new();
        };
        let draft = NoteDraft {
            title: self.form.title.clone(),
            content: self.form.content.clone(),
        };
        let request = match self.editing.clone() {
            Some(id) => Request::UpdateNote { token, id, draft },
            None => Request::CreateNote { token, draft },
        };
        vec![self.send(request)]
    }

    /// First half of a delete: remember the target until the user answers.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if self.notes.iter().any(|note| note.id == id) {
            self.pending_delete = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn resolve_delete(&mut self, confirmed: bool) -> Vec<Effect> {
        let Some(id) = self.pending_delete.take() else {
            return Vec::new();
        };
        if !confirmed {
            return Vec::new();
        }
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            return Vec::new();
        };
        vec![self.send(Request::DeleteNote { token, id })]
    }

    // ---- search and selection ----

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.normalize_selection();
    }

    pub fn push_search_char(&mut self, ch: char) {
        self.search_term.push(ch);
        self.normalize_selection();
    }

    pub fn pop_search_char(&mut self) {
        if let Some((idx, _)) = self.search_term.grapheme_indices(true).next_back() {
            self.search_term.truncate(idx);
        }
        self.normalize_selection();
    }

    pub fn visible_notes(&self) -> Vec<&Note> {
        filter_notes(&self.notes, &self.search_term)
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.visible_notes().get(self.selected).copied()
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible_notes().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + delta).clamp(0, len as isize - 1);
        self.selected = next as usize;
    }

    fn normalize_selection(&mut self) {
        let len = self.visible_notes().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    // ---- responses ----

    pub fn apply(&mut self, outcome: Outcome) -> Vec<Effect> {
        match outcome {
            Outcome::Authenticated(result) => {
                self.finish_request();
                self.on_authenticated(result)
            }
            Outcome::NotesLoaded { token, result } => {
                if !self.is_current(&token) {
                    return Vec::new();
                }
                self.finish_request();
                match result {
                    Ok(notes) => {
                        tracing::debug!(count = notes.len(), "notes loaded");
                        self.notes = notes;
                        self.normalize_selection();
                    }
                    Err(err) => {
                        tracing::warn!(%err, "failed to fetch notes; keeping current list");
                    }
                }
                Vec::new()
            }
            Outcome::NoteSaved {
                token,
                target,
                result,
            } => {
                if !self.is_current(&token) {
                    return Vec::new();
                }
                self.finish_request();
                match result {
                    Ok(saved) => {
                        match target {
                            Some(id) => {
                                if let Some(slot) = self.notes.iter_mut().find(|n| n.id == id) {
                                    *slot = saved;
                                }
                            }
                            None => self.notes.insert(0, saved),
                        }
                        self.editing = None;
                        self.form.clear_note_fields();
                        self.normalize_selection();
                    }
                    Err(err) => {
                        tracing::warn!(%err, "note save rejected");
                        self.errors.set(Field::General, err.user_message());
                    }
                }
                Vec::new()
            }
            Outcome::NoteDeleted { token, id, result } => {
                if !self.is_current(&token) {
                    return Vec::new();
                }
                self.finish_request();
                match result {
                    Ok(()) => {
                        self.notes.retain(|note| note.id != id);
                        if self.editing.as_deref() == Some(id.as_str()) {
                            self.cancel_edit();
                        }
                        self.normalize_selection();
                    }
                    Err(err) => {
                        tracing::warn!(%err, note_id = %id, "note delete rejected");
                        self.errors.set(Field::General, err.user_message());
                    }
                }
                Vec::new()
            }
        }
    }

    fn on_authenticated(&mut self, result: Result<AuthResponse, ApiError>) -> Vec<Effect> {
        match result {
            Ok(auth) => {
                let session = Session {
                    user_id: auth.user_id,
                    name: auth.name,
                    token: auth.token,
                };
                tracing::info!(user_id = %session.user_id, mode = %self.auth_mode, "authenticated");
                self.session = Some(session.clone());
                self.errors.clear();
                self.form.password.clear();
                let mut effects = vec![Effect::Persist(session)];
                effects.extend(self.load_notes());
                effects
            }
            Err(err) => {
                tracing::warn!(%err, mode = %self.auth_mode, "authentication failed");
                self.errors = ValidationErrors::general_only(err.user_message());
                Vec::new()
            }
        }
    }

    fn is_current(&self, token: &str) -> bool {
        let current = self
            .session
            .as_ref()
            .map(|s| s.token == token)
            .unwrap_or(false);
        if !current {
            tracing::debug!("discarding response for a session that is no longer active");
        }
        current
    }

    fn send(&mut self, request: Request) -> Effect {
        self.in_flight += 1;
        Effect::Send(request)
    }

    fn finish_request(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }
}
