use std::collections::VecDeque;

use anyhow::{bail, Context, Result};

use crate::api::{ApiError, AuthClient, Note, NoteClient, NoteDraft};
use crate::app::actions::ActionDispatcher;
use crate::app::state::{AppState, Effect, Outcome};
use crate::app::validation::{AuthMode, Field};
use crate::search::filter_notes;
use crate::session::SessionStore;

#[derive(Debug, Clone, Default)]
pub struct AuthFields {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Drives [`AppState`] synchronously: every request runs inline and its
/// outcome is applied before the call returns.
pub struct Controller<C> {
    state: AppState,
    store: SessionStore,
    client: C,
    fetch_error: Option<ApiError>,
}

impl<C> Controller<C>
where
    C: AuthClient + NoteClient,
{
    pub fn new(client: C, store: SessionStore) -> Self {
        Self {
            state: AppState::new(),
            store,
            client,
            fetch_error: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    /// The failure of the most recent note fetch, if it failed. The state
    /// only logs these, so callers that need to report them look here.
    pub fn fetch_error(&self) -> Option<&ApiError> {
        self.fetch_error.as_ref()
    }

    pub fn restore_session(&mut self) -> Result<()> {
        let stored = self.store.load().context("reading stored session")?;
        let effects = self.state.restore_session(stored);
        self.run(effects)
    }

    pub fn load_notes(&mut self) -> Result<()> {
        let effects = self.state.load_notes().into_iter().collect();
        self.run(effects)
    }

    pub fn submit_auth(&mut self, mode: AuthMode, fields: AuthFields) -> Result<()> {
        self.state.auth_mode = mode;
        self.state.set_field(Field::Name, fields.name);
        self.state.set_field(Field::Email, fields.email);
        self.state.set_field(Field::Password, fields.password);
        let effects = self.state.submit_auth();
        self.run(effects)
    }

    /// Creates a note, or updates `editing` when given.
    pub fn submit_note(&mut self, draft: NoteDraft, editing: Option<&str>) -> Result<()> {
        match editing {
            Some(id) => {
                if !self.state.begin_edit(id) {
                    bail!("note {id} is not in the loaded list");
                }
            }
            None => self.state.cancel_edit(),
        }
        self.state.set_field(Field::Title, draft.title);
        self.state.set_field(Field::Content, draft.content);
        let effects = self.state.submit_note();
        self.run(effects)
    }

    /// Asks `confirm` before deleting; returns whether the user agreed.
    pub fn delete_note<F>(&mut self, id: &str, confirm: F) -> Result<bool>
    where
        F: FnOnce(&Note) -> bool,
    {
        if !self.state.request_delete(id) {
            bail!("note {id} is not in the loaded list");
        }
        let confirmed = self.state.pending_delete().map(confirm).unwrap_or(false);
        let effects = self.state.resolve_delete(confirmed);
        self.run(effects)?;
        Ok(confirmed)
    }

    pub fn logout(&mut self) -> Result<()> {
        let effects = self.state.logout();
        self.run(effects)
    }

    pub fn search(&self, term: &str) -> Vec<&Note> {
        filter_notes(&self.state.notes, term)
    }

    fn run(&mut self, effects: Vec<Effect>) -> Result<()> {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Send(request) => {
                    let outcome = ActionDispatcher::new(&self.client).execute(request);
                    if let Outcome::NotesLoaded { result, .. } = &outcome {
                        self.fetch_error = result.as_ref().err().cloned();
                    }
                    queue.extend(self.state.apply(outcome));
                }
                Effect::Persist(session) => {
                    self.store.save(&session).context("persisting session")?;
                }
                Effect::ClearSession => {
                    self.store.clear().context("clearing stored session")?;
                }
            }
        }
        Ok(())
    }
}
