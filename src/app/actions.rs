use crate::api::{AuthClient, NoteClient};
use crate::app::state::{Outcome, Request};

/// Runs one request against the remote service and packages the response.
pub struct ActionDispatcher<'a, C> {
    client: &'a C,
}

impl<'a, C> ActionDispatcher<'a, C>
where
    C: AuthClient + NoteClient,
{
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub fn execute(&self, request: Request) -> Outcome {
        tracing::debug!(request = request.label(), "dispatching request");
        match request {
            Request::Login(credentials) => Outcome::Authenticated(self.client.login(&credentials)),
            Request::Signup(details) => Outcome::Authenticated(self.client.signup(&details)),
            Request::FetchNotes { token } => {
                let result = self.client.list_notes(&token);
                Outcome::NotesLoaded { token, result }
            }
            Request::CreateNote { token, draft } => {
                let result = self.client.create_note(&token, &draft);
                Outcome::NoteSaved {
                    token,
                    target: None,
                    result,
                }
            }
            Request::UpdateNote { token, id, draft } => {
                let result = self.client.update_note(&token, &id, &draft);
                Outcome::NoteSaved {
                    token,
                    target: Some(id),
                    result,
                }
            }
            Request::DeleteNote { token, id } => {
                let result = self.client.delete_note(&token, &id);
                Outcome::NoteDeleted { token, id, result }
            }
        }
    }
}
