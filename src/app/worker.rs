use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::api::{AuthClient, NoteClient};
use crate::app::actions::ActionDispatcher;
use crate::app::state::{Outcome, Request};

/// Background thread that executes requests one at a time, in the order they
/// were submitted, so the interactive loop never blocks on the network.
pub struct RequestWorker {
    requests: Sender<Request>,
    outcomes: Receiver<Outcome>,
}

impl RequestWorker {
    pub fn spawn<C>(client: C) -> Result<Self>
    where
        C: AuthClient + NoteClient + Send + 'static,
    {
        let (request_tx, request_rx) = unbounded::<Request>();
        let (outcome_tx, outcome_rx) = unbounded::<Outcome>();
        thread::Builder::new()
            .name("notes-remote-requests".into())
            .spawn(move || {
                let dispatcher = ActionDispatcher::new(&client);
                for request in request_rx.iter() {
                    let outcome = dispatcher.execute(request);
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
                tracing::debug!("request worker stopped");
            })
            .context("spawning request worker thread")?;
        Ok(Self {
            requests: request_tx,
            outcomes: outcome_rx,
        })
    }

    pub fn submit(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| anyhow::anyhow!("request worker is no longer running"))
    }

    /// Outcomes that have completed since the last call.
    pub fn drain(&self) -> Vec<Outcome> {
        self.outcomes.try_iter().collect()
    }
}
