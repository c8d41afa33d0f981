pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod search;
pub mod session;
pub mod ui;

pub use api::{ApiError, HttpClient, Note, NoteDraft};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use session::{Session, SessionStore};
