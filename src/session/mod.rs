//! Persisted session: two string entries under fixed keys, stored as a small
//! JSON key-value file next to the rest of the application data.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

const TMP_EXTENSION: &str = "json.tmp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub token: String,
}

impl Session {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identity record kept under [`USER_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    persist: bool,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            persist: true,
        }
    }

    /// A store that never touches the disk.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::new(),
            persist: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<Session>> {
        if !self.persist {
            return Ok(None);
        }
        let entries = self.read_entries()?;
        let token = entries.get(TOKEN_KEY).filter(|t| !t.is_empty());
        let user = entries.get(USER_KEY).filter(|u| !u.is_empty());
        let (Some(token), Some(user)) = (token, user) else {
            return Ok(None);
        };
        match serde_json::from_str::<UserProfile>(user) {
            Ok(profile) => Ok(Some(Session {
                user_id: profile.user_id,
                name: profile.name,
                token: token.clone(),
            })),
            Err(err) => {
                tracing::warn!(
                    ?err,
                    path = %self.path.display(),
                    "ignoring corrupt stored user record"
                );
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if !self.persist {
            return Ok(());
        }
        let mut entries = self.read_entries()?;
        let user = serde_json::to_string(&session.profile()).context("serialising user record")?;
        entries.insert(TOKEN_KEY.to_string(), session.token.clone());
        entries.insert(USER_KEY.to_string(), user);
        self.write_entries(&entries)
    }

    pub fn clear(&self) -> Result<()> {
        if !self.persist {
            return Ok(());
        }
        let mut entries = self.read_entries()?;
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err)
                    .with_context(|| format!("removing session file {}", self.path.display())),
            };
        }
        self.write_entries(&entries)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading session file {}", self.path.display()))
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                tracing::warn!(
                    ?err,
                    path = %self.path.display(),
                    "session file unreadable, starting fresh"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries).context("serialising session entries")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("ensuring session dir {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary session file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("atomically persisting session file {}", self.path.display())
        })?;
        Ok(())
    }
}
