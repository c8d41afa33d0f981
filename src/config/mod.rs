use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "NotesRemote";
const APP_NAME: &str = "notes-remote";

pub const CONFIG_ENV: &str = "NOTES_REMOTE_CONFIG";
pub const DATA_ENV: &str = "NOTES_REMOTE_DATA";
pub const DEFAULT_BASE_URL: &str = "https://note-management-2260.onrender.com";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub session_path: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let override_data = env::var(DATA_ENV).ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let session_path = data_root.join("session.json");
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            session_path,
            state_dir,
            log_dir,
        })
    }

    /// Lays every directory out under `root`; used by tests and portable installs.
    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let data_dir = root.join("data");
        let state_dir = root.join("state");
        Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            session_path: data_dir.join("session.json"),
            data_dir,
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.state_dir,
            &self.log_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiOptions,
    pub session: SessionOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        self.session.resolve(paths);
        self.api.normalize().context("validating [api] settings")?;
        Ok(())
    }

    /// Applies a `--base-url` style override after the file has been loaded.
    pub fn override_base_url(&mut self, base_url: &str) -> Result<()> {
        self.api.base_url = base_url.to_string();
        self.api.normalize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: String,
    /// Per-request timeout in seconds (0 = wait indefinitely)
    pub request_timeout_secs: u64,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 0,
        }
    }
}

impl ApiOptions {
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs))
        }
    }

    fn normalize(&mut self) -> Result<()> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).with_context(|| format!("invalid base_url {trimmed:?}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("base_url must use http or https, got {}", url.scheme());
        }
        if url.cannot_be_a_base() {
            bail!("base_url {trimmed:?} cannot carry request paths");
        }
        self.base_url = trimmed.to_string();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    #[serde(skip)]
    pub path: PathBuf,
    /// Keep the session between runs; when false the session lives only in memory
    pub persist: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            persist: true,
        }
    }
}

impl SessionOptions {
    fn resolve(&mut self, paths: &ConfigPaths) {
        if self.path.as_os_str().is_empty() {
            self.path = paths.session_path.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub tick_rate_ms: u64,
    pub preview_lines: u16,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            preview_lines: 3,
        }
    }
}

impl UiOptions {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn first_load_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(ConfigPaths::rooted_at(temp.path()));

        let cfg = loader.load_or_init()?;
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.request_timeout(), None);
        assert_eq!(cfg.session.path, loader.paths().session_path);
        assert!(loader.paths().config_file.exists());

        let reloaded = loader.load()?;
        assert_eq!(reloaded.api.base_url, DEFAULT_BASE_URL);
        Ok(())
    }

    #[test]
    fn partial_config_keeps_defaults_and_trims_base_url() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[api]\nbase_url = \"http://localhost:5000/\"\nrequest_timeout_secs = 15\n",
        )?;

        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.api.base_url, "http://localhost:5000");
        assert_eq!(cfg.api.request_timeout(), Some(Duration::from_secs(15)));
        assert!(cfg.session.persist);
        assert_eq!(cfg.ui.preview_lines, 3);
        Ok(())
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut cfg = AppConfig::default();
        let err = cfg
            .override_base_url("ftp://files.example.test")
            .expect_err("ftp is not accepted");
        assert!(err.to_string().contains("http or https"), "got {err}");
    }
}
