//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The file itself is
//! chosen by `--config`, then `CONFIG_PATH`, then `mri-client.toml` in the
//! working directory. Only the default file may be missing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mri_api::ClientConfig;
use mri_auth::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "mri-client.toml";
const APP_DIR: &str = "mri-client";
const SESSION_FILE: &str = "session.json";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Session storage settings
#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    /// Session file; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// A missing file is an error when `explicit` is set and means built-in
    /// defaults otherwise.
    pub fn load(path: &Path, explicit: bool) -> common::Result<Self> {
        let mut config = if !explicit && !path.exists() {
            Config::default()
        } else {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file path from the CLI arg or CONFIG_PATH env var.
    /// The flag is true when the path was named explicitly.
    pub fn resolve_path(cli_path: Option<&Path>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (p.to_path_buf(), true);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_FILE), false)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(url) = std::env::var("MRI_API_URL") {
            if !is_http_url(&url) {
                return Err(common::Error::Env {
                    var: "MRI_API_URL".into(),
                    reason: format!("must start with http:// or https://, got: {url}"),
                });
            }
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("MRI_SESSION_FILE") {
            if path.trim().is_empty() {
                return Err(common::Error::Env {
                    var: "MRI_SESSION_FILE".into(),
                    reason: "must not be empty".into(),
                });
            }
            self.storage.path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if !is_http_url(&self.api.base_url) {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Session file location: configured path, else
    /// `<data dir>/mri-client/session.json`, else `./session.json`.
    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(SESSION_FILE))
            .unwrap_or_else(|| PathBuf::from(SESSION_FILE))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that read or mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_env() {
        unsafe {
            remove_env("MRI_API_URL");
            remove_env("MRI_SESSION_FILE");
            remove_env("CONFIG_PATH");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("mri-client.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://mri.example.com/api"
timeout_secs = 30

[storage]
path = "/tmp/mri/session.json"
"#,
        );

        let config = Config::load(&path, true).unwrap();
        assert_eq!(config.api.base_url, "https://mri.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.session_path(), PathBuf::from("/tmp/mri/session.json"));
        assert_eq!(config.client_config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path, true).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.api.timeout_secs, 10);
        assert!(config.storage.path.is_none());
        assert!(config.session_path().ends_with("session.json"));
    }

    #[test]
    fn test_missing_default_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = Config::load(Path::new("/nonexistent/mri-client.toml"), false).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = Config::load(Path::new("/nonexistent/mri-client.toml"), true);
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(
            Config::load(&path, true),
            Err(common::Error::Toml(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"ftp://example.com\"\n");

        let err = Config::load(&path, true).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\ntimeout_secs = 0\n");

        let err = Config::load(&path, true).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "got: {err}");
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"https://file.example.com/api\"\n");

        unsafe {
            set_env("MRI_API_URL", "http://localhost:5000/api");
            set_env("MRI_SESSION_FILE", "/tmp/other-session.json");
        }
        let config = Config::load(&path, true);
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(
            config.session_path(),
            PathBuf::from("/tmp/other-session.json")
        );
    }

    #[test]
    fn test_invalid_env_url_names_the_variable() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe { set_env("MRI_API_URL", "localhost:5000") };
        let result = Config::load(Path::new("/nonexistent/mri-client.toml"), false);
        clear_env();

        match result {
            Err(common::Error::Env { var, .. }) => assert_eq!(var, "MRI_API_URL"),
            other => panic!("expected Env error, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();

        assert_eq!(
            Config::resolve_path(None),
            (PathBuf::from("mri-client.toml"), false)
        );

        unsafe { set_env("CONFIG_PATH", "/etc/mri/env.toml") };
        assert_eq!(
            Config::resolve_path(None),
            (PathBuf::from("/etc/mri/env.toml"), true)
        );
        assert_eq!(
            Config::resolve_path(Some(Path::new("/cli.toml"))),
            (PathBuf::from("/cli.toml"), true)
        );
        clear_env();
    }
}
