//! Scenario configuration
//!
//! Every scenario reads the same [`ContextConfig`]. Runners either install
//! one explicitly with [`install`] or let [`current`] fall back to the
//! `NEXTCLOUD_BDD_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{BddError, Result};

pub const ENV_BASE_URL: &str = "NEXTCLOUD_BDD_BASE_URL";
pub const ENV_ADMIN_USER: &str = "NEXTCLOUD_BDD_ADMIN_USER";
pub const ENV_ADMIN_PASSWORD: &str = "NEXTCLOUD_BDD_ADMIN_PASSWORD";
pub const ENV_TEST_PASSWORD: &str = "NEXTCLOUD_BDD_TEST_PASSWORD";
pub const ENV_CONSOLE_FILE: &str = "NEXTCLOUD_BDD_CONSOLE_FILE";
pub const ENV_CONSOLE_INTERPRETER: &str = "NEXTCLOUD_BDD_CONSOLE_INTERPRETER";
pub const ENV_CONSOLE_DIR: &str = "NEXTCLOUD_BDD_CONSOLE_DIR";

static INSTALLED: OnceLock<ContextConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Server root, e.g. `http://localhost:8080`
    pub base_url: String,
    pub admin_user: String,
    pub admin_password: String,
    /// Password given to every user the fixtures create
    pub test_password: String,
    /// File name of the console entry point (`occ` shim)
    pub console_file: String,
    /// Program used to launch the console file
    pub console_interpreter: String,
    /// Directory the console lookup starts from; the working directory when unset
    pub console_dir: Option<PathBuf>,
    /// Marker directory identifying the application root
    pub app_marker: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
            test_password: "123456".to_string(),
            console_file: "console.php".to_string(),
            console_interpreter: "php".to_string(),
            console_dir: None,
            app_marker: "appinfo".to_string(),
        }
    }
}

impl ContextConfig {
    /// Defaults overlaid with the `NEXTCLOUD_BDD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let fields: [(&str, &mut String); 6] = [
            (ENV_BASE_URL, &mut config.base_url),
            (ENV_ADMIN_USER, &mut config.admin_user),
            (ENV_ADMIN_PASSWORD, &mut config.admin_password),
            (ENV_TEST_PASSWORD, &mut config.test_password),
            (ENV_CONSOLE_FILE, &mut config.console_file),
            (ENV_CONSOLE_INTERPRETER, &mut config.console_interpreter),
        ];
        for (key, slot) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
        if let Some(dir) = lookup(ENV_CONSOLE_DIR).filter(|v| !v.is_empty()) {
            config.console_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(BddError::Config {
                reason: format!("base url must be http(s): {}", self.base_url),
            });
        }
        if self.admin_user.is_empty() {
            return Err(BddError::Config {
                reason: "admin user must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_admin(&self, user: &str) -> bool {
        user == self.admin_user
    }
}

/// Install the configuration every scenario will use. Only the first call
/// wins; later calls return the rejected config.
pub fn install(config: ContextConfig) -> std::result::Result<(), ContextConfig> {
    debug!(base_url = %config.base_url, "installing scenario configuration");
    INSTALLED.set(config)
}

/// The installed configuration, or one read from the environment.
pub fn current() -> ContextConfig {
    INSTALLED.get().cloned().unwrap_or_else(ContextConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            (ENV_BASE_URL, "http://cloud.test/"),
            (ENV_ADMIN_PASSWORD, "secret"),
            (ENV_TEST_PASSWORD, ""),
            (ENV_CONSOLE_DIR, "/srv/nextcloud"),
        ]
        .into_iter()
        .collect();

        let config = ContextConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://cloud.test/");
        assert_eq!(config.admin_password, "secret");
        assert_eq!(config.test_password, "123456");
        assert_eq!(config.console_dir, Some(PathBuf::from("/srv/nextcloud")));
        assert_eq!(config.admin_user, "admin");
    }

    #[test]
    fn json_keeps_defaults_for_missing_keys() {
        let config = ContextConfig::from_json(r#"{"admin_password": "pw"}"#).unwrap();
        assert_eq!(config.admin_password, "pw");
        assert_eq!(config.console_file, "console.php");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ContextConfig::from_json(r#"{"base_url": "ftp://x"}"#).unwrap_err();
        assert!(matches!(err, BddError::Config { .. }));
    }
}
