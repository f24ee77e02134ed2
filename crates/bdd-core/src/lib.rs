//! # BDD Core
//!
//! Shared types for the Nextcloud BDD step library.
//!
//! - [`ContextConfig`] carries the server root, credentials and console
//!   location used by every scenario
//! - [`BddError`] is the failure type returned by steps, assertions included

pub mod config;
pub mod error;

pub use config::ContextConfig;
pub use error::{ensure, ensure_eq, BddError, Result};

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information printed by the runner on startup
pub const BUILD_INFO: &str = concat!(
    "Nextcloud BDD ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Server paths the steps talk to
pub mod endpoints {
    pub const OCS_PREFIX: &str = "/ocs/v2.php";
    pub const INDEX_PREFIX: &str = "/index.php";
    pub const CLOUD_USERS: &str = "/cloud/users";
    pub const APP_CONFIG: &str = "/apps/provisioning_api/api/v1/config/apps";
    pub const OCS_API_REQUEST_HEADER: &str = "OCS-ApiRequest";
}
