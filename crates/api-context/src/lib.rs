//! # API Context
//!
//! Cucumber steps for black-box testing a Nextcloud server: requests to web
//! and OCS endpoints as a chosen user, assertions on status codes, JSON
//! bodies and HTML initial state, console commands, and user fixtures.
//!
//! ```no_run
//! # async fn run() {
//! api_context::run("tests/features").await;
//! # }
//! ```

pub use bdd_core;

pub mod auth;
pub mod command;
pub mod context;
pub mod initial_state;
pub mod jq;
pub mod matcher;
pub mod payload;
pub mod session;
mod steps;
pub mod template;
pub mod url;
mod world;

pub use command::{CommandOutcome, CommandRunner};
pub use context::ApiContext;
pub use jq::{JqBinary, JsonQuery};
pub use matcher::ExpectedValue;
pub use payload::{Body, Payload};
pub use session::{ApiResponse, HttpSession, RecordedRequest};
pub use template::Fields;
pub use world::{after_scenario, run, ApiWorld};

// Re-export core types for convenience
pub use bdd_core::{BddError, ContextConfig, Result};
