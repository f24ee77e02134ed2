//! `(jq)` expressions, evaluated by the system `jq` binary

use async_trait::async_trait;
use bdd_core::{BddError, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument};

pub const JQ_MARKER: &str = "(jq)";

/// Evaluates jq filters against JSON text.
#[async_trait]
pub trait JsonQuery: Send + Sync {
    async fn query(&self, filter: &str, json: &str) -> Result<Value>;

    /// True when `filter` evaluates to exactly `true` against `json`.
    async fn matches(&self, filter: &str, json: &str) -> Result<bool> {
        Ok(self.query(filter, json).await? == Value::Bool(true))
    }
}

#[derive(Debug, Clone, Default)]
pub struct JqBinary {
    program: Option<PathBuf>,
}

impl JqBinary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific jq executable instead of searching `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> Result<PathBuf> {
        if let Some(program) = &self.program {
            return Ok(program.clone());
        }
        which::which("jq").map_err(|_| BddError::JsonQuery {
            reason: "jq must be installed to use (jq) expressions".to_string(),
        })
    }

    pub fn is_available(&self) -> bool {
        self.program().is_ok()
    }
}

#[async_trait]
impl JsonQuery for JqBinary {
    #[instrument(skip(self, json))]
    async fn query(&self, filter: &str, json: &str) -> Result<Value> {
        let mut child = Command::new(self.program()?)
            .arg("-c")
            .arg(filter)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping stdin closes it so jq sees the end of its input.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(json.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(BddError::JsonQuery {
                reason: format!(
                    "filter {filter:?} failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        debug!(result = %text, "jq evaluated");
        Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn evaluates_filters_when_jq_is_installed() {
        let jq = JqBinary::new();
        if !jq.is_available() {
            return;
        }
        let doc = r#"{"data":[{"id":1},{"id":2}]}"#;
        assert_eq!(jq.query(".data | length", doc).await.unwrap(), json!(2));
        assert!(jq.matches(".data[0].id == 1", doc).await.unwrap());
        assert!(!jq.matches(".data[0].id == 5", doc).await.unwrap());
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let jq = JqBinary::with_program("/nonexistent/jq-binary");
        let err = jq.query(".", "{}").await.unwrap_err();
        assert!(matches!(err, BddError::Io { .. }));
    }
}
