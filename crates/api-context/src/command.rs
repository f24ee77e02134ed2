//! Console (`occ`) and shell command execution

use bdd_core::{BddError, ContextConfig, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

pub const APP_ROOT_PLACEHOLDER: &str = "<appRootDir>";
pub const SERVER_ROOT_PLACEHOLDER: &str = "<nextcloudRootDir>";

/// Result of one command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    pub output: Vec<String>,
    pub code: i32,
}

impl CommandOutcome {
    pub fn joined_output(&self) -> String {
        self.output.join("\n")
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "command: {}", self.command)?;
        writeln!(f, "resultCode: {}", self.code)?;
        write!(f, "output:")?;
        for line in &self.output {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// First directory, walking up from `start`, that contains `name`.
pub fn find_parent_dir_containing(start: &Path, name: &str) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(name).exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| BddError::NotFound {
            what: format!(
                "The file {name} was not found in the parent directories of {}",
                start.display()
            ),
        })
}

#[derive(Debug, Clone)]
pub struct CommandRunner {
    console_file: String,
    interpreter: String,
    console_dir: Option<PathBuf>,
    app_marker: String,
    environment: BTreeMap<String, String>,
    last_output: String,
}

impl CommandRunner {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            console_file: config.console_file.clone(),
            interpreter: config.console_interpreter.clone(),
            console_dir: config.console_dir.clone(),
            app_marker: config.app_marker.clone(),
            environment: BTreeMap::new(),
            last_output: String::new(),
        }
    }

    /// Variable exported to the next console commands of this scenario.
    pub fn set_env(&mut self, name: &str, value: &str) {
        self.environment.insert(name.to_string(), value.to_string());
    }

    pub fn clear_env(&mut self) {
        self.environment.clear();
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn last_output(&self) -> &str {
        &self.last_output
    }

    fn search_start(&self) -> Result<PathBuf> {
        match &self.console_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    pub fn console_root(&self) -> Result<PathBuf> {
        find_parent_dir_containing(&self.search_start()?, &self.console_file)
    }

    pub fn app_root(&self) -> Result<PathBuf> {
        find_parent_dir_containing(&std::env::current_dir()?, &self.app_marker)
    }

    /// Shell line running `command` through the console entry point.
    pub fn console_command_line(&self, command: &str) -> Result<String> {
        let console = self.console_root()?.join(&self.console_file);
        let mut line = format!(
            "{} {} {}",
            self.interpreter,
            quote(&console.to_string_lossy())?,
            command
        );
        if !self.environment.is_empty() {
            let mut exports = Vec::with_capacity(self.environment.len());
            for (name, value) in &self.environment {
                exports.push(format!("{name}={}", quote(value)?));
            }
            line = format!("{} {line}", exports.join(" "));
        }
        if let Some(owner) = foreign_owner(&console)? {
            line = format!("runuser -u {owner} -- {line}");
        }
        line.push_str("  2>&1");
        Ok(line)
    }

    /// Run a console command, e.g. `user:list`.
    #[instrument(skip(self))]
    pub async fn run_console(&mut self, command: &str) -> Result<CommandOutcome> {
        let line = self.console_command_line(command)?;
        self.run_shell(&line).await
    }

    /// Run `command` with `sh -c` after resolving the directory
    /// placeholders.
    #[instrument(skip(self))]
    pub async fn run_shell(&mut self, command: &str) -> Result<CommandOutcome> {
        let mut command = command.replace("\\\"", "\"");
        if command.contains(APP_ROOT_PLACEHOLDER) {
            let root = self.app_root()?;
            command = command.replace(APP_ROOT_PLACEHOLDER, &root.to_string_lossy());
        }
        if command.contains(SERVER_ROOT_PLACEHOLDER) {
            let root = self.console_root()?;
            command = command.replace(SERVER_ROOT_PLACEHOLDER, &root.to_string_lossy());
        }

        info!(command = %command, "running command");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .await
            .map_err(|e| BddError::Command {
                reason: format!("could not spawn `{command}`: {e}"),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim_end(), "command wrote to stderr");
        }
        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim_end().to_string())
            .collect();
        let outcome = CommandOutcome {
            command,
            output: lines,
            code: output.status.code().unwrap_or(-1),
        };
        self.last_output = outcome.joined_output();
        debug!(code = outcome.code, "command finished");
        Ok(outcome)
    }
}

fn quote(text: &str) -> Result<String> {
    shlex::try_quote(text)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| BddError::Command {
            reason: format!("cannot quote {text:?}: {e}"),
        })
}

/// Name of the owner of `path` when that is not the current user.
#[cfg(unix)]
fn foreign_owner(path: &Path) -> Result<Option<String>> {
    use nix::unistd::{getuid, Uid, User};
    use std::os::unix::fs::MetadataExt;

    let owner = Uid::from_raw(std::fs::metadata(path)?.uid());
    if owner == getuid() {
        return Ok(None);
    }
    let user = User::from_uid(owner)
        .map_err(|e| BddError::Command {
            reason: format!("could not look up owner {owner} of {}: {e}", path.display()),
        })?
        .ok_or_else(|| BddError::Command {
            reason: format!("no passwd entry for owner {owner} of {}", path.display()),
        })?;
    Ok(Some(user.name))
}

#[cfg(not(unix))]
fn foreign_owner(_path: &Path) -> Result<Option<String>> {
    Ok(None)
}
