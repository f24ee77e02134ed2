//! # nextcloud-bdd
//!
//! Runs feature files against a Nextcloud server with the API context
//! steps. Every cucumber option (`--name`, `--tags`, `--fail-fast`, ...)
//! is accepted next to the server options below.

use anyhow::{bail, Context};
use api_context::{after_scenario, ApiWorld};
use bdd_core::config::{self, ENV_ADMIN_PASSWORD, ENV_BASE_URL, ENV_CONSOLE_DIR, ENV_TEST_PASSWORD};
use bdd_core::{ContextConfig, BUILD_INFO};
use cucumber::{cli, World};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(clap::Args, Debug)]
struct ServerOpts {
    /// Server root, e.g. http://localhost:8080
    #[arg(long, env = ENV_BASE_URL)]
    base_url: Option<String>,

    /// Password of the admin account
    #[arg(long, env = ENV_ADMIN_PASSWORD)]
    admin_password: Option<String>,

    /// Password given to the users the fixtures create
    #[arg(long, env = ENV_TEST_PASSWORD)]
    test_password: Option<String>,

    /// Directory the console entry point is searched from
    #[arg(long, env = ENV_CONSOLE_DIR)]
    console_dir: Option<PathBuf>,

    /// Feature file or directory
    #[arg(default_value = "features")]
    features: PathBuf,
}

impl ServerOpts {
    fn config(&self) -> anyhow::Result<ContextConfig> {
        let mut config = ContextConfig::from_env();
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(password) = &self.admin_password {
            config.admin_password = password.clone();
        }
        if let Some(password) = &self.test_password {
            config.test_password = password.clone();
        }
        if let Some(dir) = &self.console_dir {
            config.console_dir = Some(dir.clone());
        }
        config.validate().context("invalid server options")?;
        Ok(config)
    }
}

/// Console commands run as the current user, so it has to own the checkout.
#[cfg(unix)]
fn check_owner(features: &Path) -> anyhow::Result<()> {
    use nix::unistd::{getuid, Uid, User};
    use std::os::unix::fs::MetadataExt;

    let metadata = std::fs::metadata(features)
        .with_context(|| format!("cannot read {}", features.display()))?;
    let owner = Uid::from_raw(metadata.uid());
    if owner == getuid() {
        return Ok(());
    }

    let owner_name = User::from_uid(owner)
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| owner.to_string());
    let current = User::from_uid(getuid())
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| getuid().to_string());
    let args: Vec<String> = std::env::args().collect();
    bail!(
        "{} is owned by {owner_name} but the tests run as {current}.\n\
         Run them as the owner instead:\n\n    runuser -u {owner_name} -- {}\n",
        features.display(),
        args.join(" ")
    );
}

#[cfg(not(unix))]
fn check_owner(_features: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = cli::Opts::<_, _, _, ServerOpts>::parsed();
    info!("Starting {}", BUILD_INFO);

    let features = opts.custom.features.clone();
    check_owner(&features)?;

    let config = opts.custom.config()?;
    info!(base_url = %config.base_url, features = %features.display(), "running features");
    if config::install(config).is_err() {
        warn!("configuration was already installed");
    }

    ApiWorld::cucumber()
        .max_concurrent_scenarios(1)
        .fail_on_skipped()
        .after(after_scenario)
        .with_cli(opts)
        .run_and_exit(features)
        .await;

    Ok(())
}
