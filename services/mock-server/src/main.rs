//! # Mock Server
//!
//! Standalone recording server for running feature files without a real
//! Nextcloud instance.

use bdd_core::{endpoints, BUILD_INFO};
use clap::Parser;
use mock_server::{CannedResponse, MockServer};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mock-server")]
#[command(about = "Recording HTTP server answering with a JSON echo of each request")]
#[command(version = bdd_core::VERSION)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "MOCK_SERVER_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Answer user lookups with 404 so fixtures go through user creation
    #[arg(long)]
    unknown_users: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    info!("Starting mock server ({})", BUILD_INFO);

    let server = MockServer::bind(args.bind).await?;
    if args.unknown_users {
        let path = format!("{}{}/*", endpoints::OCS_PREFIX, endpoints::CLOUD_USERS);
        info!("User lookups under {} will answer 404", path);
        server.respond_with("GET", &path, CannedResponse::json(404, "{}"));
    }
    info!("Mock server ready at {}", server.url());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down after {} requests", server.requests().len());
    server.stop();

    Ok(())
}
