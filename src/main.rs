// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::Parser;
use kube::Client;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use meshdns::constants::{
    DEFAULT_MESH_DNS_SERVICE, DEFAULT_MESH_NAMESPACE, DNS_PORT, TOKIO_WORKER_THREADS,
};
use meshdns::provider;

/// Patches the cluster DNS provider (CoreDNS or KubeDNS) so the mesh
/// domain resolves through the mesh's own DNS server, then reverts the
/// patch when the controller shuts down.
#[derive(Parser)]
#[command(name = "meshdns")]
#[command(about = "Cluster DNS integration controller for Traefik Mesh", long_about = None)]
#[command(version)]
struct Cli {
    /// Namespace the mesh control plane runs in
    #[arg(long, default_value = DEFAULT_MESH_NAMESPACE)]
    mesh_namespace: String,

    /// Name of the mesh DNS Service
    #[arg(long, default_value = DEFAULT_MESH_DNS_SERVICE)]
    dns_service: String,

    /// Port the mesh DNS server listens on
    #[arg(long, default_value_t = DNS_PORT)]
    dns_port: u16,

    /// Leave the DNS provider patched on shutdown instead of restoring it
    #[arg(long)]
    no_restore: bool,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("meshdns-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with custom format
    // Format: timestamp file:line LEVEL message
    // Example: 2025-11-29T23:45:00.123456Z main.rs:49 INFO Starting Traefik Mesh DNS controller
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug meshdns
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json meshdns
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting Traefik Mesh DNS controller");
    debug!("Logging initialized with file and line number tracking");

    // Initialize Kubernetes client
    debug!("Initializing Kubernetes client");
    let client = Client::try_default()
        .await
        .context("failed to initialize Kubernetes client")?;
    debug!("Kubernetes client initialized successfully");

    let dns_provider = match provider::detect(&client).await {
        Ok(found) => found,
        Err(err) => {
            error!(
                reason = err.reason(),
                "Failed to detect a supported cluster DNS provider: {}", err
            );
            return Err(err.into());
        }
    };

    if let Err(err) = dns_provider
        .configure(&client, &cli.mesh_namespace, &cli.dns_service, cli.dns_port)
        .await
    {
        error!(reason = err.reason(), "Failed to configure {}: {}", dns_provider, err);
        return Err(err.into());
    }

    info!("Cluster DNS provider configured, waiting for shutdown signal");
    wait_for_shutdown().await?;

    if cli.no_restore {
        warn!("Leaving DNS provider configuration in place (--no-restore)");
        return Ok(());
    }

    if let Err(err) = dns_provider.restore(&client).await {
        error!(reason = err.reason(), "Failed to restore {}: {}", dns_provider, err);
        return Err(err.into());
    }

    info!("Cluster DNS provider restored, shutting down");
    Ok(())
}

/// Completes once the controller receives SIGINT or SIGTERM.
async fn wait_for_shutdown() -> Result<()> {
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;

    tokio::select! {
        _ = interrupt.recv() => info!("Received SIGINT, shutting down"),
        _ = terminate.recv() => info!("Received SIGTERM, shutting down"),
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
