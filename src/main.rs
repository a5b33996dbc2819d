#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod bootstrap;

use crate::bootstrap::{Bootstrap, StoreKind};
use anyhow::{bail, Context, Result};
use clap::Parser;
use lattice_api::{ApiServer, ServerOptions};
use lattice_config::{Controller, ControllerOptions, MemoryStore, Store};
use lattice_core::ServiceRegistry;
use lattice_discovery::DiscoveryServer;
use lattice_registry::{CacheOptions, MemoryRegistry, RegistryCache};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "lattice", about = "Control plane for a fleet of service-mesh sidecars")]
struct Args {
    /// Path to the bootstrap file.
    #[clap(short = 'c', long = "config", default_value = "./lattice.yaml")]
    config: PathBuf,

    /// Overrides the bootstrap file's log level.
    #[clap(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let bootstrap = Bootstrap::load(&args.config)?;

    let log_level = args.log_level.as_ref().unwrap_or(&bootstrap.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(log_level).with_context(|| format!("bad log level {log_level:?}"))?,
        )
        .init();
    info!(config = %args.config.display(), "starting lattice");

    let store = new_store(&bootstrap);
    let controller = Controller::with_options(
        store,
        ControllerOptions {
            sync_interval: bootstrap.config_store.sync_freq,
            ..ControllerOptions::default()
        },
    );
    let dependencies = controller.dependencies();
    let proxy_configs = controller.proxy_configs();
    let instances = controller.instances();

    let registry = new_registry(&bootstrap);
    let registry_cache = RegistryCache::with_options(
        registry,
        CacheOptions {
            sync_freq: bootstrap.service_registry.sync_freq,
            sync_jitter: bootstrap.service_registry.sync_jitter,
            ..CacheOptions::default()
        },
    );

    // Wire the discovery servers before anything starts moving so no event
    // slips past their handlers.
    let shutdown = CancellationToken::new();
    let discovery = DiscoveryServer::new(
        registry_cache.clone(),
        proxy_configs.clone(),
        dependencies.clone(),
        shutdown.clone(),
    );

    controller
        .start()
        .await
        .context("starting the configuration controller")?;
    let registry_task = {
        let cache = registry_cache.clone();
        let token = shutdown.clone();
        tokio::spawn(async move { cache.run(token).await })
    };

    let (drain_tx, drain_rx) = drain::channel();
    let mut discovery_task =
        tokio::spawn(discovery.serve(bootstrap.discovery.bind, drain_rx.clone()));
    let api = ApiServer::new(
        bootstrap.api.bind,
        dependencies,
        proxy_configs,
        instances,
    )
    .with_options(ServerOptions {
        read_timeout: bootstrap.api.read_timeout,
        read_header_timeout: bootstrap.api.read_header_timeout,
        write_timeout: bootstrap.api.write_timeout,
        idle_timeout: bootstrap.api.idle_timeout,
    });
    let mut api_task = tokio::spawn(api.serve(drain_rx));

    tokio::select! {
        _ = shutdown_signal() => info!("shutdown signal received"),
        res = &mut discovery_task => {
            res.context("discovery server panicked")?
                .context("discovery server failed")?;
            bail!("discovery server exited unexpectedly");
        }
        res = &mut api_task => {
            res.context("admin API server panicked")?
                .context("admin API server failed")?;
            bail!("admin API server exited unexpectedly");
        }
    }

    // Drain the servers first so sidecars see clean stream shutdowns, then
    // stop the controllers.
    drain_tx.drain().await;
    shutdown.cancel();
    controller.stop().await;
    let _ = registry_task.await;
    let _ = discovery_task.await;
    let _ = api_task.await;
    info!("bye");
    Ok(())
}

fn new_store(bootstrap: &Bootstrap) -> Arc<dyn Store> {
    match bootstrap.config_store.kind {
        StoreKind::Memory => {
            if bootstrap.config_store.spec.is_some() {
                warn!("config_store.spec is ignored by the memory store");
            }
            info!(
                base_path = %bootstrap.config_store.base_path,
                "using the in-memory config store; nothing will survive a restart"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

fn new_registry(bootstrap: &Bootstrap) -> Arc<dyn ServiceRegistry> {
    match bootstrap.service_registry.kind {
        StoreKind::Memory => {
            if bootstrap.service_registry.spec.is_some() {
                warn!("service_registry.spec is ignored by the memory registry");
            }
            info!(
                base_path = %bootstrap.service_registry.base_path,
                "using the in-memory service registry; intended for development"
            );
            Arc::new(MemoryRegistry::default())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("installing the SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
