//! Server entry point: `tessera [configPath]`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tessera::config::Config;
use tessera::server::TesseraServer;
use tessera_core::World;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "server.properties".to_string());
    let config = Arc::new(
        Config::load_or_create(Path::new(&config_path))
            .with_context(|| format!("loading {config_path}"))?,
    );

    let regions_dir = PathBuf::from("worlds")
        .join(&config.world_name)
        .join("regions");
    let world = World::open(
        &regions_dir,
        config.world_seed,
        config.emergency_threshold,
        config.server_max_chunks,
    )
    .context("opening world storage")?;

    {
        let world = world.clone();
        let radius = config.spawn_warmup_radius;
        tokio::task::spawn_blocking(move || world.warm_spawn(radius))
            .await?
            .context("spawn warmup")?;
    }

    let mut server = TesseraServer::bind(config.clone(), world.clone())
        .await
        .context("binding listener")?;
    world.spawn_autosave(
        Duration::from_secs(config.autosave_interval_seconds),
        server.cancel_token(),
    );

    let cancel = server.cancel_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("shutdown signal received");
        cancel.cancel();
    });

    server.run().await;
    server.shutdown().await;
    log::info!("goodbye");
    Ok(())
}

/// Completes on ctrl-c or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let Ok(mut term) = signal(SignalKind::terminate()) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
