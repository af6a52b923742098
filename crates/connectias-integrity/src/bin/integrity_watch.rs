// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Connectias

//! integrity-watch - run the integrity monitor against the current process.
//!
//! Only process-level probes (TracerPid, memory maps, native stack) have
//! real inputs here; package-manager probes report nothing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use connectias_integrity::host::procfs::native_host_policy;
use connectias_integrity::{
    DetectionSink, MonitorConfig, MonitorSession, ProcfsEnvironment, TracingSink, Unsupported,
};

#[derive(Parser, Debug)]
#[command(
    name = "integrity-watch",
    version,
    about = "Periodic runtime integrity checks for the current process"
)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the tick interval
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,
}

fn load_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if let Some(ms) = args.interval_ms {
        config.tick_interval_ms = ms;
    }
    config.policy = native_host_policy(config.policy);
    config.policy.safe_namespaces.push("integrity_watch::".to_string());
    Ok(config.validated()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let interval = config.tick_interval();

    let session = MonitorSession::builder(Arc::new(ProcfsEnvironment::new()))
        .config(config)
        .telephony(Arc::new(Unsupported))
        .sensors(Arc::new(Unsupported))
        .build()
        .context("building monitor session")?;

    if args.once {
        session.run_tick_once(&TracingSink).await;
        info!(ticks = session.ticks_completed(), "single tick completed");
        return Ok(());
    }

    let sink: Arc<dyn DetectionSink> = Arc::new(TracingSink);
    session
        .start(interval, sink)
        .context("starting monitor")?;
    info!(?interval, "press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    session.stop();
    // let the in-flight tick finish its log lines
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!(ticks = session.ticks_completed(), "stopped");
    Ok(())
}
