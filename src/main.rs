use std::sync::Arc;

use anyhow::{Context, Error};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use probevisor::{KubeNodeLister, Supervisor, cli::Args};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .finish(),
    )
    .context("failed to set global subscriber")?;

    let (cfg, kube) = args.into_settings();
    info!(api = %kube.api, insecure = kube.insecure, "config");

    let lister = KubeNodeLister::new(kube).context("failed to create node lister")?;
    info!(url = %lister.url(), "listing nodes");
    Supervisor::builder(cfg, Arc::new(lister))
        .build()
        .run()
        .await
        .context("probevisor stopped with an error")?;

    info!("bye");
    Ok(())
}
