use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use jardoc_cache::DocService;
use jardoc_cli::{apply_overrides, fetch_timeout, repository_options, service_settings, Overrides};
use jardoc_config::JardocConfig;
use jardoc_maven::RemoteRepository;
use jardoc_server::RequestRouter;
use tokio_util::sync::CancellationToken;

/// Serve javadoc archives straight out of a Maven repository.
#[derive(Debug, Parser)]
#[command(name = "jardoc", version, about)]
struct Cli {
    /// Path to a TOML config file.
    ///
    /// If unset, `JARDOC_CONFIG` is used, then `jardoc.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (`host:port` or `:port`). Overrides the config and
    /// `JARDOC_LISTEN`.
    #[arg(long)]
    listen: Option<String>,

    /// Never pick this version as "latest". May be repeated.
    #[arg(long = "exclude", value_name = "VERSION")]
    exclude: Vec<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("failed to determine working directory")?;
    let (mut config, config_path) = JardocConfig::load(cli.config.as_deref(), &working_dir)
        .context("failed to load configuration")?;
    apply_overrides(
        &mut config,
        &Overrides {
            listen: cli.listen,
            exclude: cli.exclude,
        },
    );

    let diagnostics = config.validate();
    for warning in &diagnostics.warnings {
        eprintln!("jardoc: warning: {warning}");
    }
    if !diagnostics.is_ok() {
        for error in &diagnostics.errors {
            eprintln!("jardoc: error: {error}");
        }
        bail!("invalid configuration");
    }
    if cli.check_config {
        match &config_path {
            Some(path) => println!("jardoc: {} is valid", path.display()),
            None => println!("jardoc: no config file found; defaults are valid"),
        }
        return Ok(());
    }

    jardoc_config::init_tracing(&config.logging);
    if let Some(path) = &config_path {
        tracing::info!(target = "jardoc.cli", path = %path.display(), "loaded config");
    }
    run(config).await
}

async fn run(config: JardocConfig) -> Result<()> {
    let addr = config.server.listen_addr()?;
    let repository = RemoteRepository::new(
        config.repository.url()?,
        repository_options(&config.repository),
    )
    .context("failed to create repository client")?;

    let service = DocService::start(Arc::new(repository), service_settings(&config))
        .await
        .context("failed to load the initial version list")?;
    let router = RequestRouter::new(Arc::clone(&service))
        .with_legacy_aliases(config.versions.legacy_aliases.iter().cloned())
        .with_fetch_timeout(fetch_timeout(&config));

    let listener =
        std::net::TcpListener::bind(addr).with_context(|| format!("failed to bind {addr}"))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(target = "jardoc.cli", error = %err, "failed to listen for ctrl-c");
                return;
            }
            tracing::info!(target = "jardoc.cli", "shutting down");
            shutdown.cancel();
        }
    });

    let served = jardoc_server::serve(listener, Arc::new(router), shutdown).await;
    service.shutdown().await;
    served.context("server failed")
}
