//! Orcha CLI and REST API entry point.
//!
//! Binary name: `orcha`
//!
//! Parses CLI arguments, loads the engine config, initializes tracing, then
//! dispatches to the command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use orcha_infra::config::{load_engine_config, resolve_config_path};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need config or tracing
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "orcha", &mut std::io::stdout());
        return Ok(());
    }

    let config_path = cli.config.clone().unwrap_or_else(resolve_config_path);
    let mut config = load_engine_config(&config_path).await;

    // Verbosity flags override the configured filter
    match cli.verbose {
        0 if cli.quiet => config.logging.filter = "error".to_string(),
        0 => {}
        1 => config.logging.filter = "info,orcha_core=debug,orcha_infra=debug".to_string(),
        _ => config.logging.filter = "trace".to_string(),
    }
    orcha_observe::tracing_setup::init_tracing(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    let result = dispatch(cli, config).await;
    orcha_observe::tracing_setup::shutdown_tracing();
    result
}

async fn dispatch(cli: Cli, mut config: orcha_types::config::EngineConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run { file, events } => {
            let state = AppState::init(&config);
            cli::run::handle_run(&state.host, &file, &events, cli.json, cli.quiet).await?;
        }

        Commands::Validate { file } => {
            cli::validate::handle_validate(&file, cli.json)?;
        }

        Commands::Serve { port, host } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;

            println!(
                "  {} Orcha API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(AppState::init(&config));

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
