use anyhow::{Context, Result};
use clap::Parser;
use quic_branch::BranchEngine;
use quic_os::{FileAuditSink, PgBackRestAdapter, ShellPostgresAdapter, ShellSystemdAdapter, ShellZfsAdapter, UfwAdapter};
use quic_service::ServiceFacade;
use quic_template::TemplateEngine;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

mod config;
mod server;
mod token;
mod types;

use config::AgentConfig;
use server::AgentServer;
use token::StaticTokenResolver;

#[derive(Parser, Debug)]
#[command(author, version, about = "Storage-host agent for PostgreSQL branch lifecycle management", long_about = None)]
struct Args {
    /// Path to the agent's TOML configuration file.
    #[arg(long, default_value = "/etc/quic/agent.toml")]
    config: PathBuf,

    /// Override the Unix socket path from the config file.
    #[arg(long)]
    socket_path: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Shutdown grace period, in seconds, for an in-flight mutation to finish.
    #[arg(long, default_value_t = 30)]
    shutdown_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = if args.config.exists() {
        AgentConfig::load(&args.config).await?
    } else {
        info!(path = %args.config.display(), "no config file found, using defaults");
        AgentConfig::default()
    };
    if let Some(socket_path) = args.socket_path {
        config.socket_path = socket_path.display().to_string();
    }

    info!("starting quic-agent");

    let zfs = Arc::new(ShellZfsAdapter::new());
    let systemd = Arc::new(ShellSystemdAdapter::new());
    let firewall = Arc::new(UfwAdapter::new());
    let postgres = Arc::new(ShellPostgresAdapter::new(config.pg_user.clone()));
    let audit: Arc<dyn quic_os::AuditSink> = Arc::new(FileAuditSink::new(config.audit_log_path.clone()));
    let backup = Arc::new(PgBackRestAdapter);
    let journal = Arc::new(quic_os::JournalctlAdapter);

    let branch_engine = BranchEngine::new(
        config.branch_engine_config(),
        zfs.clone(),
        systemd.clone(),
        firewall.clone(),
        postgres.clone(),
        audit,
    );
    let template_engine = TemplateEngine::new(config.template_engine_config(), zfs, systemd, firewall, postgres, backup, journal);

    let facade = ServiceFacade::new(branch_engine, template_engine);
    let tokens = Arc::new(StaticTokenResolver::new(config.tokens.clone()));

    let socket_path = PathBuf::from(&config.socket_path);
    let (server, listener) = AgentServer::bind(socket_path, facade.clone(), tokens).context("binding agent socket")?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = server.serve(listener) => {
            error!("server loop exited unexpectedly");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
    }

    if let Err(e) = facade.shutdown(Duration::from_secs(args.shutdown_timeout_secs)).await {
        error!(error = %e, "shutdown did not complete cleanly");
    }
    server.remove_socket();

    Ok(())
}
