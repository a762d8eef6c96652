use tracing_subscriber::EnvFilter;

use ax_gateway::cli::{self, Cli, Command, ConfigCommand};
use ax_gateway::{api, bootstrap};

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _path) = cli::load_config()?;
            serve(config).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, path) = cli::load_config()?;
            if !cli::validate_config(&config, &path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _path) = cli::load_config()?;
            cli::show_config(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("axcore {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ax_gateway=debug")),
        )
        .json()
        .init();
}

async fn serve(config: ax_domain::config::Config) -> anyhow::Result<()> {
    tracing::info!("axcore starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ax_domain::config::ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ax_domain::config::ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ax_domain::config::ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues.iter().filter(|i| i.severity == ax_domain::config::ConfigSeverity::Error).count()
        );
    }

    let host = config.server.host.clone();
    let port = config.server.port;

    let state = bootstrap::build_state(config).await?;
    let app = api::router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("binding to {addr}: {e}"))?;

    tracing::info!(addr = %addr, "axcore listening");

    axum::serve(listener, app).await.map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    Ok(())
}
