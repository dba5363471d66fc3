//! Sqlgate - access-control gateway for a SQL engine

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sqlgate::cli::{Cli, Commands};
use sqlgate::config::Config;
use sqlgate::server;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            config.validate()?;
            config.log_allowlists();

            let state = server::build_state(config).await?;
            server::serve(state).await
        }
        Commands::Check => {
            config.validate()?;
            tracing::info!(
                provider = %config.provider,
                oauth_enabled = config.oauth_enabled,
                "configuration is valid"
            );
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default = if verbose { "sqlgate=debug" } else { "sqlgate=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
