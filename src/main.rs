use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedwatch::app::AppContext;
use feedwatch::cli::{commands, Cli, Commands};
use feedwatch::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        commands::init(cli.config.as_deref())?;
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.feed.url = url;
    }
    if let Some(dir) = cli.storage {
        config.storage.dir = dir;
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Check { json, no_notify } => {
            commands::check(&ctx, json, !no_notify).await?;
        }
        Commands::Show => {
            commands::show(&ctx)?;
        }
        Commands::Reset => {
            commands::reset(&ctx)?;
        }
        Commands::Init => {}
    }

    Ok(())
}
