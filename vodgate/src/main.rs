mod server;

use anyhow::Result;
use clap::Parser;
use vodgate_core::{logging, Config};

#[derive(Debug, Parser)]
#[command(name = "vodgate", about = "Video gateway between a catalog API and a remote media origin")]
struct Args {
    /// Path to the configuration file
    #[arg(long, env = "VODGATE_CONFIG_PATH")]
    config: Option<String>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

/// Load configuration from the explicit path, ./config.yaml, or
/// environment variables only.
fn load_config(args: &Args) -> Result<Config> {
    let config = if let Some(path) = &args.config {
        Config::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load config from {path}: {e}"))?
    } else if std::path::Path::new("config.yaml").exists() {
        Config::from_file("config.yaml")
            .map_err(|e| anyhow::anyhow!("failed to load ./config.yaml: {e}"))?
    } else {
        Config::from_env()
            .map_err(|e| anyhow::anyhow!("failed to load config from environment: {e}"))?
    };

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args)?;
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }

    logging::init_logging(&config.logging)?;

    server::run(config).await
}
