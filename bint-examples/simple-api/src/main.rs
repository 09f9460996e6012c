use std::path::PathBuf;

use bint_core::prelude::*;
use bint_simple_api::{Migrator, UserController};
use clap::Parser;

#[derive(Parser)]
#[command(name = "simple-api", version, about = "Example user API built with Bint")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_yaml(&cli.config)?.apply_env();
    init_logging_json(config.log_level);

    App::new(config)
        .await?
        .controller(UserController)?
        .migrate::<Migrator>()
        .await?
        .run()
        .await?;

    Ok(())
}
