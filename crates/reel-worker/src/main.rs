//! `reel` binary.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use reel_worker::commands::execute;
use reel_worker::logging::init_tracing;
use reel_worker::{Cli, PipelineConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Install rustls crypto provider (required for TLS/HTTPS)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let env_result = match &cli.env_file {
        Some(path) => dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display())),
        None => {
            dotenvy::dotenv().ok();
            Ok(())
        }
    };

    init_tracing(cli.verbose);

    if let Err(e) = env_result {
        fail(e);
    }

    match run(&cli).await {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => fail(e),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let command = cli.command();
    info!(command = ?command, "Starting reel");

    let mut config = PipelineConfig::from_env(command.requirements())
        .context("invalid configuration")?;
    if let Some(dir) = &cli.output_dir {
        config = config.with_output_dir(dir);
    }

    Ok(execute(&command, &config).await?)
}

fn fail(e: anyhow::Error) -> ! {
    error!("{:#}", e);
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
}
