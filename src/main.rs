// src/main.rs

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut device = commands::connect(&cli.global)?;

    match cli.command {
        Commands::Upload { image } => commands::cmd_upload(&mut device, &image),
        Commands::Verify { image } => commands::cmd_verify(&mut device, &image),
        Commands::Install { image_name, volume } => {
            commands::cmd_install(&mut device, &image_name, &volume)
        }
        Commands::Reboot { volume } => commands::cmd_reboot(&mut device, &volume),
        Commands::BootOptions => commands::cmd_boot_options(&mut device),
        Commands::Volumes => commands::cmd_volumes(&device),
        Commands::Images => commands::cmd_images(&device),
        Commands::FreeSpace => commands::cmd_free_space(&device),
        Commands::Upgrade { image, volume } => {
            commands::cmd_upgrade(&mut device, &image, &volume)
        }
    }
}
