// src/cli.rs
//! CLI definitions for tmos-upgrade
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tmos_upgrade::ProgressMode;

#[derive(Parser)]
#[command(name = "tmos-upgrade")]
#[command(author, version)]
#[command(about = "Upload, install and boot firmware images on redundant-volume appliances", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection options shared by every subcommand
#[derive(Args)]
pub struct GlobalArgs {
    /// Configuration file (default: /etc/tmos-upgrade/config.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Appliance management address
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Management user
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    /// Management password
    #[arg(long, global = true, env = "TMOS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Upload progress display: silent, log or bar
    #[arg(long, global = true, default_value_t = ProgressMode::Log)]
    pub progress: ProgressMode,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload an image to the appliance's image store
    Upload {
        /// Path to the local image file
        image: PathBuf,
    },

    /// Check that the uploaded copy of an image matches the local file
    Verify {
        /// Path to the local image file
        image: PathBuf,
    },

    /// Install an uploaded image onto a volume and wait for completion
    Install {
        /// Image name in the image store
        image_name: String,

        /// Target volume, e.g. HD1.2 (created if missing)
        volume: String,
    },

    /// Reboot into a volume and wait until it is active
    Reboot {
        /// Volume to boot
        volume: String,
    },

    /// Show the active boot volume as JSON
    BootOptions,

    /// List software volumes as JSON
    Volumes,

    /// List images in the image store as JSON
    Images,

    /// Show free space in the volume group
    FreeSpace,

    /// Upload, verify, install and boot an image in one step
    Upgrade {
        /// Path to the local image file
        image: PathBuf,

        /// Target volume, e.g. HD1.2
        volume: String,
    },
}
