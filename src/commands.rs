// src/commands.rs
//! Command handlers for the tmos-upgrade CLI

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use tmos_upgrade::{
    Config, HttpChunkSink, NetworkDevice, RestSession, SystemClock, TmosDevice,
};

use crate::cli::GlobalArgs;

type Device = TmosDevice<RestSession, HttpChunkSink, SystemClock>;

/// Load configuration, apply command-line overrides and connect
pub fn connect(global: &GlobalArgs) -> Result<Device> {
    let config = Config::load_or_default(global.config.as_deref())?.with_overrides(
        global.host.clone(),
        global.username.clone(),
        global.password.clone(),
    );

    let mut device = TmosDevice::from_config(&config)?.with_progress(global.progress);
    let host = device.session().credentials().host.clone();
    device
        .open()
        .with_context(|| format!("Failed to connect to {host}"))?;
    info!("Connected to {}", host);
    Ok(device)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn cmd_upload(device: &mut Device, image: &Path) -> Result<()> {
    device.file_copy(image, None)?;
    println!("Uploaded {}", image.display());
    Ok(())
}

pub fn cmd_verify(device: &mut Device, image: &Path) -> Result<()> {
    if device.file_copy_remote_exists(image, None)? {
        println!("{}: checksum matches", image.display());
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} is missing from the appliance or differs from the local file",
            image.display()
        ))
    }
}

pub fn cmd_install(device: &mut Device, image_name: &str, volume: &str) -> Result<()> {
    device.set_boot_options(image_name, volume)?;
    println!("Installed {} on {}", image_name, volume);
    Ok(())
}

pub fn cmd_reboot(device: &mut Device, volume: &str) -> Result<()> {
    NetworkDevice::reboot(device, volume)?;
    println!("Volume {} is active", volume);
    Ok(())
}

pub fn cmd_boot_options(device: &mut Device) -> Result<()> {
    print_json(&device.boot_options()?)
}

pub fn cmd_volumes(device: &Device) -> Result<()> {
    print_json(&device.volumes()?)
}

pub fn cmd_images(device: &Device) -> Result<()> {
    print_json(&device.images()?)
}

pub fn cmd_free_space(device: &Device) -> Result<()> {
    println!("{:.2} GB free", device.free_space()?);
    Ok(())
}

pub fn cmd_upgrade(device: &mut Device, image: &Path, volume: &str) -> Result<()> {
    device
        .upgrade(image, volume)
        .with_context(|| format!("Upgrade to {} on {} failed", image.display(), volume))?;
    println!("Upgrade complete, {} is active", volume);
    Ok(())
}
