// src/inventory.rs

//! Image and volume inventory queries
//!
//! Thin read-only helpers over a [`DeviceSession`]. None of these cache
//! anything: every call asks the appliance again, which is what the polling
//! loops rely on.

use crate::error::Result;
use crate::session::{DeviceSession, IMAGE_STORE, Image, Volume};
use tracing::debug;

pub fn list_images<S: DeviceSession>(session: &S) -> Result<Vec<Image>> {
    session.list_images()
}

pub fn list_volumes<S: DeviceSession>(session: &S) -> Result<Vec<Volume>> {
    session.list_volumes()
}

/// True iff `name` appears verbatim in the image store listing
pub fn image_exists<S: DeviceSession>(session: &S, name: &str) -> Result<bool> {
    let listing = session.list_directory(IMAGE_STORE)?;
    Ok(listing.is_some_and(|text| text.lines().any(|line| line == name)))
}

pub fn volume_exists<S: DeviceSession>(session: &S, name: &str) -> Result<bool> {
    session.volume_exists(name)
}

/// The first volume flagged active, if any
///
/// A healthy appliance has exactly one, but nothing here relies on that.
pub fn active_volume<S: DeviceSession>(session: &S) -> Result<Option<Volume>> {
    Ok(list_volumes(session)?.into_iter().find(|v| v.active))
}

/// True iff `volume_name` carries `image_name` and finished installing it
pub fn image_installed_on<S: DeviceSession>(
    session: &S,
    image_name: &str,
    volume_name: &str,
) -> Result<bool> {
    let Some(image) = list_images(session)?
        .into_iter()
        .find(|img| img.name == image_name)
    else {
        debug!("Image {} not in image list", image_name);
        return Ok(false);
    };

    let volumes = list_volumes(session)?;
    if let Some(volume) = volumes.iter().find(|v| v.name == volume_name) {
        debug!(
            "Volume {}: version={} basebuild={} status={}",
            volume.name, volume.version, volume.basebuild, volume.status
        );
    }
    Ok(volumes
        .iter()
        .any(|v| v.name == volume_name && v.holds(&image)))
}
