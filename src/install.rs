// src/install.rs

//! Image installation onto a volume
//!
//! The install command returns immediately and the appliance installs in the
//! background, so completion is observed by polling the inventory until the
//! target volume reports the image's version and build with status
//! `complete`. Install time is bounded by the appliance hardware, so the
//! interval is fixed.

use crate::error::{Error, Result};
use crate::inventory;
use crate::poll::{Clock, PollPolicy, poll_until};
use crate::session::{DeviceSession, InstallOptions};
use crate::space;
use std::time::Duration;
use tracing::info;

/// Minimum free space (GB) required before installing
pub const MIN_FREE_SPACE_GB: f64 = 6.0;

/// Default install deadline (15 minutes)
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

/// Interval between install status probes
pub const INSTALL_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Tunables for [`install`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallSettings {
    pub min_free_space_gb: f64,
    pub policy: PollPolicy,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            min_free_space_gb: MIN_FREE_SPACE_GB,
            policy: PollPolicy::new(INSTALL_POLL_INTERVAL, INSTALL_TIMEOUT),
        }
    }
}

/// Issue the install command, creating the volume if it does not exist
pub fn request_install<S: DeviceSession>(
    session: &S,
    image_name: &str,
    volume_name: &str,
) -> Result<InstallOptions> {
    let options = InstallOptions {
        create_volume: !inventory::volume_exists(session, volume_name)?,
    };
    if options.create_volume {
        info!("Volume {} does not exist, it will be created", volume_name);
    }

    session.issue_install(image_name, volume_name, options)?;
    Ok(options)
}

/// Poll until `image_name` is installed on `volume_name`
///
/// Returns `Ok(false)` when the deadline passes first.
pub fn wait_for_install<S: DeviceSession, C: Clock>(
    session: &S,
    clock: &C,
    image_name: &str,
    volume_name: &str,
    policy: &PollPolicy,
) -> Result<bool> {
    poll_until(clock, policy, || {
        inventory::image_installed_on(session, image_name, volume_name)
    })
}

/// Install `image_name` onto `volume_name` and wait for it to complete
///
/// The deadline counts from the start of this call, precondition checks
/// included.
pub fn install<S: DeviceSession, C: Clock>(
    session: &S,
    clock: &C,
    image_name: &str,
    volume_name: &str,
    settings: &InstallSettings,
) -> Result<()> {
    let started = clock.now();

    space::require_free_space(session, settings.min_free_space_gb)?;
    request_install(session, image_name, volume_name)?;

    info!(
        "Waiting up to {}s for {} to install on {}",
        settings.policy.timeout.as_secs(),
        image_name,
        volume_name
    );
    let remaining = PollPolicy::new(
        settings.policy.interval,
        settings
            .policy
            .timeout
            .saturating_sub(clock.now().saturating_sub(started)),
    );

    if wait_for_install(session, clock, image_name, volume_name, &remaining)? {
        info!("{} installed on {}", image_name, volume_name);
        Ok(())
    } else {
        Err(Error::InstallTimeout {
            image: image_name.to_string(),
            volume: volume_name.to_string(),
            timeout: settings.policy.timeout,
        })
    }
}
