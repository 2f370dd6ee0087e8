// src/reboot.rs

//! Reboot into a volume and wait for it to come up active
//!
//! While the appliance restarts its management API is unreachable, so every
//! probe re-establishes the session before asking for the volume. Failures
//! inside a probe mean "not yet"; only the deadline ends the wait
//! unsuccessfully. The reboot command itself is never retried.

use crate::error::{Error, Result};
use crate::inventory;
use crate::poll::{Clock, PollPolicy, poll_until};
use crate::session::{DeviceSession, RebootTarget};
use std::time::Duration;
use tracing::{debug, info};

/// Default reboot deadline (10 minutes)
pub const REBOOT_TIMEOUT: Duration = Duration::from_secs(600);

/// Interval between reboot probes
pub const REBOOT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default polling policy for reboots
pub const fn default_policy() -> PollPolicy {
    PollPolicy::new(REBOOT_POLL_INTERVAL, REBOOT_TIMEOUT)
}

/// What a single reboot probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Session could not be re-established or the volume could not be read
    Unreachable(String),
    /// Appliance answered but the volume is not the active one yet
    NotYetActive,
    Active,
}

impl ProbeOutcome {
    pub fn is_active(&self) -> bool {
        matches!(self, ProbeOutcome::Active)
    }
}

/// Pick the reboot command for `volume_name`
///
/// Rebooting into the volume that is already active is a plain restart.
pub fn reboot_target<S: DeviceSession>(session: &S, volume_name: &str) -> Result<RebootTarget> {
    let active = inventory::active_volume(session)?;
    if active.is_some_and(|v| v.name == volume_name) {
        Ok(RebootTarget::InPlace)
    } else {
        Ok(RebootTarget::Volume(volume_name.to_string()))
    }
}

/// Reconnect and check whether `volume_name` is active
pub fn probe_volume<S: DeviceSession>(session: &mut S, volume_name: &str) -> ProbeOutcome {
    if let Err(e) = session.reconnect() {
        return ProbeOutcome::Unreachable(e.to_string());
    }
    match session.load_volume(volume_name) {
        Ok(volume) if volume.active => ProbeOutcome::Active,
        Ok(_) => ProbeOutcome::NotYetActive,
        Err(e) => ProbeOutcome::Unreachable(e.to_string()),
    }
}

/// Poll until `volume_name` reports itself active
///
/// Returns `Ok(false)` when the deadline passes first.
pub fn wait_for_reboot<S: DeviceSession, C: Clock>(
    session: &mut S,
    clock: &C,
    volume_name: &str,
    policy: &PollPolicy,
) -> Result<bool> {
    poll_until(clock, policy, || {
        let outcome = probe_volume(session, volume_name);
        match &outcome {
            ProbeOutcome::Unreachable(reason) => debug!("Appliance unreachable: {}", reason),
            ProbeOutcome::NotYetActive => debug!("Volume {} not active yet", volume_name),
            ProbeOutcome::Active => {}
        }
        Ok(outcome.is_active())
    })
}

/// Reboot the appliance into `volume_name` and wait until it is active
pub fn reboot<S: DeviceSession, C: Clock>(
    session: &mut S,
    clock: &C,
    volume_name: &str,
    policy: &PollPolicy,
) -> Result<()> {
    let target = reboot_target(session, volume_name)?;
    info!("Rebooting into {} ({:?})", volume_name, target);
    session.issue_reboot(&target)?;

    if wait_for_reboot(session, clock, volume_name, policy)? {
        info!("Volume {} is active", volume_name);
        Ok(())
    } else {
        Err(Error::RebootTimeout {
            volume: volume_name.to_string(),
            timeout: policy.timeout,
        })
    }
}
