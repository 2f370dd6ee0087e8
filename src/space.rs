// src/space.rs

//! Free-space precondition for installs
//!
//! The appliance reports its volume group usage via
//! `vgdisplay -s --units G`:
//!
//! ```text
//! "vg-db-sda" 30.98 GB  [23.89 GB  used / 7.10 GB free]
//! ```

use crate::error::{Error, Result};
use crate::session::DeviceSession;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Command producing the disk-usage report
pub const FREE_SPACE_COMMAND: &str = "vgdisplay -s --units G";

static FREE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s/\s(\d+(?:\.\d+)?) GB free").unwrap());

/// Extract the free gigabytes from a disk-usage report
pub fn parse_free_space(report: &str) -> Option<f64> {
    FREE_RE
        .captures(report)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Free gigabytes in the appliance's volume group
pub fn free_space<S: DeviceSession>(session: &S) -> Result<f64> {
    let report = session
        .run_bash(FREE_SPACE_COMMAND)?
        .ok_or_else(|| Error::FreeSpaceUnavailable("empty disk usage report".to_string()))?;

    let free = parse_free_space(&report).ok_or_else(|| {
        Error::FreeSpaceUnavailable(format!("unrecognized disk usage report: {}", report.trim()))
    })?;
    debug!("Free space: {:.2} GB", free);
    Ok(free)
}

/// Space is sufficient iff `free >= min_space`
#[inline]
pub fn is_sufficient(free: f64, min_space: f64) -> bool {
    free >= min_space
}

/// Check that at least `min_space` GB are free
///
/// Returns `Ok(false)` for a readable report showing too little space; an
/// unreadable report is an error.
pub fn check_free_space<S: DeviceSession>(session: &S, min_space: f64) -> Result<bool> {
    let free = free_space(session)?;
    let sufficient = is_sufficient(free, min_space);
    info!(
        "Free space {:.2} GB, {:.2} GB required: {}",
        free,
        min_space,
        if sufficient { "ok" } else { "insufficient" }
    );
    Ok(sufficient)
}

/// Fail with [`Error::InsufficientSpace`] unless `min_space` GB are free
pub fn require_free_space<S: DeviceSession>(session: &S, min_space: f64) -> Result<()> {
    let free = free_space(session)?;
    if is_sufficient(free, min_space) {
        Ok(())
    } else {
        Err(Error::InsufficientSpace {
            required: min_space,
            available: free,
        })
    }
}
