// src/lib.rs

//! Unattended firmware upgrades for redundant-volume appliances
//!
//! Drives an appliance that keeps several bootable software volumes through
//! a full upgrade: upload a firmware image, verify it arrived intact, install
//! it onto a chosen volume and reboot into that volume, waiting on each
//! long-running step with bounded polling.
//!
//! # Architecture
//!
//! - Session: one owned management channel per appliance ([`DeviceSession`])
//! - Engine: transfer, integrity, space, install and reboot steps, each a
//!   plain function over a session so they can be composed or run alone
//! - Facade: [`TmosDevice`] implements the generic [`NetworkDevice`]
//!   operation set and the composed upgrade workflow

pub mod config;
pub mod device;
mod error;
pub mod install;
pub mod integrity;
pub mod inventory;
pub mod poll;
pub mod progress;
pub mod reboot;
pub mod session;
pub mod space;
pub mod transfer;

pub use config::Config;
pub use device::{BootOptions, NetworkDevice, TmosDevice};
pub use error::{Error, Result};
pub use install::InstallSettings;
pub use poll::{Clock, ManualClock, PollPolicy, SystemClock};
pub use progress::{ProgressMode, ProgressTracker};
pub use reboot::ProbeOutcome;
pub use session::{
    Credentials, DeviceSession, Image, InstallOptions, RebootTarget, RestSession, Volume,
};
pub use transfer::{Chunk, ChunkSink, HttpChunkSink};
