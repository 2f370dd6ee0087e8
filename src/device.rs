// src/device.rs

//! Device facade
//!
//! [`NetworkDevice`] is the operation set shared by every vendor driver.
//! Operations a driver does not implement return [`Error::NotSupported`]
//! instead of approximating them. [`TmosDevice`] implements the software
//! lifecycle subset for redundant-volume appliances and adds the composed
//! [`TmosDevice::upgrade`] workflow.
//!
//! # Example
//!
//! ```ignore
//! use tmos_upgrade::{Config, NetworkDevice, TmosDevice};
//!
//! let config = Config::load_or_default(None)?;
//! let mut device = TmosDevice::from_config(&config)?;
//! device.open()?;
//! device.upgrade(Path::new("BIGIP-15.1.0-0.0.31.iso"), "HD1.2")?;
//! ```

use crate::config::Config;
use crate::error::{Error, Result};
use crate::install::{self, InstallSettings};
use crate::integrity;
use crate::inventory;
use crate::poll::{Clock, PollPolicy, SystemClock};
use crate::progress::ProgressMode;
use crate::reboot;
use crate::session::{DeviceSession, Image, RestSession, Volume};
use crate::space;
use crate::transfer::{self, ChunkSink, HttpChunkSink, UPLOAD_CHUNK_SIZE};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Boot configuration of an appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootOptions {
    pub active_volume: Option<String>,
}

fn not_supported<T>(operation: &str) -> Result<T> {
    Err(Error::NotSupported(operation.to_string()))
}

/// Operations common to all managed network devices
pub trait NetworkDevice {
    /// Establish the management session
    fn open(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn config(&mut self, _command: &str) -> Result<String> {
        not_supported("config")
    }

    fn config_list(&mut self, _commands: &[String]) -> Result<Vec<String>> {
        not_supported("config_list")
    }

    fn show(&mut self, _command: &str, _raw_text: bool) -> Result<String> {
        not_supported("show")
    }

    fn show_list(&mut self, _commands: &[String], _raw_text: bool) -> Result<Vec<String>> {
        not_supported("show_list")
    }

    fn save(&mut self, _filename: Option<&str>) -> Result<()> {
        not_supported("save")
    }

    /// Copy a local file onto the device
    fn file_copy(&mut self, src: &Path, dest: Option<&str>) -> Result<()>;

    /// True if `src` is already on the device with identical content
    fn file_copy_remote_exists(&mut self, src: &Path, dest: Option<&str>) -> Result<bool>;

    /// Reboot into `volume` and wait for the device to come back
    fn reboot(&mut self, volume: &str) -> Result<()>;

    fn boot_options(&mut self) -> Result<BootOptions>;

    /// Install `image_name` onto `volume` so it can be booted
    fn set_boot_options(&mut self, image_name: &str, volume: &str) -> Result<()>;

    fn checkpoint(&mut self, _filename: &str) -> Result<()> {
        not_supported("checkpoint")
    }

    fn rollback(&mut self, _checkpoint_file: &str) -> Result<()> {
        not_supported("rollback")
    }

    fn backup_running_config(&mut self, _filename: &str) -> Result<()> {
        not_supported("backup_running_config")
    }

    fn facts(&mut self) -> Result<serde_json::Value> {
        not_supported("facts")
    }

    fn running_config(&mut self) -> Result<String> {
        not_supported("running_config")
    }

    fn startup_config(&mut self) -> Result<String> {
        not_supported("startup_config")
    }
}

/// Redundant-volume appliance driver
///
/// Owns its session, upload sink and clock exclusively; separate instances
/// share nothing and can drive separate appliances concurrently.
pub struct TmosDevice<S, K, C = SystemClock> {
    session: S,
    sink: K,
    clock: C,
    install_settings: InstallSettings,
    reboot_policy: PollPolicy,
    chunk_size: usize,
    progress: ProgressMode,
}

impl TmosDevice<RestSession, HttpChunkSink> {
    /// Build a REST-backed device from configuration without connecting
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials()?;
        let timeout = config.request_timeout();
        let session = RestSession::new(credentials.clone(), timeout)?;
        let sink = HttpChunkSink::new(credentials, timeout)?;

        Ok(Self::new(session, sink, SystemClock::new())
            .with_install_settings(config.install_settings())
            .with_reboot_policy(config.reboot_policy())
            .with_chunk_size(config.upgrade.chunk_size))
    }
}

impl<S: DeviceSession, K: ChunkSink, C: Clock> TmosDevice<S, K, C> {
    pub fn new(session: S, sink: K, clock: C) -> Self {
        Self {
            session,
            sink,
            clock,
            install_settings: InstallSettings::default(),
            reboot_policy: reboot::default_policy(),
            chunk_size: UPLOAD_CHUNK_SIZE,
            progress: ProgressMode::default(),
        }
    }

    pub fn with_install_settings(mut self, settings: InstallSettings) -> Self {
        self.install_settings = settings;
        self
    }

    pub fn with_reboot_policy(mut self, policy: PollPolicy) -> Self {
        self.reboot_policy = policy;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_progress(mut self, progress: ProgressMode) -> Self {
        self.progress = progress;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn volumes(&self) -> Result<Vec<Volume>> {
        inventory::list_volumes(&self.session)
    }

    pub fn images(&self) -> Result<Vec<Image>> {
        inventory::list_images(&self.session)
    }

    /// Free gigabytes in the appliance's volume group
    pub fn free_space(&self) -> Result<f64> {
        space::free_space(&self.session)
    }

    /// Upload a local image, returning its name in the image store
    pub fn upload(&mut self, src: &Path) -> Result<String> {
        let name = transfer::image_filename(src)?;
        let progress = self.progress.tracker(&name);
        transfer::upload_image(&mut self.sink, src, self.chunk_size, progress.as_ref())
    }

    /// Compare the local file with its copy in the image store
    ///
    /// A missing image or a differing digest is `Ok(false)`.
    pub fn remote_file_matches(&self, src: &Path) -> Result<bool> {
        let local = integrity::local_checksum(src)?;
        let name = transfer::image_filename(src)?;
        integrity::image_matches(&self.session, &name, &local)
    }

    /// Upload, verify, install and boot an image
    ///
    /// Each step aborts the workflow on failure; nothing is retried.
    pub fn upgrade(&mut self, image_path: &Path, volume: &str) -> Result<()> {
        info!("Upgrading to {} on volume {}", image_path.display(), volume);

        let image_name = self.upload(image_path)?;

        let expected = integrity::local_checksum(image_path)?;
        let actual = integrity::remote_checksum(
            &self.session,
            &integrity::image_store_path(&image_name),
        )?
        .unwrap_or_default();
        if !integrity::checksums_match(&expected, &actual) {
            return Err(Error::IntegrityMismatch { expected, actual });
        }
        info!("Checksum of {} verified", image_name);

        install::install(
            &self.session,
            &self.clock,
            &image_name,
            volume,
            &self.install_settings,
        )?;
        reboot::reboot(&mut self.session, &self.clock, volume, &self.reboot_policy)?;

        info!("Upgrade to {} on {} complete", image_name, volume);
        Ok(())
    }
}

fn images_only(dest: Option<&str>) -> Result<()> {
    match dest {
        Some(_) => Err(Error::NotSupported(
            "only images are supported, destination is always /shared/images".to_string(),
        )),
        None => Ok(()),
    }
}

impl<S: DeviceSession, K: ChunkSink, C: Clock> NetworkDevice for TmosDevice<S, K, C> {
    fn open(&mut self) -> Result<()> {
        self.session.reconnect()
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn file_copy(&mut self, src: &Path, dest: Option<&str>) -> Result<()> {
        images_only(dest)?;
        self.upload(src).map(|_| ())
    }

    fn file_copy_remote_exists(&mut self, src: &Path, dest: Option<&str>) -> Result<bool> {
        images_only(dest)?;
        self.remote_file_matches(src)
    }

    fn reboot(&mut self, volume: &str) -> Result<()> {
        reboot::reboot(&mut self.session, &self.clock, volume, &self.reboot_policy)
    }

    fn boot_options(&mut self) -> Result<BootOptions> {
        Ok(BootOptions {
            active_volume: inventory::active_volume(&self.session)?.map(|v| v.name),
        })
    }

    fn set_boot_options(&mut self, image_name: &str, volume: &str) -> Result<()> {
        if volume.is_empty() {
            return Err(Error::ConfigError(
                "a target volume is required to install an image".to_string(),
            ));
        }
        install::install(
            &self.session,
            &self.clock,
            image_name,
            volume,
            &self.install_settings,
        )
    }
}
