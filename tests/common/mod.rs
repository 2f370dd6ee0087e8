// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! [`Appliance`] simulates a redundant-volume device: uploaded chunks land
//! in its image store, `md5sum` and `vgdisplay` answer from that state,
//! installs finish after a scripted number of status polls and reboots keep
//! the management API down for a scripted number of reconnects.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;

use tempfile::TempDir;
use tmos_upgrade::integrity::md5_reader;
use tmos_upgrade::space::FREE_SPACE_COMMAND;
use tmos_upgrade::{
    Chunk, ChunkSink, DeviceSession, Error, Image, InstallOptions, ManualClock, ProgressMode,
    RebootTarget, Result, TmosDevice, Volume,
};

pub const IMAGE_NAME: &str = "BIGIP-15.1.0-0.0.31.iso";

pub struct PendingInstall {
    pub image: String,
    pub volume: String,
    pub polls_left: usize,
}

#[derive(Default)]
pub struct Appliance {
    /// Image store contents by file name
    pub files: BTreeMap<String, Vec<u8>>,
    /// Version and build the appliance reports for known image names
    pub catalog: BTreeMap<String, (String, String)>,
    pub volumes: Vec<Volume>,
    pub free_gb: f64,

    /// Flip a byte of every received file
    pub corrupt_uploads: bool,
    pub content_ranges: Vec<String>,

    /// Status polls answered with "installing" before an install completes
    pub install_polls: usize,
    pub pending_install: Option<PendingInstall>,
    pub installs: Vec<(String, String, InstallOptions)>,

    /// Reconnects refused after a reboot command
    pub reboot_downtime: usize,
    pub down_for: usize,
    pub pending_boot: Option<String>,
    pub reboots: Vec<RebootTarget>,
    pub reconnects: usize,
}

pub type Shared = Rc<RefCell<Appliance>>;

impl Appliance {
    /// HD1.1 active on 13.1.0, 7.10 GB free, image known to the catalog
    pub fn standard() -> Shared {
        let mut appliance = Appliance {
            free_gb: 7.10,
            ..Default::default()
        };
        appliance.volumes.push(volume("HD1.1", "13.1.0", "0.0.6", "complete", true));
        appliance
            .catalog
            .insert(IMAGE_NAME.to_string(), ("15.1.0".to_string(), "0.0.31".to_string()));
        Rc::new(RefCell::new(appliance))
    }

    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.name == name)
    }

    fn advance_install(&mut self) {
        let Some(pending) = self.pending_install.as_mut() else {
            return;
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return;
        }

        let (version, build) = self
            .catalog
            .get(&pending.image)
            .cloned()
            .unwrap_or_default();
        let target = pending.volume.clone();
        if let Some(vol) = self.volumes.iter_mut().find(|v| v.name == target) {
            vol.version = version;
            vol.basebuild = build;
            vol.status = "complete".to_string();
        }
        self.pending_install = None;
    }
}

pub fn volume(name: &str, version: &str, build: &str, status: &str, active: bool) -> Volume {
    Volume {
        name: name.to_string(),
        version: version.to_string(),
        basebuild: build.to_string(),
        status: status.to_string(),
        active,
    }
}

/// Undo single-word shell quoting
fn unquote(word: &str) -> Option<String> {
    let inner = word.strip_prefix('\'')?.strip_suffix('\'')?;
    Some(inner.replace(r"'\''", "'"))
}

/// Management session against a simulated appliance
pub struct SimSession {
    pub appliance: Shared,
}

impl DeviceSession for SimSession {
    fn run_bash(&self, command: &str) -> Result<Option<String>> {
        let appliance = self.appliance.borrow();
        if command == FREE_SPACE_COMMAND {
            return Ok(Some(format!(
                "  \"vg-db-sda\" 30.98 GB  [23.88 GB  used / {:.2} GB free]",
                appliance.free_gb
            )));
        }
        if let Some(word) = command.strip_prefix("md5sum ") {
            let path = unquote(word)
                .ok_or_else(|| Error::CommandFailed(format!("unquoted path: {word}")))?;
            let Some(name) = path.strip_prefix("/shared/images/") else {
                return Ok(None);
            };
            return match appliance.files.get(name) {
                Some(data) => {
                    let digest = md5_reader(&mut data.as_slice())?;
                    Ok(Some(format!("{digest}  {path}\n")))
                }
                None => Ok(None),
            };
        }
        Err(Error::CommandFailed(format!("unexpected command: {command}")))
    }

    fn list_directory(&self, _path: &str) -> Result<Option<String>> {
        let appliance = self.appliance.borrow();
        if appliance.files.is_empty() {
            return Ok(None);
        }
        let names: Vec<&str> = appliance.files.keys().map(String::as_str).collect();
        Ok(Some(names.join("\n")))
    }

    fn list_volumes(&self) -> Result<Vec<Volume>> {
        let mut appliance = self.appliance.borrow_mut();
        appliance.advance_install();
        Ok(appliance.volumes.clone())
    }

    fn volume_exists(&self, name: &str) -> Result<bool> {
        Ok(self.appliance.borrow().volume(name).is_some())
    }

    fn list_images(&self) -> Result<Vec<Image>> {
        let appliance = self.appliance.borrow();
        Ok(appliance
            .files
            .keys()
            .filter_map(|name| {
                appliance.catalog.get(name).map(|(version, build)| Image {
                    name: name.clone(),
                    version: version.clone(),
                    build: build.clone(),
                })
            })
            .collect())
    }

    fn issue_install(&self, image: &str, volume_name: &str, options: InstallOptions) -> Result<()> {
        let mut appliance = self.appliance.borrow_mut();
        appliance
            .installs
            .push((image.to_string(), volume_name.to_string(), options));

        if options.create_volume {
            appliance
                .volumes
                .push(volume(volume_name, "", "", "installing 0.000 pct", false));
        } else if let Some(vol) = appliance.volumes.iter_mut().find(|v| v.name == volume_name) {
            vol.status = "installing 0.000 pct".to_string();
        }

        let polls_left = appliance.install_polls;
        appliance.pending_install = Some(PendingInstall {
            image: image.to_string(),
            volume: volume_name.to_string(),
            polls_left,
        });
        Ok(())
    }

    fn issue_reboot(&self, target: &RebootTarget) -> Result<()> {
        let mut appliance = self.appliance.borrow_mut();
        appliance.reboots.push(target.clone());
        appliance.down_for = appliance.reboot_downtime;
        if let RebootTarget::Volume(name) = target {
            appliance.pending_boot = Some(name.clone());
        }
        Ok(())
    }

    fn load_volume(&self, name: &str) -> Result<Volume> {
        self.appliance
            .borrow()
            .volume(name)
            .cloned()
            .ok_or_else(|| Error::CommandFailed(format!("volume {name} not found")))
    }

    fn reconnect(&mut self) -> Result<()> {
        let mut appliance = self.appliance.borrow_mut();
        appliance.reconnects += 1;
        if appliance.down_for > 0 {
            appliance.down_for -= 1;
            return Err(Error::HttpError("connection refused".to_string()));
        }
        if let Some(target) = appliance.pending_boot.take() {
            for vol in appliance.volumes.iter_mut() {
                vol.active = vol.name == target;
            }
        }
        Ok(())
    }
}

/// Upload endpoint of a simulated appliance
pub struct SimSink {
    pub appliance: Shared,
}

impl ChunkSink for SimSink {
    fn send_chunk(&mut self, filename: &str, chunk: &Chunk<'_>) -> Result<()> {
        let mut appliance = self.appliance.borrow_mut();
        appliance.content_ranges.push(chunk.content_range());

        let corrupt = appliance.corrupt_uploads;
        let file = appliance.files.entry(filename.to_string()).or_default();
        if chunk.start == 0 {
            file.clear();
        }
        assert_eq!(file.len() as u64, chunk.start, "chunks must arrive in order");
        file.extend_from_slice(chunk.data);
        if corrupt && chunk.end + 1 == chunk.total {
            file[0] ^= 0xff;
        }
        Ok(())
    }
}

pub type SimDevice = TmosDevice<SimSession, SimSink, ManualClock>;

/// Device bound to `appliance` with a manual clock and silent progress
pub fn sim_device(appliance: &Shared) -> SimDevice {
    TmosDevice::new(
        SimSession {
            appliance: Rc::clone(appliance),
        },
        SimSink {
            appliance: Rc::clone(appliance),
        },
        ManualClock::new(),
    )
    .with_progress(ProgressMode::Silent)
}

/// Write a local image of `len` patterned bytes.
///
/// Returns (TempDir, path) - keep the TempDir alive to prevent cleanup.
pub fn local_image(len: usize) -> (TempDir, PathBuf) {
    local_image_named(IMAGE_NAME, len)
}

pub fn local_image_named(name: &str, len: usize) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..len).map(|i| (i % 241) as u8).collect();
    std::fs::write(&path, data).unwrap();
    (dir, path)
}
