// src/session/mod.rs

//! Device management session
//!
//! Everything the upgrade engine needs from the appliance goes through the
//! [`DeviceSession`] trait: remote shell commands, volume and image inventory,
//! and the fire-and-forget install and reboot commands.
//!
//! [`RestSession`] implements the trait over the iControl REST API. Tests
//! substitute scripted sessions.

mod rest;

pub use rest::{Credentials, RestSession};
pub(crate) use rest::build_client;

use crate::error::Result;
use serde::Serialize;

/// Directory holding uploaded images on the appliance
pub const IMAGE_STORE: &str = "/shared/images";

/// Status string a volume reports once an installation has finished
pub const STATUS_COMPLETE: &str = "complete";

/// Quote `arg` as a single bash word
///
/// Wraps in single quotes; an embedded `'` becomes `'\''`.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// A bootable software partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    pub name: String,
    pub version: String,
    pub basebuild: String,
    pub status: String,
    pub active: bool,
}

impl Volume {
    /// True when this volume carries `image` and finished installing it
    pub fn holds(&self, image: &Image) -> bool {
        self.version == image.version
            && self.basebuild == image.build
            && self.status == STATUS_COMPLETE
    }
}

/// A firmware image present in the image store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    /// Full path / file name, e.g. `BIGIP-15.1.0-0.0.31.iso`
    pub name: String,
    pub version: String,
    pub build: String,
}

/// Extra switches for the install command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Ask the appliance to create the target volume first
    pub create_volume: bool,
}

/// Which reboot command to issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebootTarget {
    /// Restart into the currently active volume
    InPlace,
    /// Switch the boot location to the named volume and restart
    Volume(String),
}

/// Authenticated channel to one appliance
///
/// A session is owned by exactly one device instance and is never shared
/// between threads. `reconnect` rebuilds the channel with the stored
/// credentials; it is the only operation that mutates the session.
pub trait DeviceSession {
    /// Run a shell command line on the appliance, returning its output.
    /// `None` means the command printed nothing.
    fn run_bash(&self, command: &str) -> Result<Option<String>>;

    /// List a remote directory, one entry per line
    fn list_directory(&self, path: &str) -> Result<Option<String>>;

    fn list_volumes(&self) -> Result<Vec<Volume>>;

    fn volume_exists(&self, name: &str) -> Result<bool>;

    fn list_images(&self) -> Result<Vec<Image>>;

    /// Request installation of an image. Returns as soon as the appliance
    /// accepts the command; the install itself runs asynchronously.
    fn issue_install(&self, image: &str, volume: &str, options: InstallOptions) -> Result<()>;

    /// Request a reboot. The appliance becomes unreachable shortly after.
    fn issue_reboot(&self, target: &RebootTarget) -> Result<()>;

    /// Load a single volume. Fails while the appliance is unreachable.
    fn load_volume(&self, name: &str) -> Result<Volume>;

    /// Re-establish the channel using the same credentials
    fn reconnect(&mut self) -> Result<()>;
}


#[cfg(test)]
mod tests {
    use super::fake::{image, volume};
    use super::shell_quote;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/shared/images/BIGIP.iso"), "'/shared/images/BIGIP.iso'");
        assert_eq!(shell_quote("my image.iso"), "'my image.iso'");
        assert_eq!(shell_quote("$(reboot)\".iso"), "'$(reboot)\".iso'");
        assert_eq!(shell_quote("it's.iso"), r"'it'\''s.iso'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_volume_holds_requires_every_field() {
        let img = image("BIGIP-15.1.0.iso", "15.1.0", "0.0.31");

        assert!(volume("HD1.2", "15.1.0", "0.0.31", "complete", false).holds(&img));
        assert!(!volume("HD1.2", "15.1.1", "0.0.31", "complete", false).holds(&img));
        assert!(!volume("HD1.2", "15.1.0", "0.0.30", "complete", false).holds(&img));
        assert!(!volume("HD1.2", "15.1.0", "0.0.31", "installing 40%", false).holds(&img));
    }
}
