// src/integrity.rs

//! Image integrity verification
//!
//! The appliance only offers `md5sum`, so both sides are compared with MD5.
//! Digests are compared verbatim: checksum tools print lowercase hex and a
//! case difference is treated as a mismatch.

use crate::error::{Error, Result};
use crate::inventory;
use crate::session::{DeviceSession, IMAGE_STORE, shell_quote};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Block size for streaming local files (1 MiB)
pub const HASH_BLOCK_SIZE: usize = 1 << 20;

/// Compute the MD5 digest of data from a reader
pub fn md5_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; HASH_BLOCK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compute the MD5 digest of a local file
pub fn local_checksum(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let mut file = File::open(path).map_err(|e| {
        Error::IoError(format!("Failed to open {}: {e}", path.display()))
    })?;
    let digest = md5_reader(&mut file)?;
    debug!("Local md5 of {}: {}", path.display(), digest);
    Ok(digest)
}

/// Compute the MD5 digest of a file on the appliance
///
/// Output of `md5sum` looks like `c813ac405cab73591492db326ad8893a  /tmp/x`;
/// the first token is the digest. Returns `None` when the command printed
/// nothing. The path is passed as one quoted word.
pub fn remote_checksum<S: DeviceSession>(session: &S, path: &str) -> Result<Option<String>> {
    let output = session.run_bash(&format!("md5sum {}", shell_quote(path)))?;
    let digest = output.and_then(|line| line.split_whitespace().next().map(str::to_string));
    debug!("Remote md5 of {}: {:?}", path, digest);
    Ok(digest)
}

/// Exact comparison of two digests
#[inline]
pub fn checksums_match(local: &str, remote: &str) -> bool {
    local == remote
}

/// Path of an image inside the appliance's image store
pub fn image_store_path(image_name: &str) -> String {
    format!("{IMAGE_STORE}/{image_name}")
}

/// Check that `image_name` is in the image store and has the given digest
pub fn image_matches<S: DeviceSession>(
    session: &S,
    image_name: &str,
    checksum: &str,
) -> Result<bool> {
    if !inventory::image_exists(session, image_name)? {
        debug!("Image {} not present in {}", image_name, IMAGE_STORE);
        return Ok(false);
    }

    let remote = remote_checksum(session, &image_store_path(image_name))?;
    Ok(remote.is_some_and(|remote| checksums_match(checksum, &remote)))
}
