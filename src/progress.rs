// src/progress.rs

//! Upload progress reporting
//!
//! Image uploads take minutes, so the transporter reports bytes sent through
//! a [`ProgressTracker`]. Implementations:
//! - `SilentProgress`: counts bytes, prints nothing
//! - `LogProgress`: logs roughly every 10% through tracing
//! - `BarProgress`: terminal progress bar using indicatif

use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// How upload progress is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    Silent,
    #[default]
    Log,
    Bar,
}

impl ProgressMode {
    /// Create a tracker for a transfer named `name`
    pub fn tracker(self, name: &str) -> Box<dyn ProgressTracker> {
        match self {
            Self::Silent => Box::new(SilentProgress::new()),
            Self::Log => Box::new(LogProgress::new(name)),
            Self::Bar => Box::new(BarProgress::new(name)),
        }
    }
}

impl fmt::Display for ProgressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Silent => "silent",
            Self::Log => "log",
            Self::Bar => "bar",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "none" => Ok(Self::Silent),
            "log" => Ok(Self::Log),
            "bar" => Ok(Self::Bar),
            _ => Err(format!("unknown progress mode: {s} (expected silent, log or bar)")),
        }
    }
}

/// Receiver of byte-level transfer progress
pub trait ProgressTracker {
    /// Set the total number of bytes to transfer
    fn set_length(&self, length: u64);

    /// Record `amount` more bytes sent
    fn increment(&self, amount: u64);

    /// Bytes recorded so far
    fn position(&self) -> u64;

    fn finish_with_message(&self, message: &str);

    fn finish_with_error(&self, message: &str);
}

/// No-op tracker for quiet and scripted runs
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_length(&self, _length: u64) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {}

    fn finish_with_error(&self, _message: &str) {}
}

/// Logging progress tracker
///
/// Logs at info level each time another tenth of the transfer completes.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
}

impl LogProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
        }
    }
}

impl ProgressTracker for LogProgress {
    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        let new_pos = old_pos + amount;
        let length = self.length.load(Ordering::Relaxed);

        if length > 0 {
            let step = std::cmp::max(1, length / 10);
            if new_pos / step > old_pos / step {
                let percent = (new_pos * 100) / length;
                info!("{}: {}% ({}/{} bytes)", self.name, percent, new_pos, length);
            }
        }
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        warn!("{}: ERROR - {}", self.name, message);
    }
}

/// Terminal progress bar
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(name: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        bar.set_message(name.to_string());
        Self { bar }
    }
}

impl ProgressTracker for BarProgress {
    fn set_length(&self, length: u64) {
        self.bar.set_length(length);
    }

    fn increment(&self, amount: u64) {
        self.bar.inc(amount);
    }

    fn position(&self) -> u64 {
        self.bar.position()
    }

    fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    fn finish_with_error(&self, message: &str) {
        self.bar.abandon_with_message(format!("FAILED: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_mode_parse() {
        assert_eq!("bar".parse::<ProgressMode>().unwrap(), ProgressMode::Bar);
        assert_eq!("SILENT".parse::<ProgressMode>().unwrap(), ProgressMode::Silent);
        assert_eq!(ProgressMode::default().to_string(), "log");
        assert!("fancy".parse::<ProgressMode>().is_err());
    }

    #[test]
    fn test_silent_progress_counts() {
        let progress = SilentProgress::new();
        progress.set_length(100);
        progress.increment(40);
        progress.increment(60);
        assert_eq!(progress.position(), 100);
    }

    #[test]
    fn test_log_progress_unknown_length() {
        let progress = LogProgress::new("upload");
        progress.increment(10);
        assert_eq!(progress.position(), 10);
    }

    #[test]
    fn test_bar_progress_position() {
        let progress = BarProgress::new("BIGIP.iso");
        progress.set_length(1024);
        progress.increment(512);
        assert_eq!(progress.position(), 512);
        progress.finish_with_message("done");
    }
}
