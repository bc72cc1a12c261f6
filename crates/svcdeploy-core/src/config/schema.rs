//! Configuration schema for services.toml
//!
//! These are the raw, as-written shapes. Paths are still relative here; the
//! parser resolves them against the bundle directory and `base_dir`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for services.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesFile {
    /// Shared base directory every payload and the wrapper tool live under
    pub base_dir: PathBuf,

    /// Service wrapper tool settings
    #[serde(default)]
    pub wrapper: WrapperEntry,

    /// Backoff and settle delays
    #[serde(default)]
    pub timings: TimingsEntry,

    /// Service definitions, in processing order
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceEntry>,
}

/// `[wrapper]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WrapperEntry {
    /// Bundled wrapper executable, relative to the config file's directory
    #[serde(default = "default_wrapper_source")]
    pub source: PathBuf,

    /// Subdirectory of `base_dir` the wrapper is provisioned into
    #[serde(default = "default_wrapper_subdir")]
    pub subdir: PathBuf,
}

impl Default for WrapperEntry {
    fn default() -> Self {
        Self {
            source: default_wrapper_source(),
            subdir: default_wrapper_subdir(),
        }
    }
}

/// `[timings]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingsEntry {
    #[serde(default = "default_copy_retry_backoff_ms")]
    pub copy_retry_backoff_ms: u64,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for TimingsEntry {
    fn default() -> Self {
        Self {
            copy_retry_backoff_ms: default_copy_retry_backoff_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// One `[[service]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceEntry {
    /// OS service name
    pub name: String,

    /// Payload directory, relative to the config file's directory
    pub source: PathBuf,

    /// Install directory, relative to `base_dir`
    pub destination: PathBuf,

    /// Supervised binary, relative to `destination`
    pub executable: PathBuf,
}

fn default_wrapper_source() -> PathBuf {
    PathBuf::from("nssm").join("nssm.exe")
}

fn default_wrapper_subdir() -> PathBuf {
    PathBuf::from("nssm")
}

fn default_copy_retry_backoff_ms() -> u64 {
    3000
}

fn default_settle_delay_ms() -> u64 {
    2000
}
