//! Deployment configuration
//!
//! The set of service definitions is fixed for the lifetime of the process:
//! loaded once from services.toml, validated, then handed to the
//! orchestrators by reference.

pub mod parser;
pub mod paths;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::ServiceDefinition;

pub use parser::{load_config, parse_config_str};
pub use paths::default_config_path;
pub use schema::{ServiceEntry, ServicesFile, TimingsEntry, WrapperEntry};

/// Fixed waits used in place of polling the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait before the single copy retry after a locked-file failure.
    pub copy_retry_backoff: Duration,
    /// Wait after stop/unregister so the OS releases handles and registrations.
    pub settle_delay: Duration,
}

impl Timings {
    /// No waiting at all; for tests and dry environments.
    pub fn immediate() -> Self {
        Self {
            copy_retry_backoff: Duration::ZERO,
            settle_delay: Duration::ZERO,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            copy_retry_backoff: Duration::from_secs(3),
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Where the bundled wrapper tool comes from and where it is provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperConfig {
    /// Bundled wrapper executable shipped next to the config file.
    pub source: PathBuf,
    /// Subdirectory of the base directory holding the provisioned copy.
    pub subdir: PathBuf,
}

impl WrapperConfig {
    /// File name of the wrapper executable (`nssm.exe` by default).
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.source
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("nssm.exe"))
    }
}

/// Validated, immutable deployment configuration.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    base_dir: PathBuf,
    wrapper: WrapperConfig,
    timings: Timings,
    services: Vec<ServiceDefinition>,
}

impl DeployConfig {
    /// Build a configuration, enforcing unique names and disjoint
    /// destinations under `base_dir`, apart from the wrapper directory.
    pub fn new(
        base_dir: PathBuf,
        wrapper: WrapperConfig,
        timings: Timings,
        services: Vec<ServiceDefinition>,
    ) -> anyhow::Result<Self> {
        parser::validate_services(&base_dir, &services)?;
        parser::validate_wrapper(&base_dir, &wrapper, &services)?;
        Ok(Self {
            base_dir,
            wrapper,
            timings,
            services,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn wrapper(&self) -> &WrapperConfig {
        &self.wrapper
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    pub fn services(&self) -> &[ServiceDefinition] {
        &self.services
    }

    /// Directory the wrapper tool is provisioned into.
    pub fn wrapper_dir(&self) -> PathBuf {
        crate::types::normalize(&self.base_dir.join(&self.wrapper.subdir))
    }

    /// Full path of the provisioned wrapper executable.
    pub fn wrapper_path(&self) -> PathBuf {
        self.wrapper_dir().join(self.wrapper.file_name())
    }
}
