//! NSSM ("Non-Sucking Service Manager") as the service wrapper tool.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::ServiceWrapper;
use super::runner::{CommandOutcome, CommandRunner};
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::fs::hash_file;

/// Drives a provisioned `nssm.exe`.
#[derive(Debug, Clone)]
pub struct NssmWrapper<R> {
    program: PathBuf,
    runner: R,
}

impl<R: CommandRunner> NssmWrapper<R> {
    pub fn new(program: PathBuf, runner: R) -> Self {
        Self { program, runner }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn nssm<I, S>(&self, args: I) -> CommandOutcome
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        self.runner.run(&self.program, &args)
    }
}

impl<R: CommandRunner> ServiceWrapper for NssmWrapper<R> {
    fn register(&self, name: &str, executable: &Path) -> CommandOutcome {
        self.nssm([
            OsString::from("install"),
            OsString::from(name),
            executable.as_os_str().to_os_string(),
        ])
    }

    fn set_app_directory(&self, name: &str, directory: &Path) -> CommandOutcome {
        self.nssm([
            OsString::from("set"),
            OsString::from(name),
            OsString::from("AppDirectory"),
            directory.as_os_str().to_os_string(),
        ])
    }

    fn set_auto_start(&self, name: &str) -> CommandOutcome {
        self.nssm(["set", name, "Start", "SERVICE_AUTO_START"])
    }

    fn unregister(&self, name: &str) -> CommandOutcome {
        self.nssm(["remove", name, "confirm"])
    }
}

/// The wrapper binary an install run will use.
#[derive(Debug, Clone)]
pub struct ProvisionedWrapper {
    pub path: PathBuf,
    /// Set when a previously provisioned copy had to be kept.
    pub warning: Option<DeployError>,
}

/// Copy the bundled wrapper into `base_dir/<subdir>/`.
///
/// Services registered through NSSM run `nssm.exe` itself, so the provisioned
/// copy is locked while any of them is up. An identical copy is left alone,
/// and a failed overwrite falls back to the existing copy with a warning.
pub fn provision_wrapper(config: &DeployConfig) -> Result<ProvisionedWrapper, DeployError> {
    provision_with(config, |from, to| fs::copy(from, to))
}

fn provision_with<F>(config: &DeployConfig, copy: F) -> Result<ProvisionedWrapper, DeployError>
where
    F: FnOnce(&Path, &Path) -> io::Result<u64>,
{
    let source = &config.wrapper().source;
    if !source.is_file() {
        return Err(DeployError::WrapperUnavailable {
            path: source.clone(),
            message: "bundled wrapper executable not found; installation cannot continue"
                .to_string(),
        });
    }

    let wrapper_dir = config.wrapper_dir();
    fs::create_dir_all(&wrapper_dir).map_err(|e| DeployError::WrapperUnavailable {
        path: wrapper_dir.clone(),
        message: format!("failed to create wrapper directory: {}", e),
    })?;

    let target = config.wrapper_path();
    if target.is_file() && same_content(source, &target) {
        info!(path = %target.display(), "Service wrapper already provisioned");
        return Ok(ProvisionedWrapper {
            path: target,
            warning: None,
        });
    }

    match copy(source, &target) {
        Ok(_) => {
            info!(source = %source.display(), path = %target.display(), "Provisioned service wrapper");
            Ok(ProvisionedWrapper {
                path: target,
                warning: None,
            })
        }
        Err(e) if target.is_file() => {
            warn!(path = %target.display(), error = %e, "Could not refresh service wrapper, using existing copy");
            Ok(ProvisionedWrapper {
                warning: Some(DeployError::WrapperUnavailable {
                    path: target.clone(),
                    message: format!("kept existing wrapper: {}", e),
                }),
                path: target,
            })
        }
        Err(e) => Err(DeployError::WrapperUnavailable {
            path: target,
            message: format!("failed to copy wrapper: {}", e),
        }),
    }
}

/// Wrapper to use for removal: the provisioned copy if present, else the bare
/// program name resolved through `PATH`.
pub fn removal_wrapper(config: &DeployConfig) -> ProvisionedWrapper {
    let provisioned = config.wrapper_path();
    if provisioned.is_file() {
        return ProvisionedWrapper {
            path: provisioned,
            warning: None,
        };
    }

    warn!(
        path = %provisioned.display(),
        "Service wrapper not found, will try to remove services but may fail"
    );
    ProvisionedWrapper {
        path: PathBuf::from(config.wrapper().file_name()),
        warning: Some(DeployError::WrapperUnavailable {
            path: provisioned,
            message: "provisioned wrapper missing; falling back to PATH".to_string(),
        }),
    }
}

fn same_content(a: &Path, b: &Path) -> bool {
    match (hash_file(a), hash_file(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
