//! Deploy context wiring the real adapters to a loaded configuration.

use std::path::{Path, PathBuf};

use crate::config::{DeployConfig, load_config};
use crate::fs::LocalTree;
use crate::service::{CommandRunner, NssmWrapper, ProcessRunner, ScServiceControl};

/// Dependency injection container for commands.
///
/// Holds the immutable configuration and the runner every external tool is
/// invoked through. Frontends build one and hand it to a command.
pub struct DeployContext<R = ProcessRunner> {
    config: DeployConfig,
    runner: R,
}

impl DeployContext<ProcessRunner> {
    /// Load services.toml and use real child processes.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(load_config(config_path)?, ProcessRunner))
    }
}

impl<R: CommandRunner> DeployContext<R> {
    pub fn new(config: DeployConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn tree(&self) -> LocalTree {
        LocalTree
    }

    pub fn control(&self) -> ScServiceControl<&R> {
        ScServiceControl::new(&self.runner)
    }

    pub fn wrapper(&self, program: PathBuf) -> NssmWrapper<&R> {
        NssmWrapper::new(program, &self.runner)
    }
}
