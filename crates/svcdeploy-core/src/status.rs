//! Read-only inference of where each definition currently stands.
//!
//! Nothing is recorded between runs; the registry and the filesystem are the
//! only source of truth, so this just asks them.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::config::DeployConfig;
use crate::fs::trees_match;
use crate::service::{ServiceControl, ServiceQuery};
use crate::types::{DeploymentState, ServiceDefinition};

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    /// `None` when the registry could not be queried.
    pub state: Option<DeploymentState>,
    pub query: ServiceQuery,
    pub destination: PathBuf,
    pub files_present: bool,
    /// Whether staged files match the bundled source; `None` if either side
    /// is missing or unreadable.
    pub files_current: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub base_dir: PathBuf,
    pub wrapper_present: bool,
    pub services: Vec<ServiceStatus>,
}

impl SystemStatus {
    /// True when every definition is running on up-to-date files.
    pub fn all_running(&self) -> bool {
        self.services.iter().all(|s| {
            s.state == Some(DeploymentState::Running) && s.files_current != Some(false)
        })
    }
}

pub struct StatusProbe<'a> {
    control: &'a dyn ServiceControl,
}

impl<'a> StatusProbe<'a> {
    pub fn new(control: &'a dyn ServiceControl) -> Self {
        Self { control }
    }

    pub fn probe(&self, config: &DeployConfig) -> SystemStatus {
        SystemStatus {
            base_dir: config.base_dir().to_path_buf(),
            wrapper_present: config.wrapper_path().is_file(),
            services: config
                .services()
                .iter()
                .map(|def| self.probe_definition(def))
                .collect(),
        }
    }

    pub fn probe_definition(&self, def: &ServiceDefinition) -> ServiceStatus {
        let query = self.control.query(def.name());
        let files_present = def.destination().is_dir();
        let files_current = if files_present && def.source().is_dir() {
            match trees_match(def.source(), def.destination()) {
                Ok(matches) => Some(matches),
                Err(err) => {
                    debug!(service = %def.name(), error = %format!("{:#}", err), "Could not compare staged files");
                    None
                }
            }
        } else {
            None
        };

        ServiceStatus {
            name: def.name().to_string(),
            state: DeploymentState::infer(&query, files_present),
            query,
            destination: def.destination().to_path_buf(),
            files_present,
            files_current,
        }
    }
}
