//! Adapters for the OS service-control subsystem and the service wrapper tool.
//!
//! Both are traits so orchestrators can be exercised against fakes; the real
//! implementations shell out through a [`CommandRunner`].

pub mod nssm;
pub mod runner;
pub mod sc;

use std::path::Path;

use serde::Serialize;

pub use nssm::{NssmWrapper, ProvisionedWrapper, provision_wrapper, removal_wrapper};
pub use runner::{CommandOutcome, CommandRunner, ProcessRunner};
pub use sc::ScServiceControl;

/// Live state of a named service as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ServiceQuery {
    /// The OS explicitly reported that no such service is registered.
    NotFound,
    Stopped,
    Running,
    /// Starting, stopping, pausing or continuing.
    Pending,
    /// The query itself failed or its output could not be read.
    Unknown(String),
}

impl ServiceQuery {
    /// Whether a stop is needed before the registration can be removed.
    pub fn may_be_running(&self) -> bool {
        matches!(
            self,
            ServiceQuery::Running | ServiceQuery::Pending | ServiceQuery::Unknown(_)
        )
    }
}

/// Answer to "is this name registered?".
///
/// `Unknown` is surfaced rather than guessed. Orchestrators treat it as
/// `Present`: tearing down a registration that is not there costs a failed
/// command, registering over one that is there fails the whole install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RegistryStatus {
    Present,
    Absent,
    Unknown(String),
}

impl RegistryStatus {
    /// Conservative reading: only an explicit "not found" counts as absent.
    pub fn treat_as_present(&self) -> bool {
        !matches!(self, RegistryStatus::Absent)
    }
}

impl From<&ServiceQuery> for RegistryStatus {
    fn from(query: &ServiceQuery) -> Self {
        match query {
            ServiceQuery::NotFound => RegistryStatus::Absent,
            ServiceQuery::Unknown(detail) => RegistryStatus::Unknown(detail.clone()),
            ServiceQuery::Stopped | ServiceQuery::Running | ServiceQuery::Pending => {
                RegistryStatus::Present
            }
        }
    }
}

/// The OS-native authority for querying, starting and stopping services.
pub trait ServiceControl {
    fn query(&self, name: &str) -> ServiceQuery;

    fn start(&self, name: &str) -> CommandOutcome;

    fn stop(&self, name: &str) -> CommandOutcome;

    fn exists(&self, name: &str) -> RegistryStatus {
        RegistryStatus::from(&self.query(name))
    }
}

/// External tool that registers an executable as an OS-managed service.
pub trait ServiceWrapper {
    fn register(&self, name: &str, executable: &Path) -> CommandOutcome;

    fn set_app_directory(&self, name: &str, directory: &Path) -> CommandOutcome;

    fn set_auto_start(&self, name: &str) -> CommandOutcome;

    /// Remove the registration without an interactive confirmation prompt.
    fn unregister(&self, name: &str) -> CommandOutcome;
}
