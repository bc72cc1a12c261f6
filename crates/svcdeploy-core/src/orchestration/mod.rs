//! Install/remove orchestration over the static set of service definitions.

pub mod install;
pub mod report;
pub mod uninstall;

use std::time::Duration;

use tracing::debug;

pub use install::InstallOrchestrator;
pub use report::{DefinitionReport, Issue, RunAction, RunReport, Step, StepRecord};
pub use uninstall::{FilePolicy, UninstallOrchestrator};

/// Give the OS time to release handles and registrations.
pub(crate) fn settle(delay: Duration) {
    if delay.is_zero() {
        return;
    }
    debug!(delay_ms = delay.as_millis() as u64, "Waiting for the OS to settle");
    std::thread::sleep(delay);
}
