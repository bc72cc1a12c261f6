//! Removal orchestration: stop, unregister, delete files, delete base dir.

use tracing::{error, info, warn};

use super::report::{DefinitionReport, Issue, RunAction, RunReport, Step};
use super::settle;
use crate::config::{DeployConfig, Timings};
use crate::error::DeployError;
use crate::fs::TreeOps;
use crate::service::{RegistryStatus, ServiceControl, ServiceQuery, ServiceWrapper};
use crate::types::ServiceDefinition;

/// What to do with a definition's destination directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePolicy {
    Delete,
    /// Keep freshly staged files; used by install before re-registering.
    Retain,
}

#[derive(Clone, Copy)]
pub struct UninstallOrchestrator<'a> {
    tree: &'a dyn TreeOps,
    control: &'a dyn ServiceControl,
    wrapper: &'a dyn ServiceWrapper,
    timings: Timings,
}

impl<'a> UninstallOrchestrator<'a> {
    pub fn new(
        tree: &'a dyn TreeOps,
        control: &'a dyn ServiceControl,
        wrapper: &'a dyn ServiceWrapper,
        timings: Timings,
    ) -> Self {
        Self {
            tree,
            control,
            wrapper,
            timings,
        }
    }

    /// Remove every definition, then the shared base directory.
    ///
    /// Never aborts: a base directory that cannot be deleted is recorded as a
    /// run-level error telling the operator to remove it by hand.
    pub fn remove_all(&self, config: &DeployConfig) -> RunReport {
        info!(base_dir = %config.base_dir().display(), "=== Removing all services ===");
        let mut run = RunReport::start(RunAction::Remove);

        for def in config.services() {
            run.definitions
                .push(self.remove_definition(def, FilePolicy::Delete));
        }

        settle(self.timings.settle_delay);

        let base_dir = config.base_dir();
        if self.tree.exists(base_dir) {
            match self.tree.remove_tree(base_dir) {
                Ok(()) => info!(path = %base_dir.display(), "Removed base directory"),
                Err(err) => {
                    let issue = DeployError::BaseDirFailure {
                        path: base_dir.to_path_buf(),
                        message: format!("{:#}", err),
                    };
                    error!("{}", issue);
                    run.push(Issue::error(issue));
                }
            }
        }

        run.finish()
    }

    /// Stop and unregister one service if registered, then handle its files.
    pub fn remove_definition(&self, def: &ServiceDefinition, files: FilePolicy) -> DefinitionReport {
        info!(service = %def.name(), "Removing service");
        let mut report = DefinitionReport::new(def.name());

        let query = self.control.query(def.name());
        report.record(Step::Query, true, Some(format!("{:?}", query)));
        self.teardown_registration(def, &query, &mut report, Strictness::Strict);

        match files {
            FilePolicy::Retain => {
                info!(service = %def.name(), path = %def.destination().display(), "Keeping files as requested");
            }
            FilePolicy::Delete => self.delete_files(def, &mut report),
        }

        report
    }

    /// Stop (when it may be running) and unregister a service the registry
    /// query did not rule out.
    pub(crate) fn teardown_registration(
        &self,
        def: &ServiceDefinition,
        query: &ServiceQuery,
        report: &mut DefinitionReport,
        strictness: Strictness,
    ) {
        let status = RegistryStatus::from(query);
        if let RegistryStatus::Unknown(detail) = &status {
            warn!(service = %def.name(), detail = %detail, "Service check failed, assuming it exists");
            report.push(Issue::warning(DeployError::RegistryQueryFailure {
                service: def.name().to_string(),
                message: detail.clone(),
            }));
        }
        if !status.treat_as_present() {
            return;
        }

        // Failures are only errors when the registry confirmed the service.
        let confirmed = strictness == Strictness::Strict && status == RegistryStatus::Present;
        let severity = |err| {
            if confirmed {
                Issue::error(err)
            } else {
                Issue::warning(err)
            }
        };

        if query.may_be_running() {
            info!(service = %def.name(), "Stopping service");
            let outcome = self.control.stop(def.name());
            outcome.log_output();
            if !report.record_command(Step::Stop, &outcome) {
                warn!(service = %def.name(), command = %outcome.command, "Stop failed");
                report.push(severity(DeployError::ServiceCommandFailure {
                    command: outcome.command.clone(),
                    message: outcome.diagnostic(),
                }));
            }
        }

        info!(service = %def.name(), "Unregistering service");
        let outcome = self.wrapper.unregister(def.name());
        outcome.log_output();
        if !report.record_command(Step::Unregister, &outcome) {
            warn!(service = %def.name(), command = %outcome.command, "Unregister failed");
            report.push(severity(DeployError::WrapperCommandFailure {
                command: outcome.command.clone(),
                message: outcome.diagnostic(),
            }));
        }
    }

    fn delete_files(&self, def: &ServiceDefinition, report: &mut DefinitionReport) {
        let path = def.destination();
        if !self.tree.exists(path) {
            return;
        }
        match self.tree.remove_tree(path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed folder");
                report.record(Step::DeleteFiles, true, None);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{:#}", err), "Could not delete folder (maybe in use?)");
                report.record(Step::DeleteFiles, false, None);
                report.push(Issue::warning(DeployError::DeleteFailure {
                    path: path.to_path_buf(),
                    message: format!("{:#}", err),
                }));
            }
        }
    }
}

/// Whether teardown failures on a confirmed registration count as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strictness {
    Strict,
    /// Install re-registers right after; its own steps report the damage.
    Lenient,
}
