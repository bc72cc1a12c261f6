//! Install orchestration: stage, tear down, register, configure, start.

use tracing::{error, info, warn};

use super::report::{DefinitionReport, Issue, RunAction, RunReport, Step};
use super::settle;
use super::uninstall::{Strictness, UninstallOrchestrator};
use crate::config::{DeployConfig, Timings};
use crate::error::DeployError;
use crate::fs::{DirectoryStager, TreeOps};
use crate::service::{CommandOutcome, RegistryStatus, ServiceControl, ServiceWrapper};
use crate::types::ServiceDefinition;

pub struct InstallOrchestrator<'a> {
    tree: &'a dyn TreeOps,
    control: &'a dyn ServiceControl,
    wrapper: &'a dyn ServiceWrapper,
    timings: Timings,
}

impl<'a> InstallOrchestrator<'a> {
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

    /// Install every definition in order. A failing definition is skipped;
    /// the batch always runs to the end.
    pub fn install_all(&self, config: &DeployConfig) -> RunReport {
        info!(base_dir = %config.base_dir().display(), "=== Installing services ===");
        let mut run = RunReport::start(RunAction::Install);
        for def in config.services() {
            run.definitions.push(self.install_definition(def));
        }
        run.finish()
    }

    /// Bring one definition to `Running` from whatever state it is in.
    ///
    /// No rollback: a failure partway leaves the partial state behind, and
    /// re-running install converges from there.
    pub fn install_definition(&self, def: &ServiceDefinition) -> DefinitionReport {
        info!(service = %def.name(), "--- Installing service ---");
        let mut report = DefinitionReport::new(def.name());

        if !self.tree.is_dir(def.source()) {
            let err = DeployError::MissingSource {
                path: def.source().to_path_buf(),
            };
            error!(service = %def.name(), "{}. Skipping installation.", err);
            report.record(Step::CheckSource, false, None);
            report.skip(err);
            return report;
        }
        report.record(Step::CheckSource, true, None);

        let stager = DirectoryStager::new(self.tree, self.timings.copy_retry_backoff);
        match stager.stage(def.source(), def.destination()) {
            Ok(staged) => {
                report.record(
                    Step::Stage,
                    true,
                    Some(format!("{} attempt(s)", staged.attempts)),
                );
            }
            Err(err) => {
                error!(service = %def.name(), "Failed to copy files: {}. Skipping.", err);
                report.record(Step::Stage, false, None);
                report.skip(err);
                return report;
            }
        }

        if !self.tree.exists(def.executable()) {
            let err = DeployError::MissingExecutable {
                path: def.executable().to_path_buf(),
            };
            warn!(service = %def.name(), "{}", err);
            report.push(Issue::warning(err));
        }

        let query = self.control.query(def.name());
        report.record(Step::Query, true, Some(format!("{:?}", query)));
        if RegistryStatus::from(&query).treat_as_present() {
            info!(service = %def.name(), "Service already exists, removing it first for a clean installation");
            let removal =
                UninstallOrchestrator::new(self.tree, self.control, self.wrapper, self.timings);
            removal.teardown_registration(def, &query, &mut report, Strictness::Lenient);
            settle(self.timings.settle_delay);
        }

        self.wrapper_step(
            &mut report,
            Step::Register,
            self.wrapper.register(def.name(), def.executable()),
        );
        self.wrapper_step(
            &mut report,
            Step::SetAppDirectory,
            self.wrapper.set_app_directory(def.name(), def.destination()),
        );
        self.wrapper_step(
            &mut report,
            Step::SetAutoStart,
            self.wrapper.set_auto_start(def.name()),
        );

        info!(service = %def.name(), "Starting service");
        let outcome = self.control.start(def.name());
        outcome.log_output();
        if !report.record_command(Step::Start, &outcome) {
            error!(service = %def.name(), command = %outcome.command, "Command failed: {}", outcome.diagnostic());
            report.push(Issue::error(DeployError::ServiceCommandFailure {
                command: outcome.command.clone(),
                message: outcome.diagnostic(),
            }));
        }

        if report.succeeded() {
            info!(service = %def.name(), "Service installed and started");
        }
        report
    }

    fn wrapper_step(&self, report: &mut DefinitionReport, step: Step, outcome: CommandOutcome) {
        outcome.log_output();
        if !report.record_command(step, &outcome) {
            error!(service = %report.name, command = %outcome.command, "Command failed: {}", outcome.diagnostic());
            report.push(Issue::error(DeployError::WrapperCommandFailure {
                command: outcome.command.clone(),
                message: outcome.diagnostic(),
            }));
        }
    }
}
