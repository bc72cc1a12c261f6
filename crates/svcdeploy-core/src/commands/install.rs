//! Install command implementation.
//!
//! Provisions the wrapper tool, then installs and starts every definition.

use tracing::error;

use super::context::DeployContext;
use crate::orchestration::{InstallOrchestrator, Issue, RunAction, RunReport};
use crate::service::{CommandRunner, provision_wrapper};

pub struct InstallCommand<'a, R> {
    ctx: &'a DeployContext<R>,
}

impl<'a, R: CommandRunner> InstallCommand<'a, R> {
    pub fn new(ctx: &'a DeployContext<R>) -> Self {
        Self { ctx }
    }

    pub fn execute(&self) -> RunReport {
        let config = self.ctx.config();

        let provisioned = match provision_wrapper(config) {
            Ok(provisioned) => provisioned,
            Err(err) => {
                error!("{}", err);
                let mut run = RunReport::start(RunAction::Install);
                run.push(Issue::error(err));
                return run.finish();
            }
        };

        let tree = self.ctx.tree();
        let control = self.ctx.control();
        let wrapper = self.ctx.wrapper(provisioned.path);
        let orchestrator = InstallOrchestrator::new(&tree, &control, &wrapper, config.timings());

        let mut run = orchestrator.install_all(config);
        if let Some(warning) = provisioned.warning {
            run.push(Issue::warning(warning));
        }
        run.finish()
    }
}
