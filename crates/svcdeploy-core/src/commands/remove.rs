//! Remove command implementation.
//!
//! Stops and unregisters every definition, deletes its files, then deletes
//! the shared base directory.

use super::context::DeployContext;
use crate::orchestration::{Issue, RunReport, UninstallOrchestrator};
use crate::service::{CommandRunner, removal_wrapper};

pub struct RemoveCommand<'a, R> {
    ctx: &'a DeployContext<R>,
}

impl<'a, R: CommandRunner> RemoveCommand<'a, R> {
    pub fn new(ctx: &'a DeployContext<R>) -> Self {
        Self { ctx }
    }

    pub fn execute(&self) -> RunReport {
        let config = self.ctx.config();
        let provisioned = removal_wrapper(config);

        let tree = self.ctx.tree();
        let control = self.ctx.control();
        let wrapper = self.ctx.wrapper(provisioned.path);
        let orchestrator =
            UninstallOrchestrator::new(&tree, &control, &wrapper, config.timings());

        let mut run = orchestrator.remove_all(config);
        if let Some(warning) = provisioned.warning {
            run.push(Issue::warning(warning));
        }
        run.finish()
    }
}
