//! High-level commands for svcdeploy operations.
//!
//! These wire the real adapters to the orchestrators and are what the CLI
//! calls.

pub mod context;
pub mod install;
pub mod remove;

use crate::service::CommandRunner;
use crate::status::{StatusProbe, SystemStatus};

pub use context::DeployContext;
pub use install::InstallCommand;
pub use remove::RemoveCommand;

/// Read-only status across all definitions.
pub struct StatusCommand<'a, R> {
    ctx: &'a DeployContext<R>,
}

impl<'a, R: CommandRunner> StatusCommand<'a, R> {
    pub fn new(ctx: &'a DeployContext<R>) -> Self {
        Self { ctx }
    }

    pub fn execute(&self) -> SystemStatus {
        let control = self.ctx.control();
        StatusProbe::new(&control).probe(self.ctx.config())
    }
}
