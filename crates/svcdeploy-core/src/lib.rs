//! svcdeploy Core Library
//!
//! Stages service payloads under a shared base directory and drives each
//! service definition through an idempotent install or removal against the
//! OS service-control subsystem and an external service wrapper tool.

pub mod commands;
pub mod config;
pub mod error;
pub mod fs;
pub mod orchestration;
pub mod service;
pub mod status;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{DeployConfig, Timings, WrapperConfig, load_config};

    // Definitions and inferred state
    pub use crate::types::{DeploymentState, ServiceDefinition};

    // Errors
    pub use crate::error::{DeployError, Severity};

    // Filesystem
    pub use crate::fs::{DirectoryStager, LocalTree, TreeOps};

    // Service adapters
    pub use crate::service::{
        CommandOutcome, CommandRunner, NssmWrapper, ProcessRunner, RegistryStatus,
        ScServiceControl, ServiceControl, ServiceQuery, ServiceWrapper,
    };

    // Orchestration
    pub use crate::orchestration::{
        DefinitionReport, FilePolicy, InstallOrchestrator, RunAction, RunReport,
        UninstallOrchestrator,
    };

    // Commands
    pub use crate::commands::{DeployContext, InstallCommand, RemoveCommand, StatusCommand};
}
