//! Error taxonomy for deployment runs.
//!
//! None of these abort a run. Orchestrators record them on the report of the
//! definition (or the run) they belong to and carry on.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// How much an issue counts against the outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Tolerated; the step's goal was met or will be met by a later step.
    Warning,
    /// The definition (or run) did not reach its target state.
    Error,
}

/// A single failure observed while installing or removing services.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeployError {
    #[error("Source folder not found: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("Copy to {} failed after retry: {message}", destination.display())]
    CopyTransient {
        destination: PathBuf,
        message: String,
    },

    #[error("Copy to {} failed: {message}", destination.display())]
    CopyFatal {
        destination: PathBuf,
        message: String,
    },

    #[error("Could not determine registration state of '{service}': {message}")]
    RegistryQueryFailure { service: String, message: String },

    #[error("Wrapper command failed ({command}): {message}")]
    WrapperCommandFailure { command: String, message: String },

    #[error("Service command failed ({command}): {message}")]
    ServiceCommandFailure { command: String, message: String },

    #[error("Could not delete {}: {message}", path.display())]
    DeleteFailure { path: PathBuf, message: String },

    #[error("Service wrapper unavailable at {}: {message}", path.display())]
    WrapperUnavailable { path: PathBuf, message: String },

    #[error("Failed to remove base directory {}. You may need to remove it manually. Error: {message}", path.display())]
    BaseDirFailure { path: PathBuf, message: String },

    #[error("Executable not found in staged files: {}", path.display())]
    MissingExecutable { path: PathBuf },
}

impl DeployError {
    /// Stable identifier of the error kind, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::MissingSource { .. } => "missing_source",
            DeployError::CopyTransient { .. } => "copy_transient",
            DeployError::CopyFatal { .. } => "copy_fatal",
            DeployError::RegistryQueryFailure { .. } => "registry_query_failure",
            DeployError::WrapperCommandFailure { .. } => "wrapper_command_failure",
            DeployError::ServiceCommandFailure { .. } => "service_command_failure",
            DeployError::DeleteFailure { .. } => "delete_failure",
            DeployError::WrapperUnavailable { .. } => "wrapper_unavailable",
            DeployError::BaseDirFailure { .. } => "base_dir_failure",
            DeployError::MissingExecutable { .. } => "missing_executable",
        }
    }
}
