//! Shared core types used across configuration, orchestration and status.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::service::ServiceQuery;

/// One deployable unit: a payload directory, where it lands, and the
/// executable the service wrapper supervises.
///
/// Built once at startup and never mutated. `executable` is always a strict
/// descendant of `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDefinition {
    name: String,
    source: PathBuf,
    destination: PathBuf,
    executable: PathBuf,
}

impl ServiceDefinition {
    /// Create a definition, checking the executable lives under the destination.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        executable: impl Into<PathBuf>,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        let destination = destination.into();
        let executable = executable.into();

        validate_service_name(&name)?;
        if !is_strict_descendant(&executable, &destination) {
            anyhow::bail!(
                "Executable {} for service '{}' is not inside its destination {}",
                executable.display(),
                name,
                destination.display()
            );
        }

        Ok(Self {
            name,
            source: source.into(),
            destination,
            executable,
        })
    }

    /// OS service name, also used as the log correlation key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

/// Where a definition sits in its lifecycle, inferred from the live service
/// registry and the filesystem. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// No registry entry, no files.
    Absent,
    /// Destination populated, no registry entry.
    FilesStaged,
    /// Registry entry exists, service not running.
    Registered,
    /// Registry entry exists and the service is running (or transitioning).
    Running,
}

impl DeploymentState {
    /// Combine a registry query with the presence of staged files.
    ///
    /// Returns `None` when the registry could not be queried.
    pub fn infer(query: &ServiceQuery, files_present: bool) -> Option<Self> {
        match query {
            ServiceQuery::NotFound if files_present => Some(DeploymentState::FilesStaged),
            ServiceQuery::NotFound => Some(DeploymentState::Absent),
            ServiceQuery::Stopped => Some(DeploymentState::Registered),
            ServiceQuery::Running | ServiceQuery::Pending => Some(DeploymentState::Running),
            ServiceQuery::Unknown(_) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentState::Absent => "absent",
            DeploymentState::FilesStaged => "files-staged",
            DeploymentState::Registered => "registered",
            DeploymentState::Running => "running",
        }
    }
}

fn validate_service_name(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Service name must not be empty");
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '"'))
    {
        anyhow::bail!("Service name '{}' contains invalid character {:?}", name, bad);
    }
    Ok(())
}

/// True when `child` is below `parent` after lexical normalization.
pub(crate) fn is_strict_descendant(child: &Path, parent: &Path) -> bool {
    let child = normalize(child);
    let parent = normalize(parent);
    child != parent && child.starts_with(&parent)
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
