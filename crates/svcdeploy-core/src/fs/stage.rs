//! Replace-not-merge staging of a payload directory.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use super::tree::{TreeOps, is_locked_resource_error};
use crate::error::DeployError;

/// Outcome of a successful stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    /// 1 on a clean copy, 2 when the locked-file retry was needed.
    pub attempts: u32,
}

/// Copies payload trees into their destinations.
///
/// Whatever is at the destination is deleted first so files from a previous
/// version never survive an upgrade. A locked-file failure gets exactly one
/// retry after `retry_backoff`; any other failure is terminal at once.
pub struct DirectoryStager<'a> {
    tree: &'a dyn TreeOps,
    retry_backoff: Duration,
}

impl<'a> DirectoryStager<'a> {
    pub fn new(tree: &'a dyn TreeOps, retry_backoff: Duration) -> Self {
        Self {
            tree,
            retry_backoff,
        }
    }

    pub fn stage(&self, source: &Path, destination: &Path) -> Result<StageReport, DeployError> {
        // Checked before anything at the destination is deleted.
        if !self.tree.is_dir(source) {
            return Err(DeployError::CopyFatal {
                destination: destination.to_path_buf(),
                message: format!("Source path is not a directory: {}", source.display()),
            });
        }

        let first = match self.attempt(source, destination) {
            Ok(()) => {
                info!(source = %source.display(), destination = %destination.display(), "Copied payload");
                return Ok(StageReport { attempts: 1 });
            }
            Err(err) => err,
        };

        if !is_locked_resource_error(&first) {
            return Err(DeployError::CopyFatal {
                destination: destination.to_path_buf(),
                message: format!("{:#}", first),
            });
        }

        warn!(
            destination = %destination.display(),
            error = %format!("{:#}", first),
            backoff_ms = self.retry_backoff.as_millis() as u64,
            "Access denied while copying, retrying once"
        );
        if !self.retry_backoff.is_zero() {
            std::thread::sleep(self.retry_backoff);
        }

        match self.attempt(source, destination) {
            Ok(()) => {
                info!(source = %source.display(), destination = %destination.display(), "Copied payload on retry");
                Ok(StageReport { attempts: 2 })
            }
            Err(err) => Err(DeployError::CopyTransient {
                destination: destination.to_path_buf(),
                message: format!("{:#}", err),
            }),
        }
    }

    fn attempt(&self, source: &Path, destination: &Path) -> anyhow::Result<()> {
        if self.tree.exists(destination) {
            info!(path = %destination.display(), "Removing existing directory");
            self.tree.remove_tree(destination)?;
        }
        self.tree.copy_tree(source, destination)
    }
}
