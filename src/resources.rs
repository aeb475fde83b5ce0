//! Resource staging.
//!
//! Binary attachments from source archives are written into a scratch
//! directory while tree merges proceed, tracked by a shared status map keyed
//! by resource path. Packaging waits on the write tasks' join handles, so
//! completion is signalled rather than polled.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// Lifecycle of one staged resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Pending,
    Staged,
    Failed,
}

/// Stages resource bytes into a scratch directory.
///
/// Staging is asynchronous and decoupled from tree-merge completion; `wait`
/// must be called before packaging reads the staged files.
pub struct ResourceStager {
    scratch: TempDir,
    statuses: Arc<Mutex<HashMap<String, ResourceStatus>>>,
    tasks: Vec<JoinHandle<Result<(), String>>>,
}

impl ResourceStager {
    pub fn new() -> Result<Self, String> {
        let scratch = TempDir::new()
            .map_err(|e| format!("unable to create scratch directory: {}", e))?;
        Ok(ResourceStager {
            scratch,
            statuses: Arc::new(Mutex::new(HashMap::new())),
            tasks: Vec::new(),
        })
    }

    /// Queue one resource write. Marks the path pending immediately and
    /// flips it to staged (or failed) when the write task finishes. A later
    /// stage of the same path overwrites the earlier one, as sources sharing
    /// a resource path are assumed to share its content.
    pub fn stage(&mut self, res_path: String, data: Vec<u8>) {
        if let Ok(mut statuses) = self.statuses.lock() {
            statuses.insert(res_path.clone(), ResourceStatus::Pending);
        }

        let target = self.scratch.path().join(&res_path);
        let statuses = Arc::clone(&self.statuses);
        self.tasks.push(tokio::task::spawn_blocking(move || {
            let result = write_resource(&target, &data);
            let outcome = if result.is_ok() {
                ResourceStatus::Staged
            } else {
                ResourceStatus::Failed
            };
            if let Ok(mut statuses) = statuses.lock() {
                statuses.insert(res_path.clone(), outcome);
            }
            result.map_err(|e| format!("Error staging resource '{}': {}", res_path, e))
        }));
    }

    /// Wait for every queued write to finish. Returns the errors of failed
    /// writes; failures are reported, never fatal.
    pub async fn wait(&mut self) -> Vec<String> {
        let mut errors = Vec::new();
        for task in self.tasks.drain(..) {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(e) => errors.push(format!("Resource staging task failed: {}", e)),
            }
        }
        errors
    }

    /// Successfully staged resources as (resource path, scratch file) pairs,
    /// in path order. Only valid after `wait`.
    pub fn staged(&self) -> Vec<(String, PathBuf)> {
        let mut staged: Vec<(String, PathBuf)> = match self.statuses.lock() {
            Ok(statuses) => statuses
                .iter()
                .filter(|(_, status)| **status == ResourceStatus::Staged)
                .map(|(path, _)| (path.clone(), self.scratch.path().join(path)))
                .collect(),
            Err(_) => Vec::new(),
        };
        staged.sort();
        staged
    }

    /// True when no resource was ever queued.
    pub fn is_empty(&self) -> bool {
        self.statuses.lock().map(|s| s.is_empty()).unwrap_or(true)
    }
}

fn write_resource(target: &std::path::Path, data: &[u8]) -> Result<(), std::io::Error> {
    // Resource paths may carry subdirectories.
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, data)
}
