//! The per-node transport abstraction: file transfer, command execution,
//! and OS-aware path joining.
//!
//! Remote transports (SSH, container API) are out of scope; this module
//! provides the contract plus a local-filesystem reference implementation
//! used for the implicit empty-name node and for tests.

use async_trait::async_trait;
use flowforge_flow::{Node, OsFamily};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-node file transfer, command execution, and path handling.
///
/// Implementations for remote transports (SSH, container runtimes) are an
/// external collaborator; this crate ships only the local reference
/// implementation.
#[async_trait]
pub trait NodeDriver: Send + Sync {
    /// Copies a local file to a path on this node.
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), String>;

    /// Copies a file from this node to a local path.
    async fn download(&self, remote: &str, local: &Path) -> Result<(), String>;

    /// Runs a command on this node and returns its captured stdout.
    async fn run_command(&self, cmd: &str) -> Result<String, String>;

    /// Returns this node's working directory.
    fn working_directory(&self) -> &str;

    /// Joins path segments using this node's OS family's separator.
    fn join(&self, parts: &[&str]) -> String;

    /// Releases any held resources (connections, temp state).
    async fn close(&self);

    /// Verifies this node is reachable before dispatching work to it.
    async fn check_connectivity(&self) -> Result<(), String>;
}

/// A [`NodeDriver`] operating on the local filesystem, used for the
/// implicit empty-name node and for tests.
pub struct LocalNodeDriver {
    working_dir: PathBuf,
    os_family: OsFamily,
}

impl LocalNodeDriver {
    /// Creates a driver rooted at `working_dir`.
    #[must_use]
    pub fn new(working_dir: PathBuf, os_family: OsFamily) -> Self {
        Self {
            working_dir,
            os_family,
        }
    }
}

#[async_trait]
impl NodeDriver for LocalNodeDriver {
    async fn upload(&self, local: &Path, remote: &str) -> Result<(), String> {
        let dest = self.working_dir.join(remote);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        tokio::fs::copy(local, &dest)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<(), String> {
        let src = self.working_dir.join(remote);
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        tokio::fs::copy(&src, local)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn run_command(&self, cmd: &str) -> Result<String, String> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|e| e.to_string())?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(String::from_utf8_lossy(&output.stderr).into_owned())
        }
    }

    fn working_directory(&self) -> &str {
        self.working_dir.to_str().unwrap_or_default()
    }

    fn join(&self, parts: &[&str]) -> String {
        let sep = match self.os_family {
            OsFamily::Unix => '/',
            OsFamily::Windows => '\\',
        };
        parts.join(&sep.to_string())
    }

    async fn close(&self) {}

    async fn check_connectivity(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Builds the [`NodeDriver`] a fan-out task should use for one node.
///
/// Remote transports are an external collaborator; this crate's only
/// factory implementation serves the implicit local node and rejects
/// anything else.
pub trait NodeDriverFactory: Send + Sync {
    /// Returns a driver bound to `node`, rooted at `artifact_dir` for the
    /// local reference implementation.
    fn build(&self, node: &Node, artifact_dir: &Path) -> Result<Arc<dyn NodeDriver>, String>;
}

/// The local-only [`NodeDriverFactory`]: serves [`Node::is_local`] nodes
/// from `artifact_dir` and refuses anything else.
pub struct LocalOnlyNodeDriverFactory;

impl NodeDriverFactory for LocalOnlyNodeDriverFactory {
    fn build(&self, node: &Node, artifact_dir: &Path) -> Result<Arc<dyn NodeDriver>, String> {
        if node.is_local() {
            Ok(Arc::new(LocalNodeDriver::new(
                artifact_dir.to_path_buf(),
                node.os_family.unwrap_or_default(),
            )))
        } else {
            Err(format!(
                "no driver available for remote node '{}'",
                node.name
            ))
        }
    }
}
