//! Remote execution over per-server connections
//!
//! The catalog lister and download coordinator only see the
//! [`RemoteExecutor`] trait, so tests substitute in-memory fakes and the
//! production build talks SSH.

pub mod ssh;

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

pub use ssh::SshExecutor;

/// Outcome of a remote command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Narrow command-execution / file-transfer channel to an origin server.
///
/// `run` reports non-zero exits through `CommandOutput`, not as `Err`;
/// callers decide what a failed command means in their context. Transport
/// failures (unreachable host, timeout) are `Err(UpstreamUnavailable)`.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Execute a command on `server`, capturing output.
    async fn run(&self, server: &str, command: &[&str]) -> Result<CommandOutput>;

    /// Copy a remote file to a local path. Returns bytes transferred.
    async fn transfer_in(&self, server: &str, remote_path: &str, local_path: &Path)
        -> Result<u64>;

    /// Copy a local file to a remote path. Returns bytes transferred.
    async fn transfer_out(&self, server: &str, local_path: &Path, remote_path: &str)
        -> Result<u64>;
}
