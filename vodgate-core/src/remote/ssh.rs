//! SSH-backed `RemoteExecutor`
//!
//! Shells out to the system `ssh`/`scp` binaries with ControlMaster
//! multiplexing, so repeated commands against the same origin server reuse
//! one authenticated connection instead of paying a handshake each time.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};

use super::{CommandOutput, RemoteExecutor};

pub struct SshExecutor {
    config: RemoteConfig,
    ssh_program: PathBuf,
    scp_program: PathBuf,
}

impl SshExecutor {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        Self::with_programs(config, "ssh", "scp")
    }

    fn with_programs(
        config: RemoteConfig,
        ssh_program: impl Into<PathBuf>,
        scp_program: impl Into<PathBuf>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.control_dir)?;
        Ok(Self {
            config,
            ssh_program: ssh_program.into(),
            scp_program: scp_program.into(),
        })
    }

    fn common_options(&self) -> Vec<String> {
        let mut opts = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_secs),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}/%r@%h", self.config.control_dir),
            "-o".to_string(),
            "ControlPersist=60".to_string(),
        ];
        if let Some(identity) = &self.config.identity_file {
            opts.push("-i".to_string());
            opts.push(identity.clone());
        }
        opts
    }

    fn destination(&self, server: &str) -> String {
        format!("{}@{}", self.config.login, server)
    }

    async fn run_with_timeout(
        &self,
        mut cmd: Command,
        timeout: Duration,
        what: &str,
    ) -> Result<CommandOutput> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| Error::UpstreamUnavailable(format!("{what} timed out")))?
            .map_err(|e| Error::UpstreamUnavailable(format!("{what} failed to start: {e}")))?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Escape one word for the shell the origin side runs it through.
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn run(&self, server: &str, command: &[&str]) -> Result<CommandOutput> {
        // sshd space-joins the command words and hands the result to the
        // remote login shell, so every word must be quoted or
        // metacharacters in paths and patterns get interpreted there.
        let remote_command = command
            .iter()
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ");

        let mut cmd = Command::new(&self.ssh_program);
        cmd.args(self.common_options());
        cmd.arg(self.destination(server));
        cmd.arg(remote_command);

        debug!(server, command = ?command, "remote exec");
        let timeout = Duration::from_secs(self.config.exec_timeout_secs);
        self.run_with_timeout(cmd, timeout, "remote command").await
    }

    async fn transfer_in(
        &self,
        server: &str,
        remote_path: &str,
        local_path: &Path,
    ) -> Result<u64> {
        let mut cmd = Command::new(&self.scp_program);
        cmd.args(self.common_options());
        cmd.arg("-q");
        cmd.arg(format!(
            "{}:{}",
            self.destination(server),
            shell_quote(remote_path)
        ));
        cmd.arg(local_path);

        debug!(server, remote_path, "transfer in");
        let timeout = Duration::from_secs(self.config.transfer_timeout_secs);
        let output = self.run_with_timeout(cmd, timeout, "remote download").await?;
        if !output.success() {
            return Err(Error::TransferFailed(format!(
                "scp exited with status {}",
                output.status
            )));
        }

        let meta = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| Error::TransferFailed(format!("downloaded file missing: {e}")))?;
        Ok(meta.len())
    }

    async fn transfer_out(
        &self,
        server: &str,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<u64> {
        let size = tokio::fs::metadata(local_path).await?.len();

        let mut cmd = Command::new(&self.scp_program);
        cmd.args(self.common_options());
        cmd.arg("-q");
        cmd.arg(local_path);
        cmd.arg(format!(
            "{}:{}",
            self.destination(server),
            shell_quote(remote_path)
        ));

        debug!(server, remote_path, "transfer out");
        let timeout = Duration::from_secs(self.config.transfer_timeout_secs);
        let output = self.run_with_timeout(cmd, timeout, "remote upload").await?;
        if !output.success() {
            return Err(Error::TransferFailed(format!(
                "scp exited with status {}",
                output.status
            )));
        }
        Ok(size)
    }
}
