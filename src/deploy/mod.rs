//! Webhook-triggered redeploy: verify the caller, then pull and fix permissions.
//!
//! Processes are only ever started through a [`CommandRunner`], which the
//! [`Deployer`] holds and which is reachable only after signature checks.

mod runner;
mod signature;

pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use signature::{SIGNATURE_HEADER, WebhookVerifier};

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("missing webhook signature")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid webhook secret: {0}")]
    InvalidSecret(String),

    #[error("failed to run `{program}`: {message}")]
    Spawn { program: String, message: String },

    #[error("deploy task failed: {0}")]
    Task(String),
}

/// Output of one deploy run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub pull: CommandOutput,
    pub chmod: CommandOutput,
}

impl DeployReport {
    /// Plain-text response body: the pull output, then the chmod output.
    pub fn render(&self) -> String {
        format!("output: {}{}", self.pull.stdout, self.chmod.stdout)
    }
}

pub struct Deployer {
    verifier: WebhookVerifier,
    runner: Arc<dyn CommandRunner>,
    workdir: PathBuf,
    entry_script: String,
}

impl Deployer {
    pub fn new(
        verifier: WebhookVerifier,
        runner: Arc<dyn CommandRunner>,
        workdir: impl Into<PathBuf>,
        entry_script: impl Into<String>,
    ) -> Self {
        Self {
            verifier,
            runner,
            workdir: workdir.into(),
            entry_script: entry_script.into(),
        }
    }

    /// Verifies the request and, only if it is authentic, runs
    /// `git pull` followed by `chmod a+x <entry script>`.
    ///
    /// The commands run on their own task: dropping the returned future
    /// (a webhook caller that timed out) leaves them running to completion.
    pub async fn handle(
        self: &Arc<Self>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<DeployReport, DeployError> {
        self.verifier.verify(signature, body)?;
        let deployer = Arc::clone(self);
        tokio::spawn(async move { deployer.run().await })
            .await
            .map_err(|e| DeployError::Task(e.to_string()))?
    }

    async fn run(&self) -> Result<DeployReport, DeployError> {
        let pull = self
            .runner
            .run("git", &["pull".to_string()], &self.workdir)
            .await?;
        log_exit("git pull", &pull);

        let chmod = self
            .runner
            .run(
                "chmod",
                &["a+x".to_string(), self.entry_script.clone()],
                &self.workdir,
            )
            .await?;
        log_exit("chmod", &chmod);

        Ok(DeployReport { pull, chmod })
    }
}

fn log_exit(command: &str, output: &CommandOutput) {
    if output.success() {
        info!(command, "deploy command finished");
    } else {
        warn!(
            command,
            status = ?output.status,
            stderr = %output.stderr.trim(),
            "deploy command exited unsuccessfully"
        );
    }
}
