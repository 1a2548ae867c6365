//! Main application launcher

use async_trait::async_trait;
use bridge_traits::{
    control::AppLauncher,
    error::{BridgeError, Result},
};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Starts the main application as a detached child process.
///
/// If the application is already running, it is expected to forward the
/// launch to the existing instance (single-instance apps on every desktop
/// platform do this).
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl AppLauncher for ProcessLauncher {
    async fn open_main_application(&self) -> Result<()> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                BridgeError::OperationFailed(format!(
                    "Failed to launch {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        info!(program = ?self.program, pid = ?child.id(), "Launched main application");
        Ok(())
    }
}
