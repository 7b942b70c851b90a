//! External command execution with a hard timeout.
//!
//! A command that outlives its timeout is killed, not merely signalled,
//! and the timeout is reported as a failure like any non-zero exit.

use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{error, info};

use crate::config::DetectorConfig;
use crate::error::{Result, SimError};

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to run.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Hard timeout.
    pub timeout: Duration,
}

impl CommandSpec {
    /// Creates a spec with no arguments and a five second timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Adds an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&DetectorConfig> for CommandSpec {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: config.timeout,
        }
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

/// Runs a command, optionally feeding `stdin`, and waits for it.
///
/// Feeding stdin, draining the output pipes and waiting for exit all run
/// under the one timeout. stdout is logged at info level and stderr at error level.
///
/// # Errors
/// - [`SimError::Io`] if the program cannot be spawned.
/// - [`SimError::CommandTimeout`] if it runs past its timeout (it is killed).
/// - [`SimError::CommandFailed`] on a non-zero exit.
pub async fn run_command(spec: &CommandSpec, stdin: Option<&str>) -> Result<CommandOutput> {
    info!(program = %spec.program, args = ?spec.args, "Running command");

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdin_pipe = child.stdin.take();
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let collect = async {
        let mut stdout = String::new();
        let mut stderr = String::new();
        // Dropping the handle closes stdin so the child sees EOF
        let write_in = async move {
            if let (Some(mut pipe), Some(input)) = (stdin_pipe, stdin) {
                match pipe.write_all(input.as_bytes()).await {
                    // The child exited or closed stdin without reading it all
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let read_out = async {
            match stdout_pipe.as_mut() {
                Some(pipe) => pipe.read_to_string(&mut stdout).await.map(|_| ()),
                None => Ok(()),
            }
        };
        let read_err = async {
            match stderr_pipe.as_mut() {
                Some(pipe) => pipe.read_to_string(&mut stderr).await.map(|_| ()),
                None => Ok(()),
            }
        };
        tokio::try_join!(write_in, read_out, read_err)?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, stdout, stderr))
    };

    let outcome = tokio::time::timeout(spec.timeout, collect).await;
    let (status, stdout, stderr) = match outcome {
        Ok(result) => result?,
        Err(_) => {
            error!(program = %spec.program, timeout = ?spec.timeout, "Command timed out, killing");
            child.kill().await?;
            return Err(SimError::CommandTimeout {
                program: spec.program.clone(),
                timeout: spec.timeout,
            });
        }
    };

    if !stdout.is_empty() {
        info!("{}", stdout.trim_end());
    }
    if !stderr.is_empty() {
        error!("{}", stderr.trim_end());
    }

    if !status.success() {
        return Err(SimError::CommandFailed {
            program: spec.program.clone(),
            code: status.code(),
        });
    }
    Ok(CommandOutput { stdout, stderr })
}
