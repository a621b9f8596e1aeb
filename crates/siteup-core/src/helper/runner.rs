//! Blocking runner for helper executables.
//!
//! The helper's stdout and stderr share one pipe, read a line at a time. Each
//! line is handed to the caller before the next one is read, so a slow
//! consumer simply back-pressures the helper.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

/// A helper invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Shown instead of the generic exit message when the helper fails
    pub failure_message: Option<String>,
}

impl HelperCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            failure_message: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }
}

/// Failures while running a helper
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("Failed to start helper {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read helper output: {0}")]
    Io(#[source] std::io::Error),

    #[error("{}", failure_text(.program, .code, .message))]
    Failed {
        program: PathBuf,
        code: Option<i32>,
        message: Option<String>,
    },

    /// The helper reported an unrecoverable condition
    #[error("{0}")]
    Fatal(String),
}

fn failure_text(program: &Path, code: &Option<i32>, message: &Option<String>) -> String {
    if let Some(message) = message {
        return message.clone();
    }
    match code {
        Some(code) => format!("Helper {} exited with code {}", program.display(), code),
        None => format!("Helper {} was terminated by a signal", program.display()),
    }
}

/// Resolves helper names and runs them
#[derive(Debug, Clone)]
pub struct HelperRunner {
    helper_dir: PathBuf,
}

impl HelperRunner {
    /// Create a runner that looks helpers up in `helper_dir`.
    pub fn new(helper_dir: impl Into<PathBuf>) -> Self {
        Self {
            helper_dir: helper_dir.into(),
        }
    }

    pub fn helper_dir(&self) -> &Path {
        &self.helper_dir
    }

    /// Build a command for a named helper in the helper directory.
    pub fn command(&self, helper: &str) -> HelperCommand {
        HelperCommand::new(self.helper_dir.join(helper))
    }

    /// Run a helper, passing each trimmed output line to `on_line`.
    ///
    /// If `on_line` returns an error the helper is killed and that error is
    /// returned. A non-zero exit becomes [`HelperError::Failed`].
    pub fn run<F>(&self, command: &HelperCommand, mut on_line: F) -> Result<ExitStatus, HelperError>
    where
        F: FnMut(&str) -> Result<(), HelperError>,
    {
        let (reader, writer) = std::io::pipe().map_err(HelperError::Io)?;
        let writer_err = writer.try_clone().map_err(HelperError::Io)?;

        let mut child = {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(writer_err);
            if let Some(dir) = &command.working_dir {
                cmd.current_dir(dir);
            }
            // `cmd` owns the write ends; dropping it at the end of this block
            // lets the reader see EOF once the helper exits.
            cmd.spawn().map_err(|source| HelperError::Spawn {
                program: command.program.clone(),
                source,
            })?
        };

        tracing::info!(
            helper = %command.program.display(),
            args = ?command.args,
            "Started helper"
        );

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = match reader.read_until(b'\n', &mut buf) {
                Ok(read) => read,
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(HelperError::Io(err));
                }
            };
            if read == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            tracing::debug!(target: "siteup::helper::output", "{}", line);

            if let Err(err) = on_line(line) {
                tracing::warn!(helper = %command.program.display(), "Stopping helper: {}", err);
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        }

        let status = child.wait().map_err(HelperError::Io)?;
        tracing::info!(helper = %command.program.display(), %status, "Helper exited");

        if !status.success() {
            return Err(HelperError::Failed {
                program: command.program.clone(),
                code: status.code(),
                message: command.failure_message.clone(),
            });
        }

        Ok(status)
    }
}
