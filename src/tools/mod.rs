//! External-tool invocation layer
//!
//! All transcoding and transcription work is delegated to external command-line
//! tools. Commands are built as plain argument vectors so the retry layer can
//! inspect and rewrite them, and execution sits behind a trait so tests can
//! substitute a scripted runner.

use std::process::Command;

use crate::error::{ClipError, ClipResult};

/// Shell-style command for an external media tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Start building a command for the given program
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Render the command as a single line for logging
    pub fn to_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Position of the value following the given flag, if present
    pub fn value_index_of(&self, flag: &str) -> Option<usize> {
        self.args
            .iter()
            .position(|a| a == flag)
            .map(|i| i + 1)
            .filter(|&i| i < self.args.len())
    }
}

/// Captured result of a finished tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool reported success (exit code 0)
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Convert a failed invocation into an error carrying the stderr text
    pub fn into_error(self, tool: &str) -> ClipError {
        ClipError::ToolFailed {
            tool: tool.to_string(),
            status: self.status,
            stderr: self.stderr,
        }
    }
}

/// Executes tool commands and captures their output
pub trait ToolRunner: Send + Sync {
    /// Run the command to completion, capturing stdout and stderr.
    ///
    /// A nonzero exit code is reported through `ToolOutput`, not as an `Err`;
    /// `Err` is reserved for failures to launch the process at all.
    fn run(&self, cmd: &ToolCommand) -> ClipResult<ToolOutput>;
}

/// Runs commands as real subprocesses
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, cmd: &ToolCommand) -> ClipResult<ToolOutput> {
        tracing::debug!("Running: {}", cmd.to_line());
        let output = Command::new(&cmd.program).args(&cmd.args).output()?;
        Ok(ToolOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
