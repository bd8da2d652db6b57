use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::WatchConfig;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("no test command configured")]
    EmptyCommand,
    #[error("failed to execute '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of one finished test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl RunOutput {
    /// The stream holding the unittest report: stderr, or stdout when the
    /// command wrote nothing to stderr.
    pub fn report(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Runs the test suite to completion and hands back everything it printed.
pub trait TestRunner {
    fn run(&self) -> Result<RunOutput, RunnerError>;
}

/// Spawns the configured test-discovery command and waits for it.
/// No timeout: a hung suite blocks until it exits.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    argv: Vec<String>,
    cwd: PathBuf,
}

impl CommandRunner {
    pub fn new(argv: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            cwd: cwd.into(),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.command.clone(), config.root.clone())
    }
}

impl TestRunner for CommandRunner {
    fn run(&self) -> Result<RunOutput, RunnerError> {
        let (program, args) = self.argv.split_first().ok_or(RunnerError::EmptyCommand)?;
        tracing::debug!("Exec tests: {}", self.argv.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RunnerError::Launch {
                program: program.clone(),
                source,
            })?;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
