//! Subprocess execution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{error, info};

use crate::error::{BuildError, Result};

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Captured standard output (empty unless captured).
    pub stdout: String,

    /// Captured standard error (empty unless captured).
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Capture output and only print it when the command fails.
    pub quiet: bool,
}

impl CommandOptions {
    /// Options running in `cwd`.
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Default::default()
        }
    }

    /// Set the environment.
    pub fn with_env(mut self, env: &HashMap<String, String>) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Set quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

/// Render a command line for logs and errors.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a program without a shell and capture everything it prints.
///
/// Never fails on a non-zero exit; inspect [`CommandResult::success`].
pub async fn capture(program: &str, args: &[String], options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();
    let command_line = display_command(program, args);

    let mut cmd = Command::new(program);
    cmd.args(args).envs(&options.env).stdin(Stdio::null());
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    let output = cmd.output().await.map_err(|e| {
        error!("{}: {}", command_line, e);
        BuildError::CommandFailed {
            command: command_line.clone(),
            code: None,
        }
    })?;

    Ok(CommandResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration: start.elapsed(),
        success: output.status.success(),
    })
}

/// Run a program, failing with [`BuildError::CommandFailed`] on a non-zero exit.
///
/// Output is inherited unless `options.quiet` is set, in which case it is
/// captured and logged only on failure.
pub async fn run(program: &str, args: &[String], options: &CommandOptions) -> Result<CommandResult> {
    let command_line = display_command(program, args);

    let result = if options.quiet {
        capture(program, args, options).await?
    } else {
        let start = Instant::now();
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        let status = cmd.status().await.map_err(|e| {
            error!("{}: {}", command_line, e);
            BuildError::CommandFailed {
                command: command_line.clone(),
                code: None,
            }
        })?;
        CommandResult {
            exit_code: status.code(),
            stdout: String::new(),
            stderr: String::new(),
            duration: start.elapsed(),
            success: status.success(),
        }
    };

    if result.success {
        info!("{} ok status code {:?}", program, result.exit_code);
        return Ok(result);
    }

    error!("{} status code {:?}", program, result.exit_code);
    if options.quiet {
        error!("{}{}", result.stdout, result.stderr);
    }
    Err(BuildError::CommandFailed {
        command: command_line,
        code: result.exit_code,
    })
}

/// Split a space-separated argument string.
pub fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn display_command_joins_args() {
        let args = split_args("install --no-cache-dir  -r requirements.txt");
        assert_eq!(
            display_command("pip", &args),
            "pip install --no-cache-dir -r requirements.txt"
        );
    }

    #[tokio::test]
    async fn capture_collects_output() {
        let result = capture("sh", &sh("echo out; echo err >&2"), &CommandOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn capture_reports_exit_code() {
        let result = capture("sh", &sh("exit 3"), &CommandOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[tokio::test]
    async fn run_fails_on_non_zero_exit() {
        let options = CommandOptions::default().quiet(true);
        let err = run("sh", &sh("exit 2"), &options).await.unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: Some(2), .. }));
    }

    #[tokio::test]
    async fn run_uses_cwd_and_env() {
        let temp = TempDir::new().unwrap();
        let mut env = HashMap::new();
        env.insert("PHOVEA_TEST_VALUE".to_string(), "42".to_string());
        let options = CommandOptions::in_dir(temp.path()).with_env(&env).quiet(true);

        run("sh", &sh("echo $PHOVEA_TEST_VALUE > marker.txt"), &options)
            .await
            .unwrap();

        let written = std::fs::read_to_string(temp.path().join("marker.txt")).unwrap();
        assert_eq!(written.trim(), "42");
    }

    #[tokio::test]
    async fn missing_program_is_a_command_failure() {
        let err = run("definitely-not-a-real-binary", &[], &CommandOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::CommandFailed { code: None, .. }));
    }
}
