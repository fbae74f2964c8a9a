//! External command execution: spawning, output streaming, exit status.
//!
//! Every external invocation of the pipeline (compiler probes, `tar`,
//! `configure`, `make`) is described by a [`CommandSpec`] and handed to a
//! [`CommandRunner`]. Production uses [`ProcessRunner`]; `--dry-run` uses
//! [`DryRunRunner`]; tests substitute a recording runner.

use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Lines of child output replayed at error level when a command fails
const FAILURE_TAIL_LINES: usize = 25;

/// One external command: program, arguments, working directory, extra env.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            env: Vec::new(),
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

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Value of an extra environment variable, if set on this command
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes command specs. Errors carry a human readable reason.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<(), String>>;

    /// Whether commands really execute; false for dry runs
    fn executes(&self) -> bool {
        true
    }
}

/// Runs commands as child processes, streaming their output into the log.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(run_process(spec))
    }
}

/// Logs commands instead of running them.
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run<'a>(&'a self, spec: &'a CommandSpec) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let env: Vec<String> = spec
                .env
                .iter()
                .filter(|(k, _)| k != "PATH")
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            if env.is_empty() {
                log::info!("[DRY-RUN] (cd {}) {}", spec.cwd.display(), spec);
            } else {
                log::info!(
                    "[DRY-RUN] (cd {}) {} {}",
                    spec.cwd.display(),
                    env.join(" "),
                    spec
                );
            }
            Ok(())
        })
    }

    fn executes(&self) -> bool {
        false
    }
}

fn remember(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == FAILURE_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

async fn run_process(spec: &CommandSpec) -> Result<(), String> {
    log::info!("[Exec] (cd {}) {}", spec.cwd.display(), spec);

    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    command.current_dir(&spec.cwd);
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|e| {
        format!(
            "failed to spawn '{}' in {}: {}",
            spec.program,
            spec.cwd.display(),
            e
        )
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| "failed to capture stdout".to_string())?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| "failed to capture stderr".to_string())?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_closed = false;
    let mut stderr_closed = false;
    let mut tail = VecDeque::with_capacity(FAILURE_TAIL_LINES);

    while !(stdout_closed && stderr_closed) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_closed => {
                match line {
                    Ok(Some(line)) => {
                        log::debug!(target: "build", "{}", line);
                        remember(&mut tail, line);
                    }
                    Ok(None) => stdout_closed = true,
                    Err(e) => {
                        log::warn!("[Exec] stdout read error: {}", e);
                        stdout_closed = true;
                    }
                }
            }
            line = stderr_lines.next_line(), if !stderr_closed => {
                match line {
                    Ok(Some(line)) => {
                        log::debug!(target: "build", "[STDERR] {}", line);
                        remember(&mut tail, line);
                    }
                    Ok(None) => stderr_closed = true,
                    Err(e) => {
                        log::warn!("[Exec] stderr read error: {}", e);
                        stderr_closed = true;
                    }
                }
            }
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| format!("failed to wait for '{}': {}", spec.program, e))?;

    if status.success() {
        return Ok(());
    }

    for line in &tail {
        log::error!("  | {}", line);
    }

    Err(match status.code() {
        Some(code) => format!("'{}' exited with code {}", spec, code),
        None => format!("'{}' terminated by signal", spec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder_and_display() {
        let spec = CommandSpec::new("make", "/tmp")
            .args(["-j", "4"])
            .arg("all")
            .env("CFLAGS", "-Wno-error");
        assert_eq!(spec.to_string(), "make -j 4 all");
        assert_eq!(spec.env_value("CFLAGS"), Some("-Wno-error"));
        assert!(spec.has_arg("all"));
        assert!(!spec.has_arg("install"));
    }

    #[test]
    fn test_env_value_last_wins() {
        let spec = CommandSpec::new("make", "/tmp")
            .env("A", "1")
            .env("A", "2");
        assert_eq!(spec.env_value("A"), Some("2"));
    }

    #[test]
    fn test_remember_keeps_only_tail() {
        let mut tail = VecDeque::new();
        for i in 0..(FAILURE_TAIL_LINES + 5) {
            remember(&mut tail, i.to_string());
        }
        assert_eq!(tail.len(), FAILURE_TAIL_LINES);
        assert_eq!(tail.front().map(String::as_str), Some("5"));
    }

    #[tokio::test]
    async fn test_process_runner_success() {
        let spec = CommandSpec::new("sh", "/").args(["-c", "echo out; echo err >&2"]);
        assert!(ProcessRunner.run(&spec).await.is_ok());
    }

    #[tokio::test]
    async fn test_process_runner_reports_exit_code() {
        let spec = CommandSpec::new("sh", "/").args(["-c", "exit 3"]);
        let err = ProcessRunner.run(&spec).await.unwrap_err();
        assert!(err.contains("exited with code 3"), "{}", err);
    }

    #[tokio::test]
    async fn test_process_runner_passes_env_and_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = CommandSpec::new("sh", dir.path())
            .args(["-c", "test \"$MARKER\" = yes && touch here"])
            .env("MARKER", "yes");
        ProcessRunner.run(&spec).await.unwrap();
        assert!(dir.path().join("here").exists());
    }

    #[tokio::test]
    async fn test_process_runner_spawn_failure() {
        let spec = CommandSpec::new("definitely-not-a-real-program-xyz", "/");
        let err = ProcessRunner.run(&spec).await.unwrap_err();
        assert!(err.contains("failed to spawn"), "{}", err);
    }

    #[tokio::test]
    async fn test_dry_run_runner_never_fails() {
        let spec = CommandSpec::new("definitely-not-a-real-program-xyz", "/nonexistent");
        assert!(DryRunRunner.run(&spec).await.is_ok());
        assert!(!DryRunRunner.executes());
    }
}
