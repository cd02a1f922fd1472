//! Shared integration-test harness for spawning an `rdomock` server as a
//! child process and exchanging NDJSON frames over stdio.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

/// Default timeout for reading a single frame from the server.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running `rdomock serve` process with helpers for NDJSON I/O.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
#[allow(clippy::missing_panics_doc)]
pub struct RdoMockProcess {
    child: Child,
    stdin: tokio::process::ChildStdin,
    reader: BufReader<tokio::process::ChildStdout>,
}

impl RdoMockProcess {
    /// Spawns `rdomock serve` over the given fixtures.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn(fixtures: &[&Path]) -> Self {
        Self::spawn_with_args(fixtures, &[])
    }

    /// Spawns `rdomock serve` with extra arguments after the fixtures.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_with_args(fixtures: &[&Path], extra: &[&str]) -> Self {
        let bin = env!("CARGO_BIN_EXE_rdomock");
        let mut command = Command::new(bin);
        command.arg("serve").arg("--quiet");
        for fixture in fixtures {
            command.arg("--scenario").arg(fixture);
        }
        let mut child = command
            .args(extra)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn rdomock");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
        }
    }

    /// Writes one raw line to the server's stdin.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send_line(&mut self, line: &str) {
        let mut buf = line.to_string();
        buf.push('\n');
        self.stdin
            .write_all(buf.as_bytes())
            .await
            .expect("failed to write to stdin");
        self.stdin.flush().await.expect("failed to flush stdin");
    }

    /// Reads one NDJSON frame from the server's stdout.
    ///
    /// Panics on EOF, I/O error, or if no frame arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_frame(&mut self, timeout: Duration) -> Value {
        let mut line = String::new();
        let result = tokio::time::timeout(timeout, async {
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from server");
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return serde_json::from_str::<Value>(trimmed)
                        .unwrap_or_else(|e| panic!("invalid JSON from server: {e}\nline: {line}"));
                }
            }
        })
        .await;
        result.expect("timed out waiting for frame from server")
    }

    /// Sends a raw RDO command and returns the reply frame.
    pub async fn rdo(&mut self, command: &str) -> Value {
        self.send_line(command).await;
        self.read_frame(DEFAULT_TIMEOUT).await
    }

    /// Sends an RDO request frame with per-call variables.
    #[allow(clippy::missing_panics_doc)]
    pub async fn rdo_with_vars(&mut self, command: &str, vars: Value) -> Value {
        let frame = json!({ "rdo": command, "vars": vars });
        self.send_line(&frame.to_string()).await;
        self.read_frame(DEFAULT_TIMEOUT).await
    }

    /// Sends any JSON request frame and returns the reply.
    pub async fn request(&mut self, frame: Value) -> Value {
        self.send_line(&frame.to_string()).await;
        self.read_frame(DEFAULT_TIMEOUT).await
    }

    /// Shuts down the server by closing stdin and waiting for exit.
    ///
    /// Returns the exit code, or `None` if the process had to be killed.
    #[allow(clippy::missing_panics_doc)]
    pub async fn shutdown(self) -> Option<i32> {
        let Self {
            mut child, stdin, ..
        } = self;

        // Drop stdin to signal EOF
        drop(stdin);

        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(status) => status.expect("failed to wait for child").code(),
            Err(_) => {
                child.kill().await.expect("failed to kill child");
                None
            }
        }
    }

    /// Runs `rdomock` to completion with the given arguments.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> std::process::Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_rdomock"))
            .args(args)
            .output()
            .expect("failed to run rdomock")
    }

    /// Returns the path to a test fixture.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }
}

/// Parses stdout of a completed command as NDJSON frames.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn stdout_frames(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is not JSON"))
        .collect()
}
