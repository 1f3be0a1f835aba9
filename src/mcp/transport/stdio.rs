//! Stdio transport for MCP child-process servers
//!
//! This module implements [`StdioTransport`], which spawns a child process
//! and communicates with it over its stdin/stdout pipes using
//! newline-delimited JSON framing.
//!
//! # Protocol
//!
//! - Outbound messages are written to the child's stdin as a single JSON
//!   object followed by a newline (`\n`).
//! - Inbound messages are read from the child's stdout, one JSON object per
//!   line (newline stripped before delivery).
//! - The child's stderr is forwarded to a diagnostic stream and logged via
//!   `tracing::debug!`. Stderr output is never treated as an error.
//!
//! # Environment
//!
//! The child does not inherit the parent environment wholesale. It receives
//! only [`DEFAULT_INHERITED_ENV_VARS`] from the parent, overlaid with the
//! configured variables.
//!
//! # Lifecycle
//!
//! Spawning starts one pump task per pipe. The stdin pump exits when the
//! transport is dropped; the stdout and stderr pumps exit at end of file. [`Transport::close`] kills the child;
//! dropping the transport sends a best-effort SIGTERM (Unix) or `start_kill`
//! (non-Unix).

use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use futures::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};

use crate::error::{McpClientError, Result};
use crate::mcp::transport::{queued_messages, SharedReceiver, Transport};

/// Parent environment variables passed through to the child.
#[cfg(unix)]
pub const DEFAULT_INHERITED_ENV_VARS: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

/// Parent environment variables passed through to the child.
#[cfg(not(unix))]
pub const DEFAULT_INHERITED_ENV_VARS: &[&str] = &[
    "APPDATA",
    "HOMEDRIVE",
    "HOMEPATH",
    "LOCALAPPDATA",
    "PATH",
    "PROCESSOR_ARCHITECTURE",
    "SYSTEMDRIVE",
    "SYSTEMROOT",
    "TEMP",
    "USERNAME",
    "USERPROFILE",
];

/// Build the child environment: inherited defaults overlaid with `env`.
pub fn child_environment(env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut merged: HashMap<String, String> = DEFAULT_INHERITED_ENV_VARS
        .iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.starts_with("()"))
                .map(|value| (key.to_string(), value))
        })
        .collect();
    merged.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Stdio-based MCP transport that drives a child process.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use mcp_remote_client::mcp::transport::stdio::StdioTransport;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let transport = StdioTransport::spawn(
///     "npx".into(),
///     vec!["-y".into(), "@modelcontextprotocol/server-everything".into()],
///     HashMap::new(),
///     None,
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StdioTransport {
    /// Sender side of the stdin channel; `send()` writes here.
    stdin_tx: mpsc::UnboundedSender<String>,
    /// Shared receiver for stdout lines (one JSON message per line).
    stdout_rx: SharedReceiver,
    /// Shared receiver for stderr lines (diagnostics only).
    stderr_rx: SharedReceiver,
    /// Handle to the spawned child process.
    child: Arc<Mutex<Child>>,
}

impl StdioTransport {
    /// Spawn a child process and wire up stdio pipes.
    ///
    /// # Arguments
    ///
    /// * `executable` - Path to the server executable.
    /// * `args` - Command-line arguments passed to the executable.
    /// * `env` - Environment variables applied on top of the inherited
    ///   defaults.
    /// * `working_dir` - Optional working directory for the child process.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::McpTransport`] if the process cannot be
    /// spawned or if the stdio pipes are unavailable.
    pub fn spawn(
        executable: PathBuf,
        args: Vec<String>,
        env: HashMap<String, String>,
        working_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut cmd = Command::new(&executable);
        cmd.args(&args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.env_clear().envs(child_environment(&env));
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            McpClientError::McpTransport(format!(
                "failed to spawn MCP server `{}`: {}",
                executable.display(),
                e
            ))
        })?;

        let stdin = take_pipe(child.stdin.take(), "stdin")?;
        let stdout = take_pipe(child.stdout.take(), "stdout")?;
        let stderr = take_pipe(child.stderr.take(), "stderr")?;

        let (stdin_tx, stdin_rx) = mpsc::unbounded_channel::<String>();
        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel::<String>();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(write_frames(stdin, stdin_rx));
        tokio::spawn(read_frames(stdout, stdout_tx));
        tokio::spawn(drain_diagnostics(stderr, stderr_tx));

        Ok(Self {
            stdin_tx,
            stdout_rx: Arc::new(Mutex::new(stdout_rx)),
            stderr_rx: Arc::new(Mutex::new(stderr_rx)),
            child: Arc::new(Mutex::new(child)),
        })
    }
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> Result<T> {
    pipe.ok_or_else(|| {
        McpClientError::McpTransport(format!("child {name} unavailable after spawn")).into()
    })
}

/// Write each queued message as one newline-terminated frame.
///
/// Stops on the first write failure or when the transport is dropped.
async fn write_frames<W>(mut sink: W, mut outbound: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut frame) = outbound.recv().await {
        frame.push('\n');
        let written = async {
            sink.write_all(frame.as_bytes()).await?;
            sink.flush().await
        };
        if let Err(e) = written.await {
            tracing::debug!(error = %e, "mcp server stdin closed");
            break;
        }
    }
}

/// Forward each non-blank line of `source` as one inbound message.
async fn read_frames<R>(source: R, inbound: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(source).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        if inbound.send(line).is_err() {
            break;
        }
    }
}

/// Log and forward stderr lines until the child closes the pipe.
async fn drain_diagnostics<R>(source: R, diagnostics: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(source).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(line = %line, "mcp server stderr");
        // Nobody may be listening; keep draining so the child never blocks.
        let _ = diagnostics.send(line);
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    /// Send a JSON-RPC message to the child process via its stdin.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::McpTransport`] if the background writer
    /// task has exited.
    async fn send(&self, message: String) -> Result<()> {
        self.stdin_tx
            .send(message)
            .map_err(|e| McpClientError::McpTransport(format!("stdin channel closed: {}", e)).into())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        queued_messages(Arc::clone(&self.stdout_rx))
    }

    fn receive_err(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        queued_messages(Arc::clone(&self.stderr_rx))
    }

    /// Kill the child process and reap it.
    async fn close(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if let Ok(Some(_)) = child.try_wait() {
            return Ok(());
        }
        child
            .kill()
            .await
            .map_err(|e| McpClientError::McpTransport(format!("failed to stop MCP server: {e}")))?;
        Ok(())
    }
}

impl Drop for StdioTransport {
    /// Best-effort termination of the child process on drop.
    fn drop(&mut self) {
        if let Ok(child) = self.child.try_lock() {
            #[cfg(unix)]
            {
                if let Some(pid) = child.id() {
                    // SAFETY: pid is a valid process ID obtained from tokio::process::Child.
                    unsafe {
                        libc::kill(pid as libc::pid_t, libc::SIGTERM);
                    }
                }
            }
            #[cfg(not(unix))]
            {
                let mut child = child;
                let _ = child.start_kill();
            }
        }
    }
}
