//! Process Invocation
//!
//! Launches an external tool with an explicit argument vector (never through a
//! shell), blocks until it exits, and captures its exit code and both output
//! streams.
//!
//! ## Timeouts
//!
//! An optional wall-clock bound can be configured. When it expires the child's
//! process group receives SIGTERM, gets a short grace period, then SIGKILL. The
//! invocation still yields an [`InvocationResult`], flagged with `timed_out`
//! and with exit code `-1`. The bound also covers output collection: a
//! descendant that keeps the pipes open past the deadline is killed with the
//! rest of the group.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum bytes captured per output stream (16 MiB).
///
/// Anything beyond is drained and discarded so the child never blocks on a
/// full pipe. A stream of exactly this size is not considered truncated.
pub const MAX_OUTPUT_BYTES: usize = 16 * 1024 * 1024;

/// Marker appended to a stream that hit [`MAX_OUTPUT_BYTES`].
pub const TRUNCATION_MARKER: &str = "[output truncated]";

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 8 * 1024;
const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// Errors that prevent an invocation from producing a result at all.
///
/// A nonzero exit code is *not* an error; it is a normal [`InvocationResult`].
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Failed to launch {}: {source}", .tool.display())]
    Launch {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for {}: {source}", .tool.display())]
    Wait {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything observed about one finished tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Tool path followed by every argument, exactly as passed.
    pub command: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    /// Exit code as reported by the OS; `-1` if terminated by a signal or
    /// killed by the timeout.
    pub exit_code: i32,
    /// The configured timeout expired and the process was killed.
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl InvocationResult {
    /// Result of a process that exited on its own with `exit_code`.
    pub fn exited(command: Vec<String>, exit_code: i32) -> Self {
        Self {
            command,
            stdout: String::new(),
            stderr: String::new(),
            exit_code,
            timed_out: false,
            duration_ms: 0,
        }
    }

    /// Replace captured stdout.
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// Replace captured stderr.
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Exit code zero and not killed by the timeout.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Command rendered for display, quoting tokens that contain whitespace.
    pub fn command_line(&self) -> String {
        self.command
            .iter()
            .map(|token| {
                if token.is_empty() || token.chars().any(char::is_whitespace) {
                    format!("\"{}\"", token)
                } else {
                    token.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Something that can run an external tool to completion.
///
/// The pipelines only talk to this trait, so tests can substitute scripted
/// stubs for the real builder and tester.
pub trait ToolInvoker {
    /// Run `tool` with `args` (each passed as a single verbatim token).
    fn invoke(&self, tool: &Path, args: &[String]) -> Result<InvocationResult, InvokeError>;
}

impl<T: ToolInvoker + ?Sized> ToolInvoker for &T {
    fn invoke(&self, tool: &Path, args: &[String]) -> Result<InvocationResult, InvokeError> {
        (**self).invoke(tool, args)
    }
}

/// [`ToolInvoker`] backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    /// Invoker that waits indefinitely for every child.
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoker that kills children running longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Configured wall-clock bound, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl ToolInvoker for ProcessInvoker {
    fn invoke(&self, tool: &Path, args: &[String]) -> Result<InvocationResult, InvokeError> {
        let mut command_line = Vec::with_capacity(args.len() + 1);
        command_line.push(tool.display().to_string());
        command_line.extend(args.iter().cloned());
        debug!(command = ?command_line, "invoking tool");

        let mut command = Command::new(tool);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // A dedicated group lets the timeout path also reach grandchildren
        // that inherited our pipes.
        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| InvokeError::Launch {
            tool: tool.to_path_buf(),
            source,
        })?;

        let (tx, rx) = mpsc::channel();
        spawn_reader(child.stdout.take(), Stream::Stdout, tx.clone());
        spawn_reader(child.stderr.take(), Stream::Stderr, tx);
        let mut capture = Capture::default();

        let waited = match self.timeout {
            Some(timeout) => supervise(&mut child, &rx, &mut capture, start + timeout),
            None => child.wait().map(|status| {
                capture.drain(&rx, None);
                (status, false)
            }),
        };
        let (status, timed_out) = waited.map_err(|source| InvokeError::Wait {
            tool: tool.to_path_buf(),
            source,
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        if timed_out {
            warn!(
                tool = %tool.display(),
                elapsed_ms = duration_ms,
                "tool timed out after {:?} and was killed",
                self.timeout().unwrap_or_default()
            );
        }

        let result = InvocationResult {
            command: command_line,
            stdout: capture_text(capture.stdout),
            stderr: capture_text(capture.stderr),
            exit_code: if timed_out {
                -1
            } else {
                status.code().unwrap_or(-1)
            },
            timed_out,
            duration_ms,
        };
        debug!(
            exit_code = result.exit_code,
            duration_ms = result.duration_ms,
            "tool finished"
        );
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Message from a reader thread.
enum Chunk {
    Data(Stream, Vec<u8>),
    Eof,
}

/// Output gathered so far from both reader threads.
#[derive(Default)]
struct Capture {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    closed: usize,
}

impl Capture {
    fn absorb(&mut self, chunk: Chunk) {
        match chunk {
            Chunk::Data(Stream::Stdout, bytes) => self.stdout.extend_from_slice(&bytes),
            Chunk::Data(Stream::Stderr, bytes) => self.stderr.extend_from_slice(&bytes),
            Chunk::Eof => self.closed += 1,
        }
    }

    /// Both streams reached EOF.
    fn finished(&self) -> bool {
        self.closed >= 2
    }

    /// Receive until both streams close, or until `deadline` if one is given.
    fn drain(&mut self, rx: &Receiver<Chunk>, deadline: Option<Instant>) {
        while !self.finished() {
            let chunk = match deadline {
                None => rx.recv().ok(),
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return;
                    }
                    match rx.recv_timeout(left) {
                        Ok(chunk) => Some(chunk),
                        Err(RecvTimeoutError::Timeout) => return,
                        Err(RecvTimeoutError::Disconnected) => None,
                    }
                }
            };
            match chunk {
                Some(chunk) => self.absorb(chunk),
                None => return,
            }
        }
    }
}

/// Collect output until the child has exited and both pipes closed, or the
/// deadline passes.
///
/// The deadline also covers descendants that keep the pipes open after the
/// child itself exited; the whole group is killed in either case. Returns the
/// exit status and whether the deadline was hit.
fn supervise(
    child: &mut Child,
    rx: &Receiver<Chunk>,
    capture: &mut Capture,
    deadline: Instant,
) -> std::io::Result<(ExitStatus, bool)> {
    let mut status = None;
    loop {
        if status.is_none() {
            status = child.try_wait()?;
        }
        if let Some(status) = status {
            if capture.finished() {
                return Ok((status, false));
            }
        }

        let now = Instant::now();
        if now >= deadline {
            terminate(child);
            let status = match status {
                Some(status) => status,
                None => child.wait()?,
            };
            capture.drain(rx, Some(Instant::now() + TERMINATE_GRACE));
            return Ok((status, true));
        }

        match rx.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
            Ok(chunk) => capture.absorb(chunk),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => capture.closed = 2,
        }
    }
}

/// SIGTERM the child's group, wait out the grace period, then SIGKILL.
///
/// The leader may already have been reaped; its group id stays valid while
/// any member is alive.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        let pid = child.id();
        let _ = signal_group(pid, libc::SIGTERM);

        let deadline = Instant::now() + TERMINATE_GRACE;
        while Instant::now() < deadline {
            if matches!(child.try_wait(), Ok(Some(_))) {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        let _ = signal_group(pid, libc::SIGKILL);
    }

    let _ = child.kill();
}

/// Send `signal` to the process group led by `pid`.
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn spawn_reader<R>(stream: Option<R>, kind: Stream, tx: Sender<Chunk>)
where
    R: Read + Send + 'static,
{
    match stream {
        Some(stream) => {
            thread::spawn(move || pump(stream, kind, &tx));
        }
        None => {
            let _ = tx.send(Chunk::Eof);
        }
    }
}

/// Forward a stream to `tx` until EOF.
///
/// At most one byte past [`MAX_OUTPUT_BYTES`] is forwarded so the collector
/// can tell a full stream from a truncated one; the rest is read and dropped.
fn pump<R: Read>(mut stream: R, kind: Stream, tx: &Sender<Chunk>) {
    let mut buf = [0u8; READ_CHUNK];
    let mut forwarded = 0;
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        if forwarded <= MAX_OUTPUT_BYTES {
            let keep = n.min(MAX_OUTPUT_BYTES + 1 - forwarded);
            forwarded += keep;
            if tx.send(Chunk::Data(kind, buf[..keep].to_vec())).is_err() {
                // Invocation already returned
                return;
            }
        }
    }
    let _ = tx.send(Chunk::Eof);
}

/// Decode captured bytes, cutting at [`MAX_OUTPUT_BYTES`] with a marker.
fn capture_text(mut bytes: Vec<u8>) -> String {
    let truncated = bytes.len() > MAX_OUTPUT_BYTES;
    bytes.truncate(MAX_OUTPUT_BYTES);
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if truncated {
        text.push('\n');
        text.push_str(TRUNCATION_MARKER);
        text.push('\n');
    }
    text
}
