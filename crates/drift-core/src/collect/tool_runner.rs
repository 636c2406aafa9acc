//! Bounded execution of the package tools (`rpm`, `dnf`, `rpm2cpio`).
//!
//! Every run is limited in wall time and captured output. A run that
//! overstays its deadline gets SIGTERM, then SIGKILL after a short grace
//! period. Children see only `PATH` and a C locale, so their output parses
//! the same on every host.
//!
//! ```ignore
//! use drift_core::collect::tool_runner::ToolRunnerBuilder;
//! use std::time::Duration;
//!
//! let runner = ToolRunnerBuilder::new()
//!     .timeout(Duration::from_secs(120))
//!     .allow_commands(["rpm"])
//!     .build();
//! let owners = runner.run("rpm", &["-qa"])?.require_complete()?.stdout_str();
//! ```

use std::collections::BTreeSet;
use std::io::{ErrorKind, Read};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, trace, warn};

/// Default wall-time limit per command, in seconds. `rpm -Va` digests every
/// installed file and takes minutes on a loaded host with thousands of
/// packages.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default cap per output stream (64 MiB): enough for `rpm2cpio` of a large
/// package and for the full `rpm -qa` file list.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

const KILL_GRACE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 8192;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("failed to start {command}: {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("output exceeded limit of {limit} bytes")]
    OutputTruncated { limit: usize },

    #[error("command exited with status {code}")]
    NonZeroExit { code: i32 },

    #[error("command killed by signal")]
    KilledBySignal,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("refusing to run {0:?}: not a plain command name or path")]
    InvalidCommand(String),

    #[error("command not in allowlist: {0}")]
    NotAllowed(String),
}

impl ToolError {
    /// Stable numeric code, inside the package-metadata band of the shared
    /// error type.
    pub fn code(&self) -> u32 {
        match self {
            ToolError::CommandNotFound(_) => 22,
            ToolError::SpawnFailed { .. } => 23,
            ToolError::Timeout(_) => 24,
            ToolError::OutputTruncated { .. } => 25,
            ToolError::NonZeroExit { .. } => 26,
            ToolError::KilledBySignal => 27,
            ToolError::Io(_) => 28,
            ToolError::InvalidCommand(_) | ToolError::NotAllowed(_) => 29,
        }
    }
}

impl From<ToolError> for drift_common::Error {
    fn from(err: ToolError) -> Self {
        drift_common::Error::PackageQuery(err.to_string())
    }
}

/// What a finished (or killed) command left behind.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub command: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the process died from a signal.
    pub exit_code: Option<i32>,
    /// Either stream hit the cap.
    pub truncated: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
    /// Cap that applied to this run.
    pub limit: usize,
}

impl ToolOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Reject partial output (timeout or truncation).
    ///
    /// The exit status is not checked: `rpm -Va` exits non-zero
    /// whenever it reports a modified file, and its stdout is still the
    /// answer.
    pub fn require_complete(self) -> Result<Self, ToolError> {
        if self.timed_out {
            return Err(ToolError::Timeout(self.elapsed));
        }
        if self.truncated {
            return Err(ToolError::OutputTruncated { limit: self.limit });
        }
        Ok(self)
    }

    /// [`require_complete`](Self::require_complete) plus a zero exit status.
    pub fn require_success(self) -> Result<Self, ToolError> {
        let output = self.require_complete()?;
        match output.exit_code {
            Some(0) => Ok(output),
            Some(code) => Err(ToolError::NonZeroExit { code }),
            None => Err(ToolError::KilledBySignal),
        }
    }
}

/// Limits shared by every run of one runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub timeout: Duration,
    /// Per-stream byte cap.
    pub max_output: usize,
    /// Empty means any command may run.
    pub allowed: BTreeSet<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output: DEFAULT_MAX_OUTPUT_BYTES,
            allowed: BTreeSet::new(),
        }
    }
}

/// Runs one command at a time under [`RunnerConfig`] limits.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    config: RunnerConfig,
}

impl ToolRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `cmd` with `args` and capture its output.
    ///
    /// Timeouts and truncation are reported on the [`ToolOutput`], not as
    /// errors; callers decide how strict to be.
    #[instrument(skip(self, args), fields(cmd = %cmd))]
    pub fn run(&self, cmd: &str, args: &[&str]) -> Result<ToolOutput, ToolError> {
        self.check_command(cmd)?;
        debug!(args = ?args, timeout_ms = self.config.timeout.as_millis() as u64, "running tool");

        let started = Instant::now();
        let mut child = sanitized_command(cmd, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ToolError::CommandNotFound(cmd.to_string()),
                _ => ToolError::SpawnFailed {
                    command: cmd.to_string(),
                    reason: e.to_string(),
                },
            })?;

        let finished = self.supervise(&mut child)?;
        let elapsed = started.elapsed();
        info!(
            exit_code = ?finished.status.and_then(|s| s.code()),
            elapsed_ms = elapsed.as_millis() as u64,
            stdout_bytes = finished.stdout.buf.len(),
            timed_out = finished.timed_out,
            "tool finished"
        );

        Ok(ToolOutput {
            command: cmd.to_string(),
            truncated: finished.stdout.truncated || finished.stderr.truncated,
            stdout: finished.stdout.buf,
            stderr: finished.stderr.buf,
            exit_code: finished.status.and_then(|s| s.code()),
            timed_out: finished.timed_out,
            elapsed,
            limit: self.config.max_output,
        })
    }

    fn check_command(&self, cmd: &str) -> Result<(), ToolError> {
        if cmd.is_empty() || cmd.contains(['|', '&', ';', '$', '`', '\n', '\r', ' ']) {
            return Err(ToolError::InvalidCommand(cmd.to_string()));
        }
        if !self.config.allowed.is_empty() {
            let name = Path::new(cmd)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(cmd);
            if !self.config.allowed.contains(cmd) && !self.config.allowed.contains(name) {
                return Err(ToolError::NotAllowed(cmd.to_string()));
            }
        }
        if cmd.starts_with('/') && !Path::new(cmd).exists() {
            return Err(ToolError::CommandNotFound(cmd.to_string()));
        }
        Ok(())
    }

    /// Pump both pipes until the child exits or the deadline passes.
    fn supervise(&self, child: &mut Child) -> Result<Finished, ToolError> {
        let limit = self.config.max_output;
        let mut stdout = Capture::new(child.stdout.take(), limit)?;
        let mut stderr = Capture::new(child.stderr.take(), limit)?;
        let deadline = Instant::now() + self.config.timeout;

        loop {
            let progressed = stdout.pump()? | stderr.pump()?;

            if let Some(status) = child.try_wait()? {
                stdout.drain()?;
                stderr.drain()?;
                trace!(?status, "child exited");
                return Ok(Finished {
                    stdout,
                    stderr,
                    status: Some(status),
                    timed_out: false,
                });
            }

            if Instant::now() >= deadline {
                warn!(timeout_ms = self.config.timeout.as_millis() as u64, "tool timed out");
                let status = terminate(child);
                return Ok(Finished {
                    stdout,
                    stderr,
                    status,
                    timed_out: true,
                });
            }

            if !progressed {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

struct Finished {
    stdout: Capture,
    stderr: Capture,
    status: Option<ExitStatus>,
    timed_out: bool,
}

/// One child pipe read without blocking into a capped buffer.
struct Capture {
    source: Option<Box<dyn ReadFd>>,
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

trait ReadFd: Read + AsRawFd {}
impl<T: Read + AsRawFd> ReadFd for T {}

impl Capture {
    fn new<R: Read + AsRawFd + 'static>(source: Option<R>, limit: usize) -> Result<Self, ToolError> {
        if let Some(stream) = &source {
            set_nonblocking(stream.as_raw_fd())?;
        }
        Ok(Self {
            source: source.map(|s| Box::new(s) as Box<dyn ReadFd>),
            buf: Vec::with_capacity(limit.min(64 * 1024)),
            limit,
            truncated: false,
        })
    }

    /// Read whatever is available now. Returns whether anything arrived.
    fn pump(&mut self) -> Result<bool, ToolError> {
        let Some(stream) = self.source.as_mut() else {
            return Ok(false);
        };
        let mut chunk = [0u8; READ_CHUNK];
        match stream.read(&mut chunk) {
            Ok(0) => {
                self.source = None;
                Ok(false)
            }
            Ok(n) => {
                self.keep(&chunk[..n]);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::Interrupted => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read until the pipe is empty. A grandchild may still hold the pipe
    /// open, so this stops at the first empty read instead of waiting for EOF.
    fn drain(&mut self) -> Result<(), ToolError> {
        while self.source.is_some() && !self.truncated {
            if !self.pump()? {
                break;
            }
        }
        Ok(())
    }

    fn keep(&mut self, data: &[u8]) {
        let room = self.limit.saturating_sub(self.buf.len());
        let take = data.len().min(room);
        self.buf.extend_from_slice(&data[..take]);
        if take < data.len() {
            self.truncated = true;
        }
    }
}

fn sanitized_command(cmd: &str, args: &[&str]) -> Command {
    let mut command = Command::new(cmd);
    command.args(args).env_clear();
    if let Some(path) = std::env::var_os("PATH") {
        command.env("PATH", path);
    }
    command.env("LC_ALL", "C").env("LANG", "C");
    command
}

fn set_nonblocking(fd: std::os::unix::io::RawFd) -> std::io::Result<()> {
    // SAFETY: fd belongs to a pipe we own for the lifetime of the call.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: as above; only the O_NONBLOCK bit changes.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// SIGTERM, a grace period, then SIGKILL. Returns the reaped status if any.
fn terminate(child: &mut Child) -> Option<ExitStatus> {
    let pid = child.id() as libc::pid_t;
    // SAFETY: pid is our own unreaped child.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    thread::sleep(KILL_GRACE);
    match child.try_wait() {
        Ok(Some(status)) => Some(status),
        Ok(None) => {
            warn!(pid, "still running after SIGTERM; sending SIGKILL");
            // SAFETY: as above.
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
            child.wait().ok()
        }
        Err(e) => {
            warn!(pid, error = %e, "could not reap timed-out child");
            None
        }
    }
}

/// Builds a [`ToolRunner`].
#[derive(Debug, Default)]
pub struct ToolRunnerBuilder {
    config: RunnerConfig,
}

impl ToolRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn max_output(mut self, bytes: usize) -> Self {
        self.config.max_output = bytes;
        self
    }

    /// Restrict the runner to these command names.
    pub fn allow_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed.extend(commands.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> ToolRunner {
        ToolRunner::new(self.config)
    }
}
