//! External Process Execution
//!
//! Each invocation runs as the leader of a fresh process group so that a
//! distributed program's workers can be signalled together. On timeout or
//! cancellation the whole group gets SIGTERM, a grace period, then SIGKILL.
//! Output pipes are drained on background threads so a chatty child never
//! blocks on a full pipe.

use crate::error::RunnerError;
use std::ffi::OsString;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default time the group gets between SIGTERM and SIGKILL
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Maximum stderr kept for error reports
const STDERR_TAIL: usize = 4096;

/// Shared flag set by the operator interrupt handler
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Fresh, not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Program plus arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable to launch
    pub program: PathBuf,
    /// Arguments in order
    pub args: Vec<OsString>,
}

impl CommandLine {
    /// Command with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Printable form for logs
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Spawn to exit, measured by the runner
    pub wall_time: Duration,
}

impl ProcessOutput {
    /// Wall-clock time in microseconds
    pub fn wall_micros(&self) -> u64 {
        self.wall_time.as_micros() as u64
    }
}

/// Runs external programs one at a time under a timeout
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    grace_period: Duration,
    cancellation: CancellationToken,
}

impl ProcessRunner {
    /// Runner with the given per-invocation timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            grace_period: DEFAULT_GRACE_PERIOD,
            cancellation: CancellationToken::new(),
        }
    }

    /// Override the SIGTERM to SIGKILL grace period
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Observe an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Per-invocation timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Token polled while a process runs
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Run `command` to completion.
    ///
    /// Exit codes outside `allowed_exit_codes` become
    /// [`RunnerError::ExitCode`]. On timeout or cancellation the process
    /// group is torn down before the error is returned.
    pub fn run(
        &self,
        command: &CommandLine,
        allowed_exit_codes: &[i32],
    ) -> Result<ProcessOutput, RunnerError> {
        if self.cancellation.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        tracing::debug!(command = %command.display(), "spawning");
        let started = Instant::now();
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .spawn()?;

        let mut group = ProcessGroup::new(child, self.grace_period);
        let stdout = drain(group.child.stdout.take());
        let stderr = drain(group.child.stderr.take());

        // A timeout too large to represent never expires
        let deadline = started.checked_add(self.timeout);
        let status = loop {
            if let Some(status) = group.child.try_wait()? {
                break status;
            }
            if self.cancellation.is_cancelled() {
                group.terminate();
                join_drain(stdout);
                join_drain(stderr);
                return Err(RunnerError::Cancelled);
            }
            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                tracing::debug!(command = %command.display(), "timeout, terminating process group");
                group.terminate();
                join_drain(stdout);
                join_drain(stderr);
                return Err(RunnerError::Timeout { after: self.timeout });
            }
            thread::sleep(deadline.map_or(POLL_INTERVAL, |d| POLL_INTERVAL.min(d - now)));
        };
        let wall_time = started.elapsed();

        // The leader is gone; anything left in its group is a straggler.
        group.reap_stragglers();
        let stdout = join_drain(stdout);
        let stderr = join_drain(stderr);

        check_exit(command, status, &stderr, allowed_exit_codes)?;

        Ok(ProcessOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or_default(),
            wall_time,
        })
    }
}

fn check_exit(
    command: &CommandLine,
    status: ExitStatus,
    stderr: &str,
    allowed_exit_codes: &[i32],
) -> Result<(), RunnerError> {
    match status.code() {
        Some(code) if allowed_exit_codes.contains(&code) => Ok(()),
        code => Err(RunnerError::ExitCode {
            program: command.program.display().to_string(),
            code,
            stderr: tail(stderr, STDERR_TAIL).trim().to_string(),
        }),
    }
}

fn tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn join_drain(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Send `signal` to every process in group `pgid`.
fn signal_group(pgid: libc::pid_t, signal: libc::c_int) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::killpg(pgid, signal) };
    if ret == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Child process owning its own process group
struct ProcessGroup {
    child: Child,
    pgid: libc::pid_t,
    grace_period: Duration,
    finished: bool,
}

impl ProcessGroup {
    fn new(child: Child, grace_period: Duration) -> Self {
        let pgid = child.id() as libc::pid_t;
        Self {
            child,
            pgid,
            grace_period,
            finished: false,
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// SIGTERM the group, wait out the grace period, then SIGKILL.
    fn terminate(&mut self) {
        // The group may already be gone
        let _ = signal_group(self.pgid, libc::SIGTERM);

        let deadline = Instant::now().checked_add(self.grace_period);
        while deadline.map_or(true, |d| Instant::now() < d) && self.is_alive() {
            thread::sleep(POLL_INTERVAL);
        }

        // Workers can outlive the leader, so the group is killed regardless
        let _ = signal_group(self.pgid, libc::SIGKILL);
        let _ = self.child.wait();
        self.finished = true;
    }

    fn reap_stragglers(&mut self) {
        let _ = signal_group(self.pgid, libc::SIGKILL);
        self.finished = true;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if !self.finished {
            self.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandLine {
        CommandLine::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_captures_stdout_and_exit_code() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let out = runner.run(&sh("echo hello; echo world"), &[0]).unwrap();
        assert_eq!(out.stdout, "hello\nworld\n");
        assert_eq!(out.exit_code, 0);
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        let runner = ProcessRunner::new(Duration::MAX);
        let out = runner.run(&sh("echo fine"), &[0]).unwrap();
        assert_eq!(out.stdout.trim(), "fine");
    }

    #[test]
    fn test_allowed_nonzero_exit() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        let out = runner.run(&sh("echo differ; exit 1"), &[0, 1]).unwrap();
        assert_eq!(out.exit_code, 1);
        assert_eq!(out.stdout.trim(), "differ");
    }

    #[test]
    fn test_disallowed_exit_reports_code_and_stderr() {
        let runner = ProcessRunner::new(Duration::from_secs(10));
        match runner.run(&sh("echo oops >&2; exit 3"), &[0]) {
            Err(RunnerError::ExitCode { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected exit code error, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_whole_group() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("survived");
        // The background worker would create the marker if it outlived the group
        let script = format!("(sleep 1; touch {}) & sleep 30", marker.display());
        let runner =
            ProcessRunner::new(Duration::from_millis(200)).with_grace_period(Duration::from_millis(100));

        let started = Instant::now();
        let err = runner.run(&sh(&script), &[0]).unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(5));

        thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[test]
    fn test_cancellation_before_and_during_run() {
        let token = CancellationToken::new();
        let runner = ProcessRunner::new(Duration::from_secs(30)).with_cancellation(token.clone());

        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                token.cancel();
            })
        };
        let started = Instant::now();
        let err = runner.run(&sh("sleep 30"), &[0]).unwrap_err();
        canceller.join().unwrap();
        assert!(err.is_cancellation());
        assert!(started.elapsed() < Duration::from_secs(5));

        // Already cancelled: nothing is spawned
        assert!(runner.run(&sh("true"), &[0]).unwrap_err().is_cancellation());
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let runner = ProcessRunner::new(Duration::from_secs(1));
        let err = runner
            .run(&CommandLine::new("/nonexistent/diff-program"), &[0])
            .unwrap_err();
        assert!(matches!(err, RunnerError::Spawn(_)));
    }

    #[test]
    fn test_tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("abcdef", 2), "ef");
        assert_eq!(tail("aμb", 2), "b");
    }
}
