use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::RunError;
use crate::sink::Sink;
use crate::trace::TraceReport;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Exit code reported when the child is killed for exceeding its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Result of executing a command: captured output + metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Command vector as given by the caller.
    pub command: Vec<String>,
    /// Argument vector actually executed; differs from `command` in shell mode.
    pub argv: Vec<String>,
    pub elapsed_ms: u128,
    pub timed_out: bool,
}

impl RunResult {
    /// Merge stdout + stderr into a single string.
    pub fn combined(&self) -> String {
        let mut buf = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !buf.is_empty() {
                buf.push('\n');
            }
            buf.push_str(&self.stderr);
        }
        buf
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn trace_report(&self) -> TraceReport<'_> {
        TraceReport::new(self)
    }

    /// Print what ran and what it produced to stderr.
    pub fn trace(&self) {
        eprintln!("{}", self.trace_report());
    }
}

/// Run with default options. See [`Runner::run`].
pub fn run(command: &[String], live: bool, shell_mode: bool) -> RunResult {
    Runner::new().run(command, live, shell_mode)
}

/// Launches one child per call, polls its sinks, and builds a `RunResult`.
#[derive(Debug, Clone)]
pub struct Runner {
    poll_interval: Duration,
    timeout: Option<Duration>,
    temp_dir: Option<PathBuf>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            temp_dir: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let mut runner =
            Self::new().with_poll_interval(Duration::from_millis(cfg.poll_interval_ms));
        if let Some(secs) = cfg.timeout_secs {
            runner = runner.with_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &cfg.temp_dir {
            runner = runner.with_temp_dir(dir);
        }
        runner
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Kill the child once it has run this long.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Directory for the stdout/stderr sinks instead of the system temp dir.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Run `command` to completion.
    ///
    /// With `live`, output is forwarded to this process's stdout/stderr as
    /// it is drained. With `shell_mode`, the vector is joined and handed to
    /// the platform shell. Never fails: launch errors come back as a
    /// non-zero `exit_code` with the reason in `stderr`.
    pub fn run(&self, command: &[String], live: bool, shell_mode: bool) -> RunResult {
        if live {
            self.run_mirrored(command, shell_mode, &mut io::stdout(), &mut io::stderr())
        } else {
            self.run_inner(command, shell_mode, None)
        }
    }

    /// Like `run` in live mode, but mirrors into the given writers.
    pub fn run_mirrored<'a>(
        &self,
        command: &[String],
        shell_mode: bool,
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
    ) -> RunResult {
        self.run_inner(command, shell_mode, Some(Mirror { out, err }))
    }

    fn run_inner(
        &self,
        command: &[String],
        shell_mode: bool,
        mut mirror: Option<Mirror<'_>>,
    ) -> RunResult {
        let start = Instant::now();
        let argv = if shell_mode {
            shell_argv(command)
        } else {
            command.to_vec()
        };

        let mut capture = Capture::default();
        let outcome = self.execute(&argv, &mut capture, mirror.as_mut(), start);

        let (exit_code, timed_out) = match outcome {
            Ok(Exit { status, timed_out }) => {
                let code = if timed_out { TIMEOUT_EXIT_CODE } else { status_code(status) };
                (code, timed_out)
            }
            Err(e) => {
                tracing::debug!(error = %e, "command did not run to completion");
                if !capture.err.is_empty() && !capture.err.ends_with(b"\n") {
                    capture.err.push(b'\n');
                }
                capture.err.extend_from_slice(e.to_string().as_bytes());
                (e.exit_code(), false)
            }
        };

        RunResult {
            stdout: decode(&capture.out),
            stderr: decode(&capture.err),
            exit_code,
            command: command.to_vec(),
            argv,
            elapsed_ms: start.elapsed().as_millis(),
            timed_out,
        }
    }

    fn execute(
        &self,
        argv: &[String],
        capture: &mut Capture,
        mut mirror: Option<&mut Mirror<'_>>,
        start: Instant,
    ) -> Result<Exit, RunError> {
        let dir = self.temp_dir.as_deref();
        let mut out_sink = open_sink("stdout", dir)?;
        let mut err_sink = open_sink("stderr", dir)?;

        let mut child = launch(argv, &out_sink, &err_sink)?;
        tracing::debug!(pid = child.id(), program = %argv[0], "spawned");

        let mut timed_out = false;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ok(status),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "try_wait failed, blocking on wait");
                    break child.wait().map_err(RunError::Wait);
                }
            }
            if let Some(limit) = self.timeout
                && start.elapsed() >= limit
            {
                tracing::warn!(pid = child.id(), ?limit, "timeout exceeded, killing child");
                timed_out = true;
                break kill(&mut child);
            }
            thread::sleep(self.poll_interval);
            drain_step(&mut out_sink, &mut err_sink, capture, mirror.as_deref_mut());
        };

        // Output flushed between the last tick and exit is still in the sinks.
        drain_step(&mut out_sink, &mut err_sink, capture, mirror.as_deref_mut());
        out_sink.close();
        err_sink.close();

        Ok(Exit {
            status: status?,
            timed_out,
        })
    }
}

struct Mirror<'a> {
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
}

#[derive(Default)]
struct Capture {
    out: Vec<u8>,
    err: Vec<u8>,
}

struct Exit {
    status: ExitStatus,
    timed_out: bool,
}

fn open_sink(stream: &'static str, dir: Option<&Path>) -> Result<Sink, RunError> {
    Sink::create(stream, dir).map_err(|source| RunError::Sink { stream, source })
}

/// Spawn `argv` with stdout/stderr bound to the sinks' write sides.
fn launch(argv: &[String], out: &Sink, err: &Sink) -> Result<Child, RunError> {
    let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
    let spawn_err = |source| RunError::Spawn {
        program: program.clone(),
        source,
    };
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(out.stdio().map_err(spawn_err)?)
        .stderr(err.stdio().map_err(spawn_err)?)
        .spawn()
        .map_err(spawn_err)
}

fn kill(child: &mut Child) -> Result<ExitStatus, RunError> {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "kill failed");
    }
    child.wait().map_err(RunError::Wait)
}

/// Pull whatever is new from both sinks, stdout first.
fn drain_step(
    out: &mut Sink,
    err: &mut Sink,
    capture: &mut Capture,
    mut mirror: Option<&mut Mirror<'_>>,
) {
    let out_chunk = drain(out, "stdout");
    if !out_chunk.is_empty() {
        if let Some(m) = mirror.as_deref_mut() {
            forward(&mut *m.out, &out_chunk);
        }
        capture.out.extend_from_slice(&out_chunk);
    }

    let err_chunk = drain(err, "stderr");
    if !err_chunk.is_empty() {
        if let Some(m) = mirror.as_deref_mut() {
            forward(&mut *m.err, &err_chunk);
        }
        capture.err.extend_from_slice(&err_chunk);
    }
}

fn drain(sink: &mut Sink, stream: &str) -> Vec<u8> {
    match sink.drain() {
        Ok(chunk) => {
            if !chunk.is_empty() {
                tracing::trace!(stream, bytes = chunk.len(), "drained");
            }
            chunk
        }
        Err(e) => {
            tracing::warn!(stream, error = %e, "failed to read sink");
            Vec::new()
        }
    }
}

fn forward(w: &mut dyn Write, chunk: &[u8]) {
    if let Err(e) = w.write_all(chunk).and_then(|()| w.flush()) {
        tracing::debug!(error = %e, "live mirror write failed");
    }
}

/// Wrap a command vector for the platform shell.
pub fn shell_argv(command: &[String]) -> Vec<String> {
    let script = command.join(" ");
    if cfg!(windows) {
        vec!["cmd".into(), "/C".into(), script]
    } else {
        vec!["sh".into(), "-c".into(), script]
    }
}

fn status_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}
