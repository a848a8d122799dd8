//! External tool supervisor.
//!
//! Runs a command-line tool with stdout piped, drains that pipe on one
//! scoped reader thread while the calling thread waits for exit, and
//! forwards every line to the [`Logger`] as soon as it is read.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, instrument};

use doku_shared::{DokuError, LogLevel, Logger, Result, Severity};

/// One invocation of an external tool.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Flag naming the tool's own verbosity option (e.g. `--logLevel`).
    /// When set, the value derived from the logger's level is prepended.
    pub verbosity_flag: Option<&'static str>,
    /// Accumulate stdout and return it on success.
    pub capture: bool,
}

impl ToolInvocation {
    pub fn new(program: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            verbosity_flag: None,
            capture: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn verbosity_flag(mut self, flag: &'static str) -> Self {
        self.verbosity_flag = Some(flag);
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Full argument list: verbosity option first, then the caller's arguments.
    pub fn command_args(&self, level: LogLevel) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        if let (Some(flag), Some(value)) = (self.verbosity_flag, verbosity_value(level)) {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Tool verbosity matching a log level; `None` passes no flag at all.
pub fn verbosity_value(level: LogLevel) -> Option<&'static str> {
    match level {
        LogLevel::Verbose => Some("Verbose"),
        LogLevel::Info => Some("Info"),
        LogLevel::Warning => Some("Warning"),
        LogLevel::Error => Some("Error"),
        LogLevel::None => None,
    }
}

/// Run the tool to completion.
///
/// Returns the captured stdout when [`ToolInvocation::capture`] was set,
/// `None` otherwise. A non-zero exit is a [`DokuError::Tool`].
#[instrument(skip_all, fields(program = %invocation.program.display()))]
pub fn run(invocation: &ToolInvocation, logger: &Logger) -> Result<Option<String>> {
    let args = invocation.command_args(logger.level());
    logger.verbose(format!(
        "Running {} {}",
        invocation.program.display(),
        args.join(" ")
    ));

    let mut child = Command::new(&invocation.program)
        .args(&args)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| {
            DokuError::tool(format!(
                "failed to launch {}: {e}",
                invocation.program.display()
            ))
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DokuError::tool("failed to capture tool stdout"))?;

    let capture = invocation.capture;
    let (status, drained) = std::thread::scope(|scope| {
        let reader = scope.spawn(move || drain_lines(stdout, logger, capture));
        let status = child.wait();
        (status, reader.join())
    });

    let status = status.map_err(|e| {
        DokuError::tool(format!(
            "failed to wait for {}: {e}",
            invocation.program.display()
        ))
    })?;
    let captured = drained
        .map_err(|_| DokuError::tool("tool output reader panicked"))?
        .map_err(|e| DokuError::tool(format!("failed to read tool output: {e}")))?;

    debug!(code = ?status.code(), "tool exited");
    if !status.success() {
        return Err(DokuError::tool(format!(
            "Failed to run {}",
            invocation.program.display()
        )));
    }

    Ok(capture.then_some(captured))
}

/// Read stdout to EOF, forwarding each line and optionally accumulating it.
fn drain_lines(stdout: impl Read, logger: &Logger, capture: bool) -> std::io::Result<String> {
    let mut reader = BufReader::new(stdout);
    let mut captured = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);

        let (severity, message) = classify_line(line);
        logger.log(severity, message);

        if capture {
            captured.push_str(line);
            captured.push('\n');
        }
    }

    Ok(captured)
}

/// Map one line of tool output to a severity and message.
///
/// Lines shaped `[<Severity>]: <message>` (or the site generator's
/// `[<timestamp>]<Severity>:<message>`) map to that severity; unknown tokens
/// fall to verbose. Lines not starting with `[` are info, verbatim.
pub fn classify_line(line: &str) -> (Severity, &str) {
    let Some(rest) = line.strip_prefix('[') else {
        return (Severity::Info, line);
    };
    let Some((token, after)) = rest.split_once(']') else {
        return (Severity::Verbose, line.trim());
    };

    if let Some(severity) = parse_severity(token) {
        let message = after.trim_start();
        let message = message.strip_prefix(':').unwrap_or(message);
        return (severity, message.trim());
    }

    match after.split_once(':') {
        Some((token, message)) => (
            parse_severity(token).unwrap_or(Severity::Verbose),
            message.trim(),
        ),
        None => (Severity::Verbose, after.trim()),
    }
}

fn parse_severity(token: &str) -> Option<Severity> {
    match token.trim().to_ascii_lowercase().as_str() {
        "verbose" | "diagnostic" | "debug" => Some(Severity::Verbose),
        "info" | "information" => Some(Severity::Info),
        "warning" | "warn" => Some(Severity::Warning),
        "error" => Some(Severity::Error),
        _ => None,
    }
}
