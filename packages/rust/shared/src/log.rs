//! Explicit logger handle threaded through every build component.
//!
//! Every message is forwarded to `tracing` and, when it passes the handle's
//! threshold, counted so the CLI can print an end-of-build summary and
//! derive its exit code from whether anything was logged at error severity.
//! Only the most recent messages are kept in memory.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Severity of a single log message, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Verbose,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Verbose,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum severity a [`Logger`] records; `None` silences it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Verbose,
    #[default]
    Info,
    Warning,
    Error,
    None,
}

impl LogLevel {
    /// The lowest severity admitted at this level.
    pub fn min_severity(&self) -> Option<Severity> {
        match self {
            Self::Verbose => Some(Severity::Verbose),
            Self::Info => Some(Severity::Info),
            Self::Warning => Some(Severity::Warning),
            Self::Error => Some(Severity::Error),
            Self::None => None,
        }
    }

    pub fn admits(&self, severity: Severity) -> bool {
        self.min_severity().is_some_and(|min| severity >= min)
    }

    /// Matching `tracing` filter directive for the CLI subscriber.
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            Self::Verbose => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
            Self::None => "off",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" | "debug" | "trace" => Ok(Self::Verbose),
            "info" | "information" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// A message that passed the logger's threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Messages retained by default; older ones are dropped but still counted.
pub const DEFAULT_RECORD_LIMIT: usize = 1024;

/// Logger handle shared by the pipeline, the stagers and the tool supervisor.
///
/// `Sync`: the supervisor's stdout reader thread logs through the same handle.
#[derive(Debug)]
pub struct Logger {
    level: LogLevel,
    ci_groups: bool,
    has_errors: AtomicBool,
    counts: [AtomicUsize; 4],
    record_limit: usize,
    records: Mutex<VecDeque<LogRecord>>,
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            ci_groups: false,
            has_errors: AtomicBool::new(false),
            counts: Default::default(),
            record_limit: DEFAULT_RECORD_LIMIT,
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Keep at most `limit` recent messages for [`Logger::records`].
    pub fn with_record_limit(mut self, limit: usize) -> Self {
        self.record_limit = limit;
        self
    }

    /// Emit GitHub Actions `::group::` markers around log groups.
    pub fn with_ci_groups(mut self, enabled: bool) -> Self {
        self.ci_groups = enabled;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// True once anything has been logged at error severity.
    pub fn has_errors(&self) -> bool {
        self.has_errors.load(Ordering::Relaxed)
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();

        if severity == Severity::Error {
            self.has_errors.store(true, Ordering::Relaxed);
        }

        if !self.level.admits(severity) {
            return;
        }

        match severity {
            Severity::Verbose => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }

        self.counts[severity as usize].fetch_add(1, Ordering::Relaxed);

        if self.record_limit == 0 {
            return;
        }
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if records.len() == self.record_limit {
            records.pop_front();
        }
        records.push_back(LogRecord { severity, message });
    }

    pub fn verbose(&self, message: impl Into<String>) {
        self.log(Severity::Verbose, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    /// Open a named group of log lines; the group closes when the guard drops.
    pub fn begin_group(&self, title: &str) -> LogGroup<'_> {
        if self.ci_groups {
            println!("::group::{title}");
        }
        let span = tracing::info_span!("group", title).entered();
        tracing::info!("── {title}");
        LogGroup {
            logger: self,
            _span: span,
        }
    }

    /// Snapshot of the retained messages, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn summary(&self) -> LogSummary {
        LogSummary {
            counts: std::array::from_fn(|i| self.counts[i].load(Ordering::Relaxed)),
            failed: self.has_errors(),
        }
    }
}

/// Guard returned by [`Logger::begin_group`].
pub struct LogGroup<'a> {
    logger: &'a Logger,
    _span: tracing::span::EnteredSpan,
}

impl Drop for LogGroup<'_> {
    fn drop(&mut self) {
        if self.logger.ci_groups {
            println!("::endgroup::");
        }
    }
}

/// True when running inside a GitHub Actions job.
pub fn is_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Overall result of a build as seen through its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Succeeded,
    SucceededWithWarnings,
    Failed,
}

/// Per-severity message counts collected by a [`Logger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSummary {
    counts: [usize; 4],
    failed: bool,
}

impl LogSummary {
    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity as usize]
    }

    pub fn outcome(&self) -> BuildOutcome {
        if self.failed || self.count(Severity::Error) > 0 {
            BuildOutcome::Failed
        } else if self.count(Severity::Warning) > 0 {
            BuildOutcome::SucceededWithWarnings
        } else {
            BuildOutcome::Succeeded
        }
    }

    pub fn headline(&self) -> &'static str {
        match self.outcome() {
            BuildOutcome::Failed => "Build failed.",
            BuildOutcome::SucceededWithWarnings => "Succeeded with warnings.",
            BuildOutcome::Succeeded => "Build succeeded.",
        }
    }
}
