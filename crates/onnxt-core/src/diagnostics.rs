//! Severity-tagged diagnostic sinks.
//!
//! Import steps report user-facing conditions (a weight was transposed, a
//! node could not be converted) through a [`DiagnosticSink`] rather than
//! logging directly, so callers decide where the messages end up.

use std::cell::RefCell;
use std::fmt;
use tracing::{debug, error, info, warn};

/// Message severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// An invariant inside the importer broke.
    InternalError,
    /// The operation failed.
    Error,
    /// The operation succeeded with a caveat.
    Warning,
    /// Progress information.
    Info,
    /// Detailed tracing output.
    Verbose,
}

impl Severity {
    /// Map a verbosity level to a severity threshold.
    ///
    /// Level 2 is [`Severity::Warning`]; each step up or down moves one
    /// severity and the result saturates at both ends.
    pub fn from_verbosity(level: i32) -> Self {
        match level {
            i32::MIN..=0 => Self::InternalError,
            1 => Self::Error,
            2 => Self::Warning,
            3 => Self::Info,
            _ => Self::Verbose,
        }
    }

    /// Inverse of [`from_verbosity`](Self::from_verbosity).
    pub const fn verbosity(self) -> i32 {
        match self {
            Self::InternalError => 0,
            Self::Error => 1,
            Self::Warning => 2,
            Self::Info => 3,
            Self::Verbose => 4,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InternalError => "INTERNAL_ERROR",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
            Self::Verbose => "VERBOSE",
        })
    }
}

/// Receiver for `(severity, message)` pairs.
pub trait DiagnosticSink {
    /// Record one message.
    fn log(&self, severity: Severity, message: &str);
}

/// Forwards diagnostics to `tracing`, dropping anything less severe than
/// `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    threshold: Severity,
}

impl TracingSink {
    /// Sink that forwards messages up to and including `threshold`.
    pub const fn new(threshold: Severity) -> Self {
        Self { threshold }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Severity::Verbose)
    }
}

impl DiagnosticSink for TracingSink {
    fn log(&self, severity: Severity, message: &str) {
        if severity > self.threshold {
            return;
        }
        match severity {
            Severity::InternalError | Severity::Error => error!(%severity, "{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Info => info!("{message}"),
            Severity::Verbose => debug!("{message}"),
        }
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: RefCell<Vec<(Severity, String)>>,
}

impl CollectingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded messages in arrival order.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.borrow().clone()
    }

    /// Messages recorded at exactly `severity`.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn log(&self, severity: Severity, message: &str) {
        self.entries.borrow_mut().push((severity, message.to_string()));
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::rc::Rc<S> {
    fn log(&self, severity: Severity, message: &str) {
        (**self).log(severity, message);
    }
}
