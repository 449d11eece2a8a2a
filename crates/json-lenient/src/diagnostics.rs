//! Injectable diagnostic output.
//!
//! Diagnostics are observational only: a sink can never change how a value
//! decodes. Without an injected sink, messages go to [`tracing`].

use std::fmt;
use std::sync::Arc;

use crate::options::Options;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Trace,
}

/// Receiver of diagnostic messages.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, level: Level, message: fmt::Arguments<'_>);
}

/// Forwards diagnostics to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, level: Level, message: fmt::Arguments<'_>) {
        match level {
            Level::Debug => tracing::debug!("{message}"),
            Level::Trace => tracing::trace!("{message}"),
        }
    }
}

/// Options-gated handle to a sink, cloned into every copy function.
#[derive(Clone)]
pub(crate) struct Diagnostics {
    options: Options,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub(crate) fn new(options: Options, sink: Option<Arc<dyn DiagnosticSink>>) -> Self {
        Self {
            options,
            sink: sink.unwrap_or_else(|| Arc::new(TracingSink)),
        }
    }

    pub(crate) fn options(&self) -> Options {
        self.options
    }

    pub(crate) fn debug(&self, message: fmt::Arguments<'_>) {
        if self.options.debug() {
            self.sink.record(Level::Debug, message);
        }
    }

    pub(crate) fn trace(&self, message: fmt::Arguments<'_>) {
        if self.options.trace() {
            self.sink.record(Level::Trace, message);
        }
    }

    pub(crate) fn trace_assign(&self, from: &Value, to: &Value) {
        self.trace(format_args!("assign: {} => {}", from.kind(), to.kind()));
    }
}
