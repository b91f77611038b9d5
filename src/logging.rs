//! Internal logging helpers for structured filter events.

use std::fmt;

use crate::batch::BatchId;

/// Single logging target for the filter engine.
pub(crate) const LOG_TARGET: &str = "fink_filters";

/// Common fields appended to every event of a scope: the emitting component
/// and, once known, the batch being processed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LogContext<'a> {
    component: &'static str,
    batch: Option<&'a BatchId>,
}

impl LogContext<'static> {
    /// Context for events of `component`, not tied to a batch.
    pub(crate) const fn component(component: &'static str) -> Self {
        Self {
            component,
            batch: None,
        }
    }
}

impl LogContext<'_> {
    /// Same component, scoped to `batch`.
    pub(crate) fn batch<'b>(&self, batch: &'b BatchId) -> LogContext<'b> {
        LogContext {
            component: self.component,
            batch: Some(batch),
        }
    }
}

impl fmt::Display for LogContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component={}", self.component)?;
        if let Some(batch) = self.batch {
            write!(f, " batch={batch}")?;
        }
        Ok(())
    }
}

macro_rules! filter_log {
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {}",
                $event,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
    ($level:expr, ctx: $ctx:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!(target: crate::logging::LOG_TARGET, $level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {} {}",
                $event,
                $ctx,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use filter_log;
