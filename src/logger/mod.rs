//! Minimal logger capability used by the transports.
//!
//! Five severities, each taking a message and ordered key-value pairs.
//! [`TracingLogger`] (the default) forwards to `tracing`; [`NopLogger`]
//! discards everything.

use std::fmt::Display;
use std::sync::Arc;

pub type SharedLogger = Arc<dyn Logger>;

pub trait Logger: Send + Sync + 'static {
    fn debug(&self, msg: &str, fields: &[(&str, String)]);
    fn info(&self, msg: &str, fields: &[(&str, String)]);
    fn warn(&self, msg: &str, fields: &[(&str, String)]);
    fn error(&self, msg: &str, fields: &[(&str, String)]);
    /// Logs at the highest severity. Does not terminate the process.
    fn fatal(&self, msg: &str, fields: &[(&str, String)]);
}

/// Build one key-value pair.
pub fn kv(key: &str, value: impl Display) -> (&str, String) {
    (key, value.to_string())
}

fn render(fields: &[(&str, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Forwards to `tracing` events under the `modrouter` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::debug!(target: "modrouter", fields = %render(fields), "{msg}");
    }

    fn info(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::info!(target: "modrouter", fields = %render(fields), "{msg}");
    }

    fn warn(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::warn!(target: "modrouter", fields = %render(fields), "{msg}");
    }

    fn error(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::error!(target: "modrouter", fields = %render(fields), "{msg}");
    }

    fn fatal(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::error!(target: "modrouter", fatal = true, fields = %render(fields), "{msg}");
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl Logger for NopLogger {
    fn debug(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn info(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn warn(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn error(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn fatal(&self, _msg: &str, _fields: &[(&str, String)]) {}
}

pub(crate) fn default_logger() -> SharedLogger {
    Arc::new(TracingLogger)
}

/// Keeps every record in memory; for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingLogger {
    records: std::sync::Mutex<Vec<(&'static str, String, String)>>,
}

#[cfg(test)]
impl RecordingLogger {
    fn push(&self, level: &'static str, msg: &str, fields: &[(&str, String)]) {
        self.records
            .lock()
            .unwrap()
            .push((level, msg.to_string(), render(fields)));
    }

    /// `(level, message, rendered fields)` in arrival order.
    pub(crate) fn records(&self) -> Vec<(&'static str, String, String)> {
        self.records.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl Logger for RecordingLogger {
    fn debug(&self, msg: &str, fields: &[(&str, String)]) {
        self.push("debug", msg, fields);
    }
    fn info(&self, msg: &str, fields: &[(&str, String)]) {
        self.push("info", msg, fields);
    }
    fn warn(&self, msg: &str, fields: &[(&str, String)]) {
        self.push("warn", msg, fields);
    }
    fn error(&self, msg: &str, fields: &[(&str, String)]) {
        self.push("error", msg, fields);
    }
    fn fatal(&self, msg: &str, fields: &[(&str, String)]) {
        self.push("fatal", msg, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_order() {
        let fields = [kv("action", "file.save"), kv("keys", "ctrl+s")];
        assert_eq!(render(&fields), "action=file.save keys=ctrl+s");
    }

    #[test]
    fn test_recording_logger() {
        let logger = RecordingLogger::default();
        logger.warn("overwrote", &[kv("route", "GET /x")]);
        logger.fatal("boom", &[]);
        let records = logger.records();
        assert_eq!(records[0], ("warn", "overwrote".into(), "route=GET /x".into()));
        assert_eq!(records[1].0, "fatal");
    }

    #[test]
    fn test_tracing_and_nop_loggers_accept_fields() {
        let loggers: [SharedLogger; 2] = [Arc::new(TracingLogger), Arc::new(NopLogger)];
        for logger in loggers {
            logger.info("hello", &[kv("n", 1)]);
            logger.error("bad", &[]);
        }
    }
}
