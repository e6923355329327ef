//! Failure reporting for verbs whose failures bypass normal propagation.
//!
//! In structured (`--json`) mode stdout must stay a single well-formed event
//! stream, so a failed push is emitted as one JSON error event and the
//! process terminates with status 1 instead of returning the error to a
//! caller that would print it as free text. A failed log is always fatal.

use crate::CoreError;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, error};

/// Exit status used when a reporter terminates the process.
pub const EXIT_FAILURE: i32 = 1;

/// Machine-readable event consumer.
pub trait EventSink {
    fn report_error(&self, err: &dyn std::error::Error, timestamp: &str);
}

/// Decides what happens to verb failures that are not simply propagated.
pub trait FailureReporter {
    /// Handle a failed push. `Err` hands the failure back for normal
    /// propagation; `Ok` means it was consumed and the invocation is over.
    fn push_failed(&self, err: CoreError) -> Result<(), CoreError>;

    /// Handle a failed log. Log failures are fatal for the invocation.
    fn log_failed(&self, err: CoreError) -> Result<(), CoreError>;
}

#[derive(Serialize)]
struct ErrorEvent<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    timestamp: &'a str,
}

/// Current time as `<unix seconds>.<microseconds>`.
pub fn timestamp_now() -> String {
    let now = chrono::Utc::now();
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

/// One JSON error event, without trailing newline.
pub fn event_line(err: &dyn std::error::Error, timestamp: &str) -> String {
    let message = err.to_string();
    let event = ErrorEvent {
        error: ErrorBody {
            message: &message,
            timestamp,
        },
    };
    serde_json::to_string(&event).unwrap_or_else(|e| {
        format!(r#"{{"error":{{"message":"event serialization failed: {e}","timestamp":"{timestamp}"}}}}"#)
    })
}

/// Writes one JSON event per line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEventSink;

impl EventSink for ConsoleEventSink {
    fn report_error(&self, err: &dyn std::error::Error, timestamp: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", event_line(err, timestamp));
        let _ = stdout.flush();
    }
}

/// Reporter used by the `loam` binary.
pub struct ConsoleReporter<S = ConsoleEventSink> {
    sink: S,
    structured: bool,
    exit: fn(i32) -> !,
}

impl<S: EventSink> ConsoleReporter<S> {
    pub fn new(sink: S, structured: bool) -> Self {
        Self {
            sink,
            structured,
            exit: std::process::exit,
        }
    }

    /// Replace process termination, e.g. to observe it in tests.
    #[must_use]
    pub fn with_exit(mut self, exit: fn(i32) -> !) -> Self {
        self.exit = exit;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: EventSink> FailureReporter for ConsoleReporter<S> {
    fn push_failed(&self, err: CoreError) -> Result<(), CoreError> {
        if !self.structured {
            return Err(err);
        }
        debug!("push failed in structured mode, emitting error event");
        self.sink.report_error(&err, &timestamp_now());
        (self.exit)(EXIT_FAILURE)
    }

    fn log_failed(&self, err: CoreError) -> Result<(), CoreError> {
        error!("{err}");
        (self.exit)(EXIT_FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_runtime::RuntimeError;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl EventSink for RecordingSink {
        fn report_error(&self, err: &dyn std::error::Error, timestamp: &str) {
            self.events.lock().unwrap().push(event_line(err, timestamp));
        }
    }

    fn panic_exit(code: i32) -> ! {
        panic!("exit({code})")
    }

    fn failure() -> CoreError {
        CoreError::AdapterExecution {
            action: "start",
            component: "web".to_owned(),
            source: RuntimeError::ExecFailed("pod crashed".to_owned()),
        }
    }

    #[test]
    fn event_line_is_single_json_object() {
        let line = event_line(&failure(), "1700000000.000042");
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value["error"]["message"],
            "Failed to start component with name web. Error: runtime execution failed: pod crashed"
        );
        assert_eq!(value["error"]["timestamp"], "1700000000.000042");
    }

    #[test]
    fn timestamp_has_microsecond_fraction() {
        let ts = timestamp_now();
        let (secs, micros) = ts.split_once('.').unwrap();
        assert!(secs.parse::<i64>().unwrap() > 0);
        assert_eq!(micros.len(), 6);
    }

    #[test]
    fn unstructured_push_failure_is_handed_back() {
        let reporter = ConsoleReporter::new(RecordingSink::default(), false).with_exit(panic_exit);
        let result = reporter.push_failed(failure());
        assert!(matches!(result, Err(CoreError::AdapterExecution { .. })));
        assert!(reporter.sink().events.lock().unwrap().is_empty());
    }

    #[test]
    fn structured_push_failure_reports_once_and_exits_one() {
        let reporter = ConsoleReporter::new(RecordingSink::default(), true).with_exit(panic_exit);
        let outcome = catch_unwind(AssertUnwindSafe(|| reporter.push_failed(failure())));
        let payload = outcome.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("exit(1)"));
        assert_eq!(reporter.sink().events.lock().unwrap().len(), 1);
    }

    #[test]
    fn log_failure_always_exits() {
        let reporter = ConsoleReporter::new(RecordingSink::default(), false).with_exit(panic_exit);
        let outcome = catch_unwind(AssertUnwindSafe(|| reporter.log_failed(failure())));
        assert!(outcome.is_err());
        assert!(reporter.sink().events.lock().unwrap().is_empty());
    }
}
