//! Error reporter.
//!
//! Keeps an append-only log of [`ErrorReport`]s for the status UI. Every
//! report is also written to the `log` facade and announced to the renderer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::events::ChatEvent;

/// One recorded error.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    /// Monotonically increasing id, starting at 0.
    pub id: u64,
    /// Report id of the error this one wraps, if it was already reported.
    pub parent: Option<u64>,
    /// Operation that reported the error.
    pub source: String,
    pub message: String,
    /// Snapshot of the inputs of the failed operation.
    pub params: Value,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    /// One-line summary for the status UI.
    pub fn summary(&self) -> String {
        format!(
            "{} - {}:\n  {}\n  {}",
            self.timestamp.to_rfc3339(),
            self.source,
            self.message,
            self.params
        )
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    next_id: u64,
    reports: Vec<ErrorReport>,
}

/// Shared error log.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    state: Arc<Mutex<ReporterState>>,
    events: mpsc::UnboundedSender<ChatEvent>,
}

impl ErrorReporter {
    pub fn new(events: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState::default())),
            events,
        }
    }

    /// Record `error` and return it wrapped with its report id.
    ///
    /// Reporting an already reported error records a new entry whose parent
    /// is the previous report.
    pub fn report(&self, error: ChatError, source: &str, params: Value) -> ChatError {
        let parent = error.report_id();
        let message = error.root().to_string();

        let report = {
            let mut state = self.state.lock();
            let report = ErrorReport {
                id: state.next_id,
                parent,
                source: source.to_string(),
                message,
                params,
                timestamp: Utc::now(),
            };
            state.next_id += 1;
            state.reports.push(report.clone());
            report
        };

        log::error!(
            "[newton-chat] Error {} in {}: {} {}",
            report.id,
            report.source,
            report.message,
            report.params
        );
        let _ = self.events.send(ChatEvent::ErrorReported(report.clone()));

        ChatError::Reported {
            report_id: report.id,
            source: Box::new(error),
        }
    }

    /// All reports, oldest first.
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.state.lock().reports.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every report. Ids keep increasing.
    pub fn clear(&self) {
        self.state.lock().reports.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reporter() -> (ErrorReporter, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ErrorReporter::new(tx), rx)
    }

    #[test]
    fn test_ids_increase_and_survive_clear() {
        let (reporter, _rx) = reporter();
        reporter.report(ChatError::NoKernel("a".to_string()), "init_bot", json!([]));
        reporter.report(ChatError::NoKernel("b".to_string()), "init_bot", json!([]));
        assert_eq!(
            reporter.reports().iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![0, 1]
        );

        reporter.clear();
        assert!(reporter.is_empty());
        reporter.report(ChatError::NoKernel("c".to_string()), "init_bot", json!([]));
        assert_eq!(reporter.reports()[0].id, 2);
    }

    #[test]
    fn test_rereport_chains_parent() {
        let (reporter, _rx) = reporter();
        let first = reporter.report(
            ChatError::UnknownInstance("ghost".to_string()),
            "dispatch",
            json!({"instance": "ghost"}),
        );
        let second = reporter.report(first, "receive", json!({"operation": "reply"}));

        let reports = reporter.reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].parent, Some(0));
        assert_eq!(reports[1].message, "Invalid instance ghost");
        assert_eq!(second.report_id(), Some(1));
    }

    #[test]
    fn test_report_is_announced() {
        let (reporter, mut rx) = reporter();
        reporter.report(
            ChatError::Kernel {
                command: "message".to_string(),
                message: "boom".to_string(),
            },
            "receive",
            json!(["message", "boom"]),
        );
        match rx.try_recv() {
            Ok(ChatEvent::ErrorReported(report)) => {
                assert_eq!(report.source, "receive");
                assert!(report.summary().contains("boom"));
            }
            other => panic!("Expected ErrorReported, got {:?}", other),
        }
    }
}
