//! Progress and error sinks.
//!
//! The pipeline publishes a full [`RunProgress`](crate::pipeline::RunProgress)
//! snapshot after every sub-step; the transport layer subscribes and fans
//! out. Both sinks replay state to late joiners: the publisher hands new
//! subscribers the latest snapshot immediately, and the error sink retains
//! reports in order.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::{broadcast, watch};

use crate::pipeline::RunProgress;

const ERROR_CHANNEL_CAPACITY: usize = 64;

/// A user-facing error, split into a human message and technical detail.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub title: String,
    pub message: String,
    pub technical_details: String,
}

impl ErrorReport {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        technical_details: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            technical_details: technical_details.into(),
        }
    }
}

/// Holds the latest progress snapshot and replays it to new subscribers.
#[derive(Debug)]
pub struct ProgressPublisher {
    tx: watch::Sender<Option<RunProgress>>,
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPublisher {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replaces the latest snapshot. Subscribers see it on their next read.
    pub fn publish(&self, snapshot: RunProgress) {
        // send_replace rather than send: the snapshot must be retained even
        // while nobody is subscribed.
        self.tx.send_replace(Some(snapshot));
    }

    /// The latest snapshot, if a run has published anything yet.
    pub fn latest(&self) -> Option<RunProgress> {
        self.tx.borrow().clone()
    }

    /// A receiver whose first read yields the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<RunProgress>> {
        self.tx.subscribe()
    }
}

/// Two-channel error sink: recoverable reports let the run continue with the
/// next asset, critical reports mean something escaped the per-asset
/// boundary.
#[derive(Debug)]
pub struct ErrorSink {
    recoverable_tx: broadcast::Sender<ErrorReport>,
    critical_tx: broadcast::Sender<ErrorReport>,
    recoverable_history: Mutex<Vec<ErrorReport>>,
    critical_history: Mutex<Vec<ErrorReport>>,
}

impl Default for ErrorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorSink {
    pub fn new() -> Self {
        let (recoverable_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let (critical_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            recoverable_tx,
            critical_tx,
            recoverable_history: Mutex::new(Vec::new()),
            critical_history: Mutex::new(Vec::new()),
        }
    }

    pub fn recoverable(&self, report: ErrorReport) {
        self.recoverable_history
            .lock()
            .unwrap()
            .push(report.clone());
        let _ = self.recoverable_tx.send(report);
    }

    pub fn critical(&self, report: ErrorReport) {
        self.critical_history.lock().unwrap().push(report.clone());
        let _ = self.critical_tx.send(report);
    }

    pub fn subscribe_recoverable(&self) -> broadcast::Receiver<ErrorReport> {
        self.recoverable_tx.subscribe()
    }

    pub fn subscribe_critical(&self) -> broadcast::Receiver<ErrorReport> {
        self.critical_tx.subscribe()
    }

    /// Reports already published, for replay to late joiners.
    pub fn recent_recoverable(&self) -> Vec<ErrorReport> {
        self.recoverable_history.lock().unwrap().clone()
    }

    pub fn recent_critical(&self) -> Vec<ErrorReport> {
        self.critical_history.lock().unwrap().clone()
    }

    /// Clears retained reports at the start of a fresh run.
    pub fn reset(&self) {
        self.recoverable_history.lock().unwrap().clear();
        self.critical_history.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publisher_replays_latest_to_late_subscriber() {
        let publisher = ProgressPublisher::new();
        assert!(publisher.latest().is_none());

        let mut progress = RunProgress::new(3);
        progress.assets_processed = 2;
        publisher.publish(progress);

        // Subscribed after the publish, still sees the snapshot.
        let rx = publisher.subscribe();
        let seen = rx.borrow().clone().expect("snapshot should be retained");
        assert_eq!(seen.assets_processed, 2);
        assert_eq!(seen.assets_total, 3);
    }

    #[tokio::test]
    async fn test_error_sink_channels_are_independent() {
        let sink = ErrorSink::new();
        let mut recoverable = sink.subscribe_recoverable();
        let mut critical = sink.subscribe_critical();

        sink.recoverable(ErrorReport::new("Error!", "asset failed", "exit 1"));

        let report = recoverable.recv().await.unwrap();
        assert_eq!(report.title, "Error!");
        assert!(critical.try_recv().is_err());
    }

    #[test]
    fn test_error_sink_retains_history_for_replay() {
        let sink = ErrorSink::new();
        // No subscribers yet; the report must still be retained.
        sink.critical(ErrorReport::new("Critical Error!", "run blew up", "trace"));

        let recent = sink.recent_critical();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].message, "run blew up");

        sink.reset();
        assert!(sink.recent_critical().is_empty());
    }
}
