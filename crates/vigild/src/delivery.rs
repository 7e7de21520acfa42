//! Asynchronous alert delivery.
//!
//! The engine thread hands events to an [`AlertQueue`] without waiting; a
//! small pool of tokio tasks drains the queue, logs each alert and appends it
//! to the alert log.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use vigil_core::alert_log::AlertRecord;
use vigil_core::{AlertDispatcher, AlertEvent};

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("alert log io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("alert serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Append-only JSON-lines alert log shared by all delivery workers.
#[derive(Clone)]
pub struct AlertLog {
    path: Arc<PathBuf>,
    write_lock: Arc<Mutex<()>>,
}

impl AlertLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Append one record. Writers are serialized so lines never interleave.
    pub async fn append(&self, record: &AlertRecord) -> Result<(), DeliveryError> {
        let line = record.to_line()?;
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Engine-side handle: queues alerts without blocking the frame loop.
pub struct AlertQueue {
    tx: mpsc::Sender<AlertEvent>,
}

impl AlertDispatcher for AlertQueue {
    fn dispatch(&self, event: AlertEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(key = %event.key, "delivery queue full; alert dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(key = %event.key, "delivery workers gone; alert dropped");
            }
        }
    }
}

/// Spawn `workers` delivery tasks on the current runtime.
///
/// The tasks exit once every [`AlertQueue`] is dropped and the queue drains.
pub fn spawn_delivery_pool(workers: usize, capacity: usize, log: AlertLog) -> (AlertQueue, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel::<AlertEvent>(capacity);
    let rx = Arc::new(Mutex::new(rx));

    let handles = (0..workers)
        .map(|id| {
            let rx = Arc::clone(&rx);
            let log = log.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the receiver lock only while waiting for the next event.
                    let next = rx.lock().await.recv().await;
                    let Some(event) = next else {
                        break;
                    };
                    deliver(id, &log, &event).await;
                }
                tracing::debug!(worker = id, "delivery worker exiting");
            })
        })
        .collect();

    (AlertQueue { tx }, handles)
}

async fn deliver(worker: usize, log: &AlertLog, event: &AlertEvent) {
    tracing::info!(
        worker,
        key = %event.key,
        message = %event.message,
        snapshot = ?event.snapshot,
        timestamp = %event.timestamp,
        "alert delivered"
    );
    if let Err(e) = log.append(&AlertRecord::from(event)).await {
        tracing::warn!(key = %event.key, error = %e, "failed to record alert");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use vigil_core::alert_log::read_recent;
    use vigil_core::AlertKey;

    fn event(key: AlertKey, second: u32) -> AlertEvent {
        AlertEvent {
            key,
            message: format!("{key} at {second}"),
            snapshot: None,
            timestamp: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap().and_hms_opt(3, 4, second).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_pool_delivers_every_event_then_exits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/alerts.jsonl");
        let (queue, workers) = spawn_delivery_pool(3, 16, AlertLog::new(path.clone()));

        for (i, key) in AlertKey::ALL.into_iter().enumerate() {
            queue.dispatch(event(key, i as u32));
        }
        drop(queue);
        for worker in workers {
            worker.await.unwrap();
        }

        let mut keys: Vec<AlertKey> = read_recent(&path, 100).unwrap().into_iter().map(|r| r.key).collect();
        keys.sort();
        assert_eq!(keys, AlertKey::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let log = AlertLog::new(dir.path().join("alerts.jsonl"));

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    let record = AlertRecord::from(&event(AlertKey::MotionDetected, i % 60));
                    log.append(&record).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let content = std::fs::read_to_string(dir.path().join("alerts.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 20);
        for line in content.lines() {
            serde_json::from_str::<AlertRecord>(line).unwrap();
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let queue = AlertQueue { tx };
        queue.dispatch(event(AlertKey::KnownPerson, 0));
        queue.dispatch(event(AlertKey::HighThreat, 1));
        assert_eq!(rx.recv().await.unwrap().key, AlertKey::KnownPerson);
        assert!(rx.try_recv().is_err());
    }
}
