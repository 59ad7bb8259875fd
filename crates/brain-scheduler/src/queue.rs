use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::job::{QueueClass, QueuedJob};

const POLL_BACKOFF: Duration = Duration::from_millis(20);

/// Deterministic weighted round-robin over `{default, high, low}` at 6:3:1 —
/// a `rand`-free token-bucket sequence so dispatch order is reproducible in
/// tests rather than a probabilistic draw.
const WEIGHT_SEQUENCE: [QueueClass; 10] = [
    QueueClass::Default,
    QueueClass::Default,
    QueueClass::High,
    QueueClass::Default,
    QueueClass::Default,
    QueueClass::High,
    QueueClass::Default,
    QueueClass::Low,
    QueueClass::Default,
    QueueClass::High,
];

/// Three bounded `mpsc` queues shared by a fixed worker pool. `pop` picks the
/// queue the weighted sequence names for this turn, falling back to the
/// other two so a burst on one queue never starves the rest.
pub struct WeightedQueues {
    default_tx: mpsc::Sender<QueuedJob>,
    high_tx: mpsc::Sender<QueuedJob>,
    low_tx: mpsc::Sender<QueuedJob>,
    default_rx: Arc<AsyncMutex<mpsc::Receiver<QueuedJob>>>,
    high_rx: Arc<AsyncMutex<mpsc::Receiver<QueuedJob>>>,
    low_rx: Arc<AsyncMutex<mpsc::Receiver<QueuedJob>>>,
    turn: AtomicUsize,
}

impl WeightedQueues {
    pub fn new(capacity: usize) -> Self {
        let (default_tx, default_rx) = mpsc::channel(capacity);
        let (high_tx, high_rx) = mpsc::channel(capacity);
        let (low_tx, low_rx) = mpsc::channel(capacity);
        Self {
            default_tx,
            high_tx,
            low_tx,
            default_rx: Arc::new(AsyncMutex::new(default_rx)),
            high_rx: Arc::new(AsyncMutex::new(high_rx)),
            low_rx: Arc::new(AsyncMutex::new(low_rx)),
            turn: AtomicUsize::new(0),
        }
    }

    pub async fn push(&self, class: QueueClass, job: QueuedJob) {
        let tx = match class {
            QueueClass::Default => &self.default_tx,
            QueueClass::High => &self.high_tx,
            QueueClass::Low => &self.low_tx,
        };
        if tx.send(job).await.is_err() {
            tracing::warn!("dispatch queue closed, job dropped");
        }
    }

    /// Waits for the next job. Returns `None` once every sender has been
    /// dropped and all three queues are drained — the pool's shutdown signal.
    pub async fn pop(&self) -> Option<QueuedJob> {
        loop {
            let turn = self.turn.fetch_add(1, Ordering::Relaxed) % WEIGHT_SEQUENCE.len();
            for class in self.poll_order(WEIGHT_SEQUENCE[turn]) {
                if let Some(job) = self.try_pop(class).await {
                    return Some(job);
                }
            }
            if self.default_tx.is_closed() && self.high_tx.is_closed() && self.low_tx.is_closed() {
                return None;
            }
            tokio::time::sleep(POLL_BACKOFF).await;
        }
    }

    fn poll_order(&self, preferred: QueueClass) -> [QueueClass; 3] {
        match preferred {
            QueueClass::Default => [QueueClass::Default, QueueClass::High, QueueClass::Low],
            QueueClass::High => [QueueClass::High, QueueClass::Default, QueueClass::Low],
            QueueClass::Low => [QueueClass::Low, QueueClass::Default, QueueClass::High],
        }
    }

    async fn try_pop(&self, class: QueueClass) -> Option<QueuedJob> {
        let rx = match class {
            QueueClass::Default => &self.default_rx,
            QueueClass::High => &self.high_rx,
            QueueClass::Low => &self.low_rx,
        };
        rx.lock().await.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::types::{JobId, JobPayload, JobType, SessionId, TaskId, UserId};
    use chrono::Utc;

    fn job(n: u8) -> QueuedJob {
        QueuedJob {
            job_id: JobId::new(),
            payload: JobPayload {
                job_type: JobType::TaskExecution,
                task_id: TaskId::new(),
                user_id: UserId::from(format!("u{n}")),
                session_id: SessionId::new(),
                execute_at: Utc::now(),
                metadata: serde_json::json!({}),
            },
        }
    }

    #[tokio::test]
    async fn pop_returns_jobs_pushed_to_any_queue() {
        let queues = WeightedQueues::new(16);
        queues.push(QueueClass::Low, job(1)).await;
        queues.push(QueueClass::High, job(2)).await;
        queues.push(QueueClass::Default, job(3)).await;

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(queues.pop().await.expect("job should be available").payload.user_id.as_str().to_string());
        }
        seen.sort();
        assert_eq!(seen, vec!["u1".to_string(), "u2".to_string(), "u3".to_string()]);
    }

    #[tokio::test]
    async fn pop_drains_a_job_queued_on_each_turns_preferred_class() {
        let queues = WeightedQueues::new(16);
        // One job per turn of the weighted sequence, queued on exactly the
        // class that turn prefers — every pop should find its job without
        // falling back to the backoff sleep, so this completes promptly.
        for (n, class) in WEIGHT_SEQUENCE.into_iter().enumerate() {
            queues.push(class, job(n as u8)).await;
        }
        for _ in 0..WEIGHT_SEQUENCE.len() {
            assert!(queues.pop().await.is_some());
        }
    }

    #[test]
    fn queue_class_maps_priority_bands_as_specified() {
        assert_eq!(QueueClass::for_priority(5), QueueClass::High);
        assert_eq!(QueueClass::for_priority(4), QueueClass::High);
        assert_eq!(QueueClass::for_priority(3), QueueClass::Default);
        assert_eq!(QueueClass::for_priority(2), QueueClass::Low);
        assert_eq!(QueueClass::for_priority(1), QueueClass::Low);
    }
}
