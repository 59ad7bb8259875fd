use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use brain_core::types::{JobId, JobPayload, JobType, SessionId, Task, TaskId, UserId};
use brain_protocol::{decode_job_record, encode_job_record};
use brain_runtime::BrainCore;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db;
use crate::error::SchedulerError;
use crate::job::{QueueClass, QueuedJob};
use crate::queue::WeightedQueues;
use crate::recurrence::compute_next_occurrence;
use crate::task_store::{TaskStore, UserContextResolver};

const DISPATCH_TICK: StdDuration = StdDuration::from_secs(1);
const SHUTDOWN_GRACE: StdDuration = StdDuration::from_secs(5);

/// Durable delayed job queue with at-least-once delivery, backed by the same
/// SQLite database as the Conversation Repository. `tick` polls the `jobs`
/// table for due rows and fans them out across three weighted dispatch
/// queues; a fixed pool of workers drains those queues and replays each
/// fired job through the Brain Core.
pub struct SchedulerEngine {
    conn: Mutex<Connection>,
    core: Arc<BrainCore>,
    task_store: Arc<dyn TaskStore>,
    user_resolver: Arc<dyn UserContextResolver>,
    queues: Arc<WeightedQueues>,
    worker_count: usize,
}

impl SchedulerEngine {
    pub fn new(
        conn: Connection,
        core: Arc<BrainCore>,
        task_store: Arc<dyn TaskStore>,
        user_resolver: Arc<dyn UserContextResolver>,
        worker_count: usize,
    ) -> Result<Self, SchedulerError> {
        db::init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            core,
            task_store,
            user_resolver,
            queues: Arc::new(WeightedQueues::new(256)),
            worker_count,
        })
    }

    #[cfg(test)]
    pub(crate) fn queues_for_test(&self) -> Arc<WeightedQueues> {
        self.queues.clone()
    }

    pub fn schedule_task_execution(
        &self,
        task_id: TaskId,
        user_id: UserId,
        priority: u8,
        at: DateTime<Utc>,
    ) -> Result<JobId, SchedulerError> {
        self.enqueue(JobType::TaskExecution, task_id, user_id, priority, at)
    }

    pub fn schedule_task_reminder(
        &self,
        task_id: TaskId,
        user_id: UserId,
        priority: u8,
        at: DateTime<Utc>,
    ) -> Result<JobId, SchedulerError> {
        self.enqueue(JobType::TaskReminder, task_id, user_id, priority, at)
    }

    pub fn schedule_recurring_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
        priority: u8,
        next_run: DateTime<Utc>,
    ) -> Result<JobId, SchedulerError> {
        self.enqueue(JobType::RecurringTask, task_id, user_id, priority, next_run)
    }

    fn enqueue(
        &self,
        job_type: JobType,
        task_id: TaskId,
        user_id: UserId,
        priority: u8,
        at: DateTime<Utc>,
    ) -> Result<JobId, SchedulerError> {
        let job_id = JobId::new();
        let payload = JobPayload {
            job_type,
            task_id: task_id.clone(),
            user_id,
            session_id: SessionId::new(),
            execute_at: at,
            metadata: serde_json::json!({}),
        };
        let record = encode_job_record(&payload)?;
        let queue = QueueClass::for_priority(priority);
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().expect("scheduler mutex poisoned");
        conn.execute(
            "INSERT INTO jobs (id, task_id, user_id, queue, priority, status, execute_at, payload, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?8)",
            params![
                job_id.as_str(),
                task_id.as_str(),
                payload.user_id.as_str(),
                queue.as_str(),
                priority as i64,
                at.to_rfc3339(),
                record,
                now,
            ],
        )?;
        Ok(job_id)
    }

    /// Best-effort cancellation: marks every still-pending row for `task_id`
    /// as cancelled. A job already dispatched to a worker runs to
    /// completion regardless — the handler's idempotency, not this call, is
    /// what protects against a task cancelled mid-flight.
    pub fn cancel(&self, task_id: &TaskId) -> Result<(), SchedulerError> {
        let conn = self.conn.lock().expect("scheduler mutex poisoned");
        conn.execute(
            "UPDATE jobs SET status = 'cancelled', updated_at = ?2 WHERE task_id = ?1 AND status = 'pending'",
            params![task_id.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Spawns the dispatch loop and the worker pool. Returns their join
    /// handles so the caller can hand them to [`Self::stop`].
    pub fn start(self: Arc<Self>, ctx: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.worker_count + 1);

        let dispatch_engine = self.clone();
        let dispatch_ctx = ctx.clone();
        handles.push(tokio::spawn(async move { dispatch_engine.run_dispatch(dispatch_ctx).await }));

        for _ in 0..self.worker_count {
            let worker_engine = self.clone();
            let worker_ctx = ctx.clone();
            handles.push(tokio::spawn(async move { worker_engine.run_worker(worker_ctx).await }));
        }

        handles
    }

    /// Cancels `ctx` and waits up to a grace period for every spawned task
    /// to finish; any still running past the grace period is abandoned.
    pub async fn stop(ctx: CancellationToken, handles: Vec<JoinHandle<()>>) {
        ctx.cancel();
        if tokio::time::timeout(SHUTDOWN_GRACE, futures_util::future::join_all(handles)).await.is_err() {
            warn!("scheduler shutdown grace period elapsed, abandoning remaining workers");
        }
    }

    async fn run_dispatch(&self, ctx: CancellationToken) {
        let mut ticker = tokio::time::interval(DISPATCH_TICK);
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("scheduler dispatch loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "scheduler tick failed");
                    }
                }
            }
        }
    }

    async fn run_worker(&self, ctx: CancellationToken) {
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                job = self.queues.pop() => {
                    match job {
                        Some(job) => self.handle_job(ctx.clone(), job).await,
                        None => break,
                    }
                }
            }
        }
    }

    /// One dispatch pass: pull every pending row whose `execute_at` has
    /// arrived and push it onto its queue class. Dispatched rows flip to
    /// `dispatched` so a slow tick never double-dispatches the same row.
    pub async fn tick(&self) -> Result<(), SchedulerError> {
        let due = self.due_rows()?;
        for (job_id, queue, record) in due {
            let payload = match decode_job_record(&record) {
                Ok(p) => p,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "dropping job with unreadable payload");
                    continue;
                }
            };
            self.queues.push(queue, QueuedJob { job_id, payload }).await;
        }
        Ok(())
    }

    fn due_rows(&self) -> Result<Vec<(JobId, QueueClass, Vec<u8>)>, SchedulerError> {
        let conn = self.conn.lock().expect("scheduler mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, queue, payload FROM jobs WHERE status = 'pending' AND execute_at <= ?1",
        )?;
        let now = Utc::now().to_rfc3339();
        let rows = stmt
            .query_map(params![now], |row| {
                let id: String = row.get(0)?;
                let queue: String = row.get(1)?;
                let payload: Vec<u8> = row.get(2)?;
                Ok((id, queue, payload))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, queue, payload) in rows {
            conn.execute("UPDATE jobs SET status = 'dispatched' WHERE id = ?1", params![id])?;
            let class = queue.parse().unwrap_or(QueueClass::Default);
            out.push((JobId::from(id), class, payload));
        }
        Ok(out)
    }

    /// Replays one fired job through the Brain Core. At-least-once delivery
    /// means this can run twice for the same job; re-checking the task's
    /// status before acting makes a second run a no-op.
    pub(crate) async fn handle_job(&self, ctx: CancellationToken, job: QueuedJob) {
        if let Err(e) = self.handle_job_inner(ctx, job).await {
            warn!(error = %e, "scheduled job handler failed");
        }
    }

    async fn handle_job_inner(&self, ctx: CancellationToken, job: QueuedJob) -> Result<(), SchedulerError> {
        let payload = job.payload;
        let task = match self.task_store.load_task(&payload.task_id).await? {
            Some(task) => task,
            None => {
                warn!(task_id = %payload.task_id, "scheduled job fired for an unknown task, dropping");
                return Ok(());
            }
        };

        if task.status != brain_core::types::TaskStatus::Pending {
            return Ok(());
        }

        let user_ctx = self.user_resolver.resolve(&payload.user_id).await?;
        self.core.process_scheduled_task(ctx, user_ctx, payload.job_type, &task).await?;

        match payload.job_type {
            JobType::TaskExecution | JobType::TaskDeadline => {
                self.task_store.mark_done(&task.id).await?;
            }
            JobType::TaskReminder => {}
            JobType::RecurringTask => self.reschedule_recurring(&task).await?,
        }
        Ok(())
    }

    async fn reschedule_recurring(&self, task: &Task) -> Result<(), SchedulerError> {
        let next_count = task.execution_count + 1;
        match compute_next_occurrence(task) {
            Some(next_run) => {
                self.task_store.update_recurrence(&task.id, next_run, next_count).await?;
                self.schedule_recurring_task(task.id.clone(), task.user_id.clone(), task.priority, next_run)?;
            }
            None => self.task_store.mark_done(&task.id).await?,
        }
        Ok(())
    }
}
