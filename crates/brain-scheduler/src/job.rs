use brain_core::types::{JobId, JobPayload};

/// Which of the three logical dispatch queues a job posts to, derived from
/// the originating task's `priority ∈ [1..5]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueClass {
    Default,
    High,
    Low,
}

impl QueueClass {
    pub fn for_priority(priority: u8) -> Self {
        match priority {
            4 | 5 => QueueClass::High,
            1 | 2 => QueueClass::Low,
            _ => QueueClass::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueClass::Default => "default",
            QueueClass::High => "high",
            QueueClass::Low => "low",
        }
    }
}

impl std::str::FromStr for QueueClass {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(QueueClass::Default),
            "high" => Ok(QueueClass::High),
            "low" => Ok(QueueClass::Low),
            other => Err(format!("unknown queue class: {other}")),
        }
    }
}

/// A job pulled off the `jobs` table once its `execute_at` has arrived and
/// handed to a worker.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub payload: JobPayload,
}
