use brain_runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("job record error: {0}")]
    Record(#[from] brain_protocol::ProtocolError),

    #[error("unknown task: {0}")]
    UnknownTask(String),
}
