//! `brain-protocol` — wire frame types and the scheduled-job record codec
//! shared between the Device Registry, Output Pipeline, and Scheduler.

pub mod frame;
pub mod job_record;

pub use frame::{Frame, FrameType};
pub use job_record::{decode_job_record, encode_job_record};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("record truncated")]
    Truncated,
    #[error("record body too large: {0} bytes")]
    TooLarge(usize),
}
