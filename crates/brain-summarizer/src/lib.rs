//! `brain-summarizer` — the periodic memory Summarizer: judges recent
//! conversation windows via the Processor and promotes the worthwhile ones
//! into durable memories.

pub mod error;
pub mod judgement;
pub mod task;

pub use error::SummarizerError;
pub use judgement::SummaryJudgement;
pub use task::SummarizerTask;
