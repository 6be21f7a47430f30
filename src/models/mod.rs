pub mod content_kind;
pub mod file_input;
pub mod grading;
pub mod submission;

pub use content_kind::ContentKind;
pub use file_input::{FileInput, FilePayload};
pub use grading::{
    CriterionResult, FileGradingOutcome, GradingOutcomeKind, GradingReport, GradingResult,
    SubmissionOutcome, SubmissionStatus,
};
pub use submission::{parse_total_points, BatchParams, SubmissionBatch};
