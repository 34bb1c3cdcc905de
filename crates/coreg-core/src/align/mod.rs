mod cancel;
mod report;
mod stack_aligner;

pub use cancel::CancellationToken;
pub use report::{AlignmentOutcome, FrameReport, FrameState, Verdict};
pub use stack_aligner::StackAligner;
