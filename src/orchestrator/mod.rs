pub mod flow;
pub mod journal;
pub mod retry;
pub mod runner;

pub use flow::{FlowInput, FlowOrchestrator, FlowSettings, FlowSummary, loop_count, phase_count};
pub use journal::{Journal, JournalEntry, PhaseState};
pub use retry::{RetryController, RetryOutcome, RetryPolicy};
pub use runner::{PhaseReport, PhaseRunner};
