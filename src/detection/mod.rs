pub mod orchestrator;
pub mod report;

pub use orchestrator::{Application, DetectionOrchestrator, DetectionPhase};
pub use report::{MatchedConfig, RetryReport};
