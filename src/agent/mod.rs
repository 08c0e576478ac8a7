pub mod contracts;
pub mod orchestrator;

pub use contracts::*;
pub use orchestrator::*;
