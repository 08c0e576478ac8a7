pub mod composer;
pub mod confidence;

pub use composer::*;
pub use confidence::{score as confidence_score, INFORMATIONAL_CONFIDENCE};
