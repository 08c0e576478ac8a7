pub mod classifier;
pub mod record;
pub mod structurer;

pub use classifier::*;
pub use record::*;
pub use structurer::*;
