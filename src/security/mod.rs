pub mod gate;
pub mod policy;
pub mod sql_guard;

pub use gate::*;
pub use policy::*;
pub use sql_guard::*;
