pub mod executor;
pub mod postgres;
pub mod value;

pub use executor::*;
pub use postgres::*;
pub use value::*;
