pub mod agent;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod observability;
pub mod response;
pub mod schema;
pub mod security;
pub mod sql_generator;
pub mod structuring;

pub use agent::{QueryAgent, QueryRequest, QueryResponse};
pub use error::{AgentError, Result};
