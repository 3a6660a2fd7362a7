// Library root: exposes internals for integration tests and the binaries.
// The interactive entry point is src/main.rs.

pub mod agent;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod logger;
pub mod shell;
