//! Renogy service basic library
//!
//! Provides basic functions shared by all services:
//! - logging bootstrap (console + daily rolling file)
//! - graceful shutdown signal handling

pub mod logging;
pub mod shutdown;

// Re-export common dependencies
pub use tokio;
