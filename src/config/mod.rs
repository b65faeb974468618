//! Configuration
//!
//! Database, environment and gateway settings.

pub mod database;
pub mod environment;

pub use environment::*;
