//! Plan digest — daily reminder digests for chat channels.

pub mod channels;
pub mod config;
pub mod error;
pub mod plans;
pub mod scheduler;
