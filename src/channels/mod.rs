//! Channel abstraction for message I/O.

pub mod channel;
pub mod cli;
pub mod listener;
pub mod telegram;

pub use channel::*;
pub use cli::CliChannel;
pub use listener::spawn_event_listener;
pub use telegram::TelegramChannel;
