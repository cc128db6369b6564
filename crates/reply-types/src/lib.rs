//! Shared types for reply-bot

pub mod commands;
pub mod lock;
pub mod message;
pub mod permissions;
pub mod row;

pub use commands::{AdminCommand, COMMAND_COUNT};
pub use lock::{Actor, LockSpec};
pub use message::InboundMessage;
pub use permissions::Permissions;
pub use row::{compile_pattern, ResponseRow, RESPONSE_FIELDS};
