//! # Command Channel
//!
//! Bounded byte-message queues between the host and the application.
//!
//! ```text
//!   Host ──post_command──> [commands: cap N] ──read_command──> Application
//!   Host <──read_reply──── [replies:  cap M] <──post_reply──── Application
//! ```
//!
//! Producers never block. A full queue drops its oldest unread message and
//! counts the drop. Replies pair with commands by position only.

mod command_channel;
mod queue;

pub use command_channel::{ChannelLimits, ChannelStats, CommandChannel};
pub use queue::CommandQueue;
