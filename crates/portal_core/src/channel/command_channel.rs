//! Host ↔ application text-command channel.

use std::sync::atomic::{AtomicU64, Ordering};

use portal_shared::protocol::{decode_frames, encode_frame, FrameError};
use portal_shared::{DEFAULT_COMMAND_CAPACITY, DEFAULT_MAX_MESSAGE_LEN, DEFAULT_REPLY_CAPACITY};
use tracing::{debug, warn};

use crate::channel::CommandQueue;

/// Size limits for a [`CommandChannel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelLimits {
    /// Unread commands kept before the oldest is evicted.
    pub command_capacity: usize,
    /// Unread replies kept before the oldest is evicted.
    pub reply_capacity: usize,
    /// Longest message accepted; longer posts are cut to this length.
    pub max_message_len: usize,
}

impl Default for ChannelLimits {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            reply_capacity: DEFAULT_REPLY_CAPACITY,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

/// Counters for both directions of a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Commands waiting for the application.
    pub commands_pending: usize,
    /// Replies waiting for the host.
    pub replies_pending: usize,
    /// Commands lost to overflow.
    pub commands_dropped: u64,
    /// Replies lost to overflow.
    pub replies_dropped: u64,
    /// Messages cut short on post or read.
    pub truncated: u64,
}

/// Bidirectional bounded message channel.
///
/// The host posts commands and reads replies; the application reads
/// commands and posts replies. No correlation ids are carried: the first
/// unread reply belongs to whichever command the application was handling
/// when it posted.
#[derive(Debug)]
pub struct CommandChannel {
    commands: CommandQueue,
    replies: CommandQueue,
    limits: ChannelLimits,
    oversized_posts: AtomicU64,
}

impl CommandChannel {
    /// Creates a channel with the given limits.
    ///
    /// # Panics
    ///
    /// Panics if either capacity is zero.
    #[must_use]
    pub fn new(limits: ChannelLimits) -> Self {
        Self {
            commands: CommandQueue::new("commands", limits.command_capacity),
            replies: CommandQueue::new("replies", limits.reply_capacity),
            limits,
            oversized_posts: AtomicU64::new(0),
        }
    }

    /// Applies the message length limit. Empty messages are rejected because
    /// a zero-length read means "queue empty".
    fn admit(&self, direction: &'static str, bytes: &[u8]) -> Option<Vec<u8>> {
        if bytes.is_empty() {
            debug!(direction, "empty message ignored");
            return None;
        }
        if bytes.len() > self.limits.max_message_len {
            self.oversized_posts.fetch_add(1, Ordering::Relaxed);
            warn!(
                direction,
                len = bytes.len(),
                max = self.limits.max_message_len,
                "message over length limit truncated"
            );
            return Some(bytes[..self.limits.max_message_len].to_vec());
        }
        Some(bytes.to_vec())
    }

    // =========================================================================
    // Host side
    // =========================================================================

    /// Queues a command for the application. Never blocks.
    ///
    /// Returns false if the message was empty and ignored.
    pub fn post_command(&self, bytes: &[u8]) -> bool {
        match self.admit("command", bytes) {
            Some(message) => {
                self.commands.push(message);
                true
            }
            None => false,
        }
    }

    /// Splits a length-prefixed stream into commands and queues each one.
    ///
    /// The stream is validated first; a malformed stream queues nothing.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] if the stream ends mid-frame.
    pub fn post_command_stream(&self, stream: &[u8]) -> Result<usize, FrameError> {
        let frames = decode_frames(stream)?;
        Ok(frames.into_iter().filter(|frame| self.post_command(frame)).count())
    }

    /// Pops the oldest reply into `buffer`. Returns its length, or 0 if none.
    pub fn read_reply(&self, buffer: &mut Vec<u8>, max_len: usize) -> usize {
        self.replies.pop_into(buffer, max_len)
    }

    /// Removes every pending reply and encodes them as one framed stream.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] if a reply cannot be length-prefixed.
    pub fn drain_replies_framed(&self) -> Result<Vec<u8>, FrameError> {
        let mut stream = Vec::new();
        for reply in self.replies.drain() {
            encode_frame(&reply, &mut stream)?;
        }
        Ok(stream)
    }

    // =========================================================================
    // Application side
    // =========================================================================

    /// Pops the oldest command into `buffer`. Returns its length, or 0 if none.
    pub fn read_command(&self, buffer: &mut Vec<u8>, max_len: usize) -> usize {
        self.commands.pop_into(buffer, max_len)
    }

    /// Queues a reply for the host. Never blocks.
    ///
    /// Returns false if the message was empty and ignored.
    pub fn post_reply(&self, bytes: &[u8]) -> bool {
        match self.admit("reply", bytes) {
            Some(message) => {
                self.replies.push(message);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// The host → application queue.
    #[must_use]
    pub fn commands(&self) -> &CommandQueue {
        &self.commands
    }

    /// The application → host queue.
    #[must_use]
    pub fn replies(&self) -> &CommandQueue {
        &self.replies
    }

    /// Configured limits.
    #[must_use]
    pub const fn limits(&self) -> ChannelLimits {
        self.limits
    }

    /// Current counters for both directions.
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            commands_pending: self.commands.len(),
            replies_pending: self.replies.len(),
            commands_dropped: self.commands.dropped(),
            replies_dropped: self.replies.dropped(),
            truncated: self.commands.truncated()
                + self.replies.truncated()
                + self.oversized_posts.load(Ordering::Relaxed),
        }
    }
}

impl Default for CommandChannel {
    fn default() -> Self {
        Self::new(ChannelLimits::default())
    }
}
