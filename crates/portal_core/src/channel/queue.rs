//! Bounded, evicting message queue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

/// Single-producer, single-consumer queue of byte messages with a fixed bound.
///
/// Pushing into a full queue evicts the oldest unread message instead of
/// blocking the producer.
#[derive(Debug)]
pub struct CommandQueue {
    name: &'static str,
    capacity: usize,
    entries: Mutex<VecDeque<Vec<u8>>>,
    dropped: AtomicU64,
    truncated: AtomicU64,
}

impl CommandQueue {
    /// Creates a queue holding at most `capacity` unread messages.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "command queue capacity must be non-zero");
        Self {
            name,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: AtomicU64::new(0),
            truncated: AtomicU64::new(0),
        }
    }

    /// Appends a message, evicting the oldest one if the queue is full.
    ///
    /// Returns true if a message was evicted.
    pub fn push(&self, message: Vec<u8>) -> bool {
        let mut entries = self.entries.lock();
        let evicted = if entries.len() >= self.capacity {
            entries.pop_front();
            true
        } else {
            false
        };
        entries.push_back(message);
        drop(entries);

        if evicted {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                queue = self.name,
                capacity = self.capacity,
                total_dropped = total,
                "queue full, oldest message dropped"
            );
        }
        evicted
    }

    /// Pops the oldest message into `buffer`, copying at most `max_len` bytes.
    ///
    /// `buffer` is cleared and grown as needed, never beyond `max_len`.
    /// Returns the number of bytes stored, or 0 if the queue is empty.
    /// With `max_len == 0` nothing is popped. Bytes past `max_len` are
    /// discarded and counted as a truncation.
    pub fn pop_into(&self, buffer: &mut Vec<u8>, max_len: usize) -> usize {
        if max_len == 0 {
            return 0;
        }
        let Some(message) = self.entries.lock().pop_front() else {
            return 0;
        };

        let len = message.len().min(max_len);
        if len < message.len() {
            self.truncated.fetch_add(1, Ordering::Relaxed);
            warn!(
                queue = self.name,
                message_len = message.len(),
                max_len,
                "message truncated on read"
            );
        }

        buffer.clear();
        buffer.reserve_exact(len);
        buffer.extend_from_slice(&message[..len]);
        len
    }

    /// Removes and returns every unread message, oldest first.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        self.entries.lock().drain(..).collect()
    }

    /// Number of unread messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if there is nothing to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of unread messages.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages evicted by overflow since creation.
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reads that had to cut a message short.
    #[inline]
    #[must_use]
    pub fn truncated(&self) -> u64 {
        self.truncated.load(Ordering::Relaxed)
    }
}
