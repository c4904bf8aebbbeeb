//! Multicast frame channel with a bounded replay buffer.
//!
//! Every subscriber first receives the most recent frames still held in
//! the buffer, then every frame published after it subscribed, in
//! publication order. Replay and registration happen under one lock, so
//! no frame is lost or duplicated between the two.
//!
//! Once completed, the channel drops all subscribers. Their streams end
//! after draining whatever they had already received.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{FrameStream, SharedFrame};

// ============================================================================
// Types
// ============================================================================

struct ReplayState {
    buffer: VecDeque<SharedFrame>,
    subscribers: Vec<mpsc::UnboundedSender<SharedFrame>>,
    completed: bool,
}

// ============================================================================
// ReplayChannel
// ============================================================================

/// Bounded replay subject for inbound frames.
pub struct ReplayChannel {
    capacity: usize,
    state: Mutex<ReplayState>,
}

impl ReplayChannel {
    /// Creates a channel retaining up to `capacity` frames (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(ReplayState {
                buffer: VecDeque::with_capacity(capacity),
                subscribers: Vec::new(),
                completed: false,
            }),
        }
    }

    /// Returns the replay capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publishes a frame to the buffer and every live subscriber.
    ///
    /// Ignored after completion. Subscribers whose stream was dropped are
    /// pruned here.
    pub fn publish(&self, frame: SharedFrame) {
        let mut state = self.state.lock();
        if state.completed {
            return;
        }

        if state.buffer.len() == self.capacity {
            state.buffer.pop_front();
        }
        state.buffer.push_back(SharedFrame::clone(&frame));

        state
            .subscribers
            .retain(|subscriber| subscriber.send(SharedFrame::clone(&frame)).is_ok());
    }

    /// Subscribes to the channel.
    ///
    /// The returned stream yields the buffered frames first. After
    /// completion it yields only the buffered frames, then ends.
    #[must_use]
    pub fn subscribe(&self) -> FrameStream {
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut state = self.state.lock();
            for frame in &state.buffer {
                let _ = tx.send(SharedFrame::clone(frame));
            }
            if !state.completed {
                state.subscribers.push(tx);
            }
        }

        stream::unfold(rx, |mut rx| async move {
            let frame = rx.recv().await?;
            Some((frame, rx))
        })
        .boxed()
    }

    /// Completes the channel and ends every subscription.
    ///
    /// Returns `true` only for the call that performed the completion.
    pub fn complete(&self) -> bool {
        let mut state = self.state.lock();
        if state.completed {
            return false;
        }
        state.completed = true;
        state.subscribers.clear();
        true
    }

    /// Returns `true` once [`complete`](Self::complete) has run.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// Returns the number of registered subscribers.
    ///
    /// Dropped subscriptions are only pruned on the next publish.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl fmt::Debug for ReplayChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ReplayChannel")
            .field("capacity", &self.capacity)
            .field("buffered", &state.buffer.len())
            .field("subscribers", &state.subscribers.len())
            .field("completed", &state.completed)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
