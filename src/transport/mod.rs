//! Transport layer.
//!
//! A [`Transport`] moves [`RequestFrame`]s out and publishes inbound
//! [`ResponseFrame`]s to any number of subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ TunneledTransport B  │──┐
//! └──────────────────────┘  │  Target.sendMessageToTarget
//! ┌──────────────────────┐  │  Target.receivedMessageFromTarget
//! │ TunneledTransport A  │──┤
//! └──────────────────────┘  ▼
//!                  ┌─────────────────┐        WebSocket       ┌─────────┐
//!                  │ DirectTransport │◄──────────────────────►│ Browser │
//!                  └─────────────────┘                        └─────────┘
//! ```
//!
//! Tunneled transports ride on a [`Connection`](crate::Connection) over
//! another transport, so many logical sessions share one socket.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `direct` | Transport bound to one WebSocket |
//! | `replay` | Multicast frame channel with a replay buffer |
//! | `tunneled` | Transport wrapped in Target domain messages |

// ============================================================================
// Submodules
// ============================================================================

/// Transport bound to one WebSocket.
pub mod direct;

/// Multicast frame channel with a replay buffer.
pub mod replay;

/// Transport wrapped in Target domain messages.
pub mod tunneled;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};

use crate::error::Result;
use crate::protocol::{RequestFrame, ResponseFrame};

// ============================================================================
// Re-exports
// ============================================================================

pub use direct::DirectTransport;
pub use replay::ReplayChannel;
pub use tunneled::TunneledTransport;

// ============================================================================
// Types
// ============================================================================

/// Inbound frame shared between subscribers.
pub type SharedFrame = Arc<ResponseFrame>;

/// Stream of inbound frames for one subscriber.
pub type FrameStream = BoxStream<'static, SharedFrame>;

// ============================================================================
// Transport
// ============================================================================

/// Bidirectional frame transport.
///
/// # Thread Safety
///
/// Implementations are `Send + Sync` and shared behind `Arc<dyn Transport>`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Writes a frame.
    ///
    /// Resolves once the frame is handed to the wire; does not wait for a
    /// reply.
    ///
    /// # Errors
    ///
    /// - [`Error::SerializationFailed`](crate::Error::SerializationFailed) if the frame cannot be encoded
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the transport is closed
    async fn send(&self, frame: &RequestFrame) -> Result<()>;

    /// Subscribes to all inbound frames.
    ///
    /// Each call returns an independent stream in wire order. The stream
    /// ends when the transport closes.
    fn frames(&self) -> FrameStream;

    /// Subscribes to inbound event frames.
    fn event_frames(&self) -> FrameStream {
        self.frames()
            .filter(|frame| future::ready(frame.is_event()))
            .boxed()
    }

    /// Closes the transport. Safe to call more than once.
    async fn close(&self);

    /// Returns `true` once the transport is closed.
    fn is_closed(&self) -> bool;
}
