//! Wire protocol message types.
//!
//! This module defines the JSON-RPC envelope spoken over a DevTools
//! WebSocket and the codec that translates it.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `RequestFrame` | Local → Remote | Method call |
//! | `ResponseFrame::Result` | Remote → Local | Successful reply |
//! | `ResponseFrame::Error` | Remote → Local | Rejected call |
//! | `ResponseFrame::Event` | Remote → Local | Notification |
//!
//! # Method Naming
//!
//! Methods and events follow `Domain.name` format:
//!
//! - `Page.navigate`
//! - `Target.attachToTarget`
//! - `Network.requestWillBeSent`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codec` | Frame encoding and classification |
//! | `event` | Decoded events and the event catalog |
//! | `frame` | Request and response envelopes |
//! | `target` | Target domain shapes used for tunneling and lifecycle |

// ============================================================================
// Submodules
// ============================================================================

/// Frame encoding and classification.
pub mod codec;

/// Decoded events and the event catalog.
pub mod event;

/// Request and response envelopes.
pub mod frame;

/// Target domain shapes.
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::FrameCodec;
pub use event::{Event, EventCatalog, EventPayload, ProtocolEvent};
pub use frame::{ErrorFrame, EventFrame, RequestError, RequestFrame, ResponseFrame, ResultFrame};
pub use target::TargetInfo;
