//! cdp-multiplex - DevTools protocol client core.
//!
//! JSON-RPC over WebSocket for Chromium's remote debugging protocol, with
//! request/response correlation, typed event streams and per-target
//! sessions that either get their own socket or share the browser's.
//!
//! # Architecture
//!
//! - **Transport**: moves whole frames; [`DirectTransport`] owns a socket,
//!   [`TunneledTransport`] wraps frames in `Target.sendMessageToTarget`
//! - **Connection**: assigns request ids and matches replies to calls
//! - **Domains**: name-scoped facade with dependency-ordered `enable`
//! - **Targets**: [`TargetManager`] creates, attaches and closes targets
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_multiplex::{Browser, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let browser = Browser::builder()
//!         .debugger_url("ws://127.0.0.1:9222/devtools/browser/abc")
//!         .multiplex_connections(true)
//!         .connect()
//!         .await?;
//!
//!     let page = browser.target().await?;
//!     page.domains().enable_with_dependencies("Page").await?;
//!
//!     let nav: serde_json::Value = page
//!         .domain("Page")?
//!         .request("navigate", serde_json::json!({"url": "https://example.com"}))
//!         .await?;
//!     println!("{nav}");
//!
//!     browser.close_target(&page).await?;
//!     browser.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Entry point: [`Browser`], [`BrowserBuilder`] |
//! | [`connection`] | Request correlation and event streams |
//! | [`domain`] | Domain facade and catalog |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frame types and codec |
//! | [`target`] | Target lifecycle and sessions |
//! | [`transport`] | Direct and tunneled transports |

// ============================================================================
// Modules
// ============================================================================

/// Browser entry point and configuration.
pub mod browser;

/// Request correlation and event streams over a transport.
pub mod connection;

/// Domain facade and the standard domain catalog.
pub mod domain;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
pub mod identifiers;

/// Wire frame types and codec.
pub mod protocol;

/// Target lifecycle management.
pub mod target;

/// Frame transports.
pub mod transport;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

// Entry point
pub use browser::{Browser, BrowserBuilder, BrowserOptions};

// Core types
pub use connection::Connection;
pub use domain::{Domain, DomainCatalog, DomainDescriptor, Domains, TargetDomain};
pub use target::{ConnectionMode, ManagerOptions, SessionTarget, TargetManager, TargetSession};
pub use transport::{DirectTransport, FrameStream, Transport, TunneledTransport};

// Protocol types
pub use protocol::{Event, EventCatalog, FrameCodec, ProtocolEvent, TargetInfo};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{BrowserContextId, RequestId, SessionId, TargetId};
