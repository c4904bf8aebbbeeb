//! Target lifecycle management.
//!
//! Creates, attaches, tracks and closes page targets over a browser-level
//! connection.
//!
//! # Connection Modes
//!
//! | Mode | Session transport | Session id |
//! |------|-------------------|------------|
//! | [`ConnectionMode::Multiplexed`] | Tunnel over the browser socket | Assigned by `attachToTarget` |
//! | [`ConnectionMode::Dedicated`] | Own WebSocket per target | None |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `manager` | Target creation, attachment, registry and teardown |
//! | `session` | An attached target and its connection |

// ============================================================================
// Submodules
// ============================================================================

/// Target creation, attachment, registry and teardown.
pub mod manager;

/// An attached target and its connection.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use manager::{ManagerOptions, TargetManager};
pub use session::{SessionTarget, TargetSession};

// ============================================================================
// ConnectionMode
// ============================================================================

/// How target sessions reach the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// Each target gets its own WebSocket.
    #[default]
    Dedicated,
    /// All targets share the browser socket through tunnels.
    Multiplexed,
}

impl ConnectionMode {
    /// Maps the `multiplex_connections` flag to a mode.
    #[inline]
    #[must_use]
    pub const fn from_multiplex(multiplex: bool) -> Self {
        if multiplex {
            Self::Multiplexed
        } else {
            Self::Dedicated
        }
    }

    /// Returns `true` for [`ConnectionMode::Multiplexed`].
    #[inline]
    #[must_use]
    pub const fn is_multiplexed(self) -> bool {
        matches!(self, Self::Multiplexed)
    }
}
