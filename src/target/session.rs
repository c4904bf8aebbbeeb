//! An attached target and its connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::debug;

use crate::connection::Connection;
use crate::domain::{Domain, Domains};
use crate::error::Result;
use crate::identifiers::{BrowserContextId, SessionId, TargetId};
use crate::protocol::TargetInfo;

use super::ConnectionMode;

// ============================================================================
// SessionTarget
// ============================================================================

/// Identity of an attached target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTarget {
    /// Attached target.
    pub target_id: TargetId,
    /// Session id; absent for dedicated connections.
    pub session_id: Option<SessionId>,
    /// Browser context created for the target, if any.
    pub browser_context_id: Option<BrowserContextId>,
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target_id)?;
        if let Some(session_id) = &self.session_id {
            write!(f, " (session {session_id})")?;
        }
        Ok(())
    }
}

// ============================================================================
// TargetSession
// ============================================================================

/// A target attached through either a tunnel or its own WebSocket.
///
/// Closing goes through [`TargetManager::close`](super::TargetManager::close).
pub struct TargetSession {
    target: SessionTarget,
    domains: Domains,
    mode: ConnectionMode,
}

impl TargetSession {
    pub(crate) fn new(target: SessionTarget, domains: Domains, mode: ConnectionMode) -> Self {
        Self {
            target,
            domains,
            mode,
        }
    }

    /// Returns the target identity.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &SessionTarget {
        &self.target
    }

    /// Returns the target id.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> &TargetId {
        &self.target.target_id
    }

    /// Returns the session id, if the target is multiplexed.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.target.session_id.as_ref()
    }

    /// Returns the browser context created for this target.
    #[inline]
    #[must_use]
    pub fn browser_context_id(&self) -> Option<&BrowserContextId> {
        self.target.browser_context_id.as_ref()
    }

    /// Returns how the session reaches its target.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    /// Returns the session's connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        self.domains.connection()
    }

    /// Returns domain access scoped to this target.
    #[inline]
    #[must_use]
    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    /// Returns the domain named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDomain`](crate::Error::UnknownDomain) if the
    /// catalog has no such domain.
    pub fn domain(&self, name: &str) -> Result<Domain> {
        self.domains.domain(name)
    }

    /// Fetches fresh metadata through the session itself.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn info(&self) -> Result<TargetInfo> {
        self.domains.target().get_target_info(self.target_id()).await
    }

    /// Returns `true` once the session's transport is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.connection().is_closed()
    }

    /// Closes the session's transport.
    ///
    /// A dedicated socket is closed; a tunnel only stops its stream.
    pub(crate) async fn release(&self) {
        debug!(target = %self.target, mode = ?self.mode, "Releasing session transport");
        self.connection().close().await;
    }
}

impl fmt::Debug for TargetSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetSession")
            .field("target", &self.target)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
