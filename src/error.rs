//! Error types for the DevTools protocol client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_multiplex::{Error, Result};
//!
//! async fn example(session: &TargetSession) -> Result<()> {
//!     match session.connection().request::<Value>("Page.navigate", params).await {
//!         Err(Error::RequestFailed { message, .. }) => eprintln!("rejected: {message}"),
//!         other => { other?; }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Codec | [`Error::SerializationFailed`], [`Error::ProtocolViolation`], [`Error::DeserializationFailed`] |
//! | Remote | [`Error::RequestFailed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::WebSocket`] |
//! | Domains | [`Error::UnknownDomain`], [`Error::DependencyCycle`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Callers can tell apart "your payload was malformed"
/// ([`Error::SerializationFailed`]), "the remote rejected the call"
/// ([`Error::RequestFailed`]) and "the reply did not match the expected
/// shape" ([`Error::DeserializationFailed`]).
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// Outbound payload could not be encoded.
    #[error("Serialization failed: {message}")]
    SerializationFailed {
        /// What was being serialized.
        message: String,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },

    /// Inbound message did not match any known frame shape.
    #[error("Protocol violation: {message}")]
    ProtocolViolation {
        /// Description of the offending message.
        message: String,
    },

    /// Result or event payload did not match the declared shape.
    #[error("Deserialization failed: {message}")]
    DeserializationFailed {
        /// What was being deserialized.
        message: String,
        /// Underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The remote side answered with an error frame.
    #[error("Request {method} failed ({code}): {message}")]
    RequestFailed {
        /// Method of the rejected request.
        method: String,
        /// Remote error code.
        code: i64,
        /// Remote error message.
        message: String,
        /// Optional remote error details.
        data: Option<String>,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when a connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while an operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Domain Errors
    // ========================================================================
    /// Domain name is not present in the catalog.
    #[error("Unknown domain: {name}")]
    UnknownDomain {
        /// The unknown domain name.
        name: String,
    },

    /// Domain dependency graph contains a cycle.
    #[error("Dependency cycle detected at domain: {domain}")]
    DependencyCycle {
        /// Domain at which the cycle was closed.
        domain: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[inline]
    pub fn serialization_failed(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::SerializationFailed {
            message: message.into(),
            source,
        }
    }

    /// Creates a protocol violation error.
    #[inline]
    pub fn protocol_violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a deserialization error.
    #[inline]
    pub fn deserialization_failed(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::DeserializationFailed {
            message: message.into(),
            source,
        }
    }

    /// Creates a remote request failure.
    #[inline]
    pub fn request_failed(
        method: impl Into<String>,
        code: i64,
        message: impl Into<String>,
        data: Option<String>,
    ) -> Self {
        Self::RequestFailed {
            method: method.into(),
            code,
            message: message.into(),
            data,
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an unknown domain error.
    #[inline]
    pub fn unknown_domain(name: impl Into<String>) -> Self {
        Self::UnknownDomain { name: name.into() }
    }

    /// Creates a dependency cycle error.
    #[inline]
    pub fn dependency_cycle(domain: impl Into<String>) -> Self {
        Self::DependencyCycle {
            domain: domain.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if a retry may succeed.
    ///
    /// Shape mismatches point at a caller or catalog bug and are never
    /// retryable.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SerializationFailed { .. } | Self::RequestFailed { .. }
        )
    }

    /// Returns `true` if a wire reply did not match the expected shape.
    #[inline]
    #[must_use]
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            Self::DeserializationFailed { .. } | Self::ProtocolViolation { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
