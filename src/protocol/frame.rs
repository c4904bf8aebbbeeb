//! Wire frame types.
//!
//! Defines the envelope of every message exchanged over a DevTools
//! connection. Payloads stay opaque ([`Value`]) at this layer.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{RequestId, SessionId};

// ============================================================================
// RequestFrame
// ============================================================================

/// An outbound method call.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "sessionId": "optional",
///   "method": "Domain.method",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Session the call is addressed to, if any.
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Method in `Domain.method` format.
    pub method: String,

    /// Call parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl RequestFrame {
    /// Creates a request frame; `null` params are omitted on the wire.
    #[must_use]
    pub fn new(
        id: RequestId,
        session_id: Option<SessionId>,
        method: impl Into<String>,
        params: Value,
    ) -> Self {
        Self {
            id,
            session_id,
            method: method.into(),
            params: (!params.is_null()).then_some(params),
        }
    }
}

// ============================================================================
// RequestError
// ============================================================================

/// Error payload of an [`ErrorFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestError {
    /// Remote error code.
    pub code: i64,

    /// Remote error message.
    pub message: String,

    /// Additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

// ============================================================================
// Response Frames
// ============================================================================

/// Remote rejection of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Id of the rejected request.
    pub id: RequestId,

    /// Session the reply belongs to.
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Error details.
    pub error: RequestError,
}

/// Successful reply to a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFrame {
    /// Id of the answered request.
    pub id: RequestId,

    /// Session the reply belongs to.
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Opaque result payload.
    #[serde(default)]
    pub result: Value,
}

/// Unsolicited notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Event in `Domain.event` format.
    pub method: String,

    /// Opaque event payload.
    #[serde(default)]
    pub params: Value,

    /// Session the event originates from.
    #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl EventFrame {
    /// Returns the domain part of the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }
}

// ============================================================================
// ResponseFrame
// ============================================================================

/// Any inbound frame.
///
/// Built by [`FrameCodec::decode`](super::FrameCodec::decode), which picks
/// the variant from the keys present on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFrame {
    /// Remote rejected a call.
    Error(ErrorFrame),
    /// Remote answered a call.
    Result(ResultFrame),
    /// Remote pushed an event.
    Event(EventFrame),
}

impl ResponseFrame {
    /// Returns `true` for event frames.
    #[inline]
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Returns the request id for replies.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<RequestId> {
        match self {
            Self::Error(frame) => Some(frame.id),
            Self::Result(frame) => Some(frame.id),
            Self::Event(_) => None,
        }
    }

    /// Returns the session id the frame is tagged with.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::Error(frame) => frame.session_id.as_ref(),
            Self::Result(frame) => frame.session_id.as_ref(),
            Self::Event(frame) => frame.session_id.as_ref(),
        }
    }

    /// Returns the event frame, if this is one.
    #[inline]
    #[must_use]
    pub fn as_event(&self) -> Option<&EventFrame> {
        match self {
            Self::Event(frame) => Some(frame),
            _ => None,
        }
    }

    /// Returns `true` if this reply answers `request`.
    ///
    /// Both the id and the session id must match.
    #[must_use]
    pub fn matches(&self, request: &RequestFrame) -> bool {
        self.id() == Some(request.id) && self.session_id() == request.session_id.as_ref()
    }
}

// ============================================================================
// Tests
// ============================================================================
