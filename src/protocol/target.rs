//! Target domain shapes.
//!
//! The slice of the `Target` domain catalog that tunneling and the
//! session lifecycle depend on. Everything else in the protocol catalog
//! is invoked generically by method name.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::identifiers::{BrowserContextId, SessionId, TargetId};

use super::event::ProtocolEvent;

// ============================================================================
// Method Names
// ============================================================================

/// `Target` domain method names.
pub mod methods {
    /// Attaches to a target and returns a session id.
    pub const ATTACH_TO_TARGET: &str = "Target.attachToTarget";
    /// Closes a target.
    pub const CLOSE_TARGET: &str = "Target.closeTarget";
    /// Creates an isolated browser context.
    pub const CREATE_BROWSER_CONTEXT: &str = "Target.createBrowserContext";
    /// Creates a new page target.
    pub const CREATE_TARGET: &str = "Target.createTarget";
    /// Detaches a session.
    pub const DETACH_FROM_TARGET: &str = "Target.detachFromTarget";
    /// Disposes a browser context and all of its targets.
    pub const DISPOSE_BROWSER_CONTEXT: &str = "Target.disposeBrowserContext";
    /// Returns info about one target.
    pub const GET_TARGET_INFO: &str = "Target.getTargetInfo";
    /// Returns info about all targets.
    pub const GET_TARGETS: &str = "Target.getTargets";
    /// Sends a protocol message to a target session.
    pub const SEND_MESSAGE_TO_TARGET: &str = "Target.sendMessageToTarget";
    /// Toggles target lifecycle notifications.
    pub const SET_DISCOVER_TARGETS: &str = "Target.setDiscoverTargets";
}

// ============================================================================
// TargetInfo
// ============================================================================

/// Target type reported for pages.
pub const PAGE_TARGET_TYPE: &str = "page";

/// Descriptive metadata about a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Target id.
    pub target_id: TargetId,

    /// Target type (`page`, `service_worker`, ...).
    #[serde(rename = "type")]
    pub target_type: String,

    /// Document title.
    #[serde(default)]
    pub title: String,

    /// Current URL.
    #[serde(default)]
    pub url: String,

    /// Whether a client is attached.
    #[serde(default)]
    pub attached: bool,

    /// Target that opened this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_id: Option<TargetId>,

    /// Browser context the target lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<BrowserContextId>,
}

impl TargetInfo {
    /// Returns `true` if the target is a page.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == PAGE_TARGET_TYPE
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Params of `Target.createBrowserContext`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrowserContextParams {
    /// Dispose the context when the debugging session disconnects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispose_on_detach: Option<bool>,
}

/// Params of `Target.disposeBrowserContext`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposeBrowserContextParams {
    /// Context to dispose.
    pub browser_context_id: BrowserContextId,
}

/// Params of `Target.createTarget`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    /// Initial URL.
    pub url: String,

    /// Viewport width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Viewport height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Context to create the target in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<BrowserContextId>,

    /// Create the target in the background.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
}

/// Params carrying only a target id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetIdParams {
    /// Target the call applies to.
    pub target_id: TargetId,
}

/// Params of `Target.attachToTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetParams {
    /// Target to attach to.
    pub target_id: TargetId,

    /// Use flat session mode instead of wrapped messages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

/// Params of `Target.detachFromTarget`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachFromTargetParams {
    /// Session to detach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Target to detach from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
}

/// Params of `Target.setDiscoverTargets`.
#[derive(Debug, Clone, Serialize)]
pub struct SetDiscoverTargetsParams {
    /// Whether to emit lifecycle notifications.
    pub discover: bool,
}

/// Params of `Target.sendMessageToTarget`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageToTargetParams {
    /// Encoded inner frame.
    pub message: String,

    /// Session the message is addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Target the message is addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
}

// ============================================================================
// Results
// ============================================================================

/// Result of `Target.createBrowserContext`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrowserContextResult {
    /// The new context.
    pub browser_context_id: BrowserContextId,
}

/// Result of `Target.createTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetResult {
    /// The new target.
    pub target_id: TargetId,
}

/// Result of `Target.getTargetInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetInfoResult {
    /// Target metadata.
    pub target_info: TargetInfo,
}

/// Result of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
    /// All known targets.
    pub target_infos: Vec<TargetInfo>,
}

/// Result of `Target.attachToTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
    /// Session assigned to the attachment.
    pub session_id: SessionId,
}

/// Result of `Target.closeTarget`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloseTargetResult {
    /// Always `true` on recent browsers; may be absent.
    #[serde(default)]
    pub success: Option<bool>,
}

// ============================================================================
// Events
// ============================================================================

/// `Target.targetCreated`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreated {
    /// Created target.
    pub target_info: TargetInfo,
}

impl ProtocolEvent for TargetCreated {
    const METHOD: &'static str = "Target.targetCreated";
}

/// `Target.targetInfoChanged`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfoChanged {
    /// Updated target metadata.
    pub target_info: TargetInfo,
}

impl ProtocolEvent for TargetInfoChanged {
    const METHOD: &'static str = "Target.targetInfoChanged";
}

/// `Target.targetDestroyed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDestroyed {
    /// Destroyed target.
    pub target_id: TargetId,
}

impl ProtocolEvent for TargetDestroyed {
    const METHOD: &'static str = "Target.targetDestroyed";
}

/// `Target.targetCrashed`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCrashed {
    /// Crashed target.
    pub target_id: TargetId,
    /// Termination status.
    #[serde(default)]
    pub status: String,
    /// Termination error code.
    #[serde(default)]
    pub error_code: i64,
}

impl ProtocolEvent for TargetCrashed {
    const METHOD: &'static str = "Target.targetCrashed";
}

/// `Target.receivedMessageFromTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessageFromTarget {
    /// Session the message belongs to.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Encoded inner frame.
    pub message: String,
    /// Target the message belongs to.
    #[serde(default)]
    pub target_id: Option<TargetId>,
}

impl ProtocolEvent for ReceivedMessageFromTarget {
    const METHOD: &'static str = "Target.receivedMessageFromTarget";
}

/// `Target.detachedFromTarget`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedFromTarget {
    /// Detached session.
    pub session_id: SessionId,
    /// Target the session was attached to.
    #[serde(default)]
    pub target_id: Option<TargetId>,
}

impl ProtocolEvent for DetachedFromTarget {
    const METHOD: &'static str = "Target.detachedFromTarget";
}

// ============================================================================
// Tests
// ============================================================================
