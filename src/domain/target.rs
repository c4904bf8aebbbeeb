//! Typed `Target` domain operations.
//!
//! Covers the calls the session lifecycle and tunneling need. Anything
//! else in the domain is reachable through [`TargetDomain::domain`].

// ============================================================================
// Imports
// ============================================================================

use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::connection::Connection;
use crate::error::Result;
use crate::identifiers::{BrowserContextId, SessionId, TargetId};
use crate::protocol::TargetInfo;
use crate::protocol::target::{
    AttachToTargetParams, AttachToTargetResult, CloseTargetResult, CreateBrowserContextParams,
    CreateBrowserContextResult, CreateTargetParams, CreateTargetResult, DetachFromTargetParams,
    DisposeBrowserContextParams, GetTargetInfoResult, GetTargetsResult, SendMessageToTargetParams,
    SetDiscoverTargetsParams, TargetCreated, TargetCrashed, TargetDestroyed, TargetIdParams,
    TargetInfoChanged, methods,
};

use super::catalog::{DomainCatalog, TARGET};
use super::Domain;

// ============================================================================
// TargetDomain
// ============================================================================

/// Typed access to the `Target` domain.
#[derive(Debug, Clone)]
pub struct TargetDomain {
    domain: Domain,
}

impl TargetDomain {
    /// Creates `Target` domain access over `connection`.
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self {
            domain: Domain::new(TARGET, DomainCatalog::standard(), connection),
        }
    }

    /// Returns the generic domain view.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    fn connection(&self) -> &Connection {
        self.domain.connection()
    }

    /// Creates a browser context.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn create_browser_context(&self, dispose_on_detach: bool) -> Result<BrowserContextId> {
        let params = CreateBrowserContextParams {
            dispose_on_detach: Some(dispose_on_detach),
        };
        let result: CreateBrowserContextResult = self
            .connection()
            .request(methods::CREATE_BROWSER_CONTEXT, params)
            .await?;
        Ok(result.browser_context_id)
    }

    /// Disposes a browser context and closes its targets.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn dispose_browser_context(&self, browser_context_id: &BrowserContextId) -> Result<()> {
        let params = DisposeBrowserContextParams {
            browser_context_id: browser_context_id.clone(),
        };
        self.connection()
            .request::<Value>(methods::DISPOSE_BROWSER_CONTEXT, params)
            .await
            .map(drop)
    }

    /// Creates a page target.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn create_target(&self, params: CreateTargetParams) -> Result<TargetId> {
        let result: CreateTargetResult = self
            .connection()
            .request(methods::CREATE_TARGET, params)
            .await?;
        Ok(result.target_id)
    }

    /// Closes a target.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn close_target(&self, target_id: &TargetId) -> Result<()> {
        let params = TargetIdParams {
            target_id: target_id.clone(),
        };
        self.connection()
            .request::<CloseTargetResult>(methods::CLOSE_TARGET, params)
            .await
            .map(drop)
    }

    /// Returns metadata about one target.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn get_target_info(&self, target_id: &TargetId) -> Result<TargetInfo> {
        let params = TargetIdParams {
            target_id: target_id.clone(),
        };
        let result: GetTargetInfoResult = self
            .connection()
            .request(methods::GET_TARGET_INFO, params)
            .await?;
        Ok(result.target_info)
    }

    /// Returns metadata about every target.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>> {
        let result: GetTargetsResult = self
            .connection()
            .request(methods::GET_TARGETS, Value::Null)
            .await?;
        Ok(result.target_infos)
    }

    /// Attaches to a target and returns the new session id.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn attach_to_target(&self, target_id: &TargetId, flatten: bool) -> Result<SessionId> {
        let params = AttachToTargetParams {
            target_id: target_id.clone(),
            flatten: Some(flatten),
        };
        let result: AttachToTargetResult = self
            .connection()
            .request(methods::ATTACH_TO_TARGET, params)
            .await?;
        Ok(result.session_id)
    }

    /// Detaches a session.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn detach_from_target(&self, session_id: &SessionId) -> Result<()> {
        let params = DetachFromTargetParams {
            session_id: Some(session_id.clone()),
            target_id: None,
        };
        self.connection()
            .request::<Value>(methods::DETACH_FROM_TARGET, params)
            .await
            .map(drop)
    }

    /// Toggles `targetCreated` / `targetDestroyed` notifications.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn set_discover_targets(&self, discover: bool) -> Result<()> {
        self.connection()
            .request::<Value>(methods::SET_DISCOVER_TARGETS, SetDiscoverTargetsParams { discover })
            .await
            .map(drop)
    }

    /// Sends an encoded frame to a target session.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn send_message_to_target(
        &self,
        session_id: &SessionId,
        target_id: &TargetId,
        message: String,
    ) -> Result<()> {
        let params = SendMessageToTargetParams {
            message,
            session_id: Some(session_id.clone()),
            target_id: Some(target_id.clone()),
        };
        self.connection()
            .request::<Value>(methods::SEND_MESSAGE_TO_TARGET, params)
            .await
            .map(drop)
    }

    /// Subscribes to `Target.targetCreated`.
    #[must_use]
    pub fn target_created(&self) -> BoxStream<'static, TargetCreated> {
        self.connection().events()
    }

    /// Subscribes to `Target.targetInfoChanged`.
    #[must_use]
    pub fn target_info_changed(&self) -> BoxStream<'static, TargetInfoChanged> {
        self.connection().events()
    }

    /// Subscribes to `Target.targetDestroyed`.
    #[must_use]
    pub fn target_destroyed(&self) -> BoxStream<'static, TargetDestroyed> {
        self.connection().events()
    }

    /// Subscribes to `Target.targetCrashed`.
    #[must_use]
    pub fn target_crashed(&self) -> BoxStream<'static, TargetCrashed> {
        self.connection().events()
    }
}

// ============================================================================
// Tests
// ============================================================================
