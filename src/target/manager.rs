//! Target manager.
//!
//! Owns the browser-level connection and a registry of known targets.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TargetManager              │
//! │  browser connection ─► watcher task     │
//! │  ┌─────────────────────────────────┐    │
//! │  │ TargetId=T1 → TargetInfo        │    │
//! │  │ TargetId=T2 → TargetInfo        │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The watcher applies `Target.targetCreated`, `targetInfoChanged`,
//! `targetDestroyed` and `targetCrashed` notifications to the registry.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::connection::Connection;
use crate::domain::Domains;
use crate::error::{Error, Result};
use crate::identifiers::{BrowserContextId, TargetId};
use crate::protocol::target::{
    CreateTargetParams, TargetCrashed, TargetCreated, TargetDestroyed, TargetInfoChanged,
};
use crate::protocol::{EventFrame, FrameCodec, ProtocolEvent, TargetInfo};
use crate::transport::{DirectTransport, FrameStream, Transport, TunneledTransport};

use super::ConnectionMode;
use super::session::{SessionTarget, TargetSession};

// ============================================================================
// Types
// ============================================================================

type Registry = Arc<RwLock<FxHashMap<TargetId, TargetInfo>>>;

// ============================================================================
// ManagerOptions
// ============================================================================

/// Settings the manager needs from the browser configuration.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Browser-level WebSocket URL; page URLs are derived from it.
    pub browser_debugger_url: String,
    /// How sessions reach their targets.
    pub mode: ConnectionMode,
    /// Replay buffer size of dedicated session transports.
    pub frames_buffer_size: usize,
}

// ============================================================================
// TargetManager
// ============================================================================

/// Creates, attaches and closes targets.
///
/// # Thread Safety
///
/// `TargetManager` is `Send + Sync`; the registry is shared with the
/// watcher task.
pub struct TargetManager {
    browser: Domains,
    options: ManagerOptions,
    registry: Registry,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl TargetManager {
    /// Starts the manager on a browser-level connection.
    ///
    /// Subscribes to lifecycle notifications, then enables discovery.
    ///
    /// # Errors
    ///
    /// Returns the error of `Target.setDiscoverTargets`.
    pub async fn start(connection: Connection, options: ManagerOptions) -> Result<Self> {
        let browser = Domains::new(connection);
        let registry = Registry::default();

        let events = browser.connection().event_frames();
        let watcher = tokio::spawn(Self::watch_targets(events, Arc::clone(&registry)));

        if let Err(e) = browser.target().set_discover_targets(true).await {
            watcher.abort();
            return Err(e);
        }

        info!(mode = ?options.mode, "Target manager started");

        Ok(Self {
            browser,
            options,
            registry,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    /// Returns domain access on the browser connection.
    #[inline]
    #[must_use]
    pub fn browser(&self) -> &Domains {
        &self.browser
    }

    /// Returns the manager settings.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Creates a page target and attaches to it.
    ///
    /// With `isolated`, the target lives in a fresh browser context that is
    /// disposed again when the target is closed.
    ///
    /// # Errors
    ///
    /// Returns the first failing protocol call; earlier steps are not
    /// rolled back.
    pub async fn create(
        &self,
        url: &str,
        isolated: bool,
        width: u32,
        height: u32,
    ) -> Result<TargetSession> {
        let target = self.browser.target();

        let browser_context_id = if isolated {
            let id = target.create_browser_context(true).await?;
            debug!(browser_context_id = %id, "Created browser context");
            Some(id)
        } else {
            None
        };

        let target_id = target
            .create_target(CreateTargetParams {
                url: url.to_string(),
                width: Some(width),
                height: Some(height),
                browser_context_id: browser_context_id.clone(),
                background: Some(true),
            })
            .await?;

        let info = target.get_target_info(&target_id).await?;

        info!(target_id = %target_id, url, isolated, "Target created");

        self.attach_with_context(info, browser_context_id).await
    }

    /// Attaches to an existing target.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if a dedicated URL cannot be derived
    /// - [`Error::Connection`] if a dedicated socket cannot be opened
    /// - The error of `Target.attachToTarget` in multiplexed mode
    pub async fn attach(&self, info: TargetInfo) -> Result<TargetSession> {
        self.attach_with_context(info, None).await
    }

    async fn attach_with_context(
        &self,
        info: TargetInfo,
        browser_context_id: Option<BrowserContextId>,
    ) -> Result<TargetSession> {
        let (session_id, transport) = match self.options.mode {
            ConnectionMode::Multiplexed => {
                let session_id = self
                    .browser
                    .target()
                    .attach_to_target(&info.target_id, false)
                    .await?;
                let tunnel = TunneledTransport::new(
                    self.browser.connection().clone(),
                    session_id.clone(),
                    info.target_id.clone(),
                );
                let transport: Arc<dyn Transport> = Arc::new(tunnel);
                (Some(session_id), transport)
            }
            ConnectionMode::Dedicated => {
                let url = target_ws_address(&self.options.browser_debugger_url, &info.target_id)?;
                let socket = DirectTransport::connect(&url, self.options.frames_buffer_size).await?;
                let transport: Arc<dyn Transport> = Arc::new(socket);
                (None, transport)
            }
        };

        let connection =
            Connection::with_catalog(transport, Arc::clone(self.browser.connection().catalog()));

        let target = SessionTarget {
            target_id: info.target_id.clone(),
            session_id,
            browser_context_id,
        };

        self.registry.write().insert(info.target_id.clone(), info);

        info!(target = %target, mode = ?self.options.mode, "Attached to target");

        Ok(TargetSession::new(
            target,
            Domains::with_catalog(connection, Arc::clone(self.browser.catalog())),
            self.options.mode,
        ))
    }

    /// Closes a target.
    ///
    /// Disposes the browser context created for it, if any. A failed
    /// disposal is logged and does not fail the call.
    ///
    /// # Errors
    ///
    /// Returns the error of `Target.closeTarget`.
    pub async fn close(&self, session: &TargetSession) -> Result<()> {
        let target = self.browser.target();

        target.close_target(session.target_id()).await?;
        self.registry.write().remove(session.target_id());

        if let Some(browser_context_id) = session.browser_context_id() {
            match target.dispose_browser_context(browser_context_id).await {
                Ok(()) => debug!(browser_context_id = %browser_context_id, "Disposed browser context"),
                Err(e) => warn!(
                    browser_context_id = %browser_context_id,
                    error = %e,
                    "Failed to dispose browser context"
                ),
            }
        }

        session.release().await;

        info!(target = %session.target(), "Target closed");
        Ok(())
    }

    /// Stops the watcher and closes the browser connection.
    pub async fn shutdown(&self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
        self.browser.connection().close().await;
        info!("Target manager shut down");
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Returns every known target.
    #[must_use]
    pub fn list(&self) -> Vec<TargetInfo> {
        self.registry.read().values().cloned().collect()
    }

    /// Returns every known page target.
    #[must_use]
    pub fn pages(&self) -> Vec<TargetInfo> {
        self.registry
            .read()
            .values()
            .filter(|info| info.is_page())
            .cloned()
            .collect()
    }

    /// Returns a known target.
    #[must_use]
    pub fn get(&self, target_id: &TargetId) -> Option<TargetInfo> {
        self.registry.read().get(target_id).cloned()
    }

    /// Replaces the registry with a fresh `Target.getTargets` listing.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn refresh(&self) -> Result<Vec<TargetInfo>> {
        let targets = self.browser.target().get_targets().await?;

        let mut registry = self.registry.write();
        registry.clear();
        registry.extend(
            targets
                .iter()
                .map(|info| (info.target_id.clone(), info.clone())),
        );

        Ok(targets)
    }

    // ========================================================================
    // Watcher
    // ========================================================================

    async fn watch_targets(mut events: FrameStream, registry: Registry) {
        while let Some(frame) = events.next().await {
            if let Some(event) = frame.as_event()
                && event.session_id.is_none()
            {
                Self::apply(&registry, event);
            }
        }

        debug!("Target watcher terminated");
    }

    fn apply(registry: &Registry, event: &EventFrame) {
        match event.method.as_str() {
            TargetCreated::METHOD => {
                if let Some(TargetCreated { target_info }) = decode(event) {
                    debug!(target_id = %target_info.target_id, url = %target_info.url, "Target discovered");
                    registry.write().insert(target_info.target_id.clone(), target_info);
                }
            }

            TargetInfoChanged::METHOD => {
                // Unknown ids are ignored so a late change cannot revive a closed target.
                if let Some(TargetInfoChanged { target_info }) = decode(event)
                    && let Some(entry) = registry.write().get_mut(&target_info.target_id)
                {
                    debug!(target_id = %target_info.target_id, url = %target_info.url, "Target changed");
                    *entry = target_info;
                }
            }

            TargetDestroyed::METHOD => {
                if let Some(TargetDestroyed { target_id }) = decode(event)
                    && registry.write().remove(&target_id).is_some()
                {
                    debug!(target_id = %target_id, "Target destroyed");
                }
            }

            TargetCrashed::METHOD => {
                if let Some(crashed) = decode::<TargetCrashed>(event) {
                    warn!(
                        target_id = %crashed.target_id,
                        status = %crashed.status,
                        error_code = crashed.error_code,
                        "Target crashed"
                    );
                    registry.write().remove(&crashed.target_id);
                }
            }

            _ => {}
        }
    }
}

impl Drop for TargetManager {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.abort();
        }
    }
}

impl fmt::Debug for TargetManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetManager")
            .field("options", &self.options)
            .field("targets", &self.registry.read().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn decode<E: ProtocolEvent>(event: &EventFrame) -> Option<E> {
    FrameCodec::decode_event(event)
        .inspect_err(|e| warn!(method = E::METHOD, error = %e, "Dropping undecodable event"))
        .ok()
}

/// Derives the page WebSocket URL of `target_id` from the browser URL.
///
/// Everything after the last `devtools` path segment is replaced with
/// `/page/{target_id}`.
///
/// # Errors
///
/// Returns [`Error::Config`] if `browser_url` is not a URL or has no
/// `devtools` segment.
pub fn target_ws_address(browser_url: &str, target_id: &TargetId) -> Result<String> {
    let mut url = Url::parse(browser_url)
        .map_err(|e| Error::config(format!("invalid debugger URL {browser_url}: {e}")))?;

    let path = url.path();
    let Some(index) = path.rfind("devtools") else {
        return Err(Error::config(format!(
            "debugger URL {browser_url} has no devtools path"
        )));
    };

    let page_path = format!("{}devtools/page/{target_id}", &path[..index]);
    url.set_path(&page_path);

    Ok(url.into())
}

// ============================================================================
// Tests
// ============================================================================
