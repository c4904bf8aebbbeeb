//! Browser entry point.
//!
//! The [`Browser`] owns the browser-level connection and the
//! [`TargetManager`] built on it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::info;

use crate::connection::Connection;
use crate::domain::Domains;
use crate::error::Result;
use crate::protocol::TargetInfo;
use crate::target::{TargetManager, TargetSession};

use super::builder::BrowserBuilder;
use super::options::BrowserOptions;

// ============================================================================
// Browser
// ============================================================================

/// A connected browser.
///
/// # Examples
///
/// ```no_run
/// use cdp_multiplex::Browser;
///
/// # async fn example() -> cdp_multiplex::Result<()> {
/// let browser = Browser::builder()
///     .debugger_url("ws://127.0.0.1:9222/devtools/browser/abc")
///     .connect()
///     .await?;
///
/// let page = browser.target().await?;
/// page.domain("Page")?.enable().await?;
///
/// browser.close_target(&page).await?;
/// browser.close().await;
/// # Ok(())
/// # }
/// ```
pub struct Browser {
    options: BrowserOptions,
    manager: TargetManager,
}

impl Browser {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    /// Connects with validated options.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the options are invalid
    /// - [`Error::Connection`](crate::Error::Connection) if the socket cannot be opened
    /// - The error of enabling target discovery
    pub async fn connect(options: BrowserOptions) -> Result<Self> {
        options.validate()?;

        let connection = Connection::open(&options.debugger_url, options.frames_buffer_size).await?;
        let browser = Self::with_connection(connection, options).await?;

        info!(url = %browser.options.debugger_url, "Browser connected");
        Ok(browser)
    }

    /// Starts on an existing browser-level connection.
    ///
    /// # Errors
    ///
    /// Returns the error of enabling target discovery.
    pub async fn with_connection(connection: Connection, options: BrowserOptions) -> Result<Self> {
        let manager = TargetManager::start(connection, options.manager_options()).await?;
        Ok(Self { options, manager })
    }

    /// Returns the connection settings.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Returns the target manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &TargetManager {
        &self.manager
    }

    /// Returns domain access on the browser-level connection.
    #[inline]
    #[must_use]
    pub fn domains(&self) -> &Domains {
        self.manager.browser()
    }

    /// Opens a new target with the configured defaults.
    ///
    /// # Errors
    ///
    /// See [`TargetManager::create`].
    pub async fn target(&self) -> Result<TargetSession> {
        self.target_with(
            &self.options.blank_page,
            self.options.incognito,
            self.options.viewport_width,
            self.options.viewport_height,
        )
        .await
    }

    /// Opens a new target.
    ///
    /// # Errors
    ///
    /// See [`TargetManager::create`].
    pub async fn target_with(
        &self,
        url: &str,
        incognito: bool,
        width: u32,
        height: u32,
    ) -> Result<TargetSession> {
        self.manager.create(url, incognito, width, height).await
    }

    /// Attaches to an existing target.
    ///
    /// # Errors
    ///
    /// See [`TargetManager::attach`].
    pub async fn attach(&self, info: TargetInfo) -> Result<TargetSession> {
        self.manager.attach(info).await
    }

    /// Returns the known page targets.
    #[must_use]
    pub fn targets(&self) -> Vec<TargetInfo> {
        self.manager.pages()
    }

    /// Closes a target and its browser context.
    ///
    /// # Errors
    ///
    /// See [`TargetManager::close`].
    pub async fn close_target(&self, session: &TargetSession) -> Result<()> {
        self.manager.close(session).await
    }

    /// Closes the browser connection.
    pub async fn close(&self) {
        self.manager.shutdown().await;
    }
}

impl fmt::Debug for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Browser")
            .field("options", &self.options)
            .field("manager", &self.manager)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::fake_browser;
    use crate::transport::Transport;

    async fn browser(options: BrowserOptions) -> (Browser, Arc<crate::testing::MockTransport>) {
        let transport = fake_browser();
        let connection = Connection::new(Arc::clone(&transport) as Arc<dyn Transport>);
        let browser = Browser::with_connection(connection, options).await.unwrap();
        (browser, transport)
    }

    fn multiplexed() -> BrowserOptions {
        BrowserOptions::new("ws://127.0.0.1:9222/devtools/browser/abc")
            .with_multiplex_connections(true)
    }

    #[tokio::test]
    async fn test_target_uses_defaults() {
        let (browser, transport) = browser(multiplexed()).await;

        let session = browser.target().await.unwrap();
        assert!(session.browser_context_id().is_some());

        let create = transport
            .sent()
            .into_iter()
            .find(|frame| frame.method == "Target.createTarget")
            .unwrap();
        let params = create.params.unwrap();
        assert_eq!(params["url"], "about:blank");
        assert_eq!(params["width"], 1024);
        assert_eq!(params["height"], 768);
        assert_eq!(params["browserContextId"], "CTX1");
    }

    #[tokio::test]
    async fn test_targets_lists_pages() {
        let (browser, _transport) = browser(multiplexed().with_incognito(false)).await;

        let session = browser.target().await.unwrap();
        assert_eq!(browser.targets().len(), 1);

        browser.close_target(&session).await.unwrap();
        assert!(browser.targets().is_empty());
    }

    #[tokio::test]
    async fn test_close_closes_browser_connection() {
        let (browser, transport) = browser(multiplexed()).await;
        browser.close().await;
        assert!(transport.is_closed());
        assert!(browser.domains().connection().is_closed());
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let err = Browser::connect(BrowserOptions::new("http://nope")).await.unwrap_err();
        assert!(matches!(err, crate::Error::Config { .. }));
    }
}
