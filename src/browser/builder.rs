//! Builder pattern for browser configuration.
//!
//! Provides a fluent API for configuring and connecting a [`Browser`].
//!
//! # Example
//!
//! ```no_run
//! use cdp_multiplex::Browser;
//!
//! # async fn example() -> cdp_multiplex::Result<()> {
//! let browser = Browser::builder()
//!     .debugger_url("ws://127.0.0.1:9222/devtools/browser/abc")
//!     .multiplex_connections(true)
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

use super::core::Browser;
use super::options::{BrowserOptions, DEFAULT_BLANK_PAGE, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH, MIN_VIEWPORT_EDGE};
use crate::transport::direct::DEFAULT_FRAMES_BUFFER_SIZE;

// ============================================================================
// BrowserBuilder
// ============================================================================

/// Builder for configuring a [`Browser`] connection.
///
/// Use [`Browser::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct BrowserBuilder {
    debugger_url: Option<String>,
    frames_buffer_size: usize,
    multiplex_connections: bool,
    incognito: bool,
    viewport: (u32, u32),
    blank_page: String,
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self {
            debugger_url: None,
            frames_buffer_size: DEFAULT_FRAMES_BUFFER_SIZE,
            multiplex_connections: false,
            incognito: true,
            viewport: (DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
            blank_page: DEFAULT_BLANK_PAGE.to_string(),
        }
    }
}

// ============================================================================
// BrowserBuilder Implementation
// ============================================================================

impl BrowserBuilder {
    /// Creates a builder with default settings and no URL.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the browser-level debugger URL.
    ///
    /// # Arguments
    ///
    /// * `url` - e.g. `ws://127.0.0.1:9222/devtools/browser/<id>`
    #[inline]
    #[must_use]
    pub fn debugger_url(mut self, url: impl Into<String>) -> Self {
        self.debugger_url = Some(url.into());
        self
    }

    /// Sets how many inbound frames are replayed to late subscribers.
    ///
    /// Clamped to at least 1.
    #[inline]
    #[must_use]
    pub fn frames_buffer_size(mut self, size: usize) -> Self {
        self.frames_buffer_size = size.max(1);
        self
    }

    /// Shares the browser socket across all targets instead of opening
    /// one socket per target.
    #[inline]
    #[must_use]
    pub fn multiplex_connections(mut self, multiplex: bool) -> Self {
        self.multiplex_connections = multiplex;
        self
    }

    /// Creates new targets in their own browser context.
    #[inline]
    #[must_use]
    pub fn incognito(mut self, incognito: bool) -> Self {
        self.incognito = incognito;
        self
    }

    /// Sets the viewport of new targets.
    ///
    /// Each edge is clamped to at least 100 pixels.
    #[inline]
    #[must_use]
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width.max(MIN_VIEWPORT_EDGE), height.max(MIN_VIEWPORT_EDGE));
        self
    }

    /// Sets the URL new targets open by default.
    #[inline]
    #[must_use]
    pub fn blank_page(mut self, url: impl Into<String>) -> Self {
        self.blank_page = url.into();
        self
    }

    /// Builds validated options without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing or not `ws://`/`wss://`.
    pub fn build(self) -> Result<BrowserOptions> {
        let debugger_url = self.debugger_url.ok_or_else(|| {
            Error::config(
                "Debugger URL is required. Use .debugger_url() to set it.\n\
                 Example: Browser::builder().debugger_url(\"ws://127.0.0.1:9222/devtools/browser/<id>\")",
            )
        })?;

        let options = BrowserOptions::new(debugger_url)
            .with_frames_buffer_size(self.frames_buffer_size)
            .with_multiplex_connections(self.multiplex_connections)
            .with_incognito(self.incognito)
            .with_viewport(self.viewport.0, self.viewport.1)
            .with_blank_page(self.blank_page);

        options.validate()?;
        Ok(options)
    }

    /// Validates the settings and connects.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if validation fails
    /// - [`Error::Connection`] if the socket cannot be opened
    /// - The error of enabling target discovery
    pub async fn connect(self) -> Result<Browser> {
        Browser::connect(self.build()?).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_default_builder() {
        let builder = BrowserBuilder::new();
        assert!(builder.debugger_url.is_none());
        assert_eq!(builder.frames_buffer_size, 128);
        assert!(!builder.multiplex_connections);
        assert!(builder.incognito);
        assert_eq!(builder.viewport, (1024, 768));
        assert_eq!(builder.blank_page, "about:blank");
    }

    #[test]
    fn test_setters_clamp() {
        let builder = BrowserBuilder::new().frames_buffer_size(0).viewport(50, 50);
        assert_eq!(builder.frames_buffer_size, 1);
        assert_eq!(builder.viewport, (100, 100));
    }

    #[test]
    fn test_build_fails_without_url() {
        let err = BrowserBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("Debugger URL is required"));
    }

    #[test]
    fn test_build_rejects_http_url() {
        let err = BrowserBuilder::new()
            .debugger_url("http://127.0.0.1:9222/json")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_build_carries_settings() {
        let options = BrowserBuilder::new()
            .debugger_url("ws://127.0.0.1:9222/devtools/browser/abc")
            .multiplex_connections(true)
            .incognito(false)
            .viewport(1920, 1080)
            .blank_page("https://example.com")
            .build()
            .unwrap();

        assert!(options.multiplex_connections);
        assert!(!options.incognito);
        assert_eq!((options.viewport_width, options.viewport_height), (1920, 1080));
        assert_eq!(options.blank_page, "https://example.com");
    }

    #[tokio::test]
    async fn test_connect_fails_without_url() {
        let err = BrowserBuilder::new().connect().await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
