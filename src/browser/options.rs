//! Browser connection settings.
//!
//! # Example
//!
//! ```ignore
//! use cdp_multiplex::BrowserOptions;
//!
//! let options = BrowserOptions::new("ws://127.0.0.1:9222/devtools/browser/abc")
//!     .with_multiplex_connections(true)
//!     .with_viewport(1920, 1080);
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};
use crate::target::{ConnectionMode, ManagerOptions};
use crate::transport::direct::DEFAULT_FRAMES_BUFFER_SIZE;

// ============================================================================
// Constants
// ============================================================================

/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 768;

/// Smallest accepted viewport edge in pixels.
pub const MIN_VIEWPORT_EDGE: u32 = 100;

/// Page loaded into new targets by default.
pub const DEFAULT_BLANK_PAGE: &str = "about:blank";

// ============================================================================
// BrowserOptions
// ============================================================================

/// Settings for a browser connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Browser-level `ws://` or `wss://` debugger URL.
    pub debugger_url: String,

    /// Inbound frames replayed to late subscribers.
    pub frames_buffer_size: usize,

    /// Share one socket across all targets.
    pub multiplex_connections: bool,

    /// Create each new target in its own browser context.
    pub incognito: bool,

    /// Viewport width of new targets.
    pub viewport_width: u32,

    /// Viewport height of new targets.
    pub viewport_height: u32,

    /// URL new targets open by default.
    pub blank_page: String,
}

impl BrowserOptions {
    /// Creates options with defaults for everything but the URL.
    #[must_use]
    pub fn new(debugger_url: impl Into<String>) -> Self {
        Self {
            debugger_url: debugger_url.into(),
            frames_buffer_size: DEFAULT_FRAMES_BUFFER_SIZE,
            multiplex_connections: false,
            incognito: true,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            blank_page: DEFAULT_BLANK_PAGE.to_string(),
        }
    }

    /// Sets the replay buffer size; clamped to at least 1.
    #[inline]
    #[must_use]
    pub fn with_frames_buffer_size(mut self, size: usize) -> Self {
        self.frames_buffer_size = size.max(1);
        self
    }

    /// Shares one socket across all targets.
    #[inline]
    #[must_use]
    pub fn with_multiplex_connections(mut self, multiplex: bool) -> Self {
        self.multiplex_connections = multiplex;
        self
    }

    /// Creates new targets in their own browser context.
    #[inline]
    #[must_use]
    pub fn with_incognito(mut self, incognito: bool) -> Self {
        self.incognito = incognito;
        self
    }

    /// Sets the viewport of new targets; each edge is clamped to
    /// [`MIN_VIEWPORT_EDGE`].
    #[inline]
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width.max(MIN_VIEWPORT_EDGE);
        self.viewport_height = height.max(MIN_VIEWPORT_EDGE);
        self
    }

    /// Sets the URL new targets open by default.
    #[inline]
    #[must_use]
    pub fn with_blank_page(mut self, url: impl Into<String>) -> Self {
        self.blank_page = url.into();
        self
    }

    /// Returns how targets reach the browser.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ConnectionMode {
        ConnectionMode::from_multiplex(self.multiplex_connections)
    }

    /// Returns the subset of settings the target manager needs.
    #[must_use]
    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            browser_debugger_url: self.debugger_url.clone(),
            mode: self.mode(),
            frames_buffer_size: self.frames_buffer_size,
        }
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the debugger URL is not a `ws://` or
    /// `wss://` URL.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.debugger_url).map_err(|e| {
            Error::config(format!(
                "Invalid debugger URL {}: {e}\n\
                 Example: ws://127.0.0.1:9222/devtools/browser/<id>",
                self.debugger_url
            ))
        })?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Debugger URL must use ws:// or wss://, got {}",
                self.debugger_url
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "ws://127.0.0.1:9222/devtools/browser/abc";

    #[test]
    fn test_new_uses_defaults() {
        let options = BrowserOptions::new(URL);
        assert_eq!(options.frames_buffer_size, 128);
        assert!(!options.multiplex_connections);
        assert!(options.incognito);
        assert_eq!((options.viewport_width, options.viewport_height), (1024, 768));
        assert_eq!(options.blank_page, "about:blank");
        assert_eq!(options.mode(), ConnectionMode::Dedicated);
    }

    #[test]
    fn test_setters_clamp() {
        let options = BrowserOptions::new(URL)
            .with_frames_buffer_size(0)
            .with_viewport(10, 2000);
        assert_eq!(options.frames_buffer_size, 1);
        assert_eq!((options.viewport_width, options.viewport_height), (100, 2000));
    }

    #[test]
    fn test_manager_options() {
        let options = BrowserOptions::new(URL).with_multiplex_connections(true);
        let manager = options.manager_options();
        assert_eq!(manager.browser_debugger_url, URL);
        assert_eq!(manager.mode, ConnectionMode::Multiplexed);
        assert_eq!(manager.frames_buffer_size, 128);
    }

    #[test]
    fn test_validate() {
        assert!(BrowserOptions::new(URL).validate().is_ok());
        assert!(BrowserOptions::new("wss://host/devtools/browser/x").validate().is_ok());

        let err = BrowserOptions::new("http://127.0.0.1:9222").validate().unwrap_err();
        assert!(err.to_string().contains("ws://"));

        let err = BrowserOptions::new("not a url").validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
