//! Browser entry point and configuration.
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
//!     .viewport(1280, 720)
//!     .connect()
//!     .await?;
//!
//! let page = browser.target_with("https://example.com", false, 1280, 720).await?;
//! let title: serde_json::Value = page
//!     .domain("Runtime")?
//!     .request("evaluate", serde_json::json!({"expression": "document.title"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent [`BrowserBuilder`] |
//! | `core` | [`Browser`] |
//! | `options` | [`BrowserOptions`] and defaults |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder.
pub mod builder;

/// Browser entry point.
pub mod core;

/// Connection settings and defaults.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BrowserBuilder;
pub use core::Browser;
pub use options::BrowserOptions;
