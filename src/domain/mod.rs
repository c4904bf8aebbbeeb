//! Domain facade.
//!
//! The protocol is split into named domains (`Page`, `Network`, `Target`,
//! ...). A [`Domain`] is a thin view over a [`Connection`] that prefixes
//! method names with the domain name and filters events down to that
//! domain. Domains are stateless; cloning one is cheap.
//!
//! # Example
//!
//! ```ignore
//! let domains = Domains::new(connection);
//! domains.enable_with_dependencies("Page").await?;
//!
//! let page = domains.domain("Page")?;
//! let frame: Value = page.request("navigate", json!({"url": "https://example.com"})).await?;
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `catalog` | Static descriptors and dependency order |
//! | `target` | Typed `Target` domain operations |

// ============================================================================
// Submodules
// ============================================================================

/// Static descriptors and dependency order.
pub mod catalog;

/// Typed `Target` domain operations.
pub mod target;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{BoxStream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::Result;
use crate::protocol::{Event, ProtocolEvent, ResultFrame};

// ============================================================================
// Re-exports
// ============================================================================

pub use catalog::{DomainCatalog, DomainDescriptor, STANDARD_DOMAINS};
pub use target::TargetDomain;

// ============================================================================
// Domain
// ============================================================================

/// A named view over a connection.
#[derive(Clone)]
pub struct Domain {
    descriptor: DomainDescriptor,
    catalog: Arc<DomainCatalog>,
    connection: Connection,
}

impl Domain {
    /// Creates a domain view.
    #[must_use]
    pub fn new(
        descriptor: DomainDescriptor,
        catalog: Arc<DomainCatalog>,
        connection: Connection,
    ) -> Self {
        Self {
            descriptor,
            catalog,
            connection,
        }
    }

    /// Returns the domain name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Returns the domain description.
    #[inline]
    #[must_use]
    pub fn description(&self) -> &'static str {
        self.descriptor.description
    }

    /// Returns the static descriptor.
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &DomainDescriptor {
        &self.descriptor
    }

    /// Returns the connection the domain talks through.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the qualified method name `Domain.method`.
    #[must_use]
    pub fn method(&self, method: &str) -> String {
        format!("{}.{method}", self.descriptor.name)
    }

    /// Calls `Domain.method` and decodes the result.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> Result<T> {
        self.connection.request(&self.method(method), params).await
    }

    /// Calls `Domain.method` and returns the reply envelope.
    ///
    /// # Errors
    ///
    /// See [`Connection::request_raw`].
    pub async fn request_raw(&self, method: &str, params: impl Serialize) -> Result<ResultFrame> {
        self.connection.request_raw(&self.method(method), params).await
    }

    /// Calls `Domain.enable`.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn enable(&self) -> Result<()> {
        debug!(domain = self.name(), "Enabling domain");
        self.request::<Value>("enable", Value::Null).await.map(drop)
    }

    /// Calls `Domain.disable`.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn disable(&self) -> Result<()> {
        debug!(domain = self.name(), "Disabling domain");
        self.request::<Value>("disable", Value::Null).await.map(drop)
    }

    /// Subscribes to every event of this domain.
    #[must_use]
    pub fn events(&self) -> BoxStream<'static, Event> {
        let name = self.descriptor.name;
        self.connection
            .all_events()
            .filter(move |event| future::ready(event.domain() == name))
            .boxed()
    }

    /// Subscribes to events of this domain accepted by `predicate`.
    #[must_use]
    pub fn events_where<P>(&self, predicate: P) -> BoxStream<'static, Event>
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.events()
            .filter(move |event| future::ready(predicate(event)))
            .boxed()
    }

    /// Subscribes to events of shape `E`.
    ///
    /// Shapes of another domain never yield; the stream only ends when
    /// the connection closes.
    #[must_use]
    pub fn typed_events<E: ProtocolEvent>(&self) -> BoxStream<'static, E> {
        let own_domain = E::domain() == self.name();
        if !own_domain {
            warn!(
                domain = self.name(),
                event = E::METHOD,
                "Subscribing to an event of another domain"
            );
        }
        self.connection
            .events::<E>()
            .filter(move |_| future::ready(own_domain))
            .boxed()
    }

    /// Returns views of the declared dependencies.
    ///
    /// Dependencies missing from the catalog are skipped.
    #[must_use]
    pub fn dependencies(&self) -> Vec<Domain> {
        self.descriptor
            .dependencies
            .iter()
            .filter_map(|name| self.catalog.get(name).copied())
            .map(|descriptor| {
                Self::new(descriptor, Arc::clone(&self.catalog), self.connection.clone())
            })
            .collect()
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.descriptor.name)
            .field("dependencies", &self.descriptor.dependencies)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Domains
// ============================================================================

/// Entry point to every domain on one connection.
#[derive(Clone)]
pub struct Domains {
    catalog: Arc<DomainCatalog>,
    connection: Connection,
}

impl Domains {
    /// Creates domain access with the standard catalog.
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self::with_catalog(connection, DomainCatalog::standard())
    }

    /// Creates domain access with a custom catalog.
    #[must_use]
    pub fn with_catalog(connection: Connection, catalog: Arc<DomainCatalog>) -> Self {
        Self {
            catalog,
            connection,
        }
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the domain catalog.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<DomainCatalog> {
        &self.catalog
    }

    /// Returns the domain named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDomain`](crate::Error::UnknownDomain) if the
    /// catalog has no such domain.
    pub fn domain(&self, name: &str) -> Result<Domain> {
        let descriptor = self.catalog.resolve(name)?;
        Ok(Domain::new(
            descriptor,
            Arc::clone(&self.catalog),
            self.connection.clone(),
        ))
    }

    /// Returns typed access to the `Target` domain.
    #[must_use]
    pub fn target(&self) -> TargetDomain {
        TargetDomain::new(self.connection.clone())
    }

    /// Subscribes to every event on the connection.
    #[must_use]
    pub fn events(&self) -> BoxStream<'static, Event> {
        self.connection.all_events()
    }

    /// Enables `name` after enabling its dependencies, in dependency order.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownDomain`](crate::Error::UnknownDomain) or
    ///   [`Error::DependencyCycle`](crate::Error::DependencyCycle) from resolution
    /// - The first failing `enable` call; later domains are not enabled
    pub async fn enable_with_dependencies(&self, name: &str) -> Result<Vec<&'static str>> {
        let order = self.catalog.enable_order(name)?;
        for domain in &order {
            self.domain(domain)?.enable().await?;
        }
        Ok(order)
    }
}

impl fmt::Debug for Domains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domains")
            .field("catalog", &self.catalog.len())
            .field("connection", &self.connection)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
