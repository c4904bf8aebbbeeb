//! Static domain descriptors and dependency resolution.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, LazyLock};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

// ============================================================================
// DomainDescriptor
// ============================================================================

/// Name, description and declared dependencies of a protocol domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainDescriptor {
    /// Domain name, e.g. `Page`.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Domains that should be enabled before this one.
    pub dependencies: &'static [&'static str],
}

impl DomainDescriptor {
    /// Creates a descriptor.
    #[inline]
    #[must_use]
    pub const fn new(
        name: &'static str,
        description: &'static str,
        dependencies: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            dependencies,
        }
    }
}

// ============================================================================
// Standard Domains
// ============================================================================

/// The `Target` domain.
pub const TARGET: DomainDescriptor = DomainDescriptor::new(
    "Target",
    "Supports additional targets discovery and allows to attach to them.",
    &[],
);

/// Domains of the DevTools protocol with their declared dependencies.
pub const STANDARD_DOMAINS: &[DomainDescriptor] = &[
    DomainDescriptor::new("Accessibility", "Accessibility tree inspection.", &["DOM"]),
    DomainDescriptor::new("Animation", "Animation inspection and control.", &["Runtime", "DOM"]),
    DomainDescriptor::new("ApplicationCache", "Application cache inspection.", &["Page"]),
    DomainDescriptor::new(
        "Audits",
        "Audits domain allows investigation of page violations and possible improvements.",
        &["Network"],
    ),
    DomainDescriptor::new(
        "BackgroundService",
        "Defines events for background web platform features.",
        &[],
    ),
    DomainDescriptor::new(
        "Browser",
        "The Browser domain defines methods and events for browser managing.",
        &[],
    ),
    DomainDescriptor::new("CacheStorage", "Cache storage inspection.", &[]),
    DomainDescriptor::new(
        "Cast",
        "A domain for interacting with Cast, Presentation API, and Remote Playback API functionalities.",
        &[],
    ),
    DomainDescriptor::new(
        "Console",
        "This domain is deprecated - use Runtime or Log instead.",
        &["Runtime"],
    ),
    DomainDescriptor::new("CSS", "This domain exposes CSS read/write operations.", &["DOM", "Page"]),
    DomainDescriptor::new("Database", "Web SQL database inspection.", &[]),
    DomainDescriptor::new(
        "Debugger",
        "Debugger domain exposes JavaScript debugging capabilities.",
        &["Runtime"],
    ),
    DomainDescriptor::new("DeviceOrientation", "Device orientation overrides.", &[]),
    DomainDescriptor::new(
        "DOM",
        "This domain exposes DOM read/write operations.",
        &["Runtime"],
    ),
    DomainDescriptor::new(
        "DOMDebugger",
        "DOM debugging allows setting breakpoints on particular DOM operations and events.",
        &["DOM", "Debugger", "Runtime"],
    ),
    DomainDescriptor::new(
        "DOMSnapshot",
        "This domain facilitates obtaining document snapshots with DOM, layout, and style information.",
        &["CSS", "DOM", "DOMDebugger", "Page"],
    ),
    DomainDescriptor::new("DOMStorage", "Query and modify DOM storage.", &[]),
    DomainDescriptor::new(
        "Emulation",
        "This domain emulates different environments for the page.",
        &["DOM", "Page", "Runtime"],
    ),
    DomainDescriptor::new(
        "Fetch",
        "A domain for letting clients substitute browser's network layer with client code.",
        &["Network", "IO", "Page"],
    ),
    DomainDescriptor::new(
        "HeadlessExperimental",
        "This domain provides experimental commands only supported in headless mode.",
        &["Page", "Runtime"],
    ),
    DomainDescriptor::new("HeapProfiler", "JavaScript heap profiling.", &["Runtime"]),
    DomainDescriptor::new("IndexedDB", "IndexedDB inspection.", &["Runtime"]),
    DomainDescriptor::new("Input", "Synthetic input dispatch.", &[]),
    DomainDescriptor::new("Inspector", "Inspector lifecycle notifications.", &[]),
    DomainDescriptor::new("IO", "Input/Output operations for streams produced by DevTools.", &[]),
    DomainDescriptor::new("LayerTree", "Compositing layer inspection.", &["DOM"]),
    DomainDescriptor::new("Log", "Provides access to log entries.", &["Runtime", "Network"]),
    DomainDescriptor::new(
        "Media",
        "This domain allows detailed inspection of media elements.",
        &[],
    ),
    DomainDescriptor::new("Memory", "Memory usage inspection.", &[]),
    DomainDescriptor::new(
        "Network",
        "Network domain allows tracking network activities of the page.",
        &["Debugger", "Runtime", "Security"],
    ),
    DomainDescriptor::new(
        "Overlay",
        "This domain provides various functionality related to drawing atop the inspected page.",
        &["DOM", "Page", "Runtime"],
    ),
    DomainDescriptor::new(
        "Page",
        "Actions and events related to the inspected page belong to the page domain.",
        &["Debugger", "DOM", "IO", "Network", "Runtime"],
    ),
    DomainDescriptor::new("Performance", "Runtime performance metrics.", &[]),
    DomainDescriptor::new(
        "PerformanceTimeline",
        "Reporting of performance timeline events.",
        &["DOM", "Network"],
    ),
    DomainDescriptor::new("Profiler", "JavaScript CPU profiling.", &["Runtime", "Debugger"]),
    DomainDescriptor::new(
        "Runtime",
        "Runtime domain exposes JavaScript runtime by means of remote evaluation and mirror objects.",
        &[],
    ),
    DomainDescriptor::new("Schema", "This domain is deprecated.", &[]),
    DomainDescriptor::new("Security", "Security state of the page.", &[]),
    DomainDescriptor::new("ServiceWorker", "Service worker inspection.", &[]),
    DomainDescriptor::new("Storage", "Storage quota and usage.", &[]),
    DomainDescriptor::new(
        "SystemInfo",
        "The SystemInfo domain defines methods and events for querying low-level system information.",
        &[],
    ),
    TARGET,
    DomainDescriptor::new(
        "Tethering",
        "The Tethering domain defines methods and events for browser port binding.",
        &[],
    ),
    DomainDescriptor::new("Tracing", "Trace event collection.", &["IO"]),
    DomainDescriptor::new("WebAudio", "This domain allows inspection of Web Audio API.", &[]),
    DomainDescriptor::new(
        "WebAuthn",
        "This domain allows configuring virtual authenticators to test the WebAuthn API.",
        &[],
    ),
];

static STANDARD: LazyLock<Arc<DomainCatalog>> =
    LazyLock::new(|| Arc::new(DomainCatalog::from_descriptors(STANDARD_DOMAINS)));

// ============================================================================
// DomainCatalog
// ============================================================================

/// Lookup of domain descriptors by name.
#[derive(Debug, Clone, Default)]
pub struct DomainCatalog {
    descriptors: FxHashMap<&'static str, DomainDescriptor>,
}

impl DomainCatalog {
    /// Creates an empty catalog.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared catalog of standard protocol domains.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD)
    }

    /// Builds a catalog from a descriptor list.
    #[must_use]
    pub fn from_descriptors(descriptors: &[DomainDescriptor]) -> Self {
        let mut catalog = Self::new();
        for descriptor in descriptors {
            catalog.register(*descriptor);
        }
        catalog
    }

    /// Adds or replaces a descriptor.
    pub fn register(&mut self, descriptor: DomainDescriptor) {
        self.descriptors.insert(descriptor.name, descriptor);
    }

    /// Returns the descriptor named `name`.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DomainDescriptor> {
        self.descriptors.get(name)
    }

    /// Returns the descriptor named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDomain`] if no such domain is registered.
    pub fn resolve(&self, name: &str) -> Result<DomainDescriptor> {
        self.get(name)
            .copied()
            .ok_or_else(|| Error::unknown_domain(name))
    }

    /// Returns the number of registered domains.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if no domains are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns `name` and its transitive dependencies, dependencies first.
    ///
    /// Each domain appears once, in depth-first order of declaration.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownDomain`] if `name` or a dependency is not registered
    /// - [`Error::DependencyCycle`] if the dependencies form a cycle
    pub fn enable_order(&self, name: &str) -> Result<Vec<&'static str>> {
        let mut order = Vec::new();
        let mut visiting = FxHashSet::default();
        self.visit(name, &mut visiting, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        name: &str,
        visiting: &mut FxHashSet<&'static str>,
        order: &mut Vec<&'static str>,
    ) -> Result<()> {
        let descriptor = self.resolve(name)?;

        if order.contains(&descriptor.name) {
            return Ok(());
        }
        if !visiting.insert(descriptor.name) {
            return Err(Error::dependency_cycle(descriptor.name));
        }

        for dependency in descriptor.dependencies {
            self.visit(dependency, visiting, order)?;
        }

        visiting.remove(descriptor.name);
        order.push(descriptor.name);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
