//! Event types.
//!
//! Events are notifications pushed by the remote end. Each one is keyed by
//! `Domain.event`. An [`EventCatalog`] maps method names to typed shapes;
//! events with no registered shape stay raw.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::SessionId;

use super::codec::FrameCodec;
use super::frame::EventFrame;

// ============================================================================
// ProtocolEvent
// ============================================================================

/// A typed event shape from the domain catalog.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct LoadEventFired { timestamp: f64 }
///
/// impl ProtocolEvent for LoadEventFired {
///     const METHOD: &'static str = "Page.loadEventFired";
/// }
/// ```
pub trait ProtocolEvent: DeserializeOwned + Send + Sync + 'static {
    /// Event method in `Domain.event` format.
    const METHOD: &'static str;

    /// Returns the domain part of [`Self::METHOD`].
    #[must_use]
    fn domain() -> &'static str {
        Self::METHOD.split('.').next().unwrap_or_default()
    }
}

// ============================================================================
// Event
// ============================================================================

/// Type-erased decoded payload.
pub type EventPayload = Arc<dyn Any + Send + Sync>;

/// A decoded event.
///
/// Carries the `(domain, name)` pair, the originating session and, when
/// the catalog knows the shape, a typed payload. Raw events carry no
/// typed payload.
#[derive(Clone)]
pub struct Event {
    domain: String,
    name: String,
    session_id: Option<SessionId>,
    params: Value,
    payload: Option<EventPayload>,
}

impl Event {
    /// Creates a raw event from a method name.
    #[must_use]
    pub fn raw(method: &str, session_id: Option<SessionId>, params: Value) -> Self {
        let (domain, name) = method.split_once('.').unwrap_or((method, ""));
        Self {
            domain: domain.to_string(),
            name: name.to_string(),
            session_id,
            params,
            payload: None,
        }
    }

    /// Returns the domain name.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the event name within its domain.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `Domain.event`.
    #[must_use]
    pub fn method(&self) -> String {
        format!("{}.{}", self.domain, self.name)
    }

    /// Returns the session the event originates from.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Returns the undecoded params.
    #[inline]
    #[must_use]
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Returns `true` if no typed shape was registered for this event.
    #[inline]
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.payload.is_none()
    }

    /// Returns the typed payload if it is a `T`.
    #[must_use]
    pub fn payload<T: ProtocolEvent>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("domain", &self.domain)
            .field("name", &self.name)
            .field("session_id", &self.session_id)
            .field("typed", &self.payload.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EventCatalog
// ============================================================================

type Decoder = Arc<dyn Fn(&EventFrame) -> Result<EventPayload> + Send + Sync>;

/// Method name to event shape lookup.
///
/// Shared by every connection cloned from the same root.
#[derive(Default)]
pub struct EventCatalog {
    decoders: RwLock<FxHashMap<&'static str, Decoder>>,
}

impl EventCatalog {
    /// Creates an empty catalog.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the shape `E` under [`ProtocolEvent::METHOD`].
    pub fn register<E: ProtocolEvent>(&self) {
        let decoder: Decoder = Arc::new(|frame: &EventFrame| {
            let event: E = FrameCodec::decode_event(frame)?;
            Ok(Arc::new(event) as EventPayload)
        });
        self.decoders.write().insert(E::METHOD, decoder);
    }

    /// Returns `true` if `method` has a registered shape.
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.decoders.read().contains_key(method)
    }

    /// Returns the number of registered shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.decoders.read().len()
    }

    /// Returns `true` if no shapes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decoders.read().is_empty()
    }

    /// Decodes an event frame.
    ///
    /// Unregistered methods fall back to a raw [`Event`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`](crate::Error::DeserializationFailed)
    /// if the params do not fit the registered shape.
    pub fn decode(&self, frame: &EventFrame) -> Result<Event> {
        let decoder = self.decoders.read().get(frame.method.as_str()).cloned();

        let mut event = Event::raw(&frame.method, frame.session_id.clone(), frame.params.clone());
        if let Some(decoder) = decoder {
            event.payload = Some(decoder(frame)?);
        }

        Ok(event)
    }
}

impl fmt::Debug for EventCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCatalog")
            .field("registered", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
