//! Request correlation and event routing over a [`Transport`].
//!
//! A [`Connection`] turns the frame stream of a transport into typed
//! request/response calls and typed event streams.
//!
//! # Correlation
//!
//! Every call allocates a fresh [`RequestId`], subscribes to the frame
//! stream, then sends. The first frame whose id and session id both match
//! resolves the call. Subscribing before sending means a reply can never
//! slip past, even when the transport answers synchronously.
//!
//! Dropping the returned future unsubscribes it; the reply, if it ever
//! arrives, is discarded.
//!
//! # Events
//!
//! | Method | Yields |
//! |--------|--------|
//! | [`Connection::all_events`] | Every event, typed if the catalog knows it |
//! | [`Connection::events`] | One event shape |
//! | [`Connection::events_where`] | One event shape, filtered |

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
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestIdGenerator, SessionId};
use crate::protocol::{
    Event, EventCatalog, FrameCodec, ProtocolEvent, RequestFrame, ResponseFrame, ResultFrame,
};
use crate::transport::{DirectTransport, FrameStream, SharedFrame, Transport};

// ============================================================================
// Connection
// ============================================================================

/// Correlator and event bus over one transport.
///
/// Cheap to clone. Clones share the transport, the id counter and the
/// event catalog.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and can be shared across tasks.
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn Transport>,
    ids: Arc<RequestIdGenerator>,
    catalog: Arc<EventCatalog>,
    session_id: Option<SessionId>,
}

impl Connection {
    /// Creates a connection over `transport` with an empty event catalog.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_catalog(transport, Arc::new(EventCatalog::new()))
    }

    /// Creates a connection that decodes events with `catalog`.
    #[must_use]
    pub fn with_catalog(transport: Arc<dyn Transport>, catalog: Arc<EventCatalog>) -> Self {
        Self {
            transport,
            ids: Arc::new(RequestIdGenerator::new()),
            catalog,
            session_id: None,
        }
    }

    /// Opens a WebSocket to `url` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the handshake fails.
    pub async fn open(url: &str, frames_buffer_size: usize) -> Result<Self> {
        let transport = DirectTransport::connect(url, frames_buffer_size).await?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Returns a view addressed to one session of a flat transport.
    ///
    /// Requests are tagged with `session_id` and events are limited to
    /// that session. The transport and id counter stay shared.
    #[must_use]
    pub fn with_session(&self, session_id: SessionId) -> Self {
        Self {
            session_id: Some(session_id),
            ..self.clone()
        }
    }

    /// Returns the underlying transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Returns the event catalog.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Arc<EventCatalog> {
        &self.catalog
    }

    /// Returns the session this view is scoped to.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Calls `method` and decodes the result into `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::SerializationFailed`] if `params` cannot be encoded
    /// - [`Error::RequestFailed`] if the remote rejects the call
    /// - [`Error::DeserializationFailed`] if the result does not fit `T`
    /// - [`Error::ConnectionClosed`] if the transport closes first
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
    ) -> Result<T> {
        let params = encode_params(method, params)?;
        let (request, reply) = self.call(method, params).await?;
        FrameCodec::decode_result(&request, &reply)
    }

    /// Calls `method` and returns the reply envelope.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request), minus result decoding.
    pub async fn request_raw(&self, method: &str, params: impl Serialize) -> Result<ResultFrame> {
        let params = encode_params(method, params)?;
        let (request, reply) = self.call(method, params).await?;
        FrameCodec::decode_raw(&request, &reply)
    }

    /// Sends one call and waits for the matching reply frame.
    async fn call(&self, method: &str, params: Value) -> Result<(RequestFrame, SharedFrame)> {
        let request = RequestFrame::new(
            self.ids.next_id(),
            self.session_id.clone(),
            method,
            params,
        );

        let mut replies = self.transport.frames();
        self.transport.send(&request).await?;

        trace!(request_id = %request.id, method, "Awaiting reply");

        while let Some(reply) = replies.next().await {
            if reply.matches(&request) {
                return Ok((request, reply));
            }
        }

        debug!(request_id = %request.id, method, "Transport closed before reply");
        Err(Error::ConnectionClosed)
    }

    // ========================================================================
    // Frames and Events
    // ========================================================================

    /// Subscribes to inbound frames, limited to this view's session.
    #[must_use]
    pub fn frames(&self) -> FrameStream {
        let frames = self.transport.frames();
        match self.session_id.clone() {
            None => frames,
            Some(session_id) => frames
                .filter(move |frame| future::ready(frame.session_id() == Some(&session_id)))
                .boxed(),
        }
    }

    /// Subscribes to inbound event frames, limited to this view's session.
    #[must_use]
    pub fn event_frames(&self) -> FrameStream {
        self.frames()
            .filter(|frame| future::ready(frame.is_event()))
            .boxed()
    }

    /// Subscribes to every event, decoded through the catalog.
    ///
    /// Events whose params do not fit their registered shape are logged
    /// and dropped.
    #[must_use]
    pub fn all_events(&self) -> BoxStream<'static, Event> {
        let catalog = Arc::clone(&self.catalog);
        self.event_frames()
            .filter_map(move |frame| future::ready(decode_catalog(&catalog, &frame)))
            .boxed()
    }

    /// Subscribes to events of shape `E`.
    ///
    /// Events that fail to decode are logged and dropped.
    #[must_use]
    pub fn events<E: ProtocolEvent>(&self) -> BoxStream<'static, E> {
        self.event_frames()
            .filter_map(|frame| future::ready(decode_typed::<E>(&frame)))
            .boxed()
    }

    /// Subscribes to events of shape `E` accepted by `predicate`.
    #[must_use]
    pub fn events_where<E, P>(&self, predicate: P) -> BoxStream<'static, E>
    where
        E: ProtocolEvent,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.events::<E>()
            .filter(move |event| future::ready(predicate(event)))
            .boxed()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Closes the underlying transport.
    pub async fn close(&self) {
        self.transport.close().await;
    }

    /// Returns `true` once the underlying transport is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("closed", &self.is_closed())
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn encode_params(method: &str, params: impl Serialize) -> Result<Value> {
    serde_json::to_value(params)
        .map_err(|e| Error::serialization_failed(format!("params of {method}"), e))
}

fn decode_catalog(catalog: &EventCatalog, frame: &ResponseFrame) -> Option<Event> {
    let event = frame.as_event()?;
    match catalog.decode(event) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(method = %event.method, error = %e, "Dropping undecodable event");
            None
        }
    }
}

fn decode_typed<E: ProtocolEvent>(frame: &ResponseFrame) -> Option<E> {
    let event = frame.as_event().filter(|event| event.method == E::METHOD)?;
    match FrameCodec::decode_event(event) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(method = E::METHOD, error = %e, "Dropping undecodable event");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, error_for, result_for, wait_until};
    use proptest::prelude::*;
    use rustc_hash::FxHashMap;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reply {
        y: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Changed {
        v: u32,
    }

    impl ProtocolEvent for Changed {
        const METHOD: &'static str = "Foo.changed";
    }

    fn answering(transport: &Arc<MockTransport>) -> Connection {
        Connection::new(Arc::clone(transport) as Arc<dyn Transport>)
    }

    #[tokio::test]
    async fn test_request_resolves_result() {
        let transport = MockTransport::new(|frame| vec![result_for(frame, json!({"y": 2}))]);
        let connection = answering(&transport);

        let reply: Reply = connection.request("Foo.bar", json!({"x": 1})).await.unwrap();
        assert_eq!(reply, Reply { y: 2 });

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "Foo.bar");
        assert_eq!(sent[0].params, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_remote_error_fails_request() {
        let transport = MockTransport::new(|frame| vec![error_for(frame, -32000, "boom")]);
        let connection = answering(&transport);

        let err = connection
            .request::<Reply>("Foo.bar", json!({"x": 1}))
            .await
            .unwrap_err();
        match err {
            Error::RequestFailed {
                method,
                code,
                message,
                ..
            } => {
                assert_eq!(method, "Foo.bar");
                assert_eq!(code, -32000);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shape_mismatch_fails_request() {
        let transport = MockTransport::new(|frame| vec![result_for(frame, json!({"y": "two"}))]);
        let connection = answering(&transport);

        let err = connection.request::<Reply>("Foo.bar", json!({})).await.unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[tokio::test]
    async fn test_request_raw_returns_envelope() {
        let transport = MockTransport::new(|frame| vec![result_for(frame, json!({"y": 2}))]);
        let connection = answering(&transport);

        let raw = connection.request_raw("Foo.bar", json!({})).await.unwrap();
        assert_eq!(raw.result, json!({"y": 2}));
    }

    #[tokio::test]
    async fn test_unserializable_params_fail_before_send() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);

        let mut params = FxHashMap::default();
        params.insert((1, 2), "tuple keys are not JSON");

        let err = connection.request::<Value>("Foo.bar", params).await.unwrap_err();
        assert!(matches!(err, Error::SerializationFailed { .. }));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_fails_fast() {
        let transport = MockTransport::silent();
        transport.fail_sends(true);
        let connection = answering(&transport);

        let err = connection.request::<Value>("Foo.bar", json!({})).await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_close_fails_pending_request() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);

        let pending = tokio::spawn({
            let connection = connection.clone();
            async move { connection.request::<Value>("Foo.bar", json!({})).await }
        });

        wait_until(|| transport.sent().len() == 1).await;
        connection.close().await;

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_ids_are_unique_across_clones() {
        let transport = MockTransport::new(|frame| vec![result_for(frame, json!({}))]);
        let connection = answering(&transport);
        let scoped = connection.with_session(SessionId::from("s1"));

        connection.request::<Value>("Foo.a", json!({})).await.unwrap();
        scoped.request::<Value>("Foo.b", json!({})).await.unwrap();
        connection.clone().request::<Value>("Foo.c", json!({})).await.unwrap();

        let ids: Vec<_> = transport.sent().iter().map(|frame| frame.id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_session_view_tags_requests() {
        let transport = MockTransport::new(|frame| vec![result_for(frame, json!({"y": 1}))]);
        let connection = answering(&transport).with_session(SessionId::from("s1"));

        let reply: Reply = connection.request("Foo.bar", json!({})).await.unwrap();
        assert_eq!(reply, Reply { y: 1 });
        assert_eq!(transport.sent()[0].session_id, Some(SessionId::from("s1")));
    }

    #[tokio::test]
    async fn test_reply_from_other_session_is_ignored() {
        let transport = MockTransport::silent();
        let connection = answering(&transport).with_session(SessionId::from("s1"));

        let pending = tokio::spawn({
            let connection = connection.clone();
            async move { connection.request::<Reply>("Foo.bar", json!({})).await }
        });
        wait_until(|| transport.sent().len() == 1).await;

        transport.push_json(json!({"id": 1, "sessionId": "s2", "result": {"y": 9}}));
        transport.push_json(json!({"id": 1, "sessionId": "s1", "result": {"y": 1}}));

        assert_eq!(pending.await.unwrap().unwrap(), Reply { y: 1 });
    }

    #[tokio::test]
    async fn test_typed_events() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);
        let mut events = connection.events::<Changed>();

        transport.push_event("Foo.other", json!({"v": 1}), None);
        transport.push_event("Foo.changed", json!({"v": "bad"}), None);
        transport.push_event("Foo.changed", json!({"v": 3}), None);

        assert_eq!(events.next().await, Some(Changed { v: 3 }));
    }

    #[tokio::test]
    async fn test_events_where_filters() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);
        let mut events = connection.events_where(|event: &Changed| event.v > 2);

        transport.push_event("Foo.changed", json!({"v": 1}), None);
        transport.push_event("Foo.changed", json!({"v": 5}), None);

        assert_eq!(events.next().await, Some(Changed { v: 5 }));
    }

    #[tokio::test]
    async fn test_all_events_uses_catalog() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);
        connection.catalog().register::<Changed>();
        let mut events = connection.all_events();

        transport.push_event("Bar.raw", json!({"anything": true}), None);
        transport.push_event("Foo.changed", json!({"v": 3}), None);

        let raw = events.next().await.unwrap();
        assert!(raw.is_raw());
        assert_eq!(raw.method(), "Bar.raw");

        let typed = events.next().await.unwrap();
        assert_eq!(typed.payload::<Changed>(), Some(&Changed { v: 3 }));
    }

    #[tokio::test]
    async fn test_session_view_scopes_events() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);
        let mut first = connection.with_session(SessionId::from("s1")).events::<Changed>();
        let mut second = connection.with_session(SessionId::from("s2")).events::<Changed>();

        transport.push_event("Foo.changed", json!({"v": 1}), Some("s1"));
        transport.push_event("Foo.changed", json!({"v": 2}), Some("s2"));
        transport.close().await;

        assert_eq!(first.next().await, Some(Changed { v: 1 }));
        assert_eq!(first.next().await, None);
        assert_eq!(second.next().await, Some(Changed { v: 2 }));
        assert_eq!(second.next().await, None);
    }

    #[tokio::test]
    async fn test_dropped_request_unsubscribes() {
        let transport = MockTransport::silent();
        let connection = answering(&transport);

        let pending = tokio::spawn({
            let connection = connection.clone();
            async move { connection.request::<Value>("Foo.bar", json!({})).await }
        });
        wait_until(|| transport.sent().len() == 1).await;
        assert_eq!(transport.subscriber_count(), 1);

        pending.abort();
        let _ = pending.await;
        transport.push_json(json!({"id": 1, "result": {}}));
        assert_eq!(transport.subscriber_count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_replies_resolve_by_id_in_any_order(
            order in (1usize..12).prop_flat_map(|n| Just((1..=n as u64).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let transport = MockTransport::silent();
                let connection = answering(&transport);

                let handles: Vec<_> = (0..order.len())
                    .map(|k| {
                        let connection = connection.clone();
                        tokio::spawn(async move {
                            connection.request::<Value>("Foo.bar", json!({"k": k})).await
                        })
                    })
                    .collect();

                wait_until(|| transport.sent().len() == order.len()).await;

                let keys: FxHashMap<u64, Value> = transport
                    .sent()
                    .into_iter()
                    .map(|frame| (frame.id.as_u64(), frame.params.unwrap_or_default()["k"].clone()))
                    .collect();

                for id in &order {
                    transport.push_json(json!({"id": id, "result": {"k": keys[id]}}));
                }

                for (k, handle) in handles.into_iter().enumerate() {
                    let reply = handle.await.unwrap().unwrap();
                    assert_eq!(reply, json!({"k": k}));
                }
            });
        }
    }
}
