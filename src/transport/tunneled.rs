//! Transport multiplexed over another connection.
//!
//! Outbound frames are encoded and wrapped in `Target.sendMessageToTarget`
//! on the parent connection. Inbound frames arrive as the `message` field
//! of `Target.receivedMessageFromTarget` events on the parent.
//!
//! # Addressing
//!
//! An envelope belongs to this transport when its `sessionId` matches.
//! Envelopes without a `sessionId` are matched on `targetId` instead.
//! Inner frames tagged with another session are dropped too.
//!
//! Closing a tunneled transport ends its frame stream. The parent
//! connection stays open. A closed parent closes every tunnel on it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future;
use futures_util::stream::StreamExt;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::connection::Connection;
use crate::domain::TargetDomain;
use crate::error::{Error, Result};
use crate::identifiers::{SessionId, TargetId};
use crate::protocol::target::ReceivedMessageFromTarget;
use crate::protocol::{FrameCodec, ProtocolEvent, RequestFrame, ResponseFrame};

use super::{FrameStream, SharedFrame, Transport};

// ============================================================================
// TunneledTransport
// ============================================================================

/// Transport for one target session carried over a parent connection.
pub struct TunneledTransport {
    parent: Connection,
    session_id: SessionId,
    target_id: TargetId,
    closed: watch::Sender<bool>,
}

impl TunneledTransport {
    /// Creates a tunnel for `session_id` on `target_id` over `parent`.
    #[must_use]
    pub fn new(parent: Connection, session_id: SessionId, target_id: TargetId) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            parent,
            session_id,
            target_id,
            closed,
        }
    }

    /// Returns the session this tunnel is bound to.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the target this tunnel is bound to.
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> &TargetId {
        &self.target_id
    }

    /// Returns the parent connection.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> &Connection {
        &self.parent
    }
}

#[async_trait]
impl Transport for TunneledTransport {
    async fn send(&self, frame: &RequestFrame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        let message = FrameCodec::encode(frame)?;

        trace!(
            session_id = %self.session_id,
            request_id = %frame.id,
            method = %frame.method,
            "Tunneling frame"
        );

        TargetDomain::new(self.parent.clone())
            .send_message_to_target(&self.session_id, &self.target_id, message)
            .await
    }

    fn frames(&self) -> FrameStream {
        let session_id = self.session_id.clone();
        let target_id = self.target_id.clone();

        let mut closed = self.closed.subscribe();
        let stop = async move {
            let _ = closed.wait_for(|closed| *closed).await;
        };

        self.parent
            .event_frames()
            .filter_map(move |frame| future::ready(unwrap_frame(&frame, &session_id, &target_id)))
            .take_until(stop)
            .boxed()
    }

    async fn close(&self) {
        if !self.closed.send_replace(true) {
            debug!(session_id = %self.session_id, target_id = %self.target_id, "Tunnel closed");
        }
    }

    #[inline]
    fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.parent.is_closed()
    }
}

impl fmt::Debug for TunneledTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunneledTransport")
            .field("session_id", &self.session_id)
            .field("target_id", &self.target_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extracts the inner frame of an envelope addressed to this tunnel.
fn unwrap_frame(
    frame: &ResponseFrame,
    session_id: &SessionId,
    target_id: &TargetId,
) -> Option<SharedFrame> {
    let event = frame
        .as_event()
        .filter(|event| event.method == ReceivedMessageFromTarget::METHOD)?;

    let envelope: ReceivedMessageFromTarget = match FrameCodec::decode_event(event) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Dropping malformed tunnel envelope");
            return None;
        }
    };

    let addressed = match &envelope.session_id {
        Some(envelope_session) => envelope_session == session_id,
        None => envelope.target_id.as_ref() == Some(target_id),
    };
    if !addressed {
        return None;
    }

    match FrameCodec::decode(&envelope.message) {
        Ok(inner) => {
            if inner.session_id().is_some_and(|inner_session| inner_session != session_id) {
                return None;
            }
            Some(Arc::new(inner))
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Dropping undecodable tunneled frame");
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
    use crate::identifiers::RequestId;
    use crate::testing::{MockTransport, event, result_for, wait_until};
    use serde::Deserialize;
    use serde_json::{Value, json};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Changed {
        v: u32,
    }

    impl ProtocolEvent for Changed {
        const METHOD: &'static str = "Foo.changed";
    }

    fn parent(transport: &Arc<MockTransport>) -> Connection {
        Connection::new(Arc::clone(transport) as Arc<dyn Transport>)
    }

    fn tunnel(parent: &Connection, session: &str, target: &str) -> Arc<TunneledTransport> {
        Arc::new(TunneledTransport::new(
            parent.clone(),
            SessionId::from(session),
            TargetId::from(target),
        ))
    }

    fn envelope(session: Option<&str>, target: Option<&str>, inner: Value) -> Value {
        let mut params = json!({"message": inner.to_string()});
        if let Some(session) = session {
            params["sessionId"] = json!(session);
        }
        if let Some(target) = target {
            params["targetId"] = json!(target);
        }
        event(ReceivedMessageFromTarget::METHOD, params, None)
    }

    /// Browser that acks every envelope and answers the inner call.
    fn echoing_browser() -> Arc<MockTransport> {
        MockTransport::new(|frame| {
            let params = frame.params.clone().unwrap_or_default();
            let inner: RequestFrame =
                serde_json::from_str(params["message"].as_str().unwrap_or_default()).unwrap();
            let session = params["sessionId"].as_str();
            let target = params["targetId"].as_str();
            vec![
                result_for(frame, json!({})),
                envelope(session, target, json!({"id": inner.id, "result": {"echo": inner.method}})),
            ]
        })
    }

    #[tokio::test]
    async fn test_send_wraps_frame() {
        let transport = MockTransport::new(|frame| vec![result_for(frame, json!({}))]);
        let tunnel = tunnel(&parent(&transport), "s1", "T1");

        let inner = RequestFrame::new(RequestId::new(7), None, "Page.enable", Value::Null);
        tunnel.send(&inner).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].method, "Target.sendMessageToTarget");
        assert_eq!(
            sent[0].params,
            Some(json!({
                "message": r#"{"id":7,"method":"Page.enable"}"#,
                "sessionId": "s1",
                "targetId": "T1"
            }))
        );
    }

    #[tokio::test]
    async fn test_request_round_trip_through_tunnel() {
        let transport = echoing_browser();
        let session = Connection::new(tunnel(&parent(&transport), "s1", "T1"));

        let reply: Value = session.request("Runtime.evaluate", json!({})).await.unwrap();
        assert_eq!(reply, json!({"echo": "Runtime.evaluate"}));
    }

    #[tokio::test]
    async fn test_concurrent_tunnels_are_isolated() {
        let transport = echoing_browser();
        let parent = parent(&transport);
        let first = Connection::new(tunnel(&parent, "s1", "T1"));
        let second = Connection::new(tunnel(&parent, "s2", "T2"));

        // Both sessions allocate id 1 for their first call.
        let (a, b) = tokio::join!(
            first.request::<Value>("A.call", json!({})),
            second.request::<Value>("B.call", json!({}))
        );

        assert_eq!(a.unwrap(), json!({"echo": "A.call"}));
        assert_eq!(b.unwrap(), json!({"echo": "B.call"}));
    }

    #[tokio::test]
    async fn test_events_reach_only_their_session() {
        let transport = MockTransport::silent();
        let parent = parent(&transport);
        let first = tunnel(&parent, "s1", "T1");
        let second = tunnel(&parent, "s2", "T2");
        let mut first_events = Connection::new(Arc::clone(&first) as Arc<dyn Transport>).events::<Changed>();
        let mut second_events = Connection::new(Arc::clone(&second) as Arc<dyn Transport>).events::<Changed>();

        let inner = json!({"method": "Foo.changed", "params": {"v": 3}, "sessionId": "s1"});
        transport.push_json(envelope(Some("s1"), None, inner));
        assert_eq!(first_events.next().await, Some(Changed { v: 3 }));

        first.close().await;
        second.close().await;
        assert_eq!(first_events.next().await, None);
        assert_eq!(second_events.next().await, None);
    }

    #[tokio::test]
    async fn test_target_id_fallback() {
        let transport = MockTransport::silent();
        let tunnel = tunnel(&parent(&transport), "s1", "T1");
        let mut frames = tunnel.frames();

        transport.push_json(envelope(None, Some("T2"), json!({"method": "Foo.other", "params": {}})));
        transport.push_json(envelope(None, Some("T1"), json!({"method": "Foo.mine", "params": {}})));

        let frame = frames.next().await.unwrap();
        assert_eq!(frame.as_event().map(|e| e.method.as_str()), Some("Foo.mine"));
    }

    #[tokio::test]
    async fn test_inner_frame_from_other_session_is_dropped() {
        let transport = MockTransport::silent();
        let tunnel = tunnel(&parent(&transport), "s1", "T1");
        let mut frames = tunnel.frames();

        transport.push_json(envelope(
            Some("s1"),
            None,
            json!({"method": "Foo.foreign", "params": {}, "sessionId": "s2"}),
        ));
        transport.push_json(envelope(Some("s1"), None, json!({"method": "Foo.own", "params": {}})));

        let frame = frames.next().await.unwrap();
        assert_eq!(frame.as_event().map(|e| e.method.as_str()), Some("Foo.own"));
    }

    #[tokio::test]
    async fn test_undecodable_inner_frame_is_dropped() {
        let transport = MockTransport::silent();
        let tunnel = tunnel(&parent(&transport), "s1", "T1");
        let mut frames = tunnel.frames();

        transport.push_event(
            ReceivedMessageFromTarget::METHOD,
            json!({"sessionId": "s1", "message": "not json"}),
            None,
        );
        transport.push_json(envelope(Some("s1"), None, json!({"method": "Foo.ok", "params": {}})));

        let frame = frames.next().await.unwrap();
        assert_eq!(frame.as_event().map(|e| e.method.as_str()), Some("Foo.ok"));
    }

    #[tokio::test]
    async fn test_close_keeps_parent_open() {
        let transport = MockTransport::silent();
        let parent = parent(&transport);
        let tunnel = tunnel(&parent, "s1", "T1");
        let frames = tunnel.frames();

        tunnel.close().await;
        tunnel.close().await;

        assert!(tunnel.is_closed());
        assert!(!parent.is_closed());
        assert_eq!(frames.count().await, 0);

        let inner = RequestFrame::new(RequestId::new(1), None, "Page.enable", Value::Null);
        assert!(matches!(tunnel.send(&inner).await, Err(Error::ConnectionClosed)));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_parent_close_closes_tunnel() {
        let transport = MockTransport::silent();
        let parent = parent(&transport);
        let tunnel = tunnel(&parent, "s1", "T1");
        let session = Connection::new(Arc::clone(&tunnel) as Arc<dyn Transport>);

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.request::<Value>("Page.enable", Value::Null).await }
        });
        wait_until(|| transport.sent().len() == 1).await;
        assert!(!session.is_closed());

        parent.close().await;

        let err = pending.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(tunnel.is_closed());
        assert!(session.is_closed());
        assert_eq!(tunnel.frames().count().await, 0);

        let inner = RequestFrame::new(RequestId::new(2), None, "Page.enable", Value::Null);
        assert!(matches!(tunnel.send(&inner).await, Err(Error::ConnectionClosed)));
    }
}
