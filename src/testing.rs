//! In-memory transport and helpers for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::protocol::{FrameCodec, RequestFrame};
use crate::transport::{FrameStream, ReplayChannel, Transport};

type Responder = Box<dyn Fn(&RequestFrame) -> Vec<Value> + Send + Sync>;

/// Transport that records sent frames and answers through a closure.
///
/// Replies are published synchronously from inside `send`.
pub(crate) struct MockTransport {
    frames: ReplayChannel,
    sent: Mutex<Vec<RequestFrame>>,
    responder: Responder,
    closed: AtomicBool,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&RequestFrame) -> Vec<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            frames: ReplayChannel::new(64),
            sent: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
        })
    }

    /// A transport that never answers.
    pub(crate) fn silent() -> Arc<Self> {
        Self::new(|_| Vec::new())
    }

    pub(crate) fn sent(&self) -> Vec<RequestFrame> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_methods(&self) -> Vec<String> {
        self.sent.lock().iter().map(|frame| frame.method.clone()).collect()
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.frames.subscriber_count()
    }

    /// Publishes a wire frame as if it arrived from the remote.
    pub(crate) fn push_json(&self, frame: Value) {
        let frame = FrameCodec::decode(&frame.to_string()).expect("mock frame must decode");
        self.frames.publish(Arc::new(frame));
    }

    pub(crate) fn push_event(&self, method: &str, params: Value, session_id: Option<&str>) {
        self.push_json(event(method, params, session_id));
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, frame: &RequestFrame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::connection("mock send failure"));
        }

        self.sent.lock().push(frame.clone());
        for reply in (self.responder)(frame) {
            self.push_json(reply);
        }
        Ok(())
    }

    fn frames(&self) -> FrameStream {
        self.frames.subscribe()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.frames.complete();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Successful reply to `frame`.
pub(crate) fn result_for(frame: &RequestFrame, result: Value) -> Value {
    let mut reply = json!({"id": frame.id, "result": result});
    if let Some(session_id) = &frame.session_id {
        reply["sessionId"] = json!(session_id);
    }
    reply
}

/// Error reply to `frame`.
pub(crate) fn error_for(frame: &RequestFrame, code: i64, message: &str) -> Value {
    let mut reply = json!({"id": frame.id, "error": {"code": code, "message": message}});
    if let Some(session_id) = &frame.session_id {
        reply["sessionId"] = json!(session_id);
    }
    reply
}

/// Event frame.
pub(crate) fn event(method: &str, params: Value, session_id: Option<&str>) -> Value {
    let mut frame = json!({"method": method, "params": params});
    if let Some(session_id) = session_id {
        frame["sessionId"] = json!(session_id);
    }
    frame
}

/// Transport that answers the `Target` domain like a browser with one page.
///
/// Tunneled calls are answered with an ack and a wrapped inner reply.
pub(crate) fn fake_browser() -> Arc<MockTransport> {
    MockTransport::new(|frame| {
        if frame.method != "Target.sendMessageToTarget" {
            return vec![answer_target_call(frame)];
        }

        let params = frame.params.clone().unwrap_or_default();
        let inner: RequestFrame = serde_json::from_str(params["message"].as_str().unwrap_or_default())
            .expect("tunneled message must be a request frame");
        let envelope = json!({
            "sessionId": params["sessionId"],
            "targetId": params["targetId"],
            "message": answer_target_call(&inner).to_string(),
        });

        vec![
            result_for(frame, json!({})),
            event("Target.receivedMessageFromTarget", envelope, None),
        ]
    })
}

fn answer_target_call(frame: &RequestFrame) -> Value {
    let params = frame.params.clone().unwrap_or_default();
    let target_info = |target_id: &Value| {
        json!({
            "targetId": target_id,
            "type": "page",
            "title": "",
            "url": "about:blank",
            "attached": false
        })
    };

    match frame.method.as_str() {
        "Target.createBrowserContext" => result_for(frame, json!({"browserContextId": "CTX1"})),
        "Target.createTarget" => result_for(frame, json!({"targetId": "T1"})),
        "Target.getTargetInfo" => {
            result_for(frame, json!({"targetInfo": target_info(&params["targetId"])}))
        }
        "Target.getTargets" => result_for(frame, json!({"targetInfos": [target_info(&json!("T1"))]})),
        "Target.attachToTarget" => {
            let target_id = params["targetId"].as_str().unwrap_or_default();
            result_for(frame, json!({"sessionId": format!("S-{target_id}")}))
        }
        "Target.closeTarget" => result_for(frame, json!({"success": true})),
        "Target.setDiscoverTargets" | "Target.disposeBrowserContext" | "Target.detachFromTarget" => {
            result_for(frame, json!({}))
        }
        _ => error_for(frame, -32601, "method not found"),
    }
}

/// Yields to the runtime until `condition` holds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
