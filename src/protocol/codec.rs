//! Frame codec.
//!
//! Serializes outgoing calls and classifies incoming messages. The codec
//! is pure: no I/O, no shared state.
//!
//! # Classification
//!
//! The variant of an inbound frame is decided by the keys of the decoded
//! JSON object, checked in this order:
//!
//! | Key present | Variant |
//! |-------------|---------|
//! | `error` | [`ResponseFrame::Error`] |
//! | `method` | [`ResponseFrame::Event`] |
//! | `id` | [`ResponseFrame::Result`] |
//!
//! `error` is checked first because error frames carry an `id` too.
//! Anything else is a [`Error::ProtocolViolation`].

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::frame::{ErrorFrame, EventFrame, RequestFrame, ResponseFrame, ResultFrame};

// ============================================================================
// FrameCodec
// ============================================================================

/// Encoder and decoder for wire frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Serializes a request frame to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if the frame cannot be encoded.
    pub fn encode(frame: &RequestFrame) -> Result<String> {
        serde_json::to_string(frame).map_err(|e| {
            Error::serialization_failed(format!("request frame {} ({})", frame.id, frame.method), e)
        })
    }

    /// Parses wire text into a [`ResponseFrame`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] if the text is not a JSON object
    /// or matches none of the known frame shapes.
    pub fn decode(text: &str) -> Result<ResponseFrame> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::protocol_violation(format!("malformed JSON frame: {e}")))?;

        let Value::Object(object) = value else {
            return Err(Error::protocol_violation(format!(
                "frame is not a JSON object: {}",
                truncate(text)
            )));
        };

        Self::classify(object)
    }

    /// Picks the frame variant from the object's keys.
    fn classify(object: Map<String, Value>) -> Result<ResponseFrame> {
        if object.contains_key("error") {
            return parse_variant(object, "error").map(ResponseFrame::Error);
        }

        if object.contains_key("method") {
            return parse_variant(object, "event").map(ResponseFrame::Event);
        }

        if object.contains_key("id") {
            return parse_variant(object, "result").map(ResponseFrame::Result);
        }

        Err(Error::protocol_violation(format!(
            "unrecognized frame with keys {:?}",
            object.keys().collect::<Vec<_>>()
        )))
    }

    /// Decodes the reply to `request` into `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestFailed`] if `response` is an error frame
    /// - [`Error::DeserializationFailed`] if the result does not fit `T`
    /// - [`Error::ProtocolViolation`] if `response` is an event frame
    pub fn decode_result<T: DeserializeOwned>(
        request: &RequestFrame,
        response: &ResponseFrame,
    ) -> Result<T> {
        let frame = Self::decode_raw(request, response)?;

        serde_json::from_value(frame.result).map_err(|e| {
            Error::deserialization_failed(format!("result of {} ({})", request.method, request.id), e)
        })
    }

    /// Returns the reply envelope itself without interpreting its payload.
    ///
    /// Remote errors are still raised.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestFailed`] if `response` is an error frame
    /// - [`Error::ProtocolViolation`] if `response` is an event frame
    pub fn decode_raw(request: &RequestFrame, response: &ResponseFrame) -> Result<ResultFrame> {
        match response {
            ResponseFrame::Result(frame) => Ok(frame.clone()),
            ResponseFrame::Error(frame) => Err(Error::request_failed(
                request.method.clone(),
                frame.error.code,
                frame.error.message.clone(),
                frame.error.data.clone(),
            )),
            ResponseFrame::Event(frame) => Err(Error::protocol_violation(format!(
                "event {} is not a reply to {}",
                frame.method, request.method
            ))),
        }
    }

    /// Decodes an event payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] if the params do not fit `T`.
    pub fn decode_event<T: DeserializeOwned>(frame: &EventFrame) -> Result<T> {
        serde_json::from_value(frame.params.clone())
            .map_err(|e| Error::deserialization_failed(format!("event {}", frame.method), e))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_variant<T: DeserializeOwned>(object: Map<String, Value>, kind: &str) -> Result<T> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| Error::protocol_violation(format!("malformed {kind} frame: {e}")))
}

/// Shortens wire text for log and error messages.
fn truncate(text: &str) -> &str {
    const MAX: usize = 256;
    match text.char_indices().nth(MAX) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

// ============================================================================
// Tests
// ============================================================================
