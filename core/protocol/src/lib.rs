//! Inspector protocol wire shapes
//!
//! This crate defines the logical messages exchanged between an inspector
//! front-end and the debugger agent. It owns no behavior: the agent in
//! `inspector_debugger` produces and consumes these types, and the host glue
//! moves their serialized form over whatever transport it has.
//!
//! # Message shapes
//!
//! - Requests carry an `id`, a `method` such as `Debugger.setBreakpointByUrl`
//!   and optional `params`.
//! - Responses echo the request `id` and carry either a `result` or an `error`.
//! - Events carry a `method` such as `Debugger.paused` and optional `params`,
//!   but no `id`.

pub mod events;
pub mod messages;

pub use events::{DebuggerEvent, FrontendChannel};
pub use messages::*;

use serde::{Deserialize, Serialize};

/// JSON-RPC error code for a malformed request envelope.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC error code for a request naming an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC error code for parameters that do not match the method signature.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC error code used for every agent-reported failure.
pub const SERVER_ERROR: i64 = -32000;

/// Inspector protocol message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProtocolMessage {
    /// A command sent by the front-end.
    Request(Request),
    /// The answer to a previously received command.
    Response(Response),
    /// A notification pushed by the agent.
    Event(Event),
}

/// Inspector request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Front-end chosen identifier, echoed in the response.
    pub id: i64,
    /// Fully qualified method name, `Domain.command`.
    pub method: String,
    /// Command parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Inspector response message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Identifier of the request this answers.
    pub id: i64,
    /// Result object on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
}

/// Inspector event message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Fully qualified event name, `Domain.event`.
    pub method: String,
    /// Event payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// Error object carried by a failed [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    /// One of the JSON-RPC error codes defined in this crate.
    pub code: i64,
    /// Human readable description.
    pub message: String,
}

impl Response {
    /// Creates a successful response.
    #[must_use]
    pub fn success(id: i64, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failed response.
    #[must_use]
    pub fn failure(id: i64, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ProtocolError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Returns `true` if this response carries an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl ProtocolMessage {
    /// Returns the `id` of requests and responses, `None` for events.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Request(r) => Some(r.id),
            Self::Response(r) => Some(r.id),
            Self::Event(_) => None,
        }
    }
}
