//! Debugger domain events and the channel they are delivered through.

use crate::messages::{BreakReason, BreakpointId, CallFrame, Location, ScriptId, StackTrace};
use serde::{Deserialize, Serialize};

/// Notification emitted by the debugger agent.
///
/// Serializes directly into the event envelope, `{"method": ..., "params": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DebuggerEvent {
    /// The inspected page navigated; every script id is stale.
    #[serde(rename = "Debugger.globalObjectCleared")]
    GlobalObjectCleared,
    /// A script compiled successfully.
    #[serde(rename = "Debugger.scriptParsed")]
    ScriptParsed(ScriptParsedEvent),
    /// A script failed to compile.
    #[serde(rename = "Debugger.scriptFailedToParse")]
    ScriptFailedToParse(ScriptParsedEvent),
    /// A breakpoint set by url became active in a newly parsed script.
    #[serde(rename = "Debugger.breakpointResolved")]
    BreakpointResolved(BreakpointResolvedEvent),
    /// The VM stopped and the pause is surfaced to the front-end.
    #[serde(rename = "Debugger.paused")]
    Paused(PausedEvent),
    /// The VM resumed.
    #[serde(rename = "Debugger.resumed")]
    Resumed,
}

/// Payload of `Debugger.scriptParsed` and `Debugger.scriptFailedToParse`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptParsedEvent {
    /// Id of the script.
    pub script_id: ScriptId,
    /// Url or `sourceURL` of the script.
    pub url: String,
    /// First line within the resource.
    pub start_line: i32,
    /// First column within the resource.
    pub start_column: i32,
    /// Last line within the resource.
    pub end_line: i32,
    /// Last column within the resource.
    pub end_column: i32,
    /// The script belongs to an extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_content_script: Option<bool>,
    /// Source map of the script.
    #[serde(rename = "sourceMapURL", skip_serializing_if = "Option::is_none")]
    pub source_map_url: Option<String>,
    /// `url` came from a `sourceURL` comment.
    #[serde(rename = "hasSourceURL", skip_serializing_if = "Option::is_none")]
    pub has_source_url: Option<bool>,
}

/// Payload of `Debugger.breakpointResolved`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointResolvedEvent {
    /// The breakpoint that resolved.
    pub breakpoint_id: BreakpointId,
    /// Where it resolved.
    pub location: Location,
}

/// Payload of `Debugger.paused`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedEvent {
    /// The paused stack, top first.
    pub call_frames: Vec<CallFrame>,
    /// Why the VM stopped.
    pub reason: BreakReason,
    /// Reason-specific details, e.g. the exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Breakpoints at the pause location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_breakpoints: Option<Vec<BreakpointId>>,
    /// Async stacks that led here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_stack_trace: Option<StackTrace>,
}

/// Sink for agent events.
///
/// The host glue implements this to serialize and forward events to the
/// front-end. Delivery is synchronous: the agent calls it from inside its own
/// state transitions.
pub trait FrontendChannel {
    /// Delivers one event.
    fn send_event(&mut self, event: DebuggerEvent);
}

impl<F> FrontendChannel for F
where
    F: FnMut(DebuggerEvent),
{
    fn send_event(&mut self, event: DebuggerEvent) {
        self(event);
    }
}

impl DebuggerEvent {
    /// Returns the fully qualified method name of this event.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::GlobalObjectCleared => "Debugger.globalObjectCleared",
            Self::ScriptParsed(_) => "Debugger.scriptParsed",
            Self::ScriptFailedToParse(_) => "Debugger.scriptFailedToParse",
            Self::BreakpointResolved(_) => "Debugger.breakpointResolved",
            Self::Paused(_) => "Debugger.paused",
            Self::Resumed => "Debugger.resumed",
        }
    }
}
