//! Debugger and Runtime domain types
//!
//! This module defines the command parameters, command results and shared
//! value types of the `Debugger` domain, plus the subset of `Runtime` types
//! the debugger hands out.

use serde::{Deserialize, Serialize};

/// Identifier of a parsed script.
pub type ScriptId = String;

/// Identifier of a logical breakpoint.
pub type BreakpointId = String;

/// Identifier of a call frame while paused.
pub type CallFrameId = String;

/// Opaque identifier of a wrapped remote object.
pub type RemoteObjectId = String;

// ============================================================================
// Command Parameters
// ============================================================================

/// Parameters of `Debugger.setBreakpointsActive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsActiveParams {
    /// New state of every breakpoint.
    pub active: bool,
}

/// Parameters of `Debugger.setSkipAllPauses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSkipAllPausesParams {
    /// Whether to ignore every pause.
    pub skipped: bool,
    /// Stop skipping once the page reloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until_reload: Option<bool>,
}

/// Parameters of `Debugger.setBreakpointByUrl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlParams {
    /// Line to break on.
    pub line_number: i32,
    /// Url of the scripts to break in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Pattern of the urls to break in; exclusive with `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,
    /// Column to break on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i32>,
    /// Expression that must be truthy to stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Marks a location stepping should not stop at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anti_breakpoint: Option<bool>,
}

/// `Debugger.setBreakpoint` takes its location as a loosely typed object so
/// that a missing `scriptId` or `lineNumber` is reported by the agent rather
/// than rejected as invalid params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointParams {
    /// Script and position to break at.
    pub location: serde_json::Value,
    /// Expression that must be truthy to stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Parameters of `Debugger.removeBreakpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBreakpointParams {
    /// Breakpoint to remove.
    pub breakpoint_id: BreakpointId,
}

/// Parameters of `Debugger.continueToLocation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueToLocationParams {
    /// Script and position to run to.
    pub location: serde_json::Value,
    /// Allow stopping between statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interstatement_location: Option<bool>,
}

/// Parameters of `Debugger.getStepInPositions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStepInPositionsParams {
    /// Frame to look at.
    pub call_frame_id: CallFrameId,
}

/// Parameters of `Debugger.getScriptSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceParams {
    /// Script to fetch.
    pub script_id: ScriptId,
}

/// Parameters of `Debugger.getFunctionDetails`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFunctionDetailsParams {
    /// Function to describe.
    pub function_id: RemoteObjectId,
}

/// Parameters of `Debugger.getCollectionEntries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCollectionEntriesParams {
    /// Collection to list.
    pub object_id: RemoteObjectId,
}

/// Parameters of `Debugger.setPauseOnExceptions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPauseOnExceptionsParams {
    /// One of `none`, `all` and `uncaught`.
    pub state: String,
}

/// Parameters of `Debugger.evaluateOnCallFrame`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOnCallFrameParams {
    /// Frame to evaluate in.
    pub call_frame_id: CallFrameId,
    /// Source to evaluate.
    pub expression: String,
    /// Group the result is released with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_group: Option<String>,
    /// Expose the console command line API.
    #[serde(
        rename = "includeCommandLineAPI",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_command_line_api: Option<bool>,
    /// Evaluate silently.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_not_pause_on_exceptions_and_mute_console: Option<bool>,
    /// Return JSON instead of a remote object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    /// Attach a preview to the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_preview: Option<bool>,
}

/// Parameters of `Debugger.setVariableValue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableValueParams {
    /// Index into the scope chain.
    pub scope_number: i32,
    /// Variable to assign.
    pub variable_name: String,
    /// Value to assign.
    pub new_value: CallArgument,
    /// Frame whose scope is changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_frame_id: Option<CallFrameId>,
    /// Function whose closure scope is changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_object_id: Option<RemoteObjectId>,
}

/// Parameters of `Debugger.restartFrame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartFrameParams {
    /// Frame to restart.
    pub call_frame_id: CallFrameId,
}

/// Parameters of `Debugger.skipStackFrames`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipStackFramesParams {
    /// Pattern of framework script urls; empty or missing turns skipping off.
    #[serde(alias = "pattern", skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// Parameters of `Debugger.setAsyncCallStackDepth`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAsyncCallStackDepthParams {
    /// Number of async stacks to report; 0 turns them off.
    pub max_depth: i32,
}

// ============================================================================
// Command Results
// ============================================================================

/// Result of `Debugger.setBreakpointByUrl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointByUrlResult {
    /// Id of the new breakpoint.
    pub breakpoint_id: BreakpointId,
    /// Where it resolved so far.
    pub locations: Vec<Location>,
}

/// Result of `Debugger.setBreakpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointResult {
    /// Id of the new breakpoint.
    pub breakpoint_id: BreakpointId,
    /// Where the engine placed it.
    pub actual_location: Location,
}

/// Result of `Debugger.getStepInPositions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStepInPositionsResult {
    /// Call sites a step into could land on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_in_positions: Option<Vec<Location>>,
}

/// Result of `Debugger.getBacktrace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktraceResult {
    /// The paused stack, top first.
    pub call_frames: Vec<CallFrame>,
    /// Async stacks that led here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_stack_trace: Option<StackTrace>,
}

/// Result of `Debugger.getScriptSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetScriptSourceResult {
    /// The source text.
    pub script_source: String,
}

/// Result of `Debugger.getFunctionDetails`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFunctionDetailsResult {
    /// The function's details.
    pub details: FunctionDetails,
}

/// Result of `Debugger.getCollectionEntries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCollectionEntriesResult {
    /// The entries, in iteration order.
    pub entries: Vec<CollectionEntry>,
}

/// Result of `evaluate`, `callFunctionOn` and `evaluateOnCallFrame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    /// The value, or the exception thrown.
    pub result: RemoteObject,
    /// `result` is an exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_thrown: Option<bool>,
    /// Where the exception came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<ExceptionDetails>,
}

/// Result of `Debugger.restartFrame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartFrameResult {
    /// The stack after the restart.
    pub call_frames: Vec<CallFrame>,
    /// The engine's report of the restart.
    pub result: serde_json::Value,
    /// Async stacks that led here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_stack_trace: Option<StackTrace>,
}

// ============================================================================
// Types
// ============================================================================

/// A position inside a parsed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Script the location is in.
    pub script_id: ScriptId,
    /// Zero-based line.
    pub line_number: i32,
    /// Zero-based column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i32>,
}

/// Wire representation of an engine-side value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// JavaScript `typeof` of the value.
    #[serde(rename = "type")]
    pub type_: String,
    /// Finer kind of object, such as `array` or `node`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Constructor name of an object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// The value itself, for primitives and by-value results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Display string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Handle for further requests about an object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
    /// Abbreviated content of an object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<serde_json::Value>,
}

/// Where and why an evaluation threw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    /// Exception message.
    pub text: String,
    /// Script the exception was thrown in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Line it was thrown on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i32>,
    /// Column it was thrown at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i32>,
    /// Stack at the throw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<serde_json::Value>,
}

/// Argument of `callFunctionOn` and `setVariableValue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallArgument {
    /// A primitive or JSON value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// A remote object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<RemoteObjectId>,
}

/// One scope of a call frame's scope chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Kind of scope, such as `local` or `closure`.
    #[serde(rename = "type")]
    pub type_: String,
    /// Object holding the scope's variables.
    pub object: RemoteObject,
}

/// A JavaScript call frame, as handed to the front-end while paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// Id for requests about this frame.
    pub call_frame_id: CallFrameId,
    /// Name of the running function.
    pub function_name: String,
    /// Current position.
    pub location: Location,
    /// Scopes, innermost first.
    pub scope_chain: Vec<Scope>,
    /// The frame's `this`.
    pub this: RemoteObject,
    /// Value about to be returned, at a return point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_value: Option<RemoteObject>,
}

/// An asynchronous call chain leading to the current pause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTrace {
    /// Frames of this async stack.
    pub call_frames: Vec<CallFrame>,
    /// What scheduled it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The next older async stack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub async_stack_trace: Option<Box<StackTrace>>,
}

/// One property of a remote object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Value of a data property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObject>,
    /// Whether a data property can be assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writable: Option<bool>,
    /// Getter of an accessor property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<RemoteObject>,
    /// Setter of an accessor property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set: Option<RemoteObject>,
    /// Whether the property can be changed or deleted.
    pub configurable: bool,
    /// Whether the property shows up in enumeration.
    pub enumerable: bool,
    /// Reading the property threw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub was_thrown: Option<bool>,
    /// Defined on the object itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_own: Option<bool>,
}

/// An engine-internal property, such as `[[PrimitiveValue]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalPropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Property value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RemoteObject>,
}

/// One entry of a Map, Set or iterator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntry {
    /// Entry key; missing for Sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<RemoteObject>,
    /// Entry value.
    pub value: RemoteObject,
}

/// Where a function is defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDetails {
    /// Where the function is defined.
    pub location: Location,
    /// Function name.
    pub function_name: String,
    /// Closure scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_chain: Option<Vec<Scope>>,
}

/// Why the debugger stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakReason {
    /// An XHR breakpoint.
    #[serde(rename = "XHR")]
    Xhr,
    /// A DOM mutation breakpoint.
    #[serde(rename = "DOM")]
    Dom,
    /// An event listener breakpoint.
    EventListener,
    /// A thrown exception.
    #[serde(rename = "exception")]
    Exception,
    /// A failed `console.assert`.
    #[serde(rename = "assert")]
    Assert,
    /// A Content Security Policy violation.
    #[serde(rename = "CSPViolation")]
    CspViolation,
    /// A breakpoint set by the console `debug()` command.
    #[serde(rename = "debugCommand")]
    DebugCommand,
    /// Anything else.
    #[default]
    #[serde(rename = "other")]
    Other,
}
