//! The script engine seam
//!
//! The agent never talks to a VM directly. Each engine implements
//! [`ScriptDebugServer`] once, and reports pauses back to the agent through
//! [`DebuggerAgent::did_pause`](super::DebuggerAgent::did_pause) and
//! [`DebuggerAgent::did_continue`](super::DebuggerAgent::did_continue).

use crate::error::{AgentError, AgentResult};
use crate::injected::ScriptState;
use crate::value::ScriptValue;

/// Engine-side identifier of an installed breakpoint.
pub type EngineBreakpointId = String;

/// When the engine stops on a thrown exception.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PauseOnExceptionsState {
    /// Never stop on exceptions.
    #[default]
    DontPause,
    /// Stop on every thrown exception.
    PauseOnAll,
    /// Stop only on exceptions nothing catches.
    PauseOnUncaught,
}

impl PauseOnExceptionsState {
    /// Parses the protocol spelling of the mode.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownPauseOnExceptionsState`] for anything but
    /// `none`, `all` and `uncaught`.
    pub fn parse(state: &str) -> AgentResult<Self> {
        match state {
            "none" => Ok(Self::DontPause),
            "all" => Ok(Self::PauseOnAll),
            "uncaught" => Ok(Self::PauseOnUncaught),
            other => Err(AgentError::UnknownPauseOnExceptionsState(other.to_string())),
        }
    }

    /// The persisted form of the mode.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::DontPause => 0,
            Self::PauseOnAll => 1,
            Self::PauseOnUncaught => 2,
        }
    }

    /// Reads a persisted mode; unknown values mean "don't pause".
    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::PauseOnAll,
            2 => Self::PauseOnUncaught,
            _ => Self::DontPause,
        }
    }
}

/// What the engine must do after reporting a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipPauseRequest {
    /// Stay paused; the pause was surfaced to the front-end.
    NoSkip,
    /// Resume as if nothing happened.
    Continue,
    /// Resume with a step into, to leave skipped code.
    StepInto,
    /// Resume with a step out of the current function.
    StepOut,
}

/// A breakpoint as requested from the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptBreakpoint {
    /// Zero-based line.
    pub line_number: i32,
    /// Zero-based column.
    pub column_number: i32,
    /// Expression that must be truthy for the breakpoint to stop; empty for
    /// always.
    pub condition: String,
}

impl ScriptBreakpoint {
    /// Creates a breakpoint request.
    #[must_use]
    pub fn new(line_number: i32, column_number: i32, condition: impl Into<String>) -> Self {
        Self {
            line_number,
            column_number,
            condition: condition.into(),
        }
    }
}

/// A breakpoint the engine installed, at the position it snapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBreakpoint {
    /// The engine's handle, used to remove it again.
    pub id: EngineBreakpointId,
    /// Line the breakpoint actually sits on.
    pub line_number: i32,
    /// Column the breakpoint actually sits on.
    pub column_number: i32,
}

/// The part of a stack frame the pause heuristics look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrameInfo {
    /// Script the frame executes.
    pub script_id: String,
    /// Current line.
    pub line_number: i32,
    /// Current column.
    pub column_number: i32,
    /// Name of the running function; empty for top-level code.
    pub function_name: String,
    /// The frame is about to return from its function.
    pub is_at_return: bool,
    /// The frame runs engine-internal code that is never shown.
    pub is_internal: bool,
}

/// Call stack of an asynchronous operation that led to the current one.
#[derive(Debug, Clone)]
pub struct AsyncCallStack {
    /// What scheduled the operation, e.g. `setTimeout`.
    pub description: String,
    /// Engine call frames captured when it was scheduled.
    pub call_frames: ScriptValue,
    /// Context the frames belong to.
    pub script_state: ScriptState,
}

/// Snapshot of the paused engine stack.
///
/// `frames` runs from the top frame outwards. `handle` is the engine's own
/// call frame chain, handed to the injected script for wrapping, and is only
/// meaningful while the engine stays paused.
#[derive(Debug, Clone, Default)]
pub struct CallStack {
    /// Summary of every frame, top first.
    pub frames: Vec<StackFrameInfo>,
    /// The engine's call frame chain.
    pub handle: ScriptValue,
    /// Innermost first.
    pub async_stacks: Vec<AsyncCallStack>,
}

impl CallStack {
    /// Returns `true` when there is nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty() || self.frames.is_empty()
    }

    /// The innermost frame.
    #[must_use]
    pub fn top_frame(&self) -> Option<&StackFrameInfo> {
        self.frames.first()
    }
}

/// How compiling a script went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompileResult {
    /// The script compiled.
    #[default]
    Success,
    /// The script has a syntax error.
    Error,
}

/// Debugging capabilities of one script engine.
///
/// Calls never re-enter the agent: a step or resume request only takes
/// effect once the host reports the outcome through the agent's
/// `did_pause` and `did_continue`.
pub trait ScriptDebugServer {
    /// Starts reporting parse and pause events to the agent.
    fn start_listening(&mut self);

    /// Stops reporting events.
    fn stop_listening(&mut self);

    /// Installs a breakpoint in `script_id`.
    ///
    /// Returns `None` if no statement could take the breakpoint.
    fn set_breakpoint(
        &mut self,
        script_id: &str,
        breakpoint: &ScriptBreakpoint,
        interstatement_location: bool,
    ) -> Option<ResolvedBreakpoint>;

    /// Removes a breakpoint by its engine id.
    fn remove_breakpoint(&mut self, id: &str);

    /// Removes every breakpoint.
    fn clear_breakpoints(&mut self);

    /// Drops compiled code kept around for the debugger.
    fn clear_compiled_scripts(&mut self);

    /// Turns every breakpoint on or off at once.
    fn set_breakpoints_activated(&mut self, activated: bool);

    /// The current exception pause mode.
    fn pause_on_exceptions_state(&self) -> PauseOnExceptionsState;

    /// Changes the exception pause mode.
    fn set_pause_on_exceptions_state(&mut self, state: PauseOnExceptionsState);

    /// Arms or disarms a pause on the next statement that runs.
    fn set_pause_on_next_statement(&mut self, pause: bool);

    /// Returns `true` if script is running and could be stopped right now.
    fn can_break_program(&self) -> bool;

    /// Stops at the current statement.
    fn break_program(&mut self);

    /// Resumes a paused engine.
    fn continue_program(&mut self);

    /// Resumes until the next statement, entering calls.
    fn step_into_statement(&mut self);

    /// Resumes until the next statement of the current function.
    fn step_over_statement(&mut self);

    /// Resumes until the current function returns.
    fn step_out_of_function(&mut self);

    /// Captures the stack of the current pause.
    fn current_call_stack(&self) -> CallStack;

    /// Silences console output produced by debugger evaluations.
    fn set_console_muted(&mut self, _muted: bool) {}
}
