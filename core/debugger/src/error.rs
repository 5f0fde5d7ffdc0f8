//! Errors reported by the debugger agent.
//!
//! Every public operation reports failure through [`AgentError`] instead of
//! panicking, since the agent is driven by an external front-end.

use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// An error reported back to the front-end.
///
/// The `Display` text is what ends up in the protocol error message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// A stepping or resume command arrived while the VM is running.
    #[error("Can only perform operation while paused.")]
    NotPaused,

    /// A call frame was addressed while the VM is running.
    #[error("Attempt to access callframe when debugger is not on pause")]
    NoCallFrames,

    /// The same logical breakpoint was requested twice.
    #[error("Breakpoint at specified location already exists.")]
    DuplicateBreakpoint,

    /// `setBreakpointByUrl` got neither or both of `url` and `urlRegex`.
    #[error("Either url or urlRegex must be specified.")]
    UrlOrRegexRequired,

    /// A negative column number was requested.
    #[error("Incorrect column number")]
    InvalidColumn,

    /// A location object lacks `scriptId` or `lineNumber`.
    #[error("scriptId and lineNumber are required.")]
    InvalidLocation,

    /// The engine refused to install a breakpoint at a script location.
    #[error("Could not resolve breakpoint")]
    CouldNotResolve,

    /// `setPauseOnExceptions` got an unknown mode.
    #[error("Unknown pause on exceptions mode: {0}")]
    UnknownPauseOnExceptionsState(String),

    /// The engine did not apply the requested pause on exceptions mode.
    #[error("Internal error. Could not change pause on exceptions state")]
    PauseOnExceptionsRejected,

    /// A skip-stack pattern failed to compile.
    #[error("Invalid regular expression")]
    InvalidRegex,

    /// No parsed script has the given id.
    #[error("No script for id: {0}")]
    UnknownScript(String),

    /// An object or call frame id no longer maps to a live context.
    #[error("{0}")]
    StaleObjectId(&'static str),

    /// `setVariableValue` got neither a call frame nor a function object.
    #[error("Either call frame or function object must be specified")]
    VariableTargetRequired,

    /// The embedder denied access to the execution context.
    #[error("Can not access given context.")]
    ContextAccessDenied,

    /// An object or call frame id names no injected script.
    #[error("Inspected frame has gone")]
    InspectedFrameGone,

    /// The injected script helper reported an error message of its own.
    #[error("{0}")]
    Script(String),

    /// A bridge call returned a value of an unexpected shape.
    #[error("Internal error")]
    Internal,

    /// A bridge call failed in a way worth describing.
    #[error("Internal error: {0}")]
    InternalDetail(&'static str),

    /// A condition that correct engine behavior never produces.
    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}
