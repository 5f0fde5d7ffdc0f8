//! Engine independent debugger agent
//!
//! This crate implements the `Debugger` domain of the inspector protocol on
//! top of any script engine that implements [`ScriptDebugServer`]. It is
//! organized in layers:
//!
//! - [`value`]: engine values crossing into the agent.
//! - [`injected`]: per-context injected scripts that marshal engine values
//!   to protocol remote objects, and the manager mapping contexts to ids.
//! - [`state`]: the inspector state persisted across reloads as a cookie.
//! - [`agent`]: breakpoints, the pause/step state machine and its skip
//!   heuristics.
//! - [`dispatcher`]: routing of serialized protocol requests to the agent.
//!
//! # Wiring
//!
//! ```rust,ignore
//! use inspector_debugger::{
//!     AGENT_STATE_NAME, AgentConfig, DebuggerAgent, DebuggerDispatcher,
//!     InjectedScriptManager, InspectorCompositeState,
//! };
//! use std::rc::Rc;
//!
//! let composite = InspectorCompositeState::new(Some(Box::new(save_cookie)));
//! let config = AgentConfig::default();
//! let manager = InjectedScriptManager::new(Box::new(host), Rc::new(|_| true), config.max_json_depth);
//! let mut agent = DebuggerAgent::new(engine, manager, composite.create_agent_state(AGENT_STATE_NAME), config);
//! agent.set_frontend(Box::new(move |event| send_to_frontend(event)));
//!
//! let mut dispatcher = DebuggerDispatcher::new(agent);
//! let response = dispatcher.dispatch(r#"{"id":1,"method":"Debugger.enable"}"#);
//! ```
//!
//! The engine then reports parsed scripts and pauses through
//! [`DebuggerAgent::did_parse_source`], [`DebuggerAgent::did_pause`] and
//! [`DebuggerAgent::did_continue`].

pub mod agent;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod injected;
pub mod state;
pub mod value;

pub use agent::{
    AGENT_STATE_NAME, AsyncCallStack, BreakpointSource, CallStack, CompileResult,
    DebuggerAgent, DebuggerAgentListener, EngineBreakpointId, PauseOnExceptionsState,
    ResolvedBreakpoint, Script, ScriptBreakpoint, ScriptDebugServer, SkipPauseRequest,
    SourceMapUrlResolver, StackFrameInfo,
};
pub use config::AgentConfig;
pub use dispatcher::DebuggerDispatcher;
pub use error::{AgentError, AgentResult};
pub use injected::{
    ContextId, EngineKind, EvaluateOptions, InjectedScript, InjectedScriptHost,
    InjectedScriptManager, InjectedScriptSource, InspectedStateAccessCheck, PropertyQuery,
    RealmId, ScriptState,
};
pub use state::{InspectorCompositeState, InspectorState, InspectorStateClient, JsonObject};
pub use value::{EngineHandle, ScriptValue, ToJsonError};
