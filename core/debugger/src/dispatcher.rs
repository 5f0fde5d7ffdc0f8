//! Protocol command routing
//!
//! [`DebuggerDispatcher`] turns `Debugger.*` requests into agent calls and
//! agent results into responses. Transport is the host's business: the
//! dispatcher takes one serialized request and returns one serialized
//! response.

use crate::agent::{DebuggerAgent, ScriptDebugServer};
use crate::error::AgentError;
use inspector_protocol::{
    ContinueToLocationParams, EvaluateOnCallFrameParams, GetCollectionEntriesParams,
    GetCollectionEntriesResult, GetFunctionDetailsParams, GetFunctionDetailsResult,
    GetScriptSourceParams, GetScriptSourceResult, GetStepInPositionsParams,
    GetStepInPositionsResult, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
    RemoveBreakpointParams, Request, Response, RestartFrameParams, SERVER_ERROR,
    SetAsyncCallStackDepthParams, SetBreakpointByUrlParams, SetBreakpointParams,
    SetBreakpointsActiveParams, SetPauseOnExceptionsParams, SetSkipAllPausesParams,
    SetVariableValueParams, SkipStackFramesParams,
};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

/// Why a request could not be answered with a result.
#[derive(Debug, Error)]
enum DispatchError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

type DispatchResult = Result<Value, DispatchError>;

/// Routes protocol requests to a [`DebuggerAgent`].
pub struct DebuggerDispatcher<S> {
    agent: DebuggerAgent<S>,
}

impl<S: ScriptDebugServer> DebuggerDispatcher<S> {
    /// Creates a dispatcher owning `agent`.
    pub fn new(agent: DebuggerAgent<S>) -> Self {
        Self { agent }
    }

    /// The agent commands are routed to.
    pub fn agent(&self) -> &DebuggerAgent<S> {
        &self.agent
    }

    /// Access for engine callbacks such as
    /// [`DebuggerAgent::did_pause`].
    pub fn agent_mut(&mut self) -> &mut DebuggerAgent<S> {
        &mut self.agent
    }

    /// Gives the agent back.
    pub fn into_agent(self) -> DebuggerAgent<S> {
        self.agent
    }

    /// Handles one serialized request and returns the serialized response.
    pub fn dispatch(&mut self, message: &str) -> String {
        let response = match serde_json::from_str::<Request>(message) {
            Ok(request) => self.handle_request(request),
            Err(err) => {
                warn!("dropping malformed request: {err}");
                Response::failure(0, PARSE_ERROR, format!("Message must be a valid request: {err}"))
            }
        };
        serde_json::to_string(&response).unwrap_or_default()
    }

    /// Handles one request.
    pub fn handle_request(&mut self, request: Request) -> Response {
        let Request { id, method, params } = request;
        debug!("handling {method} ({id})");

        let result = match method.as_str() {
            "Debugger.enable" => {
                self.agent.enable();
                empty()
            }
            "Debugger.disable" => {
                self.agent.disable();
                empty()
            }
            "Debugger.setBreakpointsActive" => self.handle_set_breakpoints_active(params),
            "Debugger.setSkipAllPauses" => self.handle_set_skip_all_pauses(params),
            "Debugger.setBreakpointByUrl" => self.handle_set_breakpoint_by_url(params),
            "Debugger.setBreakpoint" => self.handle_set_breakpoint(params),
            "Debugger.removeBreakpoint" => self.handle_remove_breakpoint(params),
            "Debugger.continueToLocation" => self.handle_continue_to_location(params),
            "Debugger.getStepInPositions" => self.handle_get_step_in_positions(params),
            "Debugger.getBacktrace" => self.agent.get_backtrace().map_err(Into::into).and_then(to_result),
            "Debugger.pause" => {
                self.agent.pause();
                empty()
            }
            "Debugger.resume" => self.agent.resume().map_err(Into::into).and_then(|()| empty()),
            "Debugger.stepOver" => self.agent.step_over().map_err(Into::into).and_then(|()| empty()),
            "Debugger.stepInto" => self.agent.step_into().map_err(Into::into).and_then(|()| empty()),
            "Debugger.stepOut" => self.agent.step_out().map_err(Into::into).and_then(|()| empty()),
            "Debugger.getScriptSource" => self.handle_get_script_source(params),
            "Debugger.getFunctionDetails" => self.handle_get_function_details(params),
            "Debugger.getCollectionEntries" => self.handle_get_collection_entries(params),
            "Debugger.setPauseOnExceptions" => self.handle_set_pause_on_exceptions(params),
            "Debugger.evaluateOnCallFrame" => self.handle_evaluate_on_call_frame(params),
            "Debugger.setVariableValue" => self.handle_set_variable_value(params),
            "Debugger.restartFrame" => self.handle_restart_frame(params),
            "Debugger.skipStackFrames" => self.handle_skip_stack_frames(params),
            "Debugger.setAsyncCallStackDepth" => self.handle_set_async_call_stack_depth(params),
            _ => {
                return Response::failure(id, METHOD_NOT_FOUND, format!("'{method}' wasn't found"));
            }
        };

        match result {
            Ok(result) => Response::success(id, result),
            Err(err @ DispatchError::InvalidParams(_)) => {
                Response::failure(id, INVALID_PARAMS, err.to_string())
            }
            Err(DispatchError::Agent(err)) => {
                debug!("{method} failed: {err}");
                Response::failure(id, SERVER_ERROR, err.to_string())
            }
        }
    }

    fn handle_set_breakpoints_active(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetBreakpointsActiveParams = parse_params(params)?;
        self.agent.set_breakpoints_active(params.active);
        empty()
    }

    fn handle_set_skip_all_pauses(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetSkipAllPausesParams = parse_params(params)?;
        self.agent
            .set_skip_all_pauses(params.skipped, params.until_reload.unwrap_or(false));
        empty()
    }

    fn handle_set_breakpoint_by_url(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetBreakpointByUrlParams = parse_params(params)?;
        to_result(self.agent.set_breakpoint_by_url(&params)?)
    }

    fn handle_set_breakpoint(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetBreakpointParams = parse_params(params)?;
        to_result(
            self.agent
                .set_breakpoint(&params.location, params.condition.as_deref())?,
        )
    }

    fn handle_remove_breakpoint(&mut self, params: Option<Value>) -> DispatchResult {
        let params: RemoveBreakpointParams = parse_params(params)?;
        self.agent.remove_breakpoint(&params.breakpoint_id);
        empty()
    }

    fn handle_continue_to_location(&mut self, params: Option<Value>) -> DispatchResult {
        let params: ContinueToLocationParams = parse_params(params)?;
        self.agent.continue_to_location(
            &params.location,
            params.interstatement_location.unwrap_or(false),
        )?;
        empty()
    }

    fn handle_get_step_in_positions(&mut self, params: Option<Value>) -> DispatchResult {
        let params: GetStepInPositionsParams = parse_params(params)?;
        let positions = self.agent.get_step_in_positions(&params.call_frame_id)?;
        to_result(GetStepInPositionsResult {
            step_in_positions: Some(positions),
        })
    }

    fn handle_get_script_source(&mut self, params: Option<Value>) -> DispatchResult {
        let params: GetScriptSourceParams = parse_params(params)?;
        to_result(GetScriptSourceResult {
            script_source: self.agent.get_script_source(&params.script_id)?,
        })
    }

    fn handle_get_function_details(&mut self, params: Option<Value>) -> DispatchResult {
        let params: GetFunctionDetailsParams = parse_params(params)?;
        to_result(GetFunctionDetailsResult {
            details: self.agent.get_function_details(&params.function_id)?,
        })
    }

    fn handle_get_collection_entries(&mut self, params: Option<Value>) -> DispatchResult {
        let params: GetCollectionEntriesParams = parse_params(params)?;
        to_result(GetCollectionEntriesResult {
            entries: self.agent.get_collection_entries(&params.object_id)?,
        })
    }

    fn handle_set_pause_on_exceptions(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetPauseOnExceptionsParams = parse_params(params)?;
        self.agent.set_pause_on_exceptions(&params.state)?;
        empty()
    }

    fn handle_evaluate_on_call_frame(&mut self, params: Option<Value>) -> DispatchResult {
        let params: EvaluateOnCallFrameParams = parse_params(params)?;
        to_result(self.agent.evaluate_on_call_frame(&params)?)
    }

    fn handle_set_variable_value(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetVariableValueParams = parse_params(params)?;
        self.agent.set_variable_value(&params)?;
        empty()
    }

    fn handle_restart_frame(&mut self, params: Option<Value>) -> DispatchResult {
        let params: RestartFrameParams = parse_params(params)?;
        to_result(self.agent.restart_frame(&params.call_frame_id)?)
    }

    fn handle_skip_stack_frames(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SkipStackFramesParams = parse_params(params)?;
        self.agent.skip_stack_frames(params.script.as_deref())?;
        empty()
    }

    fn handle_set_async_call_stack_depth(&mut self, params: Option<Value>) -> DispatchResult {
        let params: SetAsyncCallStackDepthParams = parse_params(params)?;
        self.agent.set_async_call_stack_depth(params.max_depth);
        empty()
    }
}

/// Decodes `params`; a missing params object counts as `{}`.
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, DispatchError> {
    serde_json::from_value(params.unwrap_or_else(|| json!({})))
        .map_err(|err| DispatchError::InvalidParams(err.to_string()))
}

fn to_result<T: Serialize>(result: T) -> DispatchResult {
    serde_json::to_value(result).map_err(|_| DispatchError::Agent(AgentError::Internal))
}

#[allow(clippy::unnecessary_wraps)]
fn empty() -> DispatchResult {
    Ok(json!({}))
}

impl<S: fmt::Debug> fmt::Debug for DebuggerDispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerDispatcher")
            .field("agent", &self.agent)
            .finish()
    }
}
