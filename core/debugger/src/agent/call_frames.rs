//! Commands addressing the frames of the current pause.

use super::{DebuggerAgent, PauseOnExceptionsState, ScriptDebugServer};
use crate::error::{AgentError, AgentResult};
use crate::injected::EvaluateOptions;
use crate::value::ScriptValue;
use inspector_protocol::{
    BacktraceResult, CallFrame, EvaluateOnCallFrameParams, EvaluateResult, Location,
    RestartFrameResult, SetVariableValueParams, StackTrace,
};
use log::warn;

impl<S: ScriptDebugServer> DebuggerAgent<S> {
    fn assert_call_frames_available(&self) -> AgentResult<()> {
        if self.is_paused() && !self.current_call_stack.handle.is_empty() {
            Ok(())
        } else {
            Err(AgentError::NoCallFrames)
        }
    }

    /// `Debugger.getBacktrace`: re-reads the stack from the engine.
    ///
    /// # Errors
    ///
    /// [`AgentError::NotPaused`] unless paused.
    pub fn get_backtrace(&mut self) -> AgentResult<BacktraceResult> {
        self.assert_paused()?;
        self.current_call_stack = self.server.current_call_stack();
        Ok(BacktraceResult {
            call_frames: self.current_call_frames(),
            async_stack_trace: self.current_async_stack_trace(),
        })
    }

    /// `Debugger.restartFrame`.
    ///
    /// # Errors
    ///
    /// Fails unless paused on a live frame, or if the helper refuses.
    pub fn restart_frame(&mut self, call_frame_id: &str) -> AgentResult<RestartFrameResult> {
        self.assert_call_frames_available()?;
        let result = self
            .injected_script_manager
            .injected_script_for_object_id(call_frame_id)
            .ok_or(AgentError::InspectedFrameGone)?
            .restart_frame(&self.current_call_stack.handle, call_frame_id)?;
        self.current_call_stack = self.server.current_call_stack();
        Ok(RestartFrameResult {
            call_frames: self.current_call_frames(),
            result,
            async_stack_trace: self.current_async_stack_trace(),
        })
    }

    /// `Debugger.getStepInPositions`.
    ///
    /// # Errors
    ///
    /// Fails unless paused on a live frame, or if the helper refuses.
    pub fn get_step_in_positions(&mut self, call_frame_id: &str) -> AgentResult<Vec<Location>> {
        self.assert_call_frames_available()?;
        self.injected_script_manager
            .injected_script_for_object_id(call_frame_id)
            .ok_or(AgentError::InspectedFrameGone)?
            .get_step_in_positions(&self.current_call_stack.handle, call_frame_id)
    }

    /// `Debugger.evaluateOnCallFrame`.
    ///
    /// With `doNotPauseOnExceptionsAndMuteConsole` the engine neither pauses
    /// on exceptions nor logs to the console during the evaluation.
    ///
    /// # Errors
    ///
    /// Fails unless paused on a live frame, or if the helper refuses. An
    /// exception thrown by the expression is a successful result.
    pub fn evaluate_on_call_frame(
        &mut self,
        params: &EvaluateOnCallFrameParams,
    ) -> AgentResult<EvaluateResult> {
        self.assert_call_frames_available()?;
        let script = self
            .injected_script_manager
            .injected_script_for_object_id(&params.call_frame_id)
            .ok_or(AgentError::InspectedFrameGone)?;

        let mute = params.do_not_pause_on_exceptions_and_mute_console.unwrap_or(false);
        let previous_state = self.server.pause_on_exceptions_state();
        if mute {
            if previous_state != PauseOnExceptionsState::DontPause {
                self.server
                    .set_pause_on_exceptions_state(PauseOnExceptionsState::DontPause);
            }
            self.server.set_console_muted(true);
        }

        let async_call_stacks: Vec<ScriptValue> = self
            .current_call_stack
            .async_stacks
            .iter()
            .take(self.async_call_stack_depth)
            .map(|stack| stack.call_frames.clone())
            .collect();
        let options = EvaluateOptions {
            object_group: params.object_group.as_deref().unwrap_or_default(),
            include_command_line_api: params.include_command_line_api.unwrap_or(false),
            return_by_value: params.return_by_value.unwrap_or(false),
            generate_preview: params.generate_preview.unwrap_or(false),
        };
        let result = script.evaluate_on_call_frame(
            &self.current_call_stack.handle,
            &async_call_stacks,
            &params.call_frame_id,
            &params.expression,
            &options,
        );

        if mute {
            self.server.set_console_muted(false);
            if self.server.pause_on_exceptions_state() != previous_state {
                self.server.set_pause_on_exceptions_state(previous_state);
            }
        }
        result
    }

    /// `Debugger.setVariableValue`, on a call frame scope or on a function's
    /// closure scope.
    ///
    /// # Errors
    ///
    /// Fails if neither target is given, if the target is gone, or if the
    /// helper refuses.
    pub fn set_variable_value(&mut self, params: &SetVariableValueParams) -> AgentResult<()> {
        let (target_id, missing) = match (&params.call_frame_id, &params.function_object_id) {
            (Some(call_frame_id), _) => {
                self.assert_call_frames_available()?;
                (call_frame_id, AgentError::InspectedFrameGone)
            }
            (None, Some(function_object_id)) => (
                function_object_id,
                AgentError::StaleObjectId("Function object id cannot be resolved"),
            ),
            (None, None) => return Err(AgentError::VariableTargetRequired),
        };
        let new_value = serde_json::to_string(&params.new_value).map_err(|_| AgentError::Internal)?;
        let call_frames = params
            .call_frame_id
            .is_some()
            .then_some(&self.current_call_stack.handle);
        self.injected_script_manager
            .injected_script_for_object_id(target_id)
            .ok_or(missing)?
            .set_variable_value(
                call_frames,
                params.call_frame_id.as_deref(),
                params.function_object_id.as_deref(),
                params.scope_number,
                &params.variable_name,
                &new_value,
            )
    }

    /// Wraps the frames of the current pause; empty while running.
    pub(super) fn current_call_frames(&mut self) -> Vec<CallFrame> {
        let Some(state) = self.paused_script_state else {
            return Vec::new();
        };
        if self.current_call_stack.handle.is_empty() {
            return Vec::new();
        }
        match self.injected_script_manager.injected_script_for(&state) {
            Some(script) => script.wrap_call_frames(&self.current_call_stack.handle, 0),
            None => {
                warn!(
                    "{}",
                    AgentError::InvariantViolation("paused context has no injected script")
                );
                Vec::new()
            }
        }
    }

    /// Chains the async parents of the current pause, innermost first, up
    /// to the configured depth.
    ///
    /// A parent whose context cannot be inspected cuts off the older part of
    /// the chain.
    pub(super) fn current_async_stack_trace(&mut self) -> Option<StackTrace> {
        if self.paused_script_state.is_none() || self.async_call_stack_depth == 0 {
            return None;
        }
        let count = self
            .current_call_stack
            .async_stacks
            .len()
            .min(self.async_call_stack_depth);
        let mut result: Option<StackTrace> = None;
        for (index, stack) in self.current_call_stack.async_stacks[..count]
            .iter()
            .enumerate()
            .rev()
        {
            let Some(script) = self
                .injected_script_manager
                .injected_script_for(&stack.script_state)
            else {
                result = None;
                continue;
            };
            result = Some(StackTrace {
                call_frames: script.wrap_call_frames(&stack.call_frames, index + 1),
                description: Some(stack.description.clone()),
                async_stack_trace: result.take().map(Box::new),
            });
        }
        result
    }
}
