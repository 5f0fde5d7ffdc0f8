//! Pause entry and exit, stepping, and the heuristics deciding which engine
//! pauses reach the front-end.

use super::{
    CallStack, DebuggerAgent, EngineBreakpointId, ScriptDebugServer, SkipPauseRequest,
    StackFrameInfo, breakpoint,
};
use crate::error::{AgentError, AgentResult};
use crate::injected::ScriptState;
use crate::value::ScriptValue;
use inspector_protocol::events::PausedEvent;
use inspector_protocol::{BreakReason, DebuggerEvent};
use log::{debug, trace};
use serde_json::Value;

impl<S: ScriptDebugServer> DebuggerAgent<S> {
    /// Reports that the engine stopped.
    ///
    /// `exception` is [`ScriptValue::Empty`] unless the pause was caused by a
    /// thrown value. `hit_breakpoints` holds engine breakpoint ids.
    ///
    /// Anything but [`SkipPauseRequest::NoSkip`] means the pause was not
    /// surfaced and the engine must carry out the returned request. On
    /// `NoSkip` a `paused` event has been sent and the engine stays stopped
    /// until [`did_continue`](Self::did_continue).
    ///
    /// # Errors
    ///
    /// [`AgentError::InvariantViolation`] if a pause is reported while the
    /// agent is already paused; the report is ignored.
    pub fn did_pause(
        &mut self,
        script_state: ScriptState,
        call_stack: CallStack,
        exception: &ScriptValue,
        hit_breakpoints: &[EngineBreakpointId],
    ) -> AgentResult<SkipPauseRequest> {
        if self.paused_script_state.is_some() {
            return Err(AgentError::InvariantViolation(
                "pause reported while already paused",
            ));
        }
        let request = self.skip_pause_request(&call_stack, exception, hit_breakpoints);
        if request != SkipPauseRequest::NoSkip {
            debug!("pause skipped with {request:?}");
            return Ok(request);
        }

        self.paused_script_state = Some(script_state);
        self.current_call_stack = call_stack;

        if !exception.is_empty() {
            if let Some(script) = self
                .injected_script_manager
                .injected_script_for(&script_state)
            {
                self.break_reason = BreakReason::Exception;
                self.break_aux_data = script
                    .wrap_object(exception, &self.config.backtrace_object_group, false)
                    .and_then(|object| serde_json::to_value(object).ok());
            }
        }

        let mut hit_breakpoint_ids = Vec::new();
        for server_id in hit_breakpoints {
            if let Some((breakpoint_id, source)) = self.server_breakpoints.get(server_id) {
                hit_breakpoint_ids.push(breakpoint_id.clone());
                if self.break_reason == BreakReason::Other
                    && *source == breakpoint::BreakpointSource::DebugCommand
                {
                    self.break_reason = BreakReason::DebugCommand;
                }
            }
        }

        let event = PausedEvent {
            call_frames: self.current_call_frames(),
            reason: self.break_reason,
            data: self.break_aux_data.clone(),
            hit_breakpoints: Some(hit_breakpoint_ids),
            async_stack_trace: self.current_async_stack_trace(),
        };
        debug!("paused ({:?}, {} frames)", event.reason, event.call_frames.len());
        self.send_event(DebuggerEvent::Paused(event));

        self.java_script_pause_scheduled = false;
        self.debugger_step_scheduled = false;
        self.stepping_from_framework = false;
        self.pausing_on_native_event = false;
        self.skipped_step_in_count = 0;

        if let Some(id) = self.continue_to_location_breakpoint_id.take() {
            self.server.remove_breakpoint(&id);
        }
        if let Some(listener) = self.listener.as_mut() {
            listener.did_pause();
        }
        Ok(SkipPauseRequest::NoSkip)
    }

    /// Reports that the engine resumed.
    pub fn did_continue(&mut self) {
        self.paused_script_state = None;
        self.current_call_stack = CallStack::default();
        self.clear_break_details();
        debug!("resumed");
        self.send_event(DebuggerEvent::Resumed);
    }

    /// Picks what to do about an engine pause, first rule wins.
    fn skip_pause_request(
        &mut self,
        call_stack: &CallStack,
        exception: &ScriptValue,
        hit_breakpoints: &[EngineBreakpointId],
    ) -> SkipPauseRequest {
        // Internal scripts and syntax errors.
        if call_stack.is_empty() || call_stack.top_frame().is_some_and(|frame| frame.is_internal) {
            SkipPauseRequest::Continue
        } else if self.java_script_pause_scheduled || !hit_breakpoints.is_empty() {
            SkipPauseRequest::NoSkip
        } else if self.skip_all_pauses {
            SkipPauseRequest::Continue
        } else if !exception.is_empty() {
            self.should_skip_exception_pause(call_stack)
        } else if self.debugger_step_scheduled || self.pausing_on_native_event {
            self.should_skip_step_pause(call_stack)
        } else {
            SkipPauseRequest::NoSkip
        }
    }

    fn should_skip_exception_pause(&self, call_stack: &CallStack) -> SkipPauseRequest {
        if self.stepping_from_framework {
            return SkipPauseRequest::NoSkip;
        }
        let Some(top_frame) = self.top_frame_skip_unknown_sources(call_stack) else {
            return SkipPauseRequest::NoSkip;
        };
        let url = self.script_url(top_frame);
        if url.is_empty() {
            return SkipPauseRequest::NoSkip;
        }
        if self.is_framework_url(url) {
            return SkipPauseRequest::Continue;
        }

        let skipped_by_anti_breakpoint = self.url_breakpoints.iter().any(|breakpoint| {
            let cookie = &breakpoint.cookie;
            cookie.is_anti
                && cookie.line_number == top_frame.line_number
                && (cookie.column_number == -1 || cookie.column_number == top_frame.column_number)
                && breakpoint.matches(url)
        });
        if skipped_by_anti_breakpoint {
            SkipPauseRequest::Continue
        } else {
            SkipPauseRequest::NoSkip
        }
    }

    /// Steps through framework code a bounded number of times, then steps
    /// out of it.
    fn should_skip_step_pause(&mut self, call_stack: &CallStack) -> SkipPauseRequest {
        if self.cached_skip_stack_regex.is_none() || self.stepping_from_framework {
            return SkipPauseRequest::NoSkip;
        }
        let Some(top_frame) = self.top_frame_skip_unknown_sources(call_stack) else {
            return SkipPauseRequest::NoSkip;
        };
        if !self.is_framework_url(self.script_url(top_frame)) {
            return SkipPauseRequest::NoSkip;
        }
        let is_at_return = top_frame.is_at_return;
        let frame_count = call_stack.frames.len();
        let max = self.config.max_skip_step_in_count;

        if self.skipped_step_in_count == 0 {
            self.min_frame_count_for_skip = frame_count;
            self.skipped_step_in_count = 1;
            return SkipPauseRequest::StepInto;
        }
        if self.skipped_step_in_count < max
            && is_at_return
            && frame_count <= self.min_frame_count_for_skip
        {
            self.skipped_step_in_count = max;
        }
        if self.skipped_step_in_count >= max {
            if self.pausing_on_native_event {
                self.pausing_on_native_event = false;
                self.skipped_step_in_count = 0;
                return SkipPauseRequest::Continue;
            }
            return SkipPauseRequest::StepOut;
        }
        self.skipped_step_in_count += 1;
        trace!("stepping into framework code ({})", self.skipped_step_in_count);
        SkipPauseRequest::StepInto
    }

    /// The first frame running a script the agent knows about.
    fn top_frame_skip_unknown_sources<'a>(
        &self,
        call_stack: &'a CallStack,
    ) -> Option<&'a StackFrameInfo> {
        call_stack
            .frames
            .iter()
            .find(|frame| self.scripts.contains_key(&frame.script_id))
    }

    fn script_url(&self, frame: &StackFrameInfo) -> &str {
        self.scripts
            .get(&frame.script_id)
            .map_or("", |script| script.url())
    }

    fn is_framework_url(&self, url: &str) -> bool {
        !url.is_empty()
            && self
                .cached_skip_stack_regex
                .as_ref()
                .is_some_and(|regex| regex.is_match(url))
    }

    fn is_top_call_frame_in_framework(&self) -> bool {
        self.top_frame_skip_unknown_sources(&self.current_call_stack)
            .is_some_and(|frame| self.is_framework_url(self.script_url(frame)))
    }

    pub(super) fn assert_paused(&self) -> AgentResult<()> {
        if self.is_paused() {
            Ok(())
        } else {
            Err(AgentError::NotPaused)
        }
    }

    /// `Debugger.pause`: stops at the next statement.
    pub fn pause(&mut self) {
        if self.java_script_pause_scheduled || self.is_paused() {
            return;
        }
        self.clear_break_details();
        self.java_script_pause_scheduled = true;
        self.server.set_pause_on_next_statement(true);
    }

    /// Stops at the next statement on behalf of a native event such as a DOM
    /// or XHR breakpoint. Such a pause may still be skipped in framework code.
    pub fn schedule_pause_on_next_statement(&mut self, reason: BreakReason, data: Option<Value>) {
        if self.java_script_pause_scheduled || self.is_paused() {
            return;
        }
        self.break_reason = reason;
        self.break_aux_data = data;
        self.pausing_on_native_event = true;
        self.server.set_pause_on_next_statement(true);
    }

    /// Withdraws a native event pause. A front-end pause stays scheduled.
    pub fn cancel_pause_on_next_statement(&mut self) {
        if self.java_script_pause_scheduled || self.is_paused() {
            return;
        }
        self.clear_break_details();
        self.pausing_on_native_event = false;
        self.server.set_pause_on_next_statement(false);
    }

    /// Breaks right away, e.g. on a failed console assertion.
    pub fn break_program(&mut self, reason: BreakReason, data: Option<Value>) {
        if self.skip_all_pauses || !self.server.can_break_program() {
            return;
        }
        self.break_reason = reason;
        self.break_aux_data = data;
        self.debugger_step_scheduled = false;
        self.stepping_from_framework = false;
        self.pausing_on_native_event = false;
        self.server.break_program();
    }

    /// `Debugger.resume`.
    ///
    /// # Errors
    ///
    /// [`AgentError::NotPaused`] unless paused.
    pub fn resume(&mut self) -> AgentResult<()> {
        self.assert_paused()?;
        self.debugger_step_scheduled = false;
        self.stepping_from_framework = false;
        self.release_backtrace();
        self.server.continue_program();
        Ok(())
    }

    /// `Debugger.stepOver`. At a function's return point this steps into the
    /// caller instead.
    ///
    /// # Errors
    ///
    /// [`AgentError::NotPaused`] unless paused.
    pub fn step_over(&mut self) -> AgentResult<()> {
        self.assert_paused()?;
        if self
            .current_call_stack
            .top_frame()
            .is_some_and(|frame| frame.is_at_return)
        {
            return self.step_into();
        }
        self.prepare_step();
        self.server.step_over_statement();
        Ok(())
    }

    /// `Debugger.stepInto`.
    ///
    /// # Errors
    ///
    /// [`AgentError::NotPaused`] unless paused.
    pub fn step_into(&mut self) -> AgentResult<()> {
        self.assert_paused()?;
        self.prepare_step();
        self.server.step_into_statement();
        if let Some(listener) = self.listener.as_mut() {
            listener.step_into();
        }
        Ok(())
    }

    /// `Debugger.stepOut`.
    ///
    /// # Errors
    ///
    /// [`AgentError::NotPaused`] unless paused.
    pub fn step_out(&mut self) -> AgentResult<()> {
        self.assert_paused()?;
        self.prepare_step();
        self.server.step_out_of_function();
        Ok(())
    }

    fn prepare_step(&mut self) {
        self.debugger_step_scheduled = true;
        self.stepping_from_framework = self.is_top_call_frame_in_framework();
        self.release_backtrace();
    }

    pub(super) fn release_backtrace(&mut self) {
        self.injected_script_manager
            .release_object_group(&self.config.backtrace_object_group);
    }
}
