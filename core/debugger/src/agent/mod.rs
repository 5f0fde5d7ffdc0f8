//! The debugger agent
//!
//! [`DebuggerAgent`] is the engine independent half of the `Debugger` domain.
//! It owns breakpoint bookkeeping, the pause/step state machine and the
//! persisted debugger state, and drives one engine through
//! [`ScriptDebugServer`].
//!
//! The agent moves through `Disabled -> Enabled -> (Running <-> Paused) ->
//! Disabled`. The engine reports the `Running <-> Paused` transitions with
//! [`DebuggerAgent::did_pause`] and [`DebuggerAgent::did_continue`]; every
//! other transition is a front-end command.

mod breakpoint;
mod call_frames;
mod pause;
mod script;
mod server;

pub use breakpoint::BreakpointSource;
pub use script::{Script, find_source_map_url, find_source_url};
pub use server::{
    AsyncCallStack, CallStack, CompileResult, EngineBreakpointId, PauseOnExceptionsState,
    ResolvedBreakpoint, ScriptBreakpoint, ScriptDebugServer, SkipPauseRequest, StackFrameInfo,
};

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::injected::{InjectedScriptManager, RealmId, ScriptState};
use crate::state::{InspectorState, JsonObject};
use breakpoint::{UrlBreakpoint, load_url_breakpoints};
use indexmap::IndexMap;
use inspector_protocol::events::{BreakpointResolvedEvent, ScriptParsedEvent};
use inspector_protocol::{
    BreakReason, CollectionEntry, DebuggerEvent, FrontendChannel, FunctionDetails,
};
use log::{debug, warn};
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;

/// Name of the debugger's sub-object in the inspector state.
pub const AGENT_STATE_NAME: &str = "debugger";

/// Keys of the persisted debugger state.
pub(crate) mod keys {
    pub(crate) const DEBUGGER_ENABLED: &str = "debuggerEnabled";
    pub(crate) const JAVASCRIPT_BREAKPOINTS: &str = "javaScriptBreakpoints";
    pub(crate) const PAUSE_ON_EXCEPTIONS_STATE: &str = "pauseOnExceptionsState";
    pub(crate) const SKIP_STACK_PATTERN: &str = "skipStackPattern";
    pub(crate) const SKIP_ALL_PAUSES: &str = "skipAllPauses";
    pub(crate) const SKIP_ALL_PAUSES_EXPIRES_ON_RELOAD: &str = "skipAllPausesExpiresOnReload";
    pub(crate) const ASYNC_CALL_STACK_DEPTH: &str = "asyncCallStackDepth";
}

/// Observer of debugger lifecycle changes, e.g. a profiler that must not run
/// while the debugger is active.
pub trait DebuggerAgentListener {
    /// The agent was enabled or restored.
    fn debugger_was_enabled(&mut self);

    /// The agent was disabled.
    fn debugger_was_disabled(&mut self);

    /// A step into was requested.
    fn step_into(&mut self) {}

    /// A pause was surfaced to the front-end.
    fn did_pause(&mut self) {}
}

/// Host fallback for source map urls of loaded resources, such as one sent
/// in a `SourceMap` HTTP header.
pub trait SourceMapUrlResolver {
    /// The source map url the host knows for the resource at `url`.
    fn resource_source_map_url(&self, url: &str) -> Option<String>;
}

/// The `Debugger` domain agent, generic over the engine it drives.
pub struct DebuggerAgent<S> {
    server: S,
    injected_script_manager: InjectedScriptManager,
    state: InspectorState,
    config: AgentConfig,
    frontend: Option<Box<dyn FrontendChannel>>,
    listener: Option<Box<dyn DebuggerAgentListener>>,
    source_map_url_resolver: Option<Box<dyn SourceMapUrlResolver>>,

    scripts: IndexMap<String, Script>,
    breakpoint_id_to_server_ids: IndexMap<String, Vec<EngineBreakpointId>>,
    server_breakpoints: FxHashMap<EngineBreakpointId, (String, BreakpointSource)>,
    continue_to_location_breakpoint_id: Option<EngineBreakpointId>,
    url_breakpoints: Vec<UrlBreakpoint>,

    paused_script_state: Option<ScriptState>,
    current_call_stack: CallStack,
    break_reason: BreakReason,
    break_aux_data: Option<Value>,

    java_script_pause_scheduled: bool,
    debugger_step_scheduled: bool,
    stepping_from_framework: bool,
    pausing_on_native_event: bool,
    skipped_step_in_count: u32,
    min_frame_count_for_skip: usize,

    skip_all_pauses: bool,
    cached_skip_stack_regex: Option<Regex>,
    async_call_stack_depth: usize,
}

impl<S: ScriptDebugServer> DebuggerAgent<S> {
    /// Creates a disabled agent.
    ///
    /// `state` should come from
    /// [`InspectorCompositeState::create_agent_state`](crate::InspectorCompositeState::create_agent_state)
    /// with [`AGENT_STATE_NAME`].
    pub fn new(
        server: S,
        injected_script_manager: InjectedScriptManager,
        state: InspectorState,
        config: AgentConfig,
    ) -> Self {
        let url_breakpoints = load_url_breakpoints(state.get_object(keys::JAVASCRIPT_BREAKPOINTS));
        Self {
            server,
            injected_script_manager,
            state,
            config,
            frontend: None,
            listener: None,
            source_map_url_resolver: None,
            scripts: IndexMap::new(),
            breakpoint_id_to_server_ids: IndexMap::new(),
            server_breakpoints: FxHashMap::default(),
            continue_to_location_breakpoint_id: None,
            url_breakpoints,
            paused_script_state: None,
            current_call_stack: CallStack::default(),
            break_reason: BreakReason::Other,
            break_aux_data: None,
            java_script_pause_scheduled: false,
            debugger_step_scheduled: false,
            stepping_from_framework: false,
            pausing_on_native_event: false,
            skipped_step_in_count: 0,
            min_frame_count_for_skip: 0,
            skip_all_pauses: false,
            cached_skip_stack_regex: None,
            async_call_stack_depth: 0,
        }
    }

    /// Attaches the channel events are delivered through.
    pub fn set_frontend(&mut self, frontend: Box<dyn FrontendChannel>) {
        self.frontend = Some(frontend);
    }

    /// Detaches the front-end, disabling the agent if it was enabled.
    pub fn clear_frontend(&mut self) {
        self.frontend = None;
        self.disable();
    }

    /// Replaces the lifecycle listener.
    pub fn set_listener(&mut self, listener: Option<Box<dyn DebuggerAgentListener>>) {
        self.listener = listener;
    }

    /// Replaces the fallback for source map urls.
    pub fn set_source_map_url_resolver(&mut self, resolver: Option<Box<dyn SourceMapUrlResolver>>) {
        self.source_map_url_resolver = resolver;
    }

    /// Returns `true` if the persisted state says the debugger is on.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.state.get_boolean(keys::DEBUGGER_ENABLED)
    }

    /// Returns `true` while a pause is surfaced to the front-end.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused_script_state.is_some()
    }

    /// `Debugger.enable`. Does nothing if already enabled.
    pub fn enable(&mut self) {
        if self.enabled() {
            return;
        }
        self.start();
        self.state.set_boolean(keys::DEBUGGER_ENABLED, true);
    }

    /// `Debugger.disable`. Forgets breakpoints and pause settings.
    pub fn disable(&mut self) {
        if !self.enabled() {
            return;
        }
        self.stop();
        self.state.set_boolean(keys::DEBUGGER_ENABLED, false);
    }

    /// Re-applies the persisted state after a reload.
    ///
    /// Persisted breakpoints are resolved again as their scripts get parsed.
    pub fn restore(&mut self) {
        if !self.enabled() {
            return;
        }
        debug!("restoring debugger agent state");
        self.url_breakpoints =
            load_url_breakpoints(self.state.get_object(keys::JAVASCRIPT_BREAKPOINTS));
        self.send_event(DebuggerEvent::GlobalObjectCleared);
        self.start();

        let pause_state =
            PauseOnExceptionsState::from_i64(self.state.get_long(keys::PAUSE_ON_EXCEPTIONS_STATE));
        if let Err(err) = self.set_pause_on_exceptions_impl(pause_state) {
            warn!("could not restore pause on exceptions mode: {err}");
        }
        self.cached_skip_stack_regex =
            compile_skip_call_frame_pattern(&self.state.get_string(keys::SKIP_STACK_PATTERN));

        self.skip_all_pauses = self.state.get_boolean(keys::SKIP_ALL_PAUSES);
        if self.skip_all_pauses && self.state.get_boolean(keys::SKIP_ALL_PAUSES_EXPIRES_ON_RELOAD) {
            self.skip_all_pauses = false;
            self.state.set_boolean(keys::SKIP_ALL_PAUSES, false);
        }
        self.async_call_stack_depth =
            self.clamp_async_call_stack_depth(self.state.get_long(keys::ASYNC_CALL_STACK_DEPTH));
    }

    fn start(&mut self) {
        debug!("debugger agent enabled");
        self.server.start_listening();
        self.server.set_breakpoints_activated(true);
        if let Some(listener) = self.listener.as_mut() {
            listener.debugger_was_enabled();
        }
    }

    fn stop(&mut self) {
        debug!("debugger agent disabled");
        self.release_backtrace();
        self.store_breakpoint_cookies(JsonObject::new());
        self.state.set_long(
            keys::PAUSE_ON_EXCEPTIONS_STATE,
            PauseOnExceptionsState::DontPause.as_i64(),
        );
        self.state.set_string(keys::SKIP_STACK_PATTERN, "");
        self.state.set_long(keys::ASYNC_CALL_STACK_DEPTH, 0);

        self.server.stop_listening();
        self.server.clear_breakpoints();
        self.server.clear_compiled_scripts();
        self.clear();
        if let Some(listener) = self.listener.as_mut() {
            listener.debugger_was_disabled();
        }
        self.skip_all_pauses = false;
        self.cached_skip_stack_regex = None;
        self.async_call_stack_depth = 0;
    }

    fn clear(&mut self) {
        self.paused_script_state = None;
        self.current_call_stack = CallStack::default();
        self.scripts.clear();
        self.breakpoint_id_to_server_ids.clear();
        self.server_breakpoints.clear();
        self.continue_to_location_breakpoint_id = None;
        self.clear_break_details();
        self.java_script_pause_scheduled = false;
        self.debugger_step_scheduled = false;
        self.stepping_from_framework = false;
        self.pausing_on_native_event = false;
        self.skipped_step_in_count = 0;
    }

    /// Forgets every script after the main frame navigated, and drops the
    /// injected scripts of the old window.
    pub fn did_clear_main_frame_window_object(&mut self, realm: RealmId) {
        self.injected_script_manager.discard_injected_scripts_for(realm);
        self.reset();
    }

    /// Forgets every parsed script and its resolved breakpoints.
    ///
    /// Breakpoints set by url stay persisted and resolve again once matching
    /// scripts are parsed.
    pub fn reset(&mut self) {
        self.scripts.clear();
        self.breakpoint_id_to_server_ids.clear();
        self.server_breakpoints.clear();
        if !self.is_paused() {
            self.java_script_pause_scheduled = false;
            self.pausing_on_native_event = false;
            self.clear_break_details();
        }
        self.send_event(DebuggerEvent::GlobalObjectCleared);
    }

    /// `Debugger.setSkipAllPauses`.
    pub fn set_skip_all_pauses(&mut self, skipped: bool, until_reload: bool) {
        self.skip_all_pauses = skipped;
        self.state.set_boolean(keys::SKIP_ALL_PAUSES, skipped);
        self.state
            .set_boolean(keys::SKIP_ALL_PAUSES_EXPIRES_ON_RELOAD, until_reload);
    }

    /// `Debugger.skipStackFrames`. An empty or missing pattern turns
    /// framework skipping off.
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidRegex`] if the pattern does not compile; the
    /// previous pattern stays in effect.
    pub fn skip_stack_frames(&mut self, pattern: Option<&str>) -> AgentResult<()> {
        let pattern = pattern.unwrap_or_default();
        let compiled = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern).map_err(|_| AgentError::InvalidRegex)?)
        };
        self.state.set_string(keys::SKIP_STACK_PATTERN, pattern);
        self.cached_skip_stack_regex = compiled;
        Ok(())
    }

    /// `Debugger.setPauseOnExceptions`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown mode, or if the engine did not take the new mode.
    pub fn set_pause_on_exceptions(&mut self, state: &str) -> AgentResult<()> {
        let state = PauseOnExceptionsState::parse(state)?;
        self.set_pause_on_exceptions_impl(state)
    }

    fn set_pause_on_exceptions_impl(&mut self, state: PauseOnExceptionsState) -> AgentResult<()> {
        self.server.set_pause_on_exceptions_state(state);
        if self.server.pause_on_exceptions_state() != state {
            return Err(AgentError::PauseOnExceptionsRejected);
        }
        self.state
            .set_long(keys::PAUSE_ON_EXCEPTIONS_STATE, state.as_i64());
        Ok(())
    }

    /// `Debugger.setAsyncCallStackDepth`. Zero turns async stacks off;
    /// negative depths count as zero.
    pub fn set_async_call_stack_depth(&mut self, max_depth: i32) {
        let depth = self.clamp_async_call_stack_depth(i64::from(max_depth));
        self.async_call_stack_depth = depth;
        self.state
            .set_long(keys::ASYNC_CALL_STACK_DEPTH, i64::try_from(depth).unwrap_or(0));
    }

    fn clamp_async_call_stack_depth(&self, depth: i64) -> usize {
        let max = i64::from(self.config.max_async_call_stack_depth);
        usize::try_from(depth.clamp(0, max)).unwrap_or(0)
    }

    /// `Debugger.getScriptSource`.
    ///
    /// # Errors
    ///
    /// [`AgentError::UnknownScript`] if no script was parsed under that id.
    pub fn get_script_source(&self, script_id: &str) -> AgentResult<String> {
        self.scripts
            .get(script_id)
            .map(|script| script.source.clone())
            .ok_or_else(|| AgentError::UnknownScript(script_id.to_string()))
    }

    /// `Debugger.getFunctionDetails`.
    ///
    /// # Errors
    ///
    /// Fails if the id names no live context, or the helper rejects it.
    pub fn get_function_details(&mut self, function_id: &str) -> AgentResult<FunctionDetails> {
        self.injected_script_manager
            .injected_script_for_object_id(function_id)
            .ok_or(AgentError::StaleObjectId("Function object id is obsolete"))?
            .get_function_details(function_id)
    }

    /// `Debugger.getCollectionEntries`.
    ///
    /// # Errors
    ///
    /// Fails if the id names no live context, or the helper rejects it.
    pub fn get_collection_entries(&mut self, object_id: &str) -> AgentResult<Vec<CollectionEntry>> {
        self.injected_script_manager
            .injected_script_for_object_id(object_id)
            .ok_or(AgentError::InspectedFrameGone)?
            .get_collection_entries(object_id)
    }

    /// `Debugger.setBreakpointsActive`.
    pub fn set_breakpoints_active(&mut self, active: bool) {
        self.server.set_breakpoints_activated(active);
    }

    /// Reports a newly compiled script.
    ///
    /// Emits `scriptParsed` (or `scriptFailedToParse`), then resolves every
    /// persisted url breakpoint matching the script, emitting
    /// `breakpointResolved` for each one the engine accepted.
    pub fn did_parse_source(&mut self, script_id: &str, mut script: Script, result: CompileResult) {
        let has_syntax_error = result != CompileResult::Success;
        if script.has_start_position() {
            script.source_url.clear();
        } else if script.source_url.is_empty() {
            if let Some(source_url) = find_source_url(&script.source) {
                script.source_url = source_url;
            }
        }

        let has_source_url = !script.source_url.is_empty();
        let script_url = script.url().to_string();
        let event = ScriptParsedEvent {
            script_id: script_id.to_string(),
            url: script_url.clone(),
            start_line: script.start_line,
            start_column: script.start_column,
            end_line: script.end_line,
            end_column: script.end_column,
            is_content_script: script.is_content_script.then_some(true),
            source_map_url: self.source_map_url_for_script(&script, has_syntax_error),
            has_source_url: has_source_url.then_some(true),
        };
        debug!("script {script_id} parsed from {script_url:?}");
        self.send_event(if has_syntax_error {
            DebuggerEvent::ScriptFailedToParse(event)
        } else {
            DebuggerEvent::ScriptParsed(event)
        });
        self.scripts.insert(script_id.to_string(), script);

        if script_url.is_empty() || has_syntax_error {
            return;
        }
        let matching: Vec<(String, ScriptBreakpoint)> = self
            .url_breakpoints
            .iter()
            .filter(|breakpoint| !breakpoint.cookie.is_anti && breakpoint.matches(&script_url))
            .map(|breakpoint| {
                let cookie = &breakpoint.cookie;
                let script_breakpoint = ScriptBreakpoint::new(
                    cookie.line_number,
                    cookie.column_number,
                    cookie.condition.as_str(),
                );
                (breakpoint.id.clone(), script_breakpoint)
            })
            .collect();
        for (breakpoint_id, breakpoint) in matching {
            if let Some(location) = self.resolve_breakpoint(
                &breakpoint_id,
                script_id,
                &breakpoint,
                BreakpointSource::User,
            ) {
                self.send_event(DebuggerEvent::BreakpointResolved(BreakpointResolvedEvent {
                    breakpoint_id,
                    location,
                }));
            }
        }
    }

    fn source_map_url_for_script(&self, script: &Script, has_syntax_error: bool) -> Option<String> {
        if has_syntax_error {
            if let Some(url) = find_source_map_url(&script.source) {
                return Some(url);
            }
        }
        if !script.source_mapping_url.is_empty() {
            return Some(script.source_mapping_url.clone());
        }
        if script.url.is_empty() {
            return None;
        }
        self.source_map_url_resolver
            .as_ref()?
            .resource_source_map_url(&script.url)
    }

    fn clear_break_details(&mut self) {
        self.break_reason = BreakReason::Other;
        self.break_aux_data = None;
    }

    fn send_event(&mut self, event: DebuggerEvent) {
        if let Some(frontend) = self.frontend.as_mut() {
            frontend.send_event(event);
        }
    }

    /// The parsed script registered under `script_id`.
    #[must_use]
    pub fn script(&self, script_id: &str) -> Option<&Script> {
        self.scripts.get(script_id)
    }

    #[must_use]
    pub fn skip_all_pauses(&self) -> bool {
        self.skip_all_pauses
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    #[must_use]
    pub fn server(&self) -> &S {
        &self.server
    }

    /// The engine, mutably.
    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    #[must_use]
    pub fn injected_script_manager(&self) -> &InjectedScriptManager {
        &self.injected_script_manager
    }

    /// The injected scripts, mutably.
    pub fn injected_script_manager_mut(&mut self) -> &mut InjectedScriptManager {
        &mut self.injected_script_manager
    }
}

fn compile_skip_call_frame_pattern(pattern: &str) -> Option<Regex> {
    if pattern.is_empty() {
        return None;
    }
    Regex::new(pattern)
        .inspect_err(|err| warn!("ignoring invalid skip stack pattern {pattern:?}: {err}"))
        .ok()
}

impl<S: fmt::Debug> fmt::Debug for DebuggerAgent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerAgent")
            .field("server", &self.server)
            .field("scripts", &self.scripts.len())
            .field("breakpoints", &self.breakpoint_id_to_server_ids.len())
            .field("paused", &self.paused_script_state.is_some())
            .field("break_reason", &self.break_reason)
            .field("skip_all_pauses", &self.skip_all_pauses)
            .finish_non_exhaustive()
    }
}
