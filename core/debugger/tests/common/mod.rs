//! Scripted fake engine shared by the integration tests
//!
//! - `FakeDebugServer` records every engine call and snaps breakpoints by a
//!   configurable offset.
//! - `FakeHelper` is an injected script helper keeping wrapped objects in
//!   groups, so releases can be observed.
//! - `Harness` wires both to an agent with a recording front-end and cookie
//!   client.

#![allow(dead_code)]

use inspector_debugger::{
    AGENT_STATE_NAME, AgentConfig, CallStack, CompileResult, ContextId, DebuggerAgent,
    EvaluateOptions, InjectedScriptHost, InjectedScriptManager, InjectedScriptSource,
    InspectorCompositeState, PauseOnExceptionsState, PropertyQuery, RealmId, ResolvedBreakpoint,
    Script, ScriptBreakpoint, ScriptDebugServer, ScriptState, ScriptValue, StackFrameInfo,
};
use inspector_protocol::DebuggerEvent;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// The main page's global scope.
pub const PAGE: ScriptState = ScriptState::new(1, RealmId(1));

/// A global scope the embedder refuses to expose.
pub const PRIVILEGED: ScriptState = ScriptState::new(2, RealmId(2));

/// Engine double recording every call.
#[derive(Debug, Default)]
pub struct FakeDebugServer {
    pub calls: Vec<String>,
    pub installed: BTreeMap<String, (String, ScriptBreakpoint)>,
    /// Added to requested positions, like snapping to the next statement.
    pub snap: (i32, i32),
    /// Lines no statement lives on.
    pub empty_lines: Vec<i32>,
    pub pause_on_exceptions: PauseOnExceptionsState,
    pub reject_pause_on_exceptions: bool,
    pub pause_on_next_statement: bool,
    pub breakpoints_active: bool,
    pub listening: bool,
    pub cannot_break: bool,
    pub console_muted: bool,
    pub stack: CallStack,
    next_breakpoint: u32,
}

impl FakeDebugServer {
    pub fn calls_matching(&self, prefix: &str) -> Vec<&str> {
        self.calls
            .iter()
            .map(String::as_str)
            .filter(|call| call.starts_with(prefix))
            .collect()
    }
}

impl ScriptDebugServer for FakeDebugServer {
    fn start_listening(&mut self) {
        self.calls.push("startListening".to_string());
        self.listening = true;
    }

    fn stop_listening(&mut self) {
        self.calls.push("stopListening".to_string());
        self.listening = false;
    }

    fn set_breakpoint(
        &mut self,
        script_id: &str,
        breakpoint: &ScriptBreakpoint,
        interstatement_location: bool,
    ) -> Option<ResolvedBreakpoint> {
        self.calls.push(format!(
            "setBreakpoint {script_id}:{}:{}{}",
            breakpoint.line_number,
            breakpoint.column_number,
            if interstatement_location { " interstatement" } else { "" }
        ));
        if self.empty_lines.contains(&breakpoint.line_number) {
            return None;
        }
        self.next_breakpoint += 1;
        let id = format!("engine-{}", self.next_breakpoint);
        self.installed
            .insert(id.clone(), (script_id.to_string(), breakpoint.clone()));
        Some(ResolvedBreakpoint {
            id,
            line_number: breakpoint.line_number + self.snap.0,
            column_number: breakpoint.column_number.max(0) + self.snap.1,
        })
    }

    fn remove_breakpoint(&mut self, id: &str) {
        self.calls.push(format!("removeBreakpoint {id}"));
        self.installed.remove(id);
    }

    fn clear_breakpoints(&mut self) {
        self.calls.push("clearBreakpoints".to_string());
        self.installed.clear();
    }

    fn clear_compiled_scripts(&mut self) {
        self.calls.push("clearCompiledScripts".to_string());
    }

    fn set_breakpoints_activated(&mut self, activated: bool) {
        self.calls.push(format!("setBreakpointsActivated {activated}"));
        self.breakpoints_active = activated;
    }

    fn pause_on_exceptions_state(&self) -> PauseOnExceptionsState {
        self.pause_on_exceptions
    }

    fn set_pause_on_exceptions_state(&mut self, state: PauseOnExceptionsState) {
        self.calls.push(format!("setPauseOnExceptionsState {state:?}"));
        if !self.reject_pause_on_exceptions {
            self.pause_on_exceptions = state;
        }
    }

    fn set_pause_on_next_statement(&mut self, pause: bool) {
        self.calls.push(format!("setPauseOnNextStatement {pause}"));
        self.pause_on_next_statement = pause;
    }

    fn can_break_program(&self) -> bool {
        !self.cannot_break
    }

    fn break_program(&mut self) {
        self.calls.push("breakProgram".to_string());
    }

    fn continue_program(&mut self) {
        self.calls.push("continueProgram".to_string());
    }

    fn step_into_statement(&mut self) {
        self.calls.push("stepIntoStatement".to_string());
    }

    fn step_over_statement(&mut self) {
        self.calls.push("stepOverStatement".to_string());
    }

    fn step_out_of_function(&mut self) {
        self.calls.push("stepOutOfFunction".to_string());
    }

    fn current_call_stack(&self) -> CallStack {
        self.stack.clone()
    }

    fn set_console_muted(&mut self, muted: bool) {
        self.calls.push(format!("setConsoleMuted {muted}"));
        self.console_muted = muted;
    }
}

/// Observable state of one fake helper.
#[derive(Debug, Default)]
pub struct HelperState {
    pub context: Option<ContextId>,
    /// Bound id to (group, value).
    pub objects: BTreeMap<u64, (String, ScriptValue)>,
    pub detached: bool,
    pub released_groups: Vec<String>,
    pub evaluations: Vec<(String, String, usize)>,
    pub assignments: Vec<(Option<String>, Option<String>, i32, String, String)>,
    next_object: u64,
}

impl HelperState {
    pub fn groups(&self) -> Vec<&str> {
        self.objects.values().map(|(group, _)| group.as_str()).collect()
    }

    fn bind(&mut self, value: &ScriptValue, group: &str) -> String {
        self.next_object += 1;
        self.objects
            .insert(self.next_object, (group.to_string(), value.clone()));
        self.context
            .map(|context| context.object_id(self.next_object))
            .unwrap_or_default()
    }

    fn lookup(&self, object_id: &str) -> Option<&ScriptValue> {
        let envelope: Value = serde_json::from_str(object_id).ok()?;
        let id = envelope.get("id")?.as_u64()?;
        self.objects.get(&id).map(|(_, value)| value)
    }
}

/// Injected script helper backed by [`HelperState`].
pub struct FakeHelper(Rc<RefCell<HelperState>>);

fn remote_object(object_id: &str, description: &str) -> Value {
    json!({"type": "object", "className": "Object", "description": description, "objectId": object_id})
}

impl FakeHelper {
    fn evaluation(&self, expression: &str) -> Option<ScriptValue> {
        let answer = match expression {
            "throw" => json!({
                "result": {"type": "object", "subtype": "error", "description": "Error: boom"},
                "wasThrown": true,
                "exceptionDetails": {"text": "Uncaught Error: boom"}
            }),
            "malformed" => json!({"result": {"type": "number", "value": 1}}),
            "helper error" => json!("Could not find call frame with given id"),
            _ => json!({"result": {"type": "string", "value": expression}, "wasThrown": false}),
        };
        Some(ScriptValue::from_json(&answer))
    }

    /// Wraps a call frame chain of `[{functionName, scriptId, lineNumber,
    /// columnNumber}]` objects.
    fn frames(&self, call_frames: &ScriptValue, async_ordinal: usize) -> Value {
        let state = self.0.borrow();
        let Some(context) = state.context else {
            return json!([]);
        };
        let frames = call_frames.to_json(100).unwrap_or(Value::Null);
        let frames = frames.as_array().cloned().unwrap_or_default();
        let wrapped: Vec<Value> = frames
            .iter()
            .enumerate()
            .map(|(ordinal, frame)| {
                let mut id: Value =
                    serde_json::from_str(&context.call_frame_id(ordinal)).unwrap_or(Value::Null);
                if async_ordinal > 0 {
                    id["asyncOrdinal"] = json!(async_ordinal);
                }
                json!({
                    "callFrameId": id.to_string(),
                    "functionName": frame["functionName"],
                    "location": {
                        "scriptId": frame["scriptId"],
                        "lineNumber": frame["lineNumber"],
                        "columnNumber": frame["columnNumber"],
                    },
                    "scopeChain": [],
                    "this": {"type": "undefined"},
                })
            })
            .collect();
        Value::Array(wrapped)
    }
}

impl InjectedScriptSource for FakeHelper {
    fn evaluate(&mut self, expression: &str, _: &EvaluateOptions<'_>) -> Option<ScriptValue> {
        self.evaluation(expression)
    }

    fn call_function_on(
        &mut self,
        _: &str,
        expression: &str,
        _: &str,
        _: &EvaluateOptions<'_>,
    ) -> Option<ScriptValue> {
        self.evaluation(expression)
    }

    fn evaluate_on_call_frame(
        &mut self,
        _: &ScriptValue,
        async_call_stacks: &[ScriptValue],
        call_frame_id: &str,
        expression: &str,
        options: &EvaluateOptions<'_>,
    ) -> Option<ScriptValue> {
        self.0.borrow_mut().evaluations.push((
            call_frame_id.to_string(),
            options.object_group.to_string(),
            async_call_stacks.len(),
        ));
        self.evaluation(expression)
    }

    fn wrap_object(
        &mut self,
        value: &ScriptValue,
        group: &str,
        _: bool,
    ) -> Option<ScriptValue> {
        let object_id = self.0.borrow_mut().bind(value, group);
        Some(ScriptValue::from_json(&remote_object(&object_id, "Error: boom")))
    }

    fn wrap_call_frames(&mut self, call_frames: &ScriptValue, async_ordinal: usize) -> Option<ScriptValue> {
        Some(ScriptValue::from_json(&self.frames(call_frames, async_ordinal)))
    }

    fn get_properties(&mut self, object_id: &str, _: &PropertyQuery) -> Option<ScriptValue> {
        let state = self.0.borrow();
        let answer = match state.lookup(object_id) {
            Some(_) => json!([{"name": "answer", "value": {"type": "number", "value": 42}, "configurable": true, "enumerable": true}]),
            None => json!("Could not find object with given id"),
        };
        Some(ScriptValue::from_json(&answer))
    }

    fn get_internal_properties(&mut self, _: &str) -> Option<ScriptValue> {
        Some(ScriptValue::array(Vec::new()))
    }

    fn get_collection_entries(&mut self, object_id: &str) -> Option<ScriptValue> {
        let state = self.0.borrow();
        let answer = match state.lookup(object_id) {
            Some(_) => json!([{"key": {"type": "string", "value": "k"}, "value": {"type": "number", "value": 1}}]),
            None => json!("Could not find object with given id"),
        };
        Some(ScriptValue::from_json(&answer))
    }

    fn get_function_details(&mut self, function_id: &str) -> Option<ScriptValue> {
        let state = self.0.borrow();
        let answer = match state.lookup(function_id) {
            Some(ScriptValue::Object(function)) => {
                let function = function.borrow();
                let get = |key: &str| function.get(key).cloned().unwrap_or(ScriptValue::Null);
                json!({
                    "location": {
                        "scriptId": get("scriptId").to_json(1).ok(),
                        "lineNumber": get("lineNumber").to_json(1).ok(),
                        "columnNumber": get("columnNumber").to_json(1).ok(),
                    },
                    "functionName": get("name").to_json(1).ok(),
                })
            }
            Some(_) => json!("Target object is not a function"),
            None => json!("Could not find object with given id"),
        };
        Some(ScriptValue::from_json(&answer))
    }

    fn get_step_in_positions(&mut self, _: &ScriptValue, _: &str) -> Option<ScriptValue> {
        Some(ScriptValue::from_json(
            &json!([{"scriptId": "1", "lineNumber": 12, "columnNumber": 4}]),
        ))
    }

    fn set_variable_value(
        &mut self,
        _: Option<&ScriptValue>,
        call_frame_id: Option<&str>,
        function_object_id: Option<&str>,
        scope_number: i32,
        variable_name: &str,
        new_value: &str,
    ) -> Option<ScriptValue> {
        if variable_name == "missing" {
            return Some(ScriptValue::String("Variable missing not found".to_string()));
        }
        self.0.borrow_mut().assignments.push((
            call_frame_id.map(str::to_string),
            function_object_id.map(str::to_string),
            scope_number,
            variable_name.to_string(),
            new_value.to_string(),
        ));
        Some(ScriptValue::Undefined)
    }

    fn restart_frame(&mut self, _: &ScriptValue, _: &str) -> Option<ScriptValue> {
        Some(ScriptValue::from_json(&json!({"stack_update_needs_step_in": false})))
    }

    fn find_object_by_id(&mut self, object_id: &str) -> Option<ScriptValue> {
        self.0.borrow().lookup(object_id).cloned()
    }

    fn inspect_node(&mut self, _: &ScriptValue) {}

    fn release_object(&mut self, object_id: &str) {
        let mut state = self.0.borrow_mut();
        let id = serde_json::from_str::<Value>(object_id)
            .ok()
            .and_then(|envelope| envelope.get("id").and_then(Value::as_u64));
        if let Some(id) = id {
            state.objects.remove(&id);
        }
    }

    fn release_object_group(&mut self, group: &str) {
        let mut state = self.0.borrow_mut();
        state.objects.retain(|_, (object_group, _)| object_group != group);
        state.released_groups.push(group.to_string());
    }

    fn is_detached(&self) -> bool {
        self.0.borrow().detached
    }
}

pub type Helpers = Rc<RefCell<BTreeMap<ContextId, Rc<RefCell<HelperState>>>>>;

/// Creates one [`FakeHelper`] per context and keeps a handle on its state.
#[derive(Default)]
pub struct FakeHost {
    pub helpers: Helpers,
}

impl InjectedScriptHost for FakeHost {
    fn create_injected_script(
        &mut self,
        _: &ScriptState,
        id: ContextId,
    ) -> Option<Box<dyn InjectedScriptSource>> {
        let state = Rc::new(RefCell::new(HelperState {
            context: Some(id),
            ..HelperState::default()
        }));
        self.helpers.borrow_mut().insert(id, Rc::clone(&state));
        Some(Box::new(FakeHelper(state)))
    }
}

pub fn new_manager(max_json_depth: usize) -> (InjectedScriptManager, Helpers) {
    let host = FakeHost::default();
    let helpers = Rc::clone(&host.helpers);
    let manager = InjectedScriptManager::new(
        Box::new(host),
        Rc::new(|state: &ScriptState| *state != PRIVILEGED),
        max_json_depth,
    );
    (manager, helpers)
}

/// An agent wired to fakes, with recorded events and cookies.
pub struct Harness {
    pub agent: DebuggerAgent<FakeDebugServer>,
    pub events: Rc<RefCell<Vec<DebuggerEvent>>>,
    pub cookies: Rc<RefCell<Vec<String>>>,
    pub composite: InspectorCompositeState,
    pub helpers: Helpers,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(AgentConfig::default(), None)
    }

    pub fn with_config(config: AgentConfig) -> Self {
        Self::build(config, None)
    }

    /// An agent created after a reload, from a saved cookie.
    pub fn from_cookie(cookie: &str) -> Self {
        Self::build(AgentConfig::default(), Some(cookie))
    }

    fn build(config: AgentConfig, cookie: Option<&str>) -> Self {
        let cookies = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&cookies);
        let composite = InspectorCompositeState::new(Some(Box::new(move |cookie: &str| {
            sink.borrow_mut().push(cookie.to_string());
        })));
        if let Some(cookie) = cookie {
            composite.load_from_cookie(cookie);
        }
        let (manager, helpers) = new_manager(config.max_json_depth);
        let mut agent = DebuggerAgent::new(
            FakeDebugServer::default(),
            manager,
            composite.create_agent_state(AGENT_STATE_NAME),
            config,
        );
        let events = Rc::new(RefCell::new(Vec::new()));
        let recorder = Rc::clone(&events);
        agent.set_frontend(Box::new(move |event: DebuggerEvent| {
            recorder.borrow_mut().push(event);
        }));
        Self {
            agent,
            events,
            cookies,
            composite,
            helpers,
        }
    }

    pub fn enabled() -> Self {
        let mut harness = Self::new();
        harness.agent.enable();
        harness
    }

    /// Drains the recorded events.
    pub fn take_events(&self) -> Vec<DebuggerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn event_methods(&self) -> Vec<&'static str> {
        self.take_events().iter().map(DebuggerEvent::method).collect()
    }

    /// Parses a script at `url` spanning lines `0..=end_line`.
    pub fn parse_script(&mut self, script_id: &str, url: &str, end_line: i32) {
        let script = Script {
            url: url.to_string(),
            source: "function f() {}\n".repeat(usize::try_from(end_line + 1).unwrap()),
            end_line,
            ..Script::default()
        };
        self.agent
            .did_parse_source(script_id, script, CompileResult::Success);
    }

    /// The helper of the main page's context, once it exists.
    pub fn page_helper(&self) -> Rc<RefCell<HelperState>> {
        let helpers = self.helpers.borrow();
        let state = helpers
            .values()
            .find(|state| state.borrow().context.is_some_and(|id| id.id() == 1))
            .expect("page helper was never created");
        Rc::clone(state)
    }
}

/// A call stack whose frames are `(script_id, line, column)`, top first.
pub fn call_stack(frames: &[(&str, i32, i32)]) -> CallStack {
    let infos = frames
        .iter()
        .map(|(script_id, line_number, column_number)| StackFrameInfo {
            script_id: (*script_id).to_string(),
            line_number: *line_number,
            column_number: *column_number,
            function_name: format!("f{line_number}"),
            ..StackFrameInfo::default()
        })
        .collect();
    let handle = json!(
        frames
            .iter()
            .map(|(script_id, line_number, column_number)| json!({
                "functionName": format!("f{line_number}"),
                "scriptId": script_id,
                "lineNumber": line_number,
                "columnNumber": column_number,
            }))
            .collect::<Vec<_>>()
    );
    CallStack {
        frames: infos,
        handle: ScriptValue::from_json(&handle),
        async_stacks: Vec::new(),
    }
}

/// Same as [`call_stack`], with the top frame about to return.
pub fn call_stack_at_return(frames: &[(&str, i32, i32)]) -> CallStack {
    let mut stack = call_stack(frames);
    if let Some(top) = stack.frames.first_mut() {
        top.is_at_return = true;
    }
    stack
}

/// A thrown value.
pub fn exception() -> ScriptValue {
    ScriptValue::from_json(&json!({"message": "boom"}))
}
