use super::{
    ContextId, EvaluateOptions, InjectedScriptSource, InspectedStateAccessCheck, PropertyQuery,
    ScriptState,
};
use crate::error::{AgentError, AgentResult};
use crate::value::{ScriptValue, ToJsonError};
use inspector_protocol::{
    CallFrame, CollectionEntry, EvaluateResult, ExceptionDetails, FunctionDetails,
    InternalPropertyDescriptor, Location, PropertyDescriptor, RemoteObject,
};
use log::{trace, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Bridge between one execution context and the protocol.
///
/// Operations fail soft: decode problems become [`AgentError::Internal`],
/// error messages produced by the helper become [`AgentError::Script`].
pub struct InjectedScript {
    id: ContextId,
    state: ScriptState,
    source: Box<dyn InjectedScriptSource>,
    access_check: InspectedStateAccessCheck,
    max_json_depth: usize,
}

impl InjectedScript {
    pub(crate) fn new(
        id: ContextId,
        state: ScriptState,
        source: Box<dyn InjectedScriptSource>,
        access_check: InspectedStateAccessCheck,
        max_json_depth: usize,
    ) -> Self {
        Self {
            id,
            state,
            source,
            access_check,
            max_json_depth,
        }
    }

    /// Id of the context this script lives in.
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.id
    }

    /// The script state this script lives in.
    #[must_use]
    pub fn script_state(&self) -> ScriptState {
        self.state
    }

    /// Returns `true` once the underlying context is gone.
    #[must_use]
    pub fn has_no_value(&self) -> bool {
        self.source.is_detached()
    }

    /// Returns `true` if the inspector may currently access the context.
    #[must_use]
    pub fn can_access_inspected_state(&self) -> bool {
        (self.access_check)(&self.state)
    }

    /// Evaluates `expression` in the global scope of the context.
    ///
    /// # Errors
    ///
    /// Fails with the helper's message, or an internal error if its answer
    /// could not be decoded.
    pub fn evaluate(
        &mut self,
        expression: &str,
        options: &EvaluateOptions<'_>,
    ) -> AgentResult<EvaluateResult> {
        let result = self.make_call("evaluate", |source| source.evaluate(expression, options));
        decode_eval_result(result)
    }

    /// Calls a function on a bound object.
    ///
    /// # Errors
    ///
    /// As for [`evaluate`](Self::evaluate).
    pub fn call_function_on(
        &mut self,
        object_id: &str,
        expression: &str,
        arguments: &str,
        options: &EvaluateOptions<'_>,
    ) -> AgentResult<EvaluateResult> {
        let result = self.make_call("callFunctionOn", |source| {
            source.call_function_on(object_id, expression, arguments, options)
        });
        decode_eval_result(result)
    }

    /// Evaluates `expression` in a paused call frame.
    ///
    /// # Errors
    ///
    /// As for [`evaluate`](Self::evaluate).
    pub fn evaluate_on_call_frame(
        &mut self,
        call_frames: &ScriptValue,
        async_call_stacks: &[ScriptValue],
        call_frame_id: &str,
        expression: &str,
        options: &EvaluateOptions<'_>,
    ) -> AgentResult<EvaluateResult> {
        let result = self.make_call("evaluateOnCallFrame", |source| {
            source.evaluate_on_call_frame(
                call_frames,
                async_call_stacks,
                call_frame_id,
                expression,
                options,
            )
        });
        decode_eval_result(result)
    }

    /// Wraps `value` and attaches it to `group` for later bulk release.
    ///
    /// Returns `None` if the helper failed; callers must give up on the
    /// current operation rather than retry. A value nesting deeper than the
    /// JSON depth limit degrades to a string remote object describing that.
    pub fn wrap_object(
        &mut self,
        value: &ScriptValue,
        group: &str,
        generate_preview: bool,
    ) -> Option<RemoteObject> {
        if self.has_no_value() || !self.can_access_inspected_state() {
            return None;
        }
        let wrapped = self.source.wrap_object(value, group, generate_preview)?;
        match wrapped.to_json(self.max_json_depth) {
            Ok(json) => serde_json::from_value(json)
                .inspect_err(|err| warn!("wrapObject returned a malformed remote object: {err}"))
                .ok(),
            Err(ToJsonError::DepthExceeded) => {
                let description = self.depth_exceeded_message();
                Some(RemoteObject {
                    type_: "string".to_string(),
                    subtype: None,
                    class_name: None,
                    value: Some(Value::String(description.clone())),
                    description: Some(description),
                    object_id: None,
                    preview: None,
                })
            }
            Err(ToJsonError::Opaque) => None,
        }
    }

    /// Wraps the frames of a paused call stack.
    ///
    /// An empty handle yields no frames; so does a helper failure, which is
    /// logged.
    pub fn wrap_call_frames(
        &mut self,
        call_frames: &ScriptValue,
        async_ordinal: usize,
    ) -> Vec<CallFrame> {
        if call_frames.is_empty() {
            return Vec::new();
        }
        if self.has_no_value() {
            warn!("wrapCallFrames called on a detached injected script {}", self.id);
            return Vec::new();
        }
        let result = self.make_call("wrapCallFrames", |source| {
            source.wrap_call_frames(call_frames, async_ordinal)
        });
        match result {
            Value::Array(_) => serde_json::from_value(result)
                .inspect_err(|err| warn!("wrapCallFrames returned malformed frames: {err}"))
                .unwrap_or_default(),
            other => {
                warn!("wrapCallFrames returned a non-array result: {other}");
                Vec::new()
            }
        }
    }

    /// Enumerates the properties of a bound object.
    ///
    /// # Errors
    ///
    /// Fails for unknown objects or an undecodable answer.
    pub fn get_properties(
        &mut self,
        object_id: &str,
        query: &PropertyQuery,
    ) -> AgentResult<Vec<PropertyDescriptor>> {
        let result = self.make_call("getProperties", |source| {
            source.get_properties(object_id, query)
        });
        decode_array(result)
    }

    /// Enumerates the engine-internal properties of a bound object.
    ///
    /// # Errors
    ///
    /// Fails for unknown objects or an undecodable answer.
    pub fn get_internal_properties(
        &mut self,
        object_id: &str,
    ) -> AgentResult<Vec<InternalPropertyDescriptor>> {
        let result = self.make_call("getInternalProperties", |source| {
            source.get_internal_properties(object_id)
        });
        decode_array(result)
    }

    /// Lists the entries of a bound collection.
    ///
    /// # Errors
    ///
    /// Fails for unknown objects or non-collections.
    pub fn get_collection_entries(&mut self, object_id: &str) -> AgentResult<Vec<CollectionEntry>> {
        let result = self.make_call("getCollectionEntries", |source| {
            source.get_collection_entries(object_id)
        });
        decode_array(result)
    }

    /// Describes a bound function.
    ///
    /// # Errors
    ///
    /// Fails for unknown objects or non-functions.
    pub fn get_function_details(&mut self, function_id: &str) -> AgentResult<FunctionDetails> {
        let result = self.make_call("getFunctionDetails", |source| {
            source.get_function_details(function_id)
        });
        decode_object(result)
    }

    /// Lists where a step into from a call frame could land.
    ///
    /// # Errors
    ///
    /// Fails for unknown call frames.
    pub fn get_step_in_positions(
        &mut self,
        call_frames: &ScriptValue,
        call_frame_id: &str,
    ) -> AgentResult<Vec<Location>> {
        let result = self.make_call("getStepInPositions", |source| {
            source.get_step_in_positions(call_frames, call_frame_id)
        });
        decode_array(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_variable_value(
        &mut self,
        call_frames: Option<&ScriptValue>,
        call_frame_id: Option<&str>,
        function_object_id: Option<&str>,
        scope_number: i32,
        variable_name: &str,
        new_value: &str,
    ) -> AgentResult<()> {
        let result = self.make_call("setVariableValue", |source| {
            source.set_variable_value(
                call_frames,
                call_frame_id,
                function_object_id,
                scope_number,
                variable_name,
                new_value,
            )
        });
        match result {
            Value::String(message) => Err(AgentError::Script(message)),
            _ => Ok(()),
        }
    }

    /// Restarts a frame and returns the helper's details object.
    pub fn restart_frame(
        &mut self,
        call_frames: &ScriptValue,
        call_frame_id: &str,
    ) -> AgentResult<Value> {
        let result = self.make_call("restartFrame", |source| {
            source.restart_frame(call_frames, call_frame_id)
        });
        match result {
            Value::Object(_) => Ok(result),
            Value::String(message) => Err(AgentError::Script(message)),
            _ => Err(AgentError::Internal),
        }
    }

    /// Resolves `object_id` to a node handle, if it names a node.
    pub fn node_for_object_id(&mut self, object_id: &str) -> Option<ScriptValue> {
        if self.has_no_value() || !self.can_access_inspected_state() {
            return None;
        }
        self.source
            .find_object_by_id(object_id)
            .filter(|value| value.as_handle().is_some())
    }

    /// Hands a node to the embedder's `inspect()` handler.
    pub fn inspect_node(&mut self, node: &ScriptValue) {
        if self.has_no_value() || !self.can_access_inspected_state() {
            return;
        }
        self.source.inspect_node(node);
    }

    /// Unbinds one object id.
    pub fn release_object(&mut self, object_id: &str) {
        if self.has_no_value() {
            return;
        }
        self.source.release_object(object_id);
    }

    /// Unbinds every object id of `group`.
    pub fn release_object_group(&mut self, group: &str) {
        if self.has_no_value() {
            return;
        }
        trace!("releasing object group {group:?} in context {}", self.id);
        self.source.release_object_group(group);
    }

    /// Runs one helper call and marshals its answer to JSON.
    ///
    /// Failures that can be described become JSON strings, which every
    /// decoder reports as an error message.
    fn make_call<F>(&mut self, function: &str, call: F) -> Value
    where
        F: FnOnce(&mut dyn InjectedScriptSource) -> Option<ScriptValue>,
    {
        if self.has_no_value() {
            return Value::Null;
        }
        if !self.can_access_inspected_state() {
            return Value::String(AgentError::ContextAccessDenied.to_string());
        }
        trace!("injected script {} call {function}", self.id);
        let Some(result) = call(self.source.as_mut()) else {
            warn!("injected script {} threw while running {function}", self.id);
            return Value::String("Exception while making a call.".to_string());
        };
        match result.to_json(self.max_json_depth) {
            Ok(json) => json,
            Err(ToJsonError::DepthExceeded) => Value::String(self.depth_exceeded_message()),
            Err(ToJsonError::Opaque) => Value::Null,
        }
    }

    fn depth_exceeded_message(&self) -> String {
        format!(
            "Object has too long reference chain(must not be longer than {})",
            self.max_json_depth
        )
    }
}

fn decode_eval_result(result: Value) -> AgentResult<EvaluateResult> {
    let mut pair = match result {
        Value::Object(pair) => pair,
        Value::String(message) => return Err(AgentError::Script(message)),
        Value::Null => return Err(AgentError::InternalDetail("result value is empty")),
        _ => return Err(AgentError::InternalDetail("result is not an Object")),
    };
    let (Some(Value::Object(object)), Some(Value::Bool(was_thrown))) =
        (pair.remove("result"), pair.remove("wasThrown"))
    else {
        return Err(AgentError::InternalDetail(
            "result is not a pair of value and wasThrown flag",
        ));
    };
    let result: RemoteObject =
        serde_json::from_value(Value::Object(object)).map_err(|_| AgentError::Internal)?;
    let exception_details = if was_thrown {
        pair.remove("exceptionDetails")
            .and_then(|details| serde_json::from_value::<ExceptionDetails>(details).ok())
    } else {
        None
    };
    Ok(EvaluateResult {
        result,
        was_thrown: Some(was_thrown),
        exception_details,
    })
}

fn decode_array<T: DeserializeOwned>(result: Value) -> AgentResult<Vec<T>> {
    match result {
        Value::Array(_) => serde_json::from_value(result).map_err(|_| AgentError::Internal),
        Value::String(message) => Err(AgentError::Script(message)),
        _ => Err(AgentError::Internal),
    }
}

fn decode_object<T: DeserializeOwned>(result: Value) -> AgentResult<T> {
    match result {
        Value::Object(_) => serde_json::from_value(result).map_err(|_| AgentError::Internal),
        Value::String(message) => Err(AgentError::Script(message)),
        _ => Err(AgentError::Internal),
    }
}

impl fmt::Debug for InjectedScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedScript")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("max_json_depth", &self.max_json_depth)
            .finish_non_exhaustive()
    }
}
