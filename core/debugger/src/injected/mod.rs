//! Injected scripts
//!
//! An injected script is the per-execution-context bridge that turns engine
//! values into protocol remote objects and back. Its behavior is split in two:
//!
//! - [`InjectedScriptSource`] is the engine-side marshaling helper, implemented
//!   once per engine. It receives typed arguments and answers with raw
//!   [`ScriptValue`]s.
//! - [`InjectedScript`] wraps one helper, marshals its answers to JSON under a
//!   depth limit and decodes them into protocol types, reporting shape
//!   mismatches as internal errors instead of guessing.
//!
//! [`InjectedScriptManager`] maps execution contexts to small ids and to their
//! injected scripts.

mod manager;
mod script;

pub use manager::InjectedScriptManager;
pub use script::InjectedScript;

use crate::value::ScriptValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Which of the embedded script engines minted an id.
///
/// Two engines sharing one inspector protocol get disjoint id spaces by
/// tagging their ids instead of offsetting them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineKind {
    /// The main script engine; its ids carry no engine tag.
    #[default]
    Primary,
    /// The second embedded engine.
    Secondary,
}

impl EngineKind {
    fn is_primary(&self) -> bool {
        *self == Self::Primary
    }
}

/// Process-unique identifier of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId {
    engine: EngineKind,
    id: u32,
}

/// The envelope every object id and call frame id minted here starts with.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdEnvelope {
    injected_script_id: u32,
    #[serde(skip_serializing_if = "EngineKind::is_primary")]
    engine: EngineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ordinal: Option<usize>,
}

/// The part of an id the agent routes on. Everything past the context is
/// owned by the helper that minted the id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdHeader {
    injected_script_id: u32,
    #[serde(default)]
    engine: EngineKind,
}

impl ContextId {
    /// Creates a context id.
    #[must_use]
    pub const fn new(engine: EngineKind, id: u32) -> Self {
        Self { engine, id }
    }

    /// The engine that minted this id.
    #[must_use]
    pub const fn engine(self) -> EngineKind {
        self.engine
    }

    /// The engine-local part of the id.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.id
    }

    /// Builds the object id of the object bound under `bound_id` in this
    /// context.
    #[must_use]
    pub fn object_id(self, bound_id: u64) -> String {
        self.envelope(Some(bound_id), None)
    }

    /// Builds the id of the call frame at `ordinal` (0 is the top frame).
    #[must_use]
    pub fn call_frame_id(self, ordinal: usize) -> String {
        self.envelope(None, Some(ordinal))
    }

    /// Extracts the context id embedded in an object or call frame id.
    ///
    /// Returns `None` for anything that is not a JSON object carrying an
    /// `injectedScriptId`. Other members are left to the helper and not
    /// inspected.
    #[must_use]
    pub fn from_object_id(object_id: &str) -> Option<Self> {
        let header: IdHeader = serde_json::from_str(object_id).ok()?;
        Some(Self::new(header.engine, header.injected_script_id))
    }

    fn envelope(self, id: Option<u64>, ordinal: Option<usize>) -> String {
        let envelope = IdEnvelope {
            injected_script_id: self.id,
            engine: self.engine,
            id,
            ordinal,
        };
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.engine {
            EngineKind::Primary => write!(f, "{}", self.id),
            EngineKind::Secondary => write!(f, "secondary:{}", self.id),
        }
    }
}

/// Identity of a realm (a window or worker global), used to discard every
/// context of a navigated frame at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RealmId(pub u64);

/// Identity of one script global scope, minted by the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptState {
    id: u64,
    realm: RealmId,
}

impl ScriptState {
    /// Creates a script state handle.
    #[must_use]
    pub const fn new(id: u64, realm: RealmId) -> Self {
        Self { id, realm }
    }

    /// The embedder's identifier of this scope.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }

    /// The realm owning this scope.
    #[must_use]
    pub const fn realm(self) -> RealmId {
        self.realm
    }
}

/// Decides whether the inspector may touch a script state.
pub type InspectedStateAccessCheck = Rc<dyn Fn(&ScriptState) -> bool>;

/// How an evaluation result should be produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluateOptions<'a> {
    /// Group the resulting remote objects are attached to.
    pub object_group: &'a str,
    /// Expose the console command line API to the expression.
    pub include_command_line_api: bool,
    /// Return the result as a JSON value instead of a remote object.
    pub return_by_value: bool,
    /// Attach an object preview to the result.
    pub generate_preview: bool,
}

/// Which properties `getProperties` enumerates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyQuery {
    /// Skip properties inherited through the prototype chain.
    pub own_properties: bool,
    /// Only report getters and setters.
    pub accessor_properties_only: bool,
    /// Attach previews to object-valued properties.
    pub generate_preview: bool,
}

/// Engine-side marshaling helper living inside one execution context.
///
/// Every method answers with the raw helper result, or `None` if the helper
/// threw. Results are decoded by [`InjectedScript`]:
///
/// - evaluation methods answer `{"result": <RemoteObject>, "wasThrown": bool,
///   "exceptionDetails"?: ...}`;
/// - enumeration methods answer arrays of the matching protocol type;
/// - a string answer is always an error message meant for the front-end.
///
/// Object ids minted by a helper must be JSON objects whose `injectedScriptId`
/// (plus `engine`, for the secondary engine) is the [`ContextId`] the helper
/// was created with. [`ContextId::object_id`] builds such ids; any other
/// members are the helper's own business.
pub trait InjectedScriptSource {
    /// Evaluates `expression` in the global scope of the context.
    fn evaluate(&mut self, expression: &str, options: &EvaluateOptions<'_>) -> Option<ScriptValue>;

    /// Calls the function source `expression` with the object bound under
    /// `object_id` as receiver and the JSON encoded `arguments`.
    fn call_function_on(
        &mut self,
        object_id: &str,
        expression: &str,
        arguments: &str,
        options: &EvaluateOptions<'_>,
    ) -> Option<ScriptValue>;

    /// Evaluates `expression` in the scope of one paused call frame.
    fn evaluate_on_call_frame(
        &mut self,
        call_frames: &ScriptValue,
        async_call_stacks: &[ScriptValue],
        call_frame_id: &str,
        expression: &str,
        options: &EvaluateOptions<'_>,
    ) -> Option<ScriptValue>;

    /// Wraps `value` as a remote object and binds it to `group`.
    fn wrap_object(
        &mut self,
        value: &ScriptValue,
        group: &str,
        generate_preview: bool,
    ) -> Option<ScriptValue>;

    /// Wraps engine call frames as protocol call frames, tagging their ids
    /// with `async_ordinal`.
    fn wrap_call_frames(&mut self, call_frames: &ScriptValue, async_ordinal: usize)
    -> Option<ScriptValue>;

    /// Enumerates the properties of a bound object.
    fn get_properties(&mut self, object_id: &str, query: &PropertyQuery) -> Option<ScriptValue>;

    /// Enumerates the engine-internal properties of a bound object.
    fn get_internal_properties(&mut self, object_id: &str) -> Option<ScriptValue>;

    /// Lists the entries of a bound Map, Set or iterator.
    fn get_collection_entries(&mut self, object_id: &str) -> Option<ScriptValue>;

    /// Describes the location and scopes of a bound function.
    fn get_function_details(&mut self, function_id: &str) -> Option<ScriptValue>;

    /// Lists the call sites a step into could land on from a call frame.
    fn get_step_in_positions(
        &mut self,
        call_frames: &ScriptValue,
        call_frame_id: &str,
    ) -> Option<ScriptValue>;

    /// Assigns `new_value` (a JSON encoded call argument) to a variable of a
    /// call frame scope or of a function closure scope.
    fn set_variable_value(
        &mut self,
        call_frames: Option<&ScriptValue>,
        call_frame_id: Option<&str>,
        function_object_id: Option<&str>,
        scope_number: i32,
        variable_name: &str,
        new_value: &str,
    ) -> Option<ScriptValue>;

    /// Drops the frames above `call_frame_id` and restarts it.
    fn restart_frame(&mut self, call_frames: &ScriptValue, call_frame_id: &str)
    -> Option<ScriptValue>;

    /// Looks up the engine value bound under `object_id`.
    fn find_object_by_id(&mut self, object_id: &str) -> Option<ScriptValue>;

    /// Hands a node to the embedder's `inspect()` handler.
    fn inspect_node(&mut self, node: &ScriptValue);

    /// Unbinds one object id.
    fn release_object(&mut self, object_id: &str);

    /// Unbinds every object id of `group`.
    fn release_object_group(&mut self, group: &str);

    /// Returns `true` once the context this helper lives in is gone.
    fn is_detached(&self) -> bool;
}

/// Instantiates marshaling helpers on behalf of the manager.
pub trait InjectedScriptHost {
    /// Creates the helper for `state`, which will be known as `id`.
    ///
    /// Returns `None` if the engine could not instantiate it.
    fn create_injected_script(
        &mut self,
        state: &ScriptState,
        id: ContextId,
    ) -> Option<Box<dyn InjectedScriptSource>>;
}
