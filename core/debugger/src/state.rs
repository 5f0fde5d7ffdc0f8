//! Persisted inspector state
//!
//! Agents keep the settings that must survive a reload (enabled flag,
//! breakpoints, pause modes) in an [`InspectorState`]. All agent states live as
//! sub-objects of one composite JSON object, serialized into an opaque cookie
//! string that the host stores across navigations.
//!
//! Every setter pushes the fresh cookie to the [`InspectorStateClient`]
//! synchronously, unless the composite state is muted.

use log::{trace, warn};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// JSON object type used for object-valued state entries.
pub type JsonObject = Map<String, Value>;

/// Receives the serialized state after every change.
pub trait InspectorStateClient {
    /// Stores `cookie` so that it can be handed back through
    /// [`InspectorCompositeState::load_from_cookie`] after a reload.
    fn update_inspector_state_cookie(&mut self, cookie: &str);
}

impl<F> InspectorStateClient for F
where
    F: FnMut(&str),
{
    fn update_inspector_state_cookie(&mut self, cookie: &str) {
        self(cookie);
    }
}

struct Composite {
    agents: BTreeMap<String, JsonObject>,
    client: Option<Box<dyn InspectorStateClient>>,
    mute_count: u32,
}

impl Composite {
    fn agent_object_mut(&mut self, agent: &str) -> &mut JsonObject {
        self.agents.entry(agent.to_string()).or_default()
    }

    fn agent_value(&self, agent: &str, key: &str) -> Option<&Value> {
        self.agents.get(agent)?.get(key)
    }

    fn cookie(&self) -> String {
        serde_json::to_string(&self.agents).unwrap_or_default()
    }

    /// Lends out the client together with the cookie it should receive, or
    /// `None` while muted or when there is no one to tell.
    fn take_update(&mut self) -> Option<(Box<dyn InspectorStateClient>, String)> {
        if self.mute_count > 0 {
            return None;
        }
        let client = self.client.take()?;
        Some((client, self.cookie()))
    }
}

/// Pushes the current cookie to the client with no borrow held, so the client
/// may read the state it is told about. Updates made from inside the client
/// are not echoed back to it.
fn state_updated(composite: &RefCell<Composite>) {
    let update = composite.borrow_mut().take_update();
    if let Some((mut client, cookie)) = update {
        trace!("inspector state cookie updated ({} bytes)", cookie.len());
        client.update_inspector_state_cookie(&cookie);
        let mut inner = composite.borrow_mut();
        if inner.client.is_none() {
            inner.client = Some(client);
        }
    }
}

/// The composite state shared by every agent of one inspector session.
#[derive(Clone)]
pub struct InspectorCompositeState {
    inner: Rc<RefCell<Composite>>,
}

impl InspectorCompositeState {
    /// Creates an empty composite state reporting to `client`.
    #[must_use]
    pub fn new(client: Option<Box<dyn InspectorStateClient>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Composite {
                agents: BTreeMap::new(),
                client,
                mute_count: 0,
            })),
        }
    }

    /// Returns the state of the agent called `agent_name`, creating its
    /// sub-object if needed.
    #[must_use]
    pub fn create_agent_state(&self, agent_name: &str) -> InspectorState {
        self.inner.borrow_mut().agent_object_mut(agent_name);
        InspectorState {
            agent: agent_name.to_string(),
            composite: self.inner.clone(),
        }
    }

    /// Replaces the whole state with the content of `cookie`.
    ///
    /// A cookie that is not an object of per-agent objects is ignored. No
    /// update is pushed to the client, since the client is where the cookie
    /// came from.
    pub fn load_from_cookie(&self, cookie: &str) {
        match serde_json::from_str::<BTreeMap<String, JsonObject>>(cookie) {
            Ok(agents) => self.inner.borrow_mut().agents = agents,
            Err(err) => warn!("ignoring malformed inspector state cookie: {err}"),
        }
    }

    /// Serializes the whole state.
    #[must_use]
    pub fn to_cookie(&self) -> String {
        self.inner.borrow().cookie()
    }

    /// Suppresses cookie updates until the matching [`unmute`](Self::unmute).
    pub fn mute(&self) {
        self.inner.borrow_mut().mute_count += 1;
    }

    /// Re-enables cookie updates and pushes the current state once the last
    /// mute is lifted.
    pub fn unmute(&self) {
        let unmuted = {
            let mut inner = self.inner.borrow_mut();
            inner.mute_count = inner.mute_count.saturating_sub(1);
            inner.mute_count == 0
        };
        if unmuted {
            state_updated(&self.inner);
        }
    }
}

impl fmt::Debug for InspectorCompositeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectorCompositeState")
            .field("cookie", &self.to_cookie())
            .finish_non_exhaustive()
    }
}

/// Key/value view onto one agent's sub-object of the composite state.
///
/// Getters return the type's default for missing or mistyped keys.
pub struct InspectorState {
    agent: String,
    composite: Rc<RefCell<Composite>>,
}

impl InspectorState {
    /// Name of the agent owning this state.
    #[must_use]
    pub fn agent_name(&self) -> &str {
        &self.agent
    }

    /// Reads a boolean entry.
    #[must_use]
    pub fn get_boolean(&self, key: &str) -> bool {
        self.composite
            .borrow()
            .agent_value(&self.agent, key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Reads a string entry.
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.composite
            .borrow()
            .agent_value(&self.agent, key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Reads an integer entry.
    #[must_use]
    pub fn get_long(&self, key: &str) -> i64 {
        self.composite
            .borrow()
            .agent_value(&self.agent, key)
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Returns a copy of an object-valued entry.
    #[must_use]
    pub fn get_object(&self, key: &str) -> JsonObject {
        self.composite
            .borrow()
            .agent_value(&self.agent, key)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Stores a boolean entry.
    pub fn set_boolean(&self, key: &str, value: bool) {
        self.set_value(key, Value::Bool(value));
    }

    /// Stores a string entry.
    pub fn set_string(&self, key: &str, value: &str) {
        self.set_value(key, Value::String(value.to_string()));
    }

    /// Stores an integer entry.
    pub fn set_long(&self, key: &str, value: i64) {
        self.set_value(key, Value::from(value));
    }

    /// Stores an object entry.
    pub fn set_object(&self, key: &str, value: JsonObject) {
        self.set_value(key, Value::Object(value));
    }

    /// Removes `key`; pushes an update only if it was present.
    pub fn remove(&self, key: &str) {
        let removed = self
            .composite
            .borrow_mut()
            .agent_object_mut(&self.agent)
            .remove(key)
            .is_some();
        if removed {
            state_updated(&self.composite);
        }
    }

    fn set_value(&self, key: &str, value: Value) {
        self.composite
            .borrow_mut()
            .agent_object_mut(&self.agent)
            .insert(key.to_string(), value);
        state_updated(&self.composite);
    }
}

impl fmt::Debug for InspectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InspectorState")
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}
