use super::{
    ContextId, EngineKind, InjectedScript, InjectedScriptHost, InspectedStateAccessCheck,
    RealmId, ScriptState,
};
use indexmap::IndexMap;
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Owns the injected scripts of one engine and the ids of their contexts.
///
/// Ids are minted from a counter that starts at 1 and is never reset, so an
/// id is never reused within a session even after its context is discarded.
pub struct InjectedScriptManager {
    engine: EngineKind,
    next_id: u32,
    state_to_id: IndexMap<ScriptState, ContextId>,
    id_to_injected_script: FxHashMap<ContextId, InjectedScript>,
    host: Box<dyn InjectedScriptHost>,
    access_check: InspectedStateAccessCheck,
    max_json_depth: usize,
}

impl InjectedScriptManager {
    /// Creates a manager for the primary engine.
    #[must_use]
    pub fn new(
        host: Box<dyn InjectedScriptHost>,
        access_check: InspectedStateAccessCheck,
        max_json_depth: usize,
    ) -> Self {
        Self::for_engine(EngineKind::Primary, host, access_check, max_json_depth)
    }

    /// Creates a manager whose ids are tagged with `engine`.
    #[must_use]
    pub fn for_engine(
        engine: EngineKind,
        host: Box<dyn InjectedScriptHost>,
        access_check: InspectedStateAccessCheck,
        max_json_depth: usize,
    ) -> Self {
        Self {
            engine,
            next_id: 1,
            state_to_id: IndexMap::new(),
            id_to_injected_script: FxHashMap::default(),
            host,
            access_check,
            max_json_depth,
        }
    }

    /// Returns the id of `state`, minting one on first sight.
    pub fn injected_script_id_for(&mut self, state: &ScriptState) -> ContextId {
        if let Some(id) = self.state_to_id.get(state) {
            return *id;
        }
        let id = ContextId::new(self.engine, self.next_id);
        self.next_id += 1;
        self.state_to_id.insert(*state, id);
        id
    }

    /// Returns the injected script of `state`, creating it if needed.
    ///
    /// Returns `None` if the inspector may not access `state` or the host
    /// failed to instantiate the helper.
    pub fn injected_script_for(&mut self, state: &ScriptState) -> Option<&mut InjectedScript> {
        if let Some(id) = self.state_to_id.get(state).copied() {
            if self.id_to_injected_script.contains_key(&id) {
                return self.id_to_injected_script.get_mut(&id);
            }
        }
        if !(self.access_check)(state) {
            debug!("access to script state {} denied", state.id());
            return None;
        }
        let id = self.injected_script_id_for(state);
        let Some(source) = self.host.create_injected_script(state, id) else {
            warn!("failed to create injected script for context {id}");
            return None;
        };
        let script = InjectedScript::new(
            id,
            *state,
            source,
            Rc::clone(&self.access_check),
            self.max_json_depth,
        );
        Some(self.id_to_injected_script.entry(id).or_insert(script))
    }

    /// Returns the injected script registered under `id`.
    ///
    /// A context whose id was minted but whose script was never created gets
    /// its script created on demand.
    pub fn injected_script_for_id(&mut self, id: ContextId) -> Option<&mut InjectedScript> {
        if self.id_to_injected_script.contains_key(&id) {
            return self.id_to_injected_script.get_mut(&id);
        }
        let state = self
            .state_to_id
            .iter()
            .find_map(|(state, known)| (*known == id).then_some(*state))?;
        self.injected_script_for(&state)
    }

    /// Returns the injected script named by the envelope of `object_id`,
    /// which may also be a call frame id.
    pub fn injected_script_for_object_id(&mut self, object_id: &str) -> Option<&mut InjectedScript> {
        let id = ContextId::from_object_id(object_id)?;
        if id.engine() != self.engine {
            return None;
        }
        self.id_to_injected_script.get_mut(&id)
    }

    /// Drops every injected script and forgets every context.
    pub fn discard_injected_scripts(&mut self) {
        debug!("discarding {} injected scripts", self.id_to_injected_script.len());
        self.id_to_injected_script.clear();
        self.state_to_id.clear();
    }

    /// Drops the injected scripts of every context living in `realm`.
    pub fn discard_injected_scripts_for(&mut self, realm: RealmId) {
        let scripts = &mut self.id_to_injected_script;
        self.state_to_id.retain(|state, id| {
            if state.realm() == realm {
                scripts.remove(id);
                false
            } else {
                true
            }
        });
    }

    /// Releases `group` in every context, then drops scripts whose context
    /// has gone away meanwhile.
    pub fn release_object_group(&mut self, group: &str) {
        let mut ids: Vec<ContextId> = self.id_to_injected_script.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids {
            if let Some(script) = self.id_to_injected_script.get_mut(id) {
                script.release_object_group(group);
            }
        }
        let dead: Vec<ContextId> = ids
            .into_iter()
            .filter(|id| {
                self.id_to_injected_script
                    .get(id)
                    .is_some_and(InjectedScript::has_no_value)
            })
            .collect();
        for id in dead {
            debug!("sweeping detached injected script {id}");
            self.id_to_injected_script.remove(&id);
            self.state_to_id.retain(|_, known| *known != id);
        }
    }

    /// Asks the embedder whether `state` may be inspected.
    #[must_use]
    pub fn can_access_inspected_state(&self, state: &ScriptState) -> bool {
        (self.access_check)(state)
    }

    /// The engine this manager mints ids for.
    #[must_use]
    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    /// Number of live injected scripts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_injected_script.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_injected_script.is_empty()
    }
}

impl fmt::Debug for InjectedScriptManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectedScriptManager")
            .field("engine", &self.engine)
            .field("next_id", &self.next_id)
            .field("contexts", &self.state_to_id.len())
            .field("scripts", &self.id_to_injected_script.len())
            .finish_non_exhaustive()
    }
}
