//! Injected script tests
//!
//! Exercises the manager together with a helper that keeps real object
//! groups, so lifetimes of wrapped objects can be observed.

mod common;

use common::{PAGE, PRIVILEGED, new_manager};
use inspector_debugger::{
    EvaluateOptions, InjectedScriptManager, PropertyQuery, RealmId, ScriptState, ScriptValue,
};
use serde_json::json;

const FRAME: ScriptState = ScriptState::new(3, RealmId(1));
const WORKER: ScriptState = ScriptState::new(4, RealmId(7));

fn wrap(
    manager: &mut InjectedScriptManager,
    state: &ScriptState,
    group: &str,
) -> String {
    manager
        .injected_script_for(state)
        .and_then(|script| {
            let value = ScriptValue::object([("n", ScriptValue::Number(1.0))]);
            script.wrap_object(&value, group, false)
        })
        .and_then(|object| object.object_id)
        .unwrap()
}

#[test]
fn test_one_script_per_context() {
    let (mut manager, helpers) = new_manager(1000);

    let first = manager.injected_script_for(&PAGE).unwrap().context_id();
    let again = manager.injected_script_for(&PAGE).unwrap().context_id();
    let other = manager.injected_script_for(&FRAME).unwrap().context_id();

    assert_eq!(first, again);
    assert_ne!(first, other);
    assert_eq!(helpers.borrow().len(), 2);
    assert_eq!(manager.injected_script_id_for(&PAGE), first);
}

#[test]
fn test_privileged_context_is_refused() {
    let (mut manager, helpers) = new_manager(1000);

    assert!(manager.injected_script_for(&PRIVILEGED).is_none());
    assert!(!manager.can_access_inspected_state(&PRIVILEGED));
    assert!(helpers.borrow().is_empty());
}

#[test]
fn test_releasing_a_group_reaches_every_context() {
    let (mut manager, helpers) = new_manager(1000);
    wrap(&mut manager, &PAGE, "console");
    wrap(&mut manager, &PAGE, "backtrace");
    wrap(&mut manager, &FRAME, "console");
    wrap(&mut manager, &WORKER, "console");

    manager.release_object_group("console");

    for helper in helpers.borrow().values() {
        let helper = helper.borrow();
        assert!(helper.groups().iter().all(|group| *group != "console"));
        assert_eq!(helper.released_groups, ["console"]);
    }
    assert_eq!(manager.len(), 3);
}

#[test]
fn test_detached_contexts_are_swept_on_release() {
    let (mut manager, helpers) = new_manager(1000);
    let page = manager.injected_script_for(&PAGE).unwrap().context_id();
    let frame = manager.injected_script_for(&FRAME).unwrap().context_id();
    helpers.borrow()[&frame].borrow_mut().detached = true;

    manager.release_object_group("console");

    assert_eq!(manager.len(), 1);
    assert!(manager.injected_script_for_id(page).is_some());
    assert!(helpers.borrow()[&frame].borrow().released_groups.is_empty());
}

#[test]
fn test_navigation_discards_only_the_old_realm() {
    let (mut manager, _) = new_manager(1000);
    let object_id = wrap(&mut manager, &PAGE, "console");
    wrap(&mut manager, &WORKER, "console");

    manager.discard_injected_scripts_for(RealmId(1));

    assert!(manager.injected_script_for_object_id(&object_id).is_none());
    assert_eq!(manager.len(), 1);
    // A new page context gets a fresh id.
    let reborn = manager.injected_script_for(&PAGE).unwrap().context_id();
    assert_eq!(reborn.id(), 3);
}

#[test]
fn test_evaluation_results_are_decoded() {
    let (mut manager, _) = new_manager(1000);
    let script = manager.injected_script_for(&PAGE).unwrap();
    let options = EvaluateOptions {
        object_group: "console",
        ..EvaluateOptions::default()
    };

    let result = script.evaluate("1 + 1", &options).unwrap();
    assert_eq!(result.result.type_, "string");
    assert_eq!(result.was_thrown, Some(false));
    assert!(result.exception_details.is_none());

    let object_id = script.context_id().object_id(404);
    let missing = script.get_properties(&object_id, &PropertyQuery::default());
    assert_eq!(
        missing.unwrap_err().to_string(),
        "Could not find object with given id"
    );
}

#[test]
fn test_properties_of_a_wrapped_object() {
    let (mut manager, _) = new_manager(1000);
    let object_id = wrap(&mut manager, &PAGE, "console");
    let script = manager.injected_script_for_object_id(&object_id).unwrap();

    let properties = script
        .get_properties(&object_id, &PropertyQuery { own_properties: true, ..PropertyQuery::default() })
        .unwrap();

    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].name, "answer");
    assert_eq!(properties[0].value.as_ref().and_then(|v| v.value.clone()), Some(json!(42)));
    assert!(script.get_internal_properties(&object_id).unwrap().is_empty());
}

#[test]
fn test_too_deep_results_become_a_message() {
    let (mut manager, _) = new_manager(0);
    let script = manager.injected_script_for(&PAGE).unwrap();

    let wrapped = script
        .wrap_object(&ScriptValue::Null, "console", false)
        .unwrap();
    assert_eq!(wrapped.type_, "string");
    assert_eq!(
        wrapped.description.as_deref(),
        Some("Object has too long reference chain(must not be longer than 0)")
    );
}
