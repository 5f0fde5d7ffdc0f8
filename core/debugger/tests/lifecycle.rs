//! Lifecycle tests
//!
//! Enable/disable, persistence through the state cookie, restore after a
//! reload, and what the agent reports for parsed scripts.

mod common;

use common::{Harness, PAGE, call_stack};
use inspector_debugger::{
    CompileResult, DebuggerAgentListener, PauseOnExceptionsState, RealmId, Script, ScriptValue,
    SourceMapUrlResolver,
};
use inspector_protocol::events::ScriptParsedEvent;
use inspector_protocol::{DebuggerEvent, SetBreakpointByUrlParams};
use indoc::indoc;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use test_case::test_case;

fn persisted(harness: &Harness) -> Value {
    let cookie: Value = serde_json::from_str(&harness.composite.to_cookie()).unwrap();
    cookie["debugger"].clone()
}

fn parsed(harness: &Harness) -> ScriptParsedEvent {
    match harness.take_events().pop() {
        Some(DebuggerEvent::ScriptParsed(event) | DebuggerEvent::ScriptFailedToParse(event)) => {
            event
        }
        other => panic!("expected a parse event, got {other:?}"),
    }
}

#[derive(Default)]
struct RecordingListener(Rc<RefCell<Vec<&'static str>>>);

impl DebuggerAgentListener for RecordingListener {
    fn debugger_was_enabled(&mut self) {
        self.0.borrow_mut().push("enabled");
    }

    fn debugger_was_disabled(&mut self) {
        self.0.borrow_mut().push("disabled");
    }

    fn step_into(&mut self) {
        self.0.borrow_mut().push("stepInto");
    }

    fn did_pause(&mut self) {
        self.0.borrow_mut().push("didPause");
    }
}

struct HeaderSourceMaps;

impl SourceMapUrlResolver for HeaderSourceMaps {
    fn resource_source_map_url(&self, url: &str) -> Option<String> {
        Some(format!("{url}.map"))
    }
}

#[test]
fn test_enable_is_idempotent_and_persisted() {
    let mut harness = Harness::new();
    assert!(!harness.agent.enabled());

    harness.agent.enable();
    harness.agent.enable();

    assert!(harness.agent.enabled());
    assert_eq!(harness.agent.server().calls_matching("startListening").len(), 1);
    assert!(harness.agent.server().breakpoints_active);
    assert_eq!(persisted(&harness)["debuggerEnabled"], json!(true));
    assert!(!harness.cookies.borrow().is_empty());
}

#[test]
fn test_disable_forgets_everything() {
    let mut harness = Harness::enabled();
    harness.parse_script("1", "http://a/app.js", 10);
    let params = SetBreakpointByUrlParams {
        line_number: 2,
        url: Some("http://a/app.js".to_string()),
        ..SetBreakpointByUrlParams::default()
    };
    harness.agent.set_breakpoint_by_url(&params).unwrap();
    harness.agent.set_pause_on_exceptions("all").unwrap();
    harness.agent.skip_stack_frames(Some("jquery")).unwrap();
    harness.agent.set_async_call_stack_depth(4);

    harness.agent.disable();

    assert!(!harness.agent.enabled());
    assert!(harness.agent.script("1").is_none());
    assert!(harness.agent.server().installed.is_empty());
    assert!(!harness.agent.server().listening);
    assert_eq!(
        persisted(&harness),
        json!({
            "debuggerEnabled": false,
            "javaScriptBreakpoints": {},
            "pauseOnExceptionsState": 0,
            "skipStackPattern": "",
            "asyncCallStackDepth": 0
        })
    );
}

#[test]
fn test_disable_while_disabled_does_nothing() {
    let mut harness = Harness::new();
    harness.agent.disable();
    assert!(harness.agent.server().calls.is_empty());
    assert!(harness.cookies.borrow().is_empty());
}

#[test]
fn test_detaching_the_front_end_disables() {
    let mut harness = Harness::enabled();
    harness.agent.clear_frontend();
    assert!(!harness.agent.enabled());
    assert_eq!(harness.agent.server().calls_matching("stopListening").len(), 1);
}

#[test]
fn test_listener_sees_lifecycle() {
    let mut harness = Harness::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    harness
        .agent
        .set_listener(Some(Box::new(RecordingListener(Rc::clone(&seen)))));
    harness.parse_script("1", "http://a/app.js", 10);

    harness.agent.enable();
    harness
        .agent
        .did_pause(PAGE, call_stack(&[("1", 1, 0)]), &ScriptValue::Empty, &[])
        .unwrap();
    harness.agent.step_into().unwrap();
    harness.agent.disable();

    assert_eq!(*seen.borrow(), ["enabled", "didPause", "stepInto", "disabled"]);
}

#[test]
fn test_restore_after_reload() {
    let mut before = Harness::enabled();
    let params = SetBreakpointByUrlParams {
        line_number: 4,
        url: Some("http://a/app.js".to_string()),
        ..SetBreakpointByUrlParams::default()
    };
    before.agent.set_breakpoint_by_url(&params).unwrap();
    before.agent.set_pause_on_exceptions("uncaught").unwrap();
    before.agent.skip_stack_frames(Some("vendor")).unwrap();
    before.agent.set_async_call_stack_depth(6);
    let cookie = before.cookies.borrow().last().cloned().unwrap();

    let mut after = Harness::from_cookie(&cookie);
    after.agent.restore();

    assert!(after.agent.enabled());
    assert_eq!(after.event_methods(), ["Debugger.globalObjectCleared"]);
    let server = after.agent.server();
    assert!(server.listening);
    assert_eq!(server.pause_on_exceptions, PauseOnExceptionsState::PauseOnUncaught);

    after.parse_script("9", "http://a/app.js", 20);
    assert_eq!(
        after.event_methods(),
        ["Debugger.scriptParsed", "Debugger.breakpointResolved"]
    );
    assert_eq!(persisted(&after)["asyncCallStackDepth"], json!(6));
    assert_eq!(persisted(&after)["skipStackPattern"], json!("vendor"));
}

#[test]
fn test_restore_of_a_disabled_agent_does_nothing() {
    let mut harness = Harness::from_cookie(r#"{"debugger": {"debuggerEnabled": false}}"#);
    harness.agent.restore();
    assert!(harness.agent.server().calls.is_empty());
    assert!(harness.take_events().is_empty());
}

#[test_case(true, false ; "expires on reload")]
#[test_case(false, true ; "survives reload")]
fn test_skip_all_pauses_across_reload(until_reload: bool, still_skipping: bool) {
    let mut before = Harness::enabled();
    before.agent.set_skip_all_pauses(true, until_reload);
    let cookie = before.composite.to_cookie();

    let mut after = Harness::from_cookie(&cookie);
    after.agent.restore();

    assert_eq!(after.agent.skip_all_pauses(), still_skipping);
    assert_eq!(persisted(&after)["skipAllPauses"], json!(still_skipping));
}

#[test_case(3, 3 ; "within bounds")]
#[test_case(100, 32 ; "clamped to the maximum")]
#[test_case(-5, 0 ; "negative turns async stacks off")]
fn test_async_call_stack_depth_is_clamped(requested: i32, stored: i64) {
    let mut harness = Harness::enabled();
    harness.agent.set_async_call_stack_depth(requested);
    assert_eq!(persisted(&harness)["asyncCallStackDepth"], json!(stored));
}

#[test]
fn test_navigation_discards_the_old_window() {
    let mut harness = Harness::enabled();
    harness.parse_script("1", "http://a/app.js", 10);
    harness.agent.injected_script_manager_mut().injected_script_for(&PAGE).unwrap();

    harness.agent.did_clear_main_frame_window_object(RealmId(1));

    assert!(harness.agent.injected_script_manager().is_empty());
    assert!(harness.agent.script("1").is_none());
    assert_eq!(harness.event_methods().last(), Some(&"Debugger.globalObjectCleared"));
}

#[test]
fn test_source_url_comment_names_the_script() {
    let mut harness = Harness::enabled();
    let script = Script {
        source: indoc! {"
            function generated() {}
            //# sourceURL=generated/widget.js
        "}
        .to_string(),
        end_line: 2,
        ..Script::default()
    };
    harness
        .agent
        .did_parse_source("4", script, CompileResult::Success);

    let event = parsed(&harness);
    assert_eq!(event.url, "generated/widget.js");
    assert_eq!(event.has_source_url, Some(true));
    assert_eq!(event.source_map_url, None);
    assert_eq!(harness.agent.script("4").map(Script::url), Some("generated/widget.js"));
}

#[test]
fn test_inline_scripts_ignore_source_url() {
    let mut harness = Harness::enabled();
    let script = Script {
        url: "http://a/index.html".to_string(),
        source_url: "ignored.js".to_string(),
        start_line: 12,
        end_line: 14,
        ..Script::default()
    };
    harness
        .agent
        .did_parse_source("5", script, CompileResult::Success);

    let event = parsed(&harness);
    assert_eq!(event.url, "http://a/index.html");
    assert_eq!(event.has_source_url, None);
    assert_eq!(event.start_line, 12);
}

#[test]
fn test_source_map_url_sources() {
    let mut harness = Harness::enabled();
    harness
        .agent
        .set_source_map_url_resolver(Some(Box::new(HeaderSourceMaps)));

    let from_header = Script {
        url: "http://a/app.js".to_string(),
        ..Script::default()
    };
    harness
        .agent
        .did_parse_source("1", from_header, CompileResult::Success);
    assert_eq!(parsed(&harness).source_map_url.as_deref(), Some("http://a/app.js.map"));

    let from_engine = Script {
        url: "http://a/lib.js".to_string(),
        source_mapping_url: "lib.js.map".to_string(),
        ..Script::default()
    };
    harness
        .agent
        .did_parse_source("2", from_engine, CompileResult::Success);
    assert_eq!(parsed(&harness).source_map_url.as_deref(), Some("lib.js.map"));

    let broken = Script {
        url: "http://a/broken.js".to_string(),
        source: "function (\n//# sourceMappingURL=broken.js.map\n".to_string(),
        ..Script::default()
    };
    harness
        .agent
        .did_parse_source("3", broken, CompileResult::Error);
    let events = harness.take_events();
    assert_eq!(events.len(), 1);
    let DebuggerEvent::ScriptFailedToParse(event) = &events[0] else {
        panic!("expected scriptFailedToParse, got {events:?}");
    };
    assert_eq!(event.source_map_url.as_deref(), Some("broken.js.map"));
}

#[test]
fn test_content_scripts_are_flagged() {
    let mut harness = Harness::enabled();
    let script = Script {
        url: "chrome-extension://x/content.js".to_string(),
        is_content_script: true,
        ..Script::default()
    };
    harness
        .agent
        .did_parse_source("8", script, CompileResult::Success);

    let event = serde_json::to_value(parsed(&harness)).unwrap();
    assert_eq!(event["isContentScript"], json!(true));
    assert_eq!(event["scriptId"], json!("8"));
}
