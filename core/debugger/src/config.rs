//! Agent tunables.

use serde::{Deserialize, Serialize};

/// Tunables of the debugger agent and its injected scripts.
///
/// Every field has a default, so hosts only need to spell out what they change:
///
/// ```
/// use inspector_debugger::AgentConfig;
///
/// let config: AgentConfig = serde_json::from_str(r#"{"maxSkipStepInCount": 5}"#).unwrap();
/// assert_eq!(config.max_skip_step_in_count, 5);
/// assert_eq!(config.max_json_depth, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    /// Number of step-ins spent inside framework code before forcing a step out.
    pub max_skip_step_in_count: u32,
    /// Maximum nesting accepted when marshaling an engine value to JSON.
    pub max_json_depth: usize,
    /// Upper bound for `setAsyncCallStackDepth`.
    pub max_async_call_stack_depth: u32,
    /// Object group holding the exception and frames of the current pause.
    pub backtrace_object_group: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_skip_step_in_count: 20,
            max_json_depth: 1000,
            max_async_call_stack_depth: 32,
            backtrace_object_group: "backtrace".to_string(),
        }
    }
}
