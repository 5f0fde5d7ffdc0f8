//! Breakpoint identity, persistence and resolution.
//!
//! A logical breakpoint is what the front-end sees. It resolves to one engine
//! breakpoint per matching script, so the agent keeps both directions of the
//! mapping: logical id to engine ids for removal, engine id to logical id for
//! reporting hits.

use super::{DebuggerAgent, ScriptBreakpoint, ScriptDebugServer, keys};
use crate::error::{AgentError, AgentResult};
use crate::state::JsonObject;
use inspector_protocol::{Location, SetBreakpointByUrlParams, SetBreakpointByUrlResult, SetBreakpointResult};
use log::{debug, trace, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who asked for a breakpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BreakpointSource {
    /// Set from the front-end.
    #[default]
    User,
    /// Set by the console `debug(fn)` command.
    DebugCommand,
    /// Set by the console `monitor(fn)` command.
    MonitorCommand,
}

/// A persisted url breakpoint, as stored under `javaScriptBreakpoints`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BreakpointCookie {
    pub(crate) url: String,
    pub(crate) line_number: i32,
    pub(crate) column_number: i32,
    #[serde(default)]
    pub(crate) condition: String,
    #[serde(default)]
    pub(crate) is_regex: bool,
    #[serde(default)]
    pub(crate) is_anti: bool,
}

/// Builds the id of a url breakpoint. Identical requests get identical ids.
pub(crate) fn url_breakpoint_id(url: &str, is_regex: bool, line_number: i32, column_number: i32) -> String {
    if is_regex {
        format!("/{url}/:{line_number}:{column_number}")
    } else {
        format!("{url}:{line_number}:{column_number}")
    }
}

/// Builds the id of a breakpoint set at a script location.
pub(crate) fn script_breakpoint_id(
    script_id: &str,
    line_number: i32,
    column_number: i32,
    source: BreakpointSource,
) -> String {
    match source {
        BreakpointSource::User => format!("{script_id}:{line_number}:{column_number}"),
        BreakpointSource::DebugCommand => format!("{script_id}:{line_number}:{column_number}:debug"),
        BreakpointSource::MonitorCommand => {
            format!("{script_id}:{line_number}:{column_number}:monitor")
        }
    }
}

/// A persisted url breakpoint with its url pattern compiled once.
#[derive(Debug, Clone)]
pub(crate) struct UrlBreakpoint {
    pub(crate) id: String,
    pub(crate) cookie: BreakpointCookie,
    regex: Option<Regex>,
}

impl UrlBreakpoint {
    pub(crate) fn new(id: String, cookie: BreakpointCookie) -> Self {
        let regex = if cookie.is_regex {
            Regex::new(&cookie.url).ok()
        } else {
            None
        };
        Self { id, cookie, regex }
    }

    /// Matches a script url, literally or as a regex. A pattern that does not
    /// compile matches nothing.
    pub(crate) fn matches(&self, url: &str) -> bool {
        if self.cookie.is_regex {
            self.regex.as_ref().is_some_and(|regex| regex.is_match(url))
        } else {
            url == self.cookie.url
        }
    }
}

/// Compiles the persisted url breakpoints, ordered by id. Malformed entries
/// are skipped.
pub(crate) fn load_url_breakpoints(cookies: JsonObject) -> Vec<UrlBreakpoint> {
    cookies
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value(value) {
            Ok(cookie) => Some(UrlBreakpoint::new(id, cookie)),
            Err(err) => {
                warn!("ignoring malformed persisted breakpoint {id}: {err}");
                None
            }
        })
        .collect()
}

/// A location as sent by the front-end.
struct RequestedLocation {
    script_id: String,
    line_number: i32,
    column_number: i32,
}

fn parse_location(location: &Value) -> AgentResult<RequestedLocation> {
    let number = |key: &str| {
        location
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|n| i32::try_from(n).ok())
    };
    let (Some(script_id), Some(line_number)) = (
        location.get("scriptId").and_then(Value::as_str),
        number("lineNumber"),
    ) else {
        return Err(AgentError::InvalidLocation);
    };
    Ok(RequestedLocation {
        script_id: script_id.to_string(),
        line_number,
        column_number: number("columnNumber").unwrap_or(0),
    })
}

impl<S: ScriptDebugServer> DebuggerAgent<S> {
    /// `Debugger.setBreakpointByUrl`.
    ///
    /// The breakpoint is persisted before it is resolved, so it survives even
    /// if no loaded script matches yet. Anti-breakpoints are persisted only.
    ///
    /// # Errors
    ///
    /// Fails if not exactly one of `url` and `urlRegex` is given, on a negative
    /// column, or if the same breakpoint already exists.
    pub fn set_breakpoint_by_url(
        &mut self,
        params: &SetBreakpointByUrlParams,
    ) -> AgentResult<SetBreakpointByUrlResult> {
        let (url, is_regex) = match (&params.url, &params.url_regex) {
            (Some(url), None) => (url.as_str(), false),
            (None, Some(regex)) => (regex.as_str(), true),
            _ => return Err(AgentError::UrlOrRegexRequired),
        };
        let is_anti = params.is_anti_breakpoint.unwrap_or(false);
        let column_number = match params.column_number {
            Some(column) if column < 0 => return Err(AgentError::InvalidColumn),
            Some(column) => column,
            None if is_anti => -1,
            None => 0,
        };
        let condition = params.condition.clone().unwrap_or_default();

        let breakpoint_id = url_breakpoint_id(url, is_regex, params.line_number, column_number);
        let mut cookies = self.state.get_object(keys::JAVASCRIPT_BREAKPOINTS);
        if cookies.contains_key(&breakpoint_id) {
            return Err(AgentError::DuplicateBreakpoint);
        }
        let cookie = BreakpointCookie {
            url: url.to_string(),
            line_number: params.line_number,
            column_number,
            condition: condition.clone(),
            is_regex,
            is_anti,
        };
        let url_breakpoint = UrlBreakpoint::new(breakpoint_id.clone(), cookie.clone());
        let cookie = serde_json::to_value(cookie).map_err(|_| AgentError::Internal)?;
        cookies.insert(breakpoint_id.clone(), cookie);
        self.store_breakpoint_cookies(cookies);
        debug!("breakpoint {breakpoint_id} persisted");

        let mut locations = Vec::new();
        if !is_anti {
            let breakpoint = ScriptBreakpoint::new(params.line_number, column_number, condition);
            let script_ids: Vec<String> = self
                .scripts
                .iter()
                .filter(|(_, script)| url_breakpoint.matches(script.url()))
                .map(|(id, _)| id.clone())
                .collect();
            for script_id in script_ids {
                if let Some(location) = self.resolve_breakpoint(
                    &breakpoint_id,
                    &script_id,
                    &breakpoint,
                    BreakpointSource::User,
                ) {
                    locations.push(location);
                }
            }
        }
        Ok(SetBreakpointByUrlResult {
            breakpoint_id,
            locations,
        })
    }

    /// `Debugger.setBreakpoint`: a breakpoint in one script, not persisted.
    ///
    /// # Errors
    ///
    /// Fails on a malformed location, a duplicate, or if the engine could not
    /// place the breakpoint.
    pub fn set_breakpoint(
        &mut self,
        location: &Value,
        condition: Option<&str>,
    ) -> AgentResult<SetBreakpointResult> {
        let location = parse_location(location)?;
        let breakpoint_id = script_breakpoint_id(
            &location.script_id,
            location.line_number,
            location.column_number,
            BreakpointSource::User,
        );
        if self.breakpoint_id_to_server_ids.contains_key(&breakpoint_id) {
            return Err(AgentError::DuplicateBreakpoint);
        }
        let breakpoint = ScriptBreakpoint::new(
            location.line_number,
            location.column_number,
            condition.unwrap_or_default(),
        );
        let actual_location = self
            .resolve_breakpoint(
                &breakpoint_id,
                &location.script_id,
                &breakpoint,
                BreakpointSource::User,
            )
            .ok_or(AgentError::CouldNotResolve)?;
        Ok(SetBreakpointResult {
            breakpoint_id,
            actual_location,
        })
    }

    /// `Debugger.removeBreakpoint`. Unknown ids are ignored.
    pub fn remove_breakpoint(&mut self, breakpoint_id: &str) {
        let mut cookies = self.state.get_object(keys::JAVASCRIPT_BREAKPOINTS);
        let mut is_anti = false;
        if let Some(cookie) = cookies.remove(breakpoint_id) {
            is_anti = cookie
                .get("isAnti")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            self.store_breakpoint_cookies(cookies);
        }
        if !is_anti {
            self.remove_resolved_breakpoint(breakpoint_id);
        }
    }

    /// Persists the url breakpoints and refreshes their compiled form.
    pub(super) fn store_breakpoint_cookies(&mut self, cookies: JsonObject) {
        self.url_breakpoints = load_url_breakpoints(cookies.clone());
        self.state.set_object(keys::JAVASCRIPT_BREAKPOINTS, cookies);
    }

    fn remove_resolved_breakpoint(&mut self, breakpoint_id: &str) {
        let Some(server_ids) = self.breakpoint_id_to_server_ids.shift_remove(breakpoint_id) else {
            return;
        };
        debug!("removing breakpoint {breakpoint_id} ({} engine breakpoints)", server_ids.len());
        for server_id in server_ids {
            self.server.remove_breakpoint(&server_id);
            self.server_breakpoints.remove(&server_id);
        }
    }

    /// `Debugger.continueToLocation`: resumes until `location` is reached.
    ///
    /// Any earlier one-shot breakpoint is dropped first; the new one is
    /// removed by the next surfaced pause.
    ///
    /// # Errors
    ///
    /// Fails if not paused or on a malformed location.
    pub fn continue_to_location(
        &mut self,
        location: &Value,
        interstatement_location: bool,
    ) -> AgentResult<()> {
        self.assert_paused()?;
        if let Some(id) = self.continue_to_location_breakpoint_id.take() {
            self.server.remove_breakpoint(&id);
        }
        let location = parse_location(location)?;
        let breakpoint = ScriptBreakpoint::new(location.line_number, location.column_number, "");
        self.continue_to_location_breakpoint_id = self
            .server
            .set_breakpoint(&location.script_id, &breakpoint, interstatement_location)
            .map(|resolved| resolved.id);
        self.resume()
    }

    /// Installs a breakpoint at the start of a function, for the console
    /// `debug(fn)` and `monitor(fn)` commands.
    ///
    /// Returns the resolved location, or `None` if the engine could not place
    /// the breakpoint or it was already set.
    ///
    /// # Errors
    ///
    /// Fails if the function object id cannot be resolved.
    pub fn set_breakpoint_at_function(
        &mut self,
        function_object_id: &str,
        source: BreakpointSource,
        condition: &str,
    ) -> AgentResult<Option<Location>> {
        let location = self.get_function_details(function_object_id)?.location;
        let column_number = location.column_number.unwrap_or(0);
        let breakpoint_id =
            script_breakpoint_id(&location.script_id, location.line_number, column_number, source);
        if self.breakpoint_id_to_server_ids.contains_key(&breakpoint_id) {
            return Ok(None);
        }
        let breakpoint = ScriptBreakpoint::new(location.line_number, column_number, condition);
        Ok(self.resolve_breakpoint(&breakpoint_id, &location.script_id, &breakpoint, source))
    }

    /// Removes a breakpoint installed by [`set_breakpoint_at_function`](Self::set_breakpoint_at_function).
    ///
    /// # Errors
    ///
    /// Fails if the function object id cannot be resolved.
    pub fn remove_breakpoint_at_function(
        &mut self,
        function_object_id: &str,
        source: BreakpointSource,
    ) -> AgentResult<()> {
        let location = self.get_function_details(function_object_id)?.location;
        let breakpoint_id = script_breakpoint_id(
            &location.script_id,
            location.line_number,
            location.column_number.unwrap_or(0),
            source,
        );
        self.remove_resolved_breakpoint(&breakpoint_id);
        Ok(())
    }

    /// Installs `breakpoint` in one script on behalf of `breakpoint_id`.
    ///
    /// Returns `None`, without error, for unknown scripts and lines outside
    /// the script: those may still resolve later.
    pub(super) fn resolve_breakpoint(
        &mut self,
        breakpoint_id: &str,
        script_id: &str,
        breakpoint: &ScriptBreakpoint,
        source: BreakpointSource,
    ) -> Option<Location> {
        let script = self.scripts.get(script_id)?;
        if breakpoint.line_number < script.start_line || script.end_line < breakpoint.line_number {
            trace!("breakpoint {breakpoint_id} is outside script {script_id}");
            return None;
        }
        let resolved = self.server.set_breakpoint(script_id, breakpoint, false)?;
        debug!(
            "breakpoint {breakpoint_id} resolved in script {script_id} at {}:{}",
            resolved.line_number, resolved.column_number
        );
        self.server_breakpoints
            .insert(resolved.id.clone(), (breakpoint_id.to_string(), source));
        self.breakpoint_id_to_server_ids
            .entry(breakpoint_id.to_string())
            .or_default()
            .push(resolved.id);
        Some(Location {
            script_id: script_id.to_string(),
            line_number: resolved.line_number,
            column_number: Some(resolved.column_number),
        })
    }
}
