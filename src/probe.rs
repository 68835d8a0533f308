//! Environment probing for the tool-availability notice.

use crate::constants::{COMMON_TOOLS, LANGUAGE_TOOLS};
use log::debug;
use serde::Serialize;

/// Answers whether a command line tool can be found on this machine.
pub trait ToolProbe {
    fn is_available(&self, tool: &str) -> bool;
}

/// Looks tools up on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn is_available(&self, tool: &str) -> bool {
        let found = which::which(tool).is_ok();
        debug!("Probed tool '{}': {}", tool, if found { "found" } else { "missing" });
        found
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
}

/// Tools a project in `language` is expected to need, common tools first.
pub fn required_tools(language: Option<&str>) -> Vec<&'static str> {
    let mut tools: Vec<&'static str> = COMMON_TOOLS.to_vec();
    if let Some(language) = language {
        if let Some((_, specific)) = LANGUAGE_TOOLS.iter().find(|(l, _)| *l == language) {
            tools.extend(specific.iter().copied());
        }
    }
    tools
}

pub fn probe_tools(probe: &dyn ToolProbe, tools: &[&str]) -> Vec<ToolStatus> {
    tools
        .iter()
        .map(|tool| ToolStatus { name: tool.to_string(), available: probe.is_available(tool) })
        .collect()
}

/// Markdown notice listing missing tools, or `None` when everything is installed.
pub fn tool_notice(statuses: &[ToolStatus]) -> Option<String> {
    let missing: Vec<&str> =
        statuses.iter().filter(|s| !s.available).map(|s| s.name.as_str()).collect();
    if missing.is_empty() {
        return None;
    }
    Some(format!(
        "> **Note:** the following tools were not found on this machine: {}. Install them before running the setup commands.",
        missing.iter().map(|t| format!("`{t}`")).collect::<Vec<_>>().join(", ")
    ))
}
