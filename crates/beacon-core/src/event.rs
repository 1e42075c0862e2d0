//! Lifecycle events delivered by the assistant's hook pipeline.
//!
//! One JSON record per hook invocation, discriminated by `hook_event_name`.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::BeaconError;

/// Fields every hook record carries.
#[derive(Debug, Clone, Deserialize)]
pub struct EventCommon {
    pub session_id: String,
    pub transcript_path: String,
    #[serde(default)]
    pub cwd: String,
}

/// The assistant finished a turn.
#[derive(Debug, Clone, Deserialize)]
pub struct StoppedEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    /// True when this stop was itself triggered by a stop hook.
    #[serde(default)]
    pub stop_hook_active: bool,
    #[serde(default)]
    pub last_assistant_message: String,
}

/// A tool call failed.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolFailedEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Map<String, Value>,
    #[serde(default)]
    pub error: String,
}

/// The assistant is asking the operator for permission to use a tool.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRequestedEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "hook_event_name")]
pub enum LifecycleEvent {
    #[serde(rename = "Stop")]
    Stopped(StoppedEvent),
    #[serde(rename = "PostToolUseFailure")]
    ToolFailed(ToolFailedEvent),
    #[serde(rename = "PermissionRequest")]
    PermissionRequested(PermissionRequestedEvent),
    /// Any hook kind this bridge does not handle.
    #[serde(other)]
    Unknown,
}

impl LifecycleEvent {
    /// Parse one hook record.
    pub fn parse(raw: &str) -> Result<Self, BeaconError> {
        serde_json::from_str(raw.trim()).map_err(|e| BeaconError::Event(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stopped(_) => "Stop",
            Self::ToolFailed(_) => "PostToolUseFailure",
            Self::PermissionRequested(_) => "PermissionRequest",
            Self::Unknown => "unknown",
        }
    }
}
