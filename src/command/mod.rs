// src/command/mod.rs

//! Edit commands and the command variant registry.
//!
//! A job carries an ordered list of commands; each command is one atomic
//! edit operation (set/fill/replace/paste/clone). The wire form is an
//! opaque `{type, params}` payload; [`registry`] resolves payloads into
//! validated [`Command`]s at admission time. Unknown command types and
//! missing params fail there, never during a run.

pub mod registry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use registry::Command;

/// The fixed set of command variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    SetBlock,
    Fill,
    Replace,
    PasteBlueprint,
    Clone,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::SetBlock => "setBlock",
            CommandKind::Fill => "fill",
            CommandKind::Replace => "replace",
            CommandKind::PasteBlueprint => "pasteBlueprint",
            CommandKind::Clone => "clone",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setBlock" => Ok(CommandKind::SetBlock),
            "fill" => Ok(CommandKind::Fill),
            "replace" => Ok(CommandKind::Replace),
            "pasteBlueprint" => Ok(CommandKind::PasteBlueprint),
            "clone" => Ok(CommandKind::Clone),
            other => Err(format!("unknown command type: {other}")),
        }
    }
}

/// Wire form of a command, as submitted by the control layer.
///
/// `params` is kept opaque here; the registry validates the fields each
/// variant actually needs and the raw map is retained for auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPayload {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl CommandPayload {
    pub fn new(kind: impl Into<String>, params: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// Read-only execution context passed to the executor for every
/// `apply`/`revert` call of a run. Constructed once per job run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandContext {
    pub world_id: String,
    pub estimated_blocks: u64,
}
