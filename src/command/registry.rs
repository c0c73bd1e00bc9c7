// src/command/registry.rs

//! Resolution of wire payloads into validated commands.
//!
//! One exhaustive match over [`CommandKind`] checks the params each variant
//! requires and computes its block contribution. This is the only place a
//! payload can be rejected; once a [`Command`] exists it is immutable and
//! guaranteed executable as far as the engine is concerned.

use serde_json::{Map, Value};

use crate::command::{CommandKind, CommandPayload};
use crate::errors::{CraftopsError, Result};

/// Default contribution for a blueprint paste whose size is not declared.
const PASTE_DEFAULT_BLOCKS: u64 = 10;

/// A validated command, fixed at job creation.
#[derive(Debug, Clone)]
pub struct Command {
    kind: CommandKind,
    params: Map<String, Value>,
    blocks: u64,
}

impl Command {
    /// Resolve a wire payload into a validated command.
    ///
    /// `index` is the position in the submitted list and only feeds error
    /// messages. Fails on unknown command types and missing or ill-typed
    /// required params.
    pub fn from_payload(index: usize, payload: &CommandPayload) -> Result<Self> {
        let kind: CommandKind = payload
            .kind
            .parse()
            .map_err(|_| CraftopsError::UnknownCommandType(payload.kind.clone()))?;

        let check = ParamCheck {
            index,
            kind,
            params: &payload.params,
        };

        let blocks = match kind {
            CommandKind::SetBlock => {
                check.require_int("x")?;
                check.require_int("y")?;
                check.require_int("z")?;
                check.require_str("block")?;
                1
            }
            CommandKind::Fill => {
                let from = check.require_vec3("from")?;
                let to = check.require_vec3("to")?;
                check.require_str("block")?;
                box_volume(from, to)
            }
            CommandKind::Replace => {
                let from = check.require_vec3("from")?;
                let to = check.require_vec3("to")?;
                check.require_str("match")?;
                check.require_str("block")?;
                box_volume(from, to)
            }
            CommandKind::PasteBlueprint => {
                check.require_str("blueprintId")?;
                check.require_vec3("origin")?;
                paste_blocks(&check)?
            }
            CommandKind::Clone => {
                let from = check.require_vec3("from")?;
                let to = check.require_vec3("to")?;
                check.require_vec3("dest")?;
                box_volume(from, to)
            }
        };

        Ok(Self {
            kind,
            params: payload.params.clone(),
            blocks,
        })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// The raw params map, as submitted. Retained for audit records.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Estimated number of blocks this command touches.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }
}

/// Inclusive volume of the axis-aligned box spanned by two corners.
fn box_volume(from: [i64; 3], to: [i64; 3]) -> u64 {
    (0..3)
        .map(|axis| (from[axis] - to[axis]).unsigned_abs() + 1)
        .product()
}

/// Blueprint pastes declare their footprint via `size`, fall back to a
/// `blocks` hint, and otherwise get a flat default.
fn paste_blocks(check: &ParamCheck<'_>) -> Result<u64> {
    if check.params.contains_key("size") {
        let size = check.require_vec3("size")?;
        if size.iter().any(|&d| d < 0) {
            return Err(check.invalid("size", "dimensions must be >= 0"));
        }
        return Ok(size.iter().map(|&d| d as u64).product());
    }
    if check.params.contains_key("blocks") {
        let blocks = check.require_int("blocks")?;
        if blocks < 0 {
            return Err(check.invalid("blocks", "must be >= 0"));
        }
        return Ok(blocks as u64);
    }
    Ok(PASTE_DEFAULT_BLOCKS)
}

/// Param extraction helpers carrying enough context for useful admission
/// errors.
struct ParamCheck<'a> {
    index: usize,
    kind: CommandKind,
    params: &'a Map<String, Value>,
}

impl ParamCheck<'_> {
    fn missing(&self, param: &str) -> CraftopsError {
        CraftopsError::MissingParam {
            index: self.index,
            kind: self.kind.as_str().to_string(),
            param: param.to_string(),
        }
    }

    fn invalid(&self, param: &str, reason: &str) -> CraftopsError {
        CraftopsError::InvalidParam {
            index: self.index,
            kind: self.kind.as_str().to_string(),
            param: param.to_string(),
            reason: reason.to_string(),
        }
    }

    fn require(&self, param: &str) -> Result<&Value> {
        self.params.get(param).ok_or_else(|| self.missing(param))
    }

    fn require_int(&self, param: &str) -> Result<i64> {
        self.require(param)?
            .as_i64()
            .ok_or_else(|| self.invalid(param, "expected an integer"))
    }

    fn require_str(&self, param: &str) -> Result<&str> {
        self.require(param)?
            .as_str()
            .ok_or_else(|| self.invalid(param, "expected a string"))
    }

    fn require_vec3(&self, param: &str) -> Result<[i64; 3]> {
        let value = self.require(param)?;
        let arr = value
            .as_array()
            .ok_or_else(|| self.invalid(param, "expected a [x, y, z] array"))?;
        if arr.len() != 3 {
            return Err(self.invalid(param, "expected exactly 3 elements"));
        }
        let mut out = [0i64; 3];
        for (i, v) in arr.iter().enumerate() {
            out[i] = v
                .as_i64()
                .ok_or_else(|| self.invalid(param, "expected integer coordinates"))?;
        }
        Ok(out)
    }
}
