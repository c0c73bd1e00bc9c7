// src/exec/mod.rs

//! The external world-mutation executor.
//!
//! The engine's responsibility ends at invoking the correct command variant
//! with the correct context and awaiting completion or error; actually
//! touching world blocks belongs to whatever implements [`BlockExecutor`]
//! (in production, the server bridge). Tests substitute recording fakes.
//!
//! There is deliberately no timeout here: if the executor hangs, the job
//! hangs. That risk is owned by the executor side.

use std::future::Future;
use std::pin::Pin;

use crate::command::{Command, CommandContext};

/// Applies and reverts single commands against a live world.
pub trait BlockExecutor: Send + Sync {
    /// Execute one command's forward edit.
    fn apply<'a>(
        &'a self,
        command: &'a Command,
        context: &'a CommandContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Execute one command's inverse edit. Revert re-executes the recorded
    /// command through this path; it does not diff world state.
    fn revert<'a>(
        &'a self,
        command: &'a Command,
        context: &'a CommandContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
}
