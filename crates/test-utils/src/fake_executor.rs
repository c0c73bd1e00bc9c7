use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use craftops::command::{Command, CommandContext, CommandKind};
use craftops::exec::BlockExecutor;
use craftops::types::RunMode;

/// One completed executor call, as observed by [`RecordingExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub mode: RunMode,
    pub kind: CommandKind,
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// A fake world executor that:
/// - records every completed `apply`/`revert` call in order,
/// - can gate execution so tests control exactly how many commands complete,
/// - can fail the nth call to exercise the `failed` path.
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<ExecutedCall>>>,
    /// When gated, every call waits for one permit before completing.
    gate: Option<Arc<Semaphore>>,
    /// Zero-based call number that should fail, counted across apply+revert.
    fail_at: Option<usize>,
    attempts: AtomicUsize,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            gate: None,
            fail_at: None,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Gated variant: no call completes until [`allow`](Self::allow) grants
    /// permits.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    /// Fail the `n`th call (zero-based) with an executor error.
    pub fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::new()
        }
    }

    /// Allow `n` gated calls to complete.
    pub fn allow(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<ExecutedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn kinds(&self, mode: RunMode) -> Vec<CommandKind> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.mode == mode)
            .map(|c| c.kind)
            .collect()
    }

    async fn execute(&self, mode: RunMode, command: &Command) -> anyhow::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("executor gate closed");
            permit.forget();
        }

        if self.fail_at == Some(attempt) {
            anyhow::bail!("injected executor failure at call {attempt}");
        }

        self.calls.lock().unwrap().push(ExecutedCall {
            mode,
            kind: command.kind(),
            params: command.params().clone(),
        });
        Ok(())
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockExecutor for RecordingExecutor {
    fn apply<'a>(
        &'a self,
        command: &'a Command,
        _context: &'a CommandContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(self.execute(RunMode::Apply, command))
    }

    fn revert<'a>(
        &'a self,
        command: &'a Command,
        _context: &'a CommandContext,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(self.execute(RunMode::Revert, command))
    }
}
