use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use craftops::metrics::{MetricsSample, MetricsSource};

/// A metrics source tests steer by hand.
///
/// Returns the current sample on every pull (or an error while none is
/// set), and counts pulls so ticker tests can assert a stopped ticker no
/// longer samples.
pub struct ScriptedMetrics {
    current: Mutex<Option<MetricsSample>>,
    samples_taken: AtomicUsize,
}

impl ScriptedMetrics {
    pub fn new(initial: Option<MetricsSample>) -> Self {
        Self {
            current: Mutex::new(initial),
            samples_taken: AtomicUsize::new(0),
        }
    }

    /// Set the sample returned by subsequent pulls.
    pub fn set(&self, sample: MetricsSample) {
        *self.current.lock().unwrap() = Some(sample);
    }

    /// Make subsequent pulls fail (transient metrics outage).
    pub fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }

    pub fn samples_taken(&self) -> usize {
        self.samples_taken.load(Ordering::SeqCst)
    }
}

impl MetricsSource for ScriptedMetrics {
    fn sample(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<MetricsSample>> + Send + '_>> {
        Box::pin(async move {
            self.samples_taken.fetch_add(1, Ordering::SeqCst);
            let current = *self.current.lock().unwrap();
            current.ok_or_else(|| anyhow::anyhow!("metrics feed unavailable"))
        })
    }
}
