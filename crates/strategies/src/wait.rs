//! Delayed rendering

use std::sync::Arc;
use std::time::Duration;

use refsnap::{Difference, Rendering, Snapshotting, StrategyError};

/// Waits `delay` on the render runtime before rendering with the inner
/// strategy, e.g. to let an animation settle. The engine's timeout still
/// applies to the whole wait.
pub struct Wait<S> {
    delay: Duration,
    strategy: Arc<S>,
}

impl<S> Wait<S> {
    pub fn new(delay: Duration, strategy: S) -> Self {
        Self {
            delay,
            strategy: Arc::new(strategy),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<V, S> Snapshotting<V> for Wait<S>
where
    V: Send + 'static,
    S: Snapshotting<V> + Send + Sync + 'static,
{
    type Format = S::Format;

    fn path_extension(&self) -> Option<&str> {
        self.strategy.path_extension()
    }

    fn render(&self, value: V) -> Rendering<S::Format> {
        let delay = self.delay;
        let strategy = Arc::clone(&self.strategy);
        Rendering::deferred(async move {
            tokio::time::sleep(delay).await;
            strategy.render(value).into_future().await
        })
    }

    fn to_bytes(&self, format: &S::Format) -> Result<Vec<u8>, StrategyError> {
        self.strategy.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<S::Format, StrategyError> {
        self.strategy.from_bytes(bytes)
    }

    fn diff(&self, reference: &S::Format, candidate: &S::Format) -> Option<Difference> {
        self.strategy.diff(reference, candidate)
    }
}
