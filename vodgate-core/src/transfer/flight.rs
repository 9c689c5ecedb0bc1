//! Per-key deduplication of in-flight work
//!
//! Thin typed facade over `async_singleflight`: when several tasks request
//! the same key concurrently, one leader runs the future and the waiters
//! share its result instead of racing their own. The key is registered
//! before the leader's future is polled, so late arrivals reliably
//! observe it.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
pub enum FlightError<E> {
    /// The leader task was dropped or panicked before producing a result.
    #[error("in-flight leader dropped or panicked")]
    LeaderFailed,
    #[error("{0}")]
    Inner(E),
}

#[derive(Clone)]
pub struct FlightGroup<K, V, E>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    group: Arc<async_singleflight::Group<K, V, E>>,
}

impl<K, V, E> FlightGroup<K, V, E>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            group: Arc::new(async_singleflight::Group::new()),
        }
    }

    /// Run `f` for `key`, or wait on the leader already running it.
    pub async fn run<Fut>(&self, key: K, f: Fut) -> Result<V, FlightError<E>>
    where
        Fut: std::future::Future<Output = Result<V, E>> + Send,
    {
        // Group::work returns Err(None) when the leader vanished without a
        // result and Err(Some(e)) for an ordinary failure.
        self.group.work(&key, f).await.map_err(|err| match err {
            Some(inner) => FlightError::Inner(inner),
            None => FlightError::LeaderFailed,
        })
    }
}

impl<K, V, E> Default for FlightGroup<K, V, E>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
