//! Concurrent fan-out across providers.
//!
//! One tokio task per provider. Each task reports `(index, result)` back
//! through its join handle and the collector writes it into a pre-sized slot
//! vector, so `results[i]` always belongs to `providers[i]` no matter which
//! task finishes first. A task that panics still gets its slot filled via
//! [`ProbeOutcome::failed`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::client::ResilientClient;
use super::provider::ProviderSpec;
use crate::error::{CallError, CallErrorKind, Result};

// =============================================================================
// Outcome contract
// =============================================================================

/// Result type of a fan-out operation.
///
/// Operations encode failure in their own return value; the executor only
/// needs a way to build one when it could not run the operation at all.
pub trait ProbeOutcome: Send + 'static {
    /// Result for a provider whose operation never produced a value.
    fn failed(provider: &ProviderSpec, error: CallError) -> Self;
}

// =============================================================================
// Client pool
// =============================================================================

/// Clients keyed by provider name, reused across rounds.
#[derive(Debug, Default)]
pub struct ClientPool {
    clients: RwLock<HashMap<String, Arc<ResilientClient>>>,
}

impl ClientPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing client for `spec.name`, or a new one.
    ///
    /// Read-lock fast path; the write lock re-checks before inserting so two
    /// racing callers end up sharing one client.
    ///
    /// # Errors
    /// Returns an error if a new client cannot be built.
    pub async fn get_or_create(&self, spec: &ProviderSpec) -> Result<Arc<ResilientClient>> {
        if let Some(client) = self.clients.read().await.get(&spec.name) {
            return Ok(Arc::clone(client));
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&spec.name) {
            return Ok(Arc::clone(client));
        }
        let client = Arc::new(ResilientClient::new(spec.clone())?);
        clients.insert(spec.name.clone(), Arc::clone(&client));
        tracing::debug!(provider = %spec.name, "created pooled client");
        Ok(client)
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}

// =============================================================================
// Fan-out executor
// =============================================================================

/// Runs one operation against every provider concurrently.
#[derive(Debug, Clone, Default)]
pub struct FanOut {
    pool: Arc<ClientPool>,
}

impl FanOut {
    /// Executor with its own fresh client pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clients built so far, shared by every round run through this executor.
    #[must_use]
    pub const fn pool(&self) -> &Arc<ClientPool> {
        &self.pool
    }

    /// Run `operation` for every provider; `results[i]` matches `providers[i]`.
    ///
    /// Never fails as a whole. Returns once every task has finished; the
    /// operation is expected to honour `ctx` so a cancelled round returns
    /// promptly with error results in the affected slots.
    pub async fn execute_all<T, F, Fut>(
        &self,
        ctx: &CancellationToken,
        providers: &[ProviderSpec],
        operation: F,
    ) -> Vec<T>
    where
        T: ProbeOutcome,
        F: Fn(Arc<ResilientClient>, ProviderSpec, CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        self.execute_all_with_clients(ctx, providers, operation)
            .await
            .0
    }

    /// Like [`execute_all`](Self::execute_all), also returning the client used
    /// for each provider (`None` where one could not be built).
    pub async fn execute_all_with_clients<T, F, Fut>(
        &self,
        ctx: &CancellationToken,
        providers: &[ProviderSpec],
        operation: F,
    ) -> (Vec<T>, Vec<Option<Arc<ResilientClient>>>)
    where
        T: ProbeOutcome,
        F: Fn(Arc<ResilientClient>, ProviderSpec, CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None)
            .take(providers.len())
            .collect();
        let mut clients: Vec<Option<Arc<ResilientClient>>> = vec![None; providers.len()];
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::with_capacity(providers.len());

        for (index, spec) in providers.iter().enumerate() {
            let client = match self.pool.get_or_create(spec).await {
                Ok(client) => client,
                Err(e) => {
                    tracing::warn!(provider = %spec.name, error = %e, "could not build client");
                    slots[index] = Some(T::failed(
                        spec,
                        CallError::new(CallErrorKind::Unknown, e.to_string()),
                    ));
                    continue;
                }
            };
            clients[index] = Some(Arc::clone(&client));
            let fut = operation(client, spec.clone(), ctx.child_token());
            let handle = tasks.spawn(async move { (index, fut.await) });
            task_index.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(join_error) => {
                    if let Some(&index) = task_index.get(&join_error.id()) {
                        let spec = &providers[index];
                        tracing::error!(provider = %spec.name, error = %join_error, "probe task aborted");
                        slots[index] = Some(T::failed(
                            spec,
                            CallError::new(CallErrorKind::Unknown, "probe task aborted"),
                        ));
                    }
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(providers)
            .map(|(slot, spec)| {
                slot.unwrap_or_else(|| {
                    T::failed(spec, CallError::new(CallErrorKind::Unknown, "no result"))
                })
            })
            .collect();
        (results, clients)
    }
}

/// Child of `parent` that is cancelled automatically after `after`.
///
/// Must be called inside a tokio runtime.
#[must_use]
pub fn deadline_token(parent: &CancellationToken, after: Duration) -> CancellationToken {
    let token = parent.child_token();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = timer.cancelled() => {}
            () = tokio::time::sleep(after) => {
                tracing::debug!(deadline_ms = super::client::duration_ms(after), "round deadline reached");
                timer.cancel();
            }
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Echo(String);

    impl ProbeOutcome for Echo {
        fn failed(provider: &ProviderSpec, error: CallError) -> Self {
            Self(format!("{}:{}", provider.name, error.kind))
        }
    }

    fn specs(n: usize) -> Vec<ProviderSpec> {
        (0..n)
            .map(|i| ProviderSpec::new(format!("p{i}"), "http://127.0.0.1:1"))
            .collect()
    }

    #[tokio::test]
    async fn pool_reuses_clients() {
        let pool = ClientPool::new();
        let spec = ProviderSpec::new("a", "http://127.0.0.1:1");
        let first = pool.get_or_create(&spec).await.unwrap();
        let second = pool.get_or_create(&spec).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn results_follow_provider_order_despite_reversed_delays() {
        let providers = specs(5);
        let fanout = FanOut::new();
        let ctx = CancellationToken::new();
        let results = fanout
            .execute_all(&ctx, &providers, |client, spec, _ctx| async move {
                let index: u64 = spec.name[1..].parse().unwrap();
                // first provider sleeps longest
                tokio::time::sleep(Duration::from_millis((5 - index) * 30)).await;
                Echo(client.name().to_string())
            })
            .await;
        let names: Vec<_> = results.into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["p0", "p1", "p2", "p3", "p4"]);
    }

    #[tokio::test]
    async fn panicking_task_still_fills_its_slot() {
        let providers = specs(3);
        let fanout = FanOut::new();
        let ctx = CancellationToken::new();
        let results = fanout
            .execute_all(&ctx, &providers, |_client, spec, _ctx| async move {
                assert!(spec.name != "p1", "boom");
                Echo(spec.name)
            })
            .await;
        assert_eq!(results[0], Echo("p0".into()));
        assert_eq!(results[1], Echo("p1:unknown".into()));
        assert_eq!(results[2], Echo("p2".into()));
    }

    #[tokio::test]
    async fn deadline_cancels_every_unit() {
        let providers = specs(3);
        let fanout = FanOut::new();
        let root = CancellationToken::new();
        let ctx = deadline_token(&root, Duration::from_millis(50));
        let started = std::time::Instant::now();
        let results = fanout
            .execute_all(&ctx, &providers, |_client, spec, ctx| async move {
                tokio::select! {
                    () = ctx.cancelled() => Echo(format!("{}:cancelled", spec.name)),
                    () = tokio::time::sleep(Duration::from_secs(30)) => Echo(spec.name),
                }
            })
            .await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(results.iter().all(|e| e.0.ends_with(":cancelled")));
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    async fn with_clients_returns_parallel_clients() {
        let providers = specs(2);
        let fanout = FanOut::new();
        let ctx = CancellationToken::new();
        let (results, clients) = fanout
            .execute_all_with_clients(&ctx, &providers, |client, _spec, _ctx| async move {
                Echo(client.name().to_string())
            })
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1].as_ref().unwrap().name(), "p1");
    }

    #[tokio::test]
    async fn empty_provider_list_yields_empty_results() {
        let fanout = FanOut::new();
        let ctx = CancellationToken::new();
        let results: Vec<Echo> = fanout
            .execute_all(&ctx, &[], |_c, spec, _ctx| async move { Echo(spec.name) })
            .await;
        assert!(results.is_empty());
    }
}
