use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::checker::Prober;
use crate::config::EndpointConfig;
use crate::database::Store;

/// Delay before an endpoint's first check, so startup does not fire every
/// probe at the same instant.
const STARTUP_STAGGER: Duration = Duration::from_millis(200);

/// How long `stop` waits for loops to finish their current iteration.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Owns one repeating check loop per configured endpoint.
///
/// Lifecycle is start-once/stop-once: `start` registers every endpoint in the
/// store and spawns the loops, `stop` signals them and waits a bounded grace.
/// The name→id map is written exactly once inside `start` and is read-only
/// afterwards, so the API layer reads it without locking.
pub struct Monitor {
    store: Arc<dyn Store>,
    prober: Arc<Prober>,
    endpoints: Vec<EndpointConfig>,
    endpoint_ids: OnceLock<HashMap<String, i64>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    pub fn new(store: Arc<dyn Store>, prober: Prober, endpoints: Vec<EndpointConfig>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            prober: Arc::new(prober),
            endpoints,
            endpoint_ids: OnceLock::new(),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register every endpoint in the store and launch one check loop each.
    ///
    /// A store failure here is fatal: without stable ids no check can be
    /// recorded. Calling `start` twice is an error.
    pub async fn start(&self) -> Result<()> {
        if self.endpoint_ids.get().is_some() {
            bail!("monitor already started");
        }

        let mut ids = HashMap::with_capacity(self.endpoints.len());
        let mut loops = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let id = self
                .store
                .upsert_endpoint(endpoint)
                .await
                .with_context(|| format!("failed to register endpoint '{}'", endpoint.name))?;
            ids.insert(endpoint.name.clone(), id);
            loops.push((endpoint.clone(), id));
        }

        if self.endpoint_ids.set(ids).is_err() {
            bail!("monitor already started");
        }

        let mut tasks = self.tasks.lock().unwrap();
        for (endpoint, endpoint_id) in loops {
            let store = self.store.clone();
            let prober = self.prober.clone();
            let shutdown = self.shutdown.subscribe();
            tasks.push(tokio::spawn(run_endpoint_loop(
                store,
                prober,
                endpoint,
                endpoint_id,
                shutdown,
            )));
        }

        tracing::info!("monitoring {} endpoint(s)", self.endpoints.len());
        Ok(())
    }

    /// Signal all loops to halt and wait a bounded grace for them to finish
    /// their current iteration. In-flight probes are not aborted; they
    /// complete or hit their own timeout first.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().unwrap();
            tasks.drain(..).collect()
        };
        if handles.is_empty() {
            return;
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, join_all(handles))
            .await
            .is_err()
        {
            tracing::warn!("timed out waiting for monitor loops to stop");
        }
    }

    /// Trigger one extra out-of-band check, concurrent with the regular loop.
    ///
    /// Returns false (and writes nothing) when the name is unknown. Does not
    /// wait for the check to finish.
    pub fn check_now(&self, name: &str) -> bool {
        let Some(&endpoint_id) = self.endpoint_ids.get().and_then(|ids| ids.get(name)) else {
            return false;
        };
        let Some(endpoint) = self
            .endpoints
            .iter()
            .find(|endpoint| endpoint.name == name)
            .cloned()
        else {
            return false;
        };

        let store = self.store.clone();
        let prober = self.prober.clone();
        tokio::spawn(async move {
            check_and_store(&store, &prober, &endpoint, endpoint_id).await;
        });
        true
    }

    /// The name→id map, available once `start` has completed.
    pub fn endpoint_ids(&self) -> Option<&HashMap<String, i64>> {
        self.endpoint_ids.get()
    }

    pub fn endpoint_id(&self, name: &str) -> Option<i64> {
        self.endpoint_ids.get()?.get(name).copied()
    }
}

async fn run_endpoint_loop(
    store: Arc<dyn Store>,
    prober: Arc<Prober>,
    endpoint: EndpointConfig,
    endpoint_id: i64,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::time::sleep(STARTUP_STAGGER).await;
    let interval = Duration::from_secs(endpoint.interval_seconds);

    loop {
        if *shutdown.borrow() {
            break;
        }

        check_and_store(&store, &prober, &endpoint, endpoint_id).await;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!(endpoint = %endpoint.name, "check loop stopped");
}

/// One probe-and-persist cycle. A failed write is logged and skipped; the
/// next tick gets another chance.
async fn check_and_store(
    store: &Arc<dyn Store>,
    prober: &Prober,
    endpoint: &EndpointConfig,
    endpoint_id: i64,
) {
    let outcome = prober.probe(endpoint).await;
    let checked_at = chrono::Utc::now().timestamp();
    if let Err(err) = store.insert_check(endpoint_id, checked_at, &outcome).await {
        tracing::warn!(
            endpoint = %endpoint.name,
            error = %err,
            "failed to record check result"
        );
    }
}
