/**
 * Reflector: list-then-watch cache synchronization
 *
 * One background worker fills a local store with a full list, then keeps it
 * current from a streaming watch, re-listing on error, stream end, or the
 * reconcile deadline. Consumers take snapshots or subscribe to the live
 * event feed; a single level-triggered stop token interrupts the worker at
 * every wait boundary.
 */
use super::store::Store;
use super::subscription::{Subscription, SubscriptionManager};
use crate::api::{ListerWatcher, WatchEvent, WatchOptions, resource};
use crate::config::RETRY_DELAY_SECONDS;
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Caches list results for multiple consumers to share and keeps them
/// updated with a watch.
pub struct Reflector {
    client: Arc<dyn ListerWatcher>,
    resource: String,
    options: WatchOptions,
    reconcile_timeout: Duration,
    retry_delay: Duration,
    store: Arc<Store>,
    subscriptions: Arc<SubscriptionManager>,
    stop: CancellationToken,
    filled_tx: watch::Sender<bool>,
    filled_rx: watch::Receiver<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Reflector {
    /// `reconcile_timeout` bounds staleness from a watch connection that
    /// silently stops delivering events: on expiry the active stream is
    /// finished and a fresh full list is forced.
    #[must_use]
    pub fn new(
        client: Arc<dyn ListerWatcher>,
        resource: impl Into<String>,
        options: WatchOptions,
        reconcile_timeout: Duration,
    ) -> Self {
        let (filled_tx, filled_rx) = watch::channel(false);
        Self {
            client,
            resource: resource.into(),
            options,
            reconcile_timeout,
            retry_delay: Duration::from_secs(RETRY_DELAY_SECONDS),
            store: Arc::new(Store::new()),
            subscriptions: Arc::new(SubscriptionManager::new()),
            stop: CancellationToken::new(),
            filled_tx,
            filled_rx,
            worker: Mutex::new(None),
        }
    }

    /// Overrides the delay between worker cycles. Mostly useful in tests;
    /// the default of one second keeps a broken loop from overwhelming the
    /// api-server.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Snapshot of the current cache. Meaningful once `start_worker` has
    /// returned; before that it reports the empty pre-fill state.
    pub async fn list(&self) -> Vec<Value> {
        self.store.snapshot().await
    }

    /// Registers a live subscriber. Every event applied to the cache from
    /// this moment on is delivered in order; dropping the handle
    /// deregisters it.
    #[must_use]
    pub fn watch(&self) -> Subscription {
        self.subscriptions.subscribe()
    }

    /// Number of currently-registered subscribers.
    #[must_use]
    pub fn active_watchers(&self) -> usize {
        self.subscriptions.active_subscriptions()
    }

    /// Spawns the background worker and blocks until the first full list
    /// has completed (or a stop request arrives), so `list` is immediately
    /// meaningful afterwards.
    ///
    /// If the very first fill keeps failing this blocks indefinitely;
    /// callers needing a bound should wrap it in `tokio::time::timeout`.
    /// Not implicit in `new` so callers know they have to `stop_worker`.
    /// Each Reflector runs its worker at most once.
    pub async fn start_worker(&self) {
        let worker = Worker {
            client: self.client.clone(),
            resource: self.resource.clone(),
            options: self.options.clone(),
            reconcile_timeout: self.reconcile_timeout,
            retry_delay: self.retry_delay,
            store: self.store.clone(),
            subscriptions: self.subscriptions.clone(),
            stop: self.stop.clone(),
            filled: self.filled_tx.clone(),
        };
        let handle = tokio::spawn(worker.run());
        if let Ok(mut guard) = self.worker.lock() {
            *guard = Some(handle);
        }

        let mut filled = self.filled_rx.clone();
        tokio::select! {
            result = filled.wait_for(|filled| *filled) => {
                let _ = result;
            }
            () = self.stop.cancelled() => {}
        }
    }

    /// Requests termination and blocks until the worker has fully exited,
    /// whether it was sleeping between cycles, blocked on a list request,
    /// or blocked inside a watch read. Idempotent; safe before
    /// `start_worker` and safe to call repeatedly.
    pub async fn stop_worker(&self) {
        self.stop.cancel();
        let handle = if let Ok(mut guard) = self.worker.lock() { guard.take() } else { None };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("🛑 reflector for {} stopped", self.resource);
    }
}

impl std::fmt::Debug for Reflector {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Reflector")
            .field("resource", &self.resource)
            .field("reconcile_timeout", &self.reconcile_timeout)
            .finish_non_exhaustive()
    }
}

/// State moved into the background task.
struct Worker {
    client: Arc<dyn ListerWatcher>,
    resource: String,
    options: WatchOptions,
    reconcile_timeout: Duration,
    retry_delay: Duration,
    store: Arc<Store>,
    subscriptions: Arc<SubscriptionManager>,
    stop: CancellationToken,
    filled: watch::Sender<bool>,
}

impl Worker {
    async fn run(self) {
        info!("🔭 reflector worker started for {}", self.resource);
        loop {
            if let Err(error) = self.cycle().await {
                // keep retrying; only an explicit stop ends the worker
                error!("ignoring error during background work for {}: {error}", self.resource);
            }
            if self.stop.is_cancelled() {
                break;
            }
            tokio::select! {
                () = self.stop.cancelled() => {}
                () = sleep(self.retry_delay) => {}
            }
            if self.stop.is_cancelled() {
                break;
            }
        }
        debug!("reflector worker for {} exited", self.resource);
    }

    async fn cycle(&self) -> Result<()> {
        let Some(resume) = self.fill_cache().await? else {
            return Ok(());
        };
        self.watch_to_update_cache(resume).await
    }

    /// Full list: build a brand-new map off-lock, swap it in, remember the
    /// reply's change-log position as the watch resume point.
    async fn fill_cache(&self) -> Result<Option<String>> {
        let mut options = self.options.clone();
        options.resource_version = Some("0".to_string());

        let reply = tokio::select! {
            reply = self.client.list(&self.resource, &options) => reply?,
            () = self.stop.cancelled() => return Ok(None),
        };

        let mut objects = HashMap::with_capacity(reply.items.len());
        for item in reply.items {
            let Some(uid) = resource::uid(&item).map(str::to_string) else {
                warn!("skipping listed {} item without metadata.uid", self.resource);
                continue;
            };
            objects.insert(uid, item);
        }
        debug!(
            "💾 filled {} cache: {} objects at version {:?}",
            self.resource,
            objects.len(),
            reply.resource_version
        );
        self.store.replace(objects).await;
        let _ = self.filled.send(true);
        Ok(Some(reply.resource_version))
    }

    /// Watch from the resume point and apply events until the stream ends,
    /// the server reports an error, the reconcile deadline expires, or a
    /// stop is requested. The deadline and the stop token share the read
    /// `select!`, so no auxiliary watchdog races the reader.
    async fn watch_to_update_cache(&self, resume: String) -> Result<()> {
        let mut options = self.options.clone();
        options.resource_version = Some(resume);

        let mut stream = tokio::select! {
            stream = self.client.watch(&self.resource, &options) => stream?,
            () = self.stop.cancelled() => return Ok(()),
        };
        let finisher = stream.finisher();

        let deadline = sleep(self.reconcile_timeout);
        tokio::pin!(deadline);
        let mut stop_reason = "disconnect";
        let mut finish_requested = false;

        loop {
            let event = if finish_requested {
                // finish() was delivered; drain what the reader already
                // buffered, then it reports a clean end
                stream.next_event().await?
            } else {
                tokio::select! {
                    () = self.stop.cancelled() => {
                        stop_reason = "stop";
                        finisher.finish();
                        finish_requested = true;
                        continue;
                    }
                    () = &mut deadline => {
                        stop_reason = "reconcile";
                        finisher.finish();
                        finish_requested = true;
                        continue;
                    }
                    event = stream.next_event() => event?,
                }
            };
            let Some(event) = event else { break };
            if !self.apply(event).await {
                stop_reason = "error";
                break;
            }
        }

        info!("watch of {} restarted: {stop_reason}", self.resource);
        Ok(())
    }

    /// Applies one event to the store and forwards it to subscribers.
    /// Returns false when the cycle must abort and re-list.
    async fn apply(&self, event: WatchEvent) -> bool {
        match &event {
            WatchEvent::Added(object) | WatchEvent::Modified(object) => {
                if let Some(uid) = resource::uid(object).map(str::to_string) {
                    self.store.upsert(uid, object.clone()).await;
                } else {
                    warn!("ignoring {} event for {} without metadata.uid", event.kind(), self.resource);
                }
            }
            WatchEvent::Deleted(object) => {
                if let Some(uid) = resource::uid(object) {
                    self.store.delete(uid).await;
                } else {
                    warn!("ignoring DELETED event for {} without metadata.uid", self.resource);
                }
            }
            WatchEvent::Error(status) => {
                warn!("watch of {} returned an error notice: {status:?}", self.resource);
                return false;
            }
            WatchEvent::Unknown { kind, .. } => {
                error!("unsupported event type {kind}");
            }
        }
        self.subscriptions.notify(&event);
        true
    }
}
