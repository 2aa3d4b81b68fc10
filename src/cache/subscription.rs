use crate::api::WatchEvent;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Live event feed for one consumer, registered from the moment of
/// subscription. Dropping the handle deregisters it, so a consumer loop
/// that breaks early or bails on an error never leaks its queue.
///
/// The queue is unbounded: a subscriber that processes events slower than
/// they arrive accumulates backlog rather than stalling the worker.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<WatchEvent>,
    manager: Arc<SubscriptionManager>,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Next event in arrival order, `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.manager.unsubscribe(self.id);
    }
}

/// Registry of live subscriber queues, shared between the reflector worker
/// (which broadcasts) and consumers (which subscribe and drop).
///
/// Uses a synchronous lock so `Subscription::drop` can deregister without
/// an executor; no await happens while it is held.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    senders: RwLock<HashMap<Uuid, mpsc::UnboundedSender<WatchEvent>>>,
}

impl SubscriptionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        if let Ok(mut senders) = self.senders.write() {
            senders.insert(id, sender);
        }
        Subscription { id, receiver, manager: self.clone() }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        if let Ok(mut senders) = self.senders.write() {
            senders.remove(&id);
        }
    }

    /// Broadcasts one event to every currently-registered subscriber,
    /// pruning queues whose consumer is gone.
    pub fn notify(&self, event: &WatchEvent) {
        let dead: Vec<Uuid> = {
            let Ok(senders) = self.senders.read() else { return };
            senders
                .iter()
                .filter(|(_, sender)| sender.send(event.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };
        for id in dead {
            self.unsubscribe(id);
        }
    }

    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.senders.read().map_or(0, |senders| senders.len())
    }
}
