//! In-process change feed.
//!
//! Each backend owns a [`ChangeFeed`] and publishes a [`ChangeEvent`] after
//! every successful mutation. Views hold a [`Subscription`] for the table they
//! render; dropping the subscription tears it down.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use classfete_core::{ChangeEvent, Table};

/// Events buffered per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for row changes.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    live: Arc<AtomicUsize>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Publishing with no subscribers is a no-op.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(table = %event.table, kind = ?event.kind, row_id = ?event.row_id, "change published");
        let _ = self.sender.send(event);
    }

    /// Subscribe to changes on one table.
    #[must_use]
    pub fn subscribe(&self, table: Table) -> Subscription {
        self.live.fetch_add(1, Ordering::SeqCst);
        Subscription {
            table,
            receiver: self.sender.subscribe(),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of subscriptions that have not been dropped.
    #[must_use]
    pub fn live_subscribers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// A live subscription to one table's changes.
pub struct Subscription {
    table: Table,
    receiver: broadcast::Receiver<ChangeEvent>,
    live: Arc<AtomicUsize>,
}

impl Subscription {
    #[must_use]
    pub const fn table(&self) -> Table {
        self.table
    }

    /// Wait for the next change on this subscription's table.
    ///
    /// A subscriber that fell behind gets a single refresh event for the
    /// table. Returns `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.table == self.table => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(table = %self.table, missed, "change subscriber lagged");
                    return Some(ChangeEvent::refresh(self.table));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Turn the subscription into a stream of events.
    ///
    /// The subscription lives inside the stream and is torn down when the
    /// stream is dropped.
    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send {
        let mut subscription = self;
        async_stream::stream! {
            while let Some(event) = subscription.next().await {
                yield event;
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
