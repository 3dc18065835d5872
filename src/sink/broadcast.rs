// src/sink/broadcast.rs

//! Fan-out of finished runs to live subscribers.

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::sink::record::RunRecord;

/// Publishes finished runs to whoever is listening.
pub trait RunBroadcaster: Send + Sync {
    fn publish(&self, record: &RunRecord) -> Result<()>;
}

impl<T: RunBroadcaster + ?Sized> RunBroadcaster for std::sync::Arc<T> {
    fn publish(&self, record: &RunRecord) -> Result<()> {
        (**self).publish(record)
    }
}

/// Broadcaster backed by a `tokio::sync::broadcast` channel.
///
/// Publishing while nobody is subscribed is not an error; the record is
/// simply dropped. Slow subscribers observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<RunRecord>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunRecord> {
        self.tx.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}

impl RunBroadcaster for ChannelBroadcaster {
    fn publish(&self, record: &RunRecord) -> Result<()> {
        match self.tx.send(record.clone()) {
            Ok(receivers) => {
                trace!(run_id = %record.id, receivers, "broadcast run");
            }
            Err(_) => {
                debug!(run_id = %record.id, "no subscribers for run broadcast");
            }
        }
        Ok(())
    }
}

/// Broadcaster that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcaster;

impl RunBroadcaster for NoopBroadcaster {
    fn publish(&self, _record: &RunRecord) -> Result<()> {
        Ok(())
    }
}
