// ── Reactive entity streams ──
//
// Subscription handles for consuming collection changes from the
// DataStore without holding any locks.

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// A live subscription to one entity collection.
///
/// Reads are always cheap `Arc` clones of the latest snapshot;
/// [`changed`](Self::changed) parks until the collection mutates. The
/// snapshot arrives pre-sorted in display order, so consumers render it
/// as-is.
pub struct EntityStream<T: Clone + Send + Sync + 'static> {
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        Self { receiver }
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the `DataStore` has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Adapt into a `Stream` of snapshots for combinator use. The first
    /// item is the snapshot current at conversion time.
    pub fn into_stream(self) -> impl Stream<Item = Arc<Vec<Arc<T>>>> + Send {
        WatchStream::new(self.receiver)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn changed_wakes_on_mutation() {
        let (tx, rx) = watch::channel(Arc::new(vec![Arc::new(1u32)]));
        let mut stream = EntityStream::new(rx);
        assert_eq!(stream.snapshot().len(), 1);

        tx.send_modify(|s| *s = Arc::new(vec![Arc::new(1), Arc::new(2)]));
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 2);

        drop(tx);
        assert!(stream.changed().await.is_none());
    }
}
