// ── Reactive entity streams ──
//
// A registry publishes its whole entry list after every container
// mutation: a merged refresh group, a prune, a store hydration, a local
// playback edit or a removal. Consumers see whole lists, never deltas, and
// a slow consumer only ever sees the newest list.

mod filter;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

pub use filter::{MediaFilter, ProviderFilter};

/// A subscription to one registry's entries, obtained from
/// `Registry::entities()`.
///
/// `current()` is the list as it stood when the subscription was taken (or
/// at the last `changed()`); entries are in the order their keys were
/// first seen. A refresh cycle that merges several groups can publish more
/// than one list; intermediate ones may be skipped.
pub struct EntityStream<T: Clone + Send + Sync + 'static> {
    current: Arc<Vec<Arc<T>>>,
    receiver: watch::Receiver<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> EntityStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Vec<Arc<T>>>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// List held by this subscription. Does not move until `changed()`.
    pub fn current(&self) -> &Arc<Vec<Arc<T>>> {
        &self.current
    }

    /// Newest published list, without marking it seen.
    pub fn latest(&self) -> Arc<Vec<Arc<T>>> {
        self.receiver.borrow().clone()
    }

    /// Wait until the registry publishes a list newer than the one last
    /// seen. `None` once the registry's container is gone.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Arc<T>>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// Registry entries as a `Stream`. The first item is the list current at
/// conversion time; later items follow publications, coalescing any that
/// arrive faster than they are polled. Ends with the registry.
pub struct EntityWatchStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<Arc<Vec<Arc<T>>>>,
}

impl<T: Clone + Send + Sync + 'static> Stream for EntityWatchStream<T> {
    type Item = Arc<Vec<Arc<T>>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use crate::model::{ClientCapabilities, Provider};
    use crate::store::RegistryContainer;

    use super::*;

    #[tokio::test]
    async fn changed_yields_new_snapshot() {
        let col = RegistryContainer::new();
        let mut stream = EntityStream::new(col.subscribe());
        assert!(stream.current().is_empty());

        col.upsert_from_client(Provider::new(1, 1, "A"), &ClientCapabilities::all());
        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(stream.current().len(), 1);
    }

    #[tokio::test]
    async fn changed_ends_when_container_is_dropped() {
        let col = RegistryContainer::<Provider>::new();
        let mut stream = EntityStream::new(col.subscribe());
        drop(col);
        assert!(stream.changed().await.is_none());
    }

    #[tokio::test]
    async fn latest_does_not_advance_current() {
        let col = RegistryContainer::new();
        let stream = EntityStream::new(col.subscribe());
        col.upsert_from_client(Provider::new(1, 1, "A"), &ClientCapabilities::all());

        assert!(stream.current().is_empty());
        assert_eq!(stream.latest().len(), 1);
    }

    #[tokio::test]
    async fn into_stream_starts_with_current() {
        let col = RegistryContainer::new();
        col.upsert_from_client(Provider::new(1, 1, "A"), &ClientCapabilities::all());

        let mut stream = EntityStream::new(col.subscribe()).into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first[0].name, "A");
    }
}
