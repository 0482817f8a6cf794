//! Live snapshot feeds over a store collection.
//!
//! A feed delivers the full current list once on start and again after every change to its
//! collection. Receivers that fall behind skip the intermediate notifications and simply
//! re-read the latest snapshot. Load failures are logged and the feed keeps running.

use crate::error::CoreResult;
use crate::store::{Collection, DocumentStore};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Handle to a running feed. Dropping it, or calling [`Subscription::unsubscribe`], stops
/// the feed.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start a feed on the current tokio runtime.
///
/// The change receiver is registered before the initial load so no commit can fall between
/// the first snapshot and the first notification.
pub(crate) fn spawn_feed<T, L, C>(
    store: Arc<DocumentStore>,
    collection: Collection,
    load: L,
    mut callback: C,
) -> Subscription
where
    T: Send + 'static,
    L: Fn(&DocumentStore) -> CoreResult<Vec<T>> + Send + 'static,
    C: FnMut(Vec<T>) + Send + 'static,
{
    let mut changes = store.subscribe();
    let task = tokio::spawn(async move {
        emit(&store, collection, &load, &mut callback);
        loop {
            match changes.recv().await {
                Ok(changed) if changed == collection => {
                    emit(&store, collection, &load, &mut callback)
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%collection, skipped, "subscriber lagged, re-reading snapshot");
                    emit(&store, collection, &load, &mut callback);
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(%collection, "subscription feed closed");
    });
    Subscription { task }
}

fn emit<T, L, C>(store: &DocumentStore, collection: Collection, load: &L, callback: &mut C)
where
    L: Fn(&DocumentStore) -> CoreResult<Vec<T>>,
    C: FnMut(Vec<T>),
{
    match load(store) {
        Ok(items) => callback(items),
        Err(err) => {
            tracing::warn!(%collection, error = %err, "failed to refresh subscription snapshot");
        }
    }
}
