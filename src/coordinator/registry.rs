//! Job registry: owned map of job id to shared job entry.

use crate::types::{JobId, JobSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, watch};

/// Pause/stop requests, settable by any caller and read by the owning loop
#[derive(Debug, Default)]
pub(crate) struct JobControl {
    pause: AtomicBool,
    stop: AtomicBool,
}

impl JobControl {
    pub(crate) fn request_pause(&self, paused: bool) {
        self.pause.store(paused, Ordering::SeqCst);
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub(crate) fn pause_requested(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Everything the coordinator keeps about one job
///
/// The snapshot lives in a `watch` channel so that every read, whether a
/// one-off status query or a live subscription, sees one consistent value.
pub(crate) struct JobEntry {
    pub(crate) id: JobId,
    pub(crate) control: JobControl,
    snapshot: watch::Sender<JobSnapshot>,
    finished: watch::Sender<bool>,
}

impl JobEntry {
    pub(crate) fn new(id: JobId, source_identifier: String) -> Self {
        let (snapshot, _) = watch::channel(JobSnapshot::pending(id, source_identifier));
        let (finished, _) = watch::channel(false);
        Self {
            id,
            control: JobControl::default(),
            snapshot,
            finished,
        }
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.snapshot.subscribe()
    }

    /// Mutate the snapshot under its lock
    ///
    /// `modify` returns whether it changed anything; observers are only
    /// woken when it did.
    pub(crate) fn update(&self, modify: impl FnOnce(&mut JobSnapshot) -> bool) -> bool {
        self.snapshot.send_if_modified(modify)
    }

    /// Mark the lifecycle task as exited
    pub(crate) fn mark_finished(&self) {
        self.finished.send_replace(true);
    }

    pub(crate) fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Wait until the lifecycle task has exited and released its handle
    pub(crate) async fn wait_finished(&self) {
        let mut rx = self.finished.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Owned job registry
///
/// Jobs are inserted once at creation and never removed.
#[derive(Default)]
pub(crate) struct JobRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    jobs: HashMap<JobId, Arc<JobEntry>>,
    order: Vec<JobId>,
}

impl JobRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry; returns `false` (and leaves the map untouched)
    /// if the id is already present
    pub(crate) async fn insert(&self, entry: Arc<JobEntry>) -> bool {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&entry.id) {
            return false;
        }
        inner.order.push(entry.id);
        inner.jobs.insert(entry.id, entry);
        true
    }

    pub(crate) async fn get(&self, id: JobId) -> Option<Arc<JobEntry>> {
        self.inner.read().await.jobs.get(&id).cloned()
    }

    /// All entries in creation order
    pub(crate) async fn entries(&self) -> Vec<Arc<JobEntry>> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    pub(crate) async fn len(&self) -> usize {
        self.inner.read().await.jobs.len()
    }
}
