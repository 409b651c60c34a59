//! Write-coalescing queue
//!
//! Rapid successive saves of the same document collapse into one physical
//! write. Each [`WriteQueue::enqueue`] replaces the pending value for its
//! document and re-arms a single debounce timer; when the timer fires every
//! pending document is written. Until then [`WriteQueue::pending`] exposes the
//! latest value, so readers never observe a stale document.
//!
//! The timer runs on the ambient tokio runtime. Without one, enqueued values
//! are written immediately.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::store::DocumentStore;

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
struct PendingDoc {
    value: Value,
    compress: bool,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    pending: BTreeMap<String, PendingDoc>,
    timer: Option<JoinHandle<()>>,
    next_seq: u64,
}

#[derive(Debug)]
struct Inner {
    store: DocumentStore,
    debounce: Duration,
    state: Mutex<State>,
    // Serializes flushes so an older batch never lands after a newer one.
    flush_lock: Mutex<()>,
    flushes: AtomicU64,
}

/// Debounced document writer. Cheap to clone; clones share one queue.
#[derive(Debug, Clone)]
pub struct WriteQueue {
    inner: Arc<Inner>,
}

impl WriteQueue {
    pub fn new(store: DocumentStore) -> Self {
        Self::with_debounce(store, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(store: DocumentStore, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                debounce,
                state: Mutex::new(State::default()),
                flush_lock: Mutex::new(()),
                flushes: AtomicU64::new(0),
            }),
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.inner.store
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Queue `value` as the next content of `name` and re-arm the timer.
    pub fn enqueue(&self, name: &str, value: Value) -> Result<()> {
        // Reject bad names now rather than inside a background flush.
        self.inner.store.document_path(name)?;
        let compress = self.inner.store.compression_enabled();

        let runtime = tokio::runtime::Handle::try_current();
        {
            let mut state = self.inner.state.lock();
            state.next_seq += 1;
            let seq = state.next_seq;
            state.pending.insert(
                name.to_string(),
                PendingDoc {
                    value,
                    compress,
                    seq,
                },
            );

            if let Some(timer) = state.timer.take() {
                timer.abort();
            }

            if let Ok(handle) = &runtime {
                let weak = Arc::downgrade(&self.inner);
                let debounce = self.inner.debounce;
                state.timer = Some(handle.spawn(run_timer(weak, debounce)));
                tracing::debug!(document = name, "queued write");
                return Ok(());
            }
        }

        // No runtime to host the timer: write through.
        self.inner.flush_pending().map(|_| ())
    }

    /// Latest not-yet-written value for `name`
    pub fn pending(&self, name: &str) -> Option<Value> {
        self.inner
            .state
            .lock()
            .pending
            .get(name)
            .map(|doc| doc.value.clone())
    }

    /// Whether any write is waiting for the timer
    pub fn has_pending(&self) -> bool {
        !self.inner.state.lock().pending.is_empty()
    }

    /// Cancel the timer and write everything pending now.
    ///
    /// Returns the number of documents written.
    pub fn flush_now(&self) -> Result<usize> {
        if let Some(timer) = self.inner.state.lock().timer.take() {
            timer.abort();
        }
        self.inner.flush_pending()
    }

    /// Physical writes performed so far
    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.load(Ordering::SeqCst)
    }
}

async fn run_timer(queue: Weak<Inner>, debounce: Duration) {
    tokio::time::sleep(debounce).await;
    let Some(inner) = queue.upgrade() else {
        return;
    };
    inner.state.lock().timer = None;
    if let Err(err) = inner.flush_pending() {
        tracing::error!(error = %err, "background flush failed");
    }
}

impl Inner {
    fn flush_pending(&self) -> Result<usize> {
        let _guard = self.flush_lock.lock();
        let batch: Vec<(String, PendingDoc)> = self
            .state
            .lock()
            .pending
            .iter()
            .map(|(name, doc)| (name.clone(), doc.clone()))
            .collect();

        let mut written = 0;
        let mut first_error = None;
        for (name, doc) in batch {
            match self.store.save_value(&name, &doc.value, doc.compress) {
                Ok(()) => {
                    written += 1;
                    self.flushes.fetch_add(1, Ordering::SeqCst);
                    let mut state = self.state.lock();
                    // Keep the entry if a newer value arrived mid-write.
                    if state.pending.get(&name).map(|p| p.seq) == Some(doc.seq) {
                        state.pending.remove(&name);
                    }
                }
                Err(err) => {
                    tracing::error!(document = %name, error = %err, "queued write failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                if written > 0 {
                    tracing::debug!(documents = written, "flushed queued writes");
                }
                Ok(written)
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.abort();
        }
        if self.state.get_mut().pending.is_empty() {
            return;
        }
        if let Err(err) = self.flush_pending() {
            tracing::error!(error = %err, "failed to flush queued writes on shutdown");
        }
    }
}
