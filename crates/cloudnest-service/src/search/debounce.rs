//! Debounced search input.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use cloudnest_core::events::{InvalidationBus, InvalidationEvent, SearchMode};
use cloudnest_entity::SearchResult;

use super::indexer::SearchIndexer;

/// Delays a handler until input has been quiet for `delay`.
///
/// Each new input aborts the pending task and schedules a fresh one.
/// Must be used inside a tokio runtime.
#[derive(Debug)]
pub struct Debouncer<T> {
    /// Quiet period.
    delay: Duration,
    /// Pending delayed task.
    pending: Option<JoinHandle<()>>,
    _input: PhantomData<fn(T)>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            _input: PhantomData,
        }
    }

    /// The quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `handler(input)` after the quiet period, replacing any
    /// pending call.
    pub fn debounce<F, Fut>(&mut self, input: T, handler: F)
    where
        F: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handler(input).await;
        }));
    }

    /// Abort the pending call. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Whether a call is scheduled and has not finished.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

/// State of one search input field.
///
/// Typing restarts the debounce timer. When it fires, a `GlobalSearch`
/// event goes out on the bus; in local mode the query is also answered
/// from the index and published on [`SearchBox::results`]. Remote-mode
/// answers come from whoever handles the event.
#[derive(Debug)]
pub struct SearchBox {
    debouncer: Debouncer<String>,
    bus: Arc<InvalidationBus>,
    indexer: Arc<SearchIndexer>,
    mode: SearchMode,
    results: Arc<watch::Sender<Vec<SearchResult>>>,
}

impl SearchBox {
    /// Create a search box.
    pub fn new(
        bus: Arc<InvalidationBus>,
        indexer: Arc<SearchIndexer>,
        mode: SearchMode,
        delay: Duration,
    ) -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            debouncer: Debouncer::new(delay),
            bus,
            indexer,
            mode,
            results: Arc::new(results),
        }
    }

    /// Feed the current input text.
    pub fn input(&mut self, text: impl Into<String>) {
        let bus = Arc::clone(&self.bus);
        let indexer = Arc::clone(&self.indexer);
        let results = Arc::clone(&self.results);
        let mode = self.mode;

        self.debouncer.debounce(text.into(), move |query| async move {
            let query = query.trim().to_string();
            debug!(query = %query, ?mode, "Search submitted");
            if mode == SearchMode::Local {
                results.send_replace(indexer.search(&query));
            }
            bus.publish(InvalidationEvent::GlobalSearch { query, mode });
        });
    }

    /// Abandon pending input and empty the results.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.results.send_replace(Vec::new());
    }

    /// Latest local results.
    pub fn results(&self) -> watch::Receiver<Vec<SearchResult>> {
        self.results.subscribe()
    }

    /// Current mode.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Switch between local and remote answering.
    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    /// Whether a query is waiting for the quiet period to end.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}
