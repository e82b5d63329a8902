//! Search store.

use std::sync::Arc;

use clipsage_core::{
    ChangeBus, Notifier, OpStatus, Result, SearchOptions, SearchOptionsPatch, SearchResult,
    StatusCell, StoreKind,
};
use clipsage_gateway::BackendGateway;
use clipsage_notify::NotificationCenter;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info};

/// Snapshot of the search slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchState {
    /// Text bound to the search box.
    pub query: String,
    pub results: Vec<SearchResult>,
    /// Query of the last successful search, `None` when nothing was searched.
    pub last_search_query: Option<String>,
    /// Baseline options. Per-call overrides never land here.
    pub options: SearchOptions,
}

impl SearchState {
    fn new(options: SearchOptions) -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            last_search_query: None,
            options,
        }
    }
}

pub struct SearchStore {
    gateway: Arc<dyn BackendGateway>,
    toasts: Arc<NotificationCenter>,
    state: RwLock<SearchState>,
    /// Options restored by [`reset`](Self::reset).
    defaults: SearchOptions,
    status: StatusCell,
    notifier: Notifier,
}

impl SearchStore {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        toasts: Arc<NotificationCenter>,
        bus: &ChangeBus,
        defaults: SearchOptions,
    ) -> Self {
        let notifier = bus.notifier(StoreKind::Search);
        Self {
            gateway,
            toasts,
            state: RwLock::new(SearchState::new(defaults.clone())),
            defaults,
            status: StatusCell::new(notifier.clone()),
            notifier,
        }
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.read().clone()
    }

    pub fn query(&self) -> String {
        self.state.read().query.clone()
    }

    pub fn results(&self) -> Vec<SearchResult> {
        self.state.read().results.clone()
    }

    pub fn last_search_query(&self) -> Option<String> {
        self.state.read().last_search_query.clone()
    }

    pub fn options(&self) -> SearchOptions {
        self.state.read().options.clone()
    }

    pub fn status(&self) -> OpStatus {
        self.status.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.status.error()
    }

    pub fn has_results(&self) -> bool {
        !self.state.read().results.is_empty()
    }

    pub fn has_searched(&self) -> bool {
        self.state.read().last_search_query.is_some()
    }

    pub fn results_count(&self) -> usize {
        self.state.read().results.len()
    }

    /// Look up a current result by chunk id.
    pub fn result(&self, chunk_id: &str) -> Option<SearchResult> {
        self.state
            .read()
            .results
            .iter()
            .find(|r| r.chunk_id == chunk_id)
            .cloned()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.state.write().query = query.into();
        self.notifier.notify("query");
    }

    /// Run a search.
    ///
    /// `query` defaults to the bound query text. A blank query clears the
    /// results without calling the backend. `overrides` apply to this call
    /// only.
    pub async fn search(
        &self,
        query: Option<&str>,
        overrides: Option<&SearchOptionsPatch>,
    ) -> Result<()> {
        let (query, options) = {
            let state = self.state.read();
            let query = query.map(str::to_string).unwrap_or_else(|| state.query.clone());
            let options = match overrides {
                Some(patch) => state.options.merged(patch),
                None => state.options.clone(),
            };
            (query, options)
        };

        if query.trim().is_empty() {
            {
                let mut state = self.state.write();
                state.results.clear();
                state.last_search_query = None;
            }
            self.notifier.notify("results");
            debug!("Blank query, results cleared");
            return Ok(());
        }

        let _loading = self.status.begin();

        match self.gateway.search(&query, &options).await {
            Ok(response) => {
                let count = response.results.len();
                {
                    let mut state = self.state.write();
                    state.results = response.results;
                    state.last_search_query = Some(query.clone());
                }
                self.notifier.notify("results");
                info!("Search {:?} returned {} results (top_k={})", query, count, options.top_k);
                if count == 0 {
                    self.toasts.info("No results found", None);
                }
                Ok(())
            }
            Err(e) => {
                error!("Search {:?} failed: {}", query, e);
                self.state.write().results.clear();
                self.notifier.notify("results");
                self.status.fail(&e);
                self.toasts.error("Search failed. Please try again.", None);
                Err(e)
            }
        }
    }

    /// Merge `patch` into the baseline options. Does not search.
    pub fn update_options(&self, patch: &SearchOptionsPatch) {
        self.state.write().options.apply(patch);
        self.notifier.notify("options");
    }

    /// Clear results, query text, the last-search marker and any error.
    pub fn clear_results(&self) {
        {
            let mut state = self.state.write();
            state.results.clear();
            state.query.clear();
            state.last_search_query = None;
        }
        self.status.clear_error();
        self.notifier.notify("results");
        self.notifier.notify("query");
    }

    /// Back to the initial state, including the configured baseline options.
    pub fn reset(&self) {
        *self.state.write() = SearchState::new(self.defaults.clone());
        self.status.reset();
        self.notifier.notify("results");
        self.notifier.notify("query");
        self.notifier.notify("options");
    }
}
