// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! A single searchable dropdown bound to one backend endpoint.
//!
//! Typing first filters the shared cache locally for instant feedback. A
//! debounced remote prefix search then runs and its results are appended
//! after the local matches. Every publishing call takes a ticket; only the
//! holder of the latest ticket may replace the visible options, so a slow
//! response never overwrites a newer one.

use bizsuite_app::{LookupId, LookupItem};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cache::LookupCache;
use crate::rank::rank_items;
use crate::source::{DropdownSource, ItemQuery};

pub const DEFAULT_BULK_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupLimits {
    pub bulk: usize,
    pub search: usize,
}

impl Default for LookupLimits {
    fn default() -> Self {
        Self {
            bulk: DEFAULT_BULK_LIMIT,
            search: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// What a dropdown renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupView {
    pub options: Vec<LookupItem>,
    pub loading: bool,
}

#[derive(Debug, Default)]
struct Requests {
    latest: u64,
    bulk_in_flight: usize,
    search_in_flight: Option<u64>,
}

impl Requests {
    fn loading(&self) -> bool {
        self.bulk_in_flight > 0 || self.search_in_flight.is_some()
    }
}

pub struct SearchableLookup<S> {
    endpoint: String,
    source: Arc<S>,
    cache: Arc<LookupCache>,
    limits: LookupLimits,
    requests: Mutex<Requests>,
    view: watch::Sender<LookupView>,
}

impl<S: DropdownSource> SearchableLookup<S> {
    pub fn new(
        endpoint: impl Into<String>,
        source: Arc<S>,
        cache: Arc<LookupCache>,
        limits: LookupLimits,
    ) -> Self {
        let (view, _) = watch::channel(LookupView::default());
        Self {
            endpoint: endpoint.into(),
            source,
            cache,
            limits,
            requests: Mutex::new(Requests::default()),
            view,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn options(&self) -> Vec<LookupItem> {
        self.view.borrow().options.clone()
    }

    pub fn loading(&self) -> bool {
        self.view.borrow().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupView> {
        self.view.subscribe()
    }

    /// Publishes the full cached list, fetching it first if this endpoint
    /// has never been loaded. Failures are logged and leave the options
    /// empty.
    pub async fn load_initial(&self) -> Vec<LookupItem> {
        let ticket = self.next_ticket();
        let cached = self.cache.snapshot(&self.endpoint);
        if !cached.is_empty() {
            let items = cached.to_vec();
            self.commit(ticket, &items);
            return items;
        }

        let _bulk = BulkGuard::start(self);
        let query = ItemQuery::Browse {
            limit: self.limits.bulk,
        };
        let loaded = self
            .cache
            .get_or_load(&self.endpoint, || {
                self.source.fetch_items(&self.endpoint, &query)
            })
            .await;

        let items = match loaded {
            Ok(items) => items.to_vec(),
            Err(error) => {
                warn!(endpoint = %self.endpoint, error = %format!("{error:#}"), "initial dropdown load failed");
                Vec::new()
            }
        };
        self.commit(ticket, &items);
        items
    }

    /// Publishes the local matches right away, then asks the backend for
    /// prefix matches and appends the ones not already shown. A failed
    /// remote search degrades to the local matches.
    pub async fn search(&self, term: &str) -> Vec<LookupItem> {
        let ticket = self.next_ticket();
        let cached = self.cache.snapshot(&self.endpoint);
        if term.trim().is_empty() {
            let items = cached.to_vec();
            self.commit(ticket, &items);
            return items;
        }

        let local = rank_items(&cached, term);
        self.commit(ticket, &local);
        let _search = SearchGuard::start(self, ticket);
        let query = ItemQuery::Prefix {
            term: term.to_owned(),
            limit: self.limits.search,
        };
        let merged = match self.source.fetch_items(&self.endpoint, &query).await {
            Ok(remote) => merge_results(local, remote),
            Err(error) => {
                warn!(endpoint = %self.endpoint, term, error = %format!("{error:#}"), "remote dropdown search failed");
                local
            }
        };

        if !self.commit(ticket, &merged) {
            debug!(endpoint = %self.endpoint, term, "discarding stale search results");
        }
        merged
    }

    /// Synchronous cache-only filter. Supersedes any search in flight.
    pub fn filter_local(&self, term: &str) -> Vec<LookupItem> {
        let ticket = self.next_ticket();
        let cached = self.cache.snapshot(&self.endpoint);
        let items = if term.trim().is_empty() {
            cached.to_vec()
        } else {
            rank_items(&cached, term)
        };
        self.commit(ticket, &items);
        items
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Requests> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_ticket(&self) -> u64 {
        let mut requests = self.lock_requests();
        requests.latest += 1;
        requests.search_in_flight = None;
        self.publish_loading(&requests);
        requests.latest
    }

    fn commit(&self, ticket: u64, items: &[LookupItem]) -> bool {
        let requests = self.lock_requests();
        if requests.latest != ticket {
            return false;
        }
        self.view.send_modify(|view| view.options = items.to_vec());
        true
    }

    fn publish_loading(&self, requests: &Requests) {
        let loading = requests.loading();
        self.view.send_if_modified(|view| {
            let changed = view.loading != loading;
            view.loading = loading;
            changed
        });
    }
}

struct BulkGuard<'a, S: DropdownSource> {
    lookup: &'a SearchableLookup<S>,
}

impl<'a, S: DropdownSource> BulkGuard<'a, S> {
    fn start(lookup: &'a SearchableLookup<S>) -> Self {
        let mut requests = lookup.lock_requests();
        requests.bulk_in_flight += 1;
        lookup.publish_loading(&requests);
        Self { lookup }
    }
}

impl<S: DropdownSource> Drop for BulkGuard<'_, S> {
    fn drop(&mut self) {
        let mut requests = self.lookup.lock_requests();
        requests.bulk_in_flight = requests.bulk_in_flight.saturating_sub(1);
        self.lookup.publish_loading(&requests);
    }
}

struct SearchGuard<'a, S: DropdownSource> {
    lookup: &'a SearchableLookup<S>,
    ticket: u64,
}

impl<'a, S: DropdownSource> SearchGuard<'a, S> {
    fn start(lookup: &'a SearchableLookup<S>, ticket: u64) -> Self {
        let mut requests = lookup.lock_requests();
        if requests.latest == ticket {
            requests.search_in_flight = Some(ticket);
            lookup.publish_loading(&requests);
        }
        Self { lookup, ticket }
    }
}

impl<S: DropdownSource> Drop for SearchGuard<'_, S> {
    fn drop(&mut self) {
        let mut requests = self.lookup.lock_requests();
        if requests.search_in_flight == Some(self.ticket) {
            requests.search_in_flight = None;
            self.lookup.publish_loading(&requests);
        }
    }
}

/// Local matches first, then remote entries whose id has not been seen.
pub fn merge_results(local: Vec<LookupItem>, remote: Vec<LookupItem>) -> Vec<LookupItem> {
    let mut seen: HashSet<LookupId> = HashSet::new();
    local
        .into_iter()
        .chain(remote)
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}
