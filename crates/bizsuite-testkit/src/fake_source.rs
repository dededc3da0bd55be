// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use bizsuite_app::{LookupEndpoint, LookupId, LookupItem};
use bizsuite_lookup::{DropdownSource, ItemQuery};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A request the fake received, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Items { endpoint: String, query: ItemQuery },
    Batches(LookupId),
}

#[derive(Debug, Default)]
struct Script {
    items: HashMap<String, Vec<LookupItem>>,
    batches: HashMap<LookupId, Vec<String>>,
    failing_endpoints: HashSet<String>,
    failing_terms: HashSet<String>,
    bulk_delay: Option<Duration>,
    batch_delay: Option<Duration>,
    term_delays: HashMap<String, Duration>,
    requests: Vec<Recorded>,
}

/// Scripted in-memory backend. Prefix searches match names case-insensitively.
/// Delays use tokio time, so paused-clock tests control them exactly.
#[derive(Debug, Default)]
pub struct FakeSource {
    script: Mutex<Script>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_items(&self, endpoint: LookupEndpoint, items: Vec<LookupItem>) {
        self.script().items.insert(endpoint.path().to_owned(), items);
    }

    pub fn set_batches(&self, item_id: &str, batches: &[&str]) {
        self.script().batches.insert(
            LookupId::new(item_id),
            batches.iter().map(|batch| (*batch).to_owned()).collect(),
        );
    }

    pub fn fail_endpoint(&self, endpoint: LookupEndpoint) {
        self.script()
            .failing_endpoints
            .insert(endpoint.path().to_owned());
    }

    pub fn fail_batches(&self) {
        self.script()
            .failing_endpoints
            .insert(bizsuite_app::BATCHES_PATH.to_owned());
    }

    pub fn fail_search(&self, term: &str) {
        self.script().failing_terms.insert(term.to_owned());
    }

    pub fn recover(&self) {
        let mut script = self.script();
        script.failing_endpoints.clear();
        script.failing_terms.clear();
    }

    pub fn delay_bulk(&self, delay: Duration) {
        self.script().bulk_delay = Some(delay);
    }

    pub fn delay_batches(&self, delay: Duration) {
        self.script().batch_delay = Some(delay);
    }

    pub fn delay_search(&self, term: &str, delay: Duration) {
        self.script().term_delays.insert(term.to_owned(), delay);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script().requests.clone()
    }

    pub fn bulk_requests(&self, endpoint: LookupEndpoint) -> usize {
        self.count(|request| {
            matches!(request, Recorded::Items { endpoint: path, query: ItemQuery::Browse { .. } } if path == endpoint.path())
        })
    }

    pub fn search_requests(&self, endpoint: LookupEndpoint) -> usize {
        self.count(|request| {
            matches!(request, Recorded::Items { endpoint: path, query: ItemQuery::Prefix { .. } } if path == endpoint.path())
        })
    }

    pub fn batch_requests(&self) -> usize {
        self.count(|request| matches!(request, Recorded::Batches(_)))
    }

    fn count(&self, predicate: impl Fn(&Recorded) -> bool) -> usize {
        self.script()
            .requests
            .iter()
            .filter(|request| predicate(request))
            .count()
    }

    fn respond(&self, endpoint: &str, query: &ItemQuery) -> (Option<Duration>, Result<Vec<LookupItem>>) {
        let mut script = self.script();
        script.requests.push(Recorded::Items {
            endpoint: endpoint.to_owned(),
            query: query.clone(),
        });

        let delay = match query.term() {
            Some(term) => script.term_delays.get(term).copied(),
            None => script.bulk_delay,
        };
        if script.failing_endpoints.contains(endpoint) {
            return (delay, Err(anyhow!("{endpoint} returned 500 Internal Server Error")));
        }
        if let Some(term) = query.term().filter(|term| script.failing_terms.contains(*term)) {
            return (delay, Err(anyhow!("search for {term:?} returned 500 Internal Server Error")));
        }

        let all = script.items.get(endpoint).cloned().unwrap_or_default();
        let matches = match query.term() {
            Some(term) => {
                let prefix = term.to_lowercase();
                all.into_iter()
                    .filter(|item| item.name.to_lowercase().starts_with(&prefix))
                    .take(query.limit())
                    .collect()
            }
            None => all.into_iter().take(query.limit()).collect(),
        };
        (delay, Ok(matches))
    }

    fn respond_batches(&self, item_id: &LookupId) -> (Option<Duration>, Result<Vec<String>>) {
        let mut script = self.script();
        script.requests.push(Recorded::Batches(item_id.clone()));
        let delay = script.batch_delay;
        if script.failing_endpoints.contains(bizsuite_app::BATCHES_PATH) {
            return (delay, Err(anyhow!("batch lookup for {item_id} failed")));
        }
        (delay, Ok(script.batches.get(item_id).cloned().unwrap_or_default()))
    }
}

impl DropdownSource for FakeSource {
    fn fetch_items(
        &self,
        endpoint: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = Result<Vec<LookupItem>>> + Send {
        let (delay, outcome) = self.respond(endpoint, query);
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
    }

    fn fetch_batches(
        &self,
        item_id: &LookupId,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        let (delay, outcome) = self.respond_batches(item_id);
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }
    }
}
