// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use bizsuite_app::LookupId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as LoadGate;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::source::DropdownSource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchState {
    pub batches: Vec<String>,
    pub loading: bool,
}

/// Batch numbers per inventory item, fetched on first selection of the item.
/// An item whose batch list came back empty is fetched again next time.
/// Concurrent loads of one item share a single request.
pub struct BatchLookup<S> {
    source: Arc<S>,
    entries: Mutex<HashMap<LookupId, BatchState>>,
    gates: Mutex<HashMap<LookupId, Arc<LoadGate<()>>>>,
}

impl<S: DropdownSource> BatchLookup<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, item_id: &LookupId) -> BatchState {
        self.lock()
            .get(item_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn load(&self, item_id: &LookupId) -> Vec<String> {
        if item_id.is_empty() {
            return Vec::new();
        }
        if let Some(cached) = self.cached(item_id) {
            return cached;
        }

        let gate = self.gate(item_id);
        let _turn = gate.lock().await;
        // Whoever held the gate before us may have filled the entry.
        if let Some(cached) = self.cached(item_id) {
            return cached;
        }

        let loading = LoadingGuard::start(&self.entries, item_id);
        let batches = match self.source.fetch_batches(item_id).await {
            Ok(batches) => batches,
            Err(error) => {
                warn!(item_id = %item_id, error = %format!("{error:#}"), "batch lookup failed");
                Vec::new()
            }
        };
        loading.finish(batches.clone());
        batches
    }

    pub fn spawn_load(self: &Arc<Self>, item_id: LookupId) -> JoinHandle<Vec<String>> {
        let batches = Arc::clone(self);
        tokio::spawn(async move { batches.load(&item_id).await })
    }

    fn cached(&self, item_id: &LookupId) -> Option<Vec<String>> {
        self.lock()
            .get(item_id)
            .filter(|state| !state.batches.is_empty())
            .map(|state| state.batches.clone())
    }

    fn gate(&self, item_id: &LookupId) -> Arc<LoadGate<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(item_id.clone()).or_default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LookupId, BatchState>> {
        lock_entries(&self.entries)
    }
}

fn lock_entries(
    entries: &Mutex<HashMap<LookupId, BatchState>>,
) -> MutexGuard<'_, HashMap<LookupId, BatchState>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks an item as loading until the fetch finishes. Dropping it early,
/// as happens when the load task is aborted, clears the flag.
struct LoadingGuard<'a> {
    entries: &'a Mutex<HashMap<LookupId, BatchState>>,
    item_id: &'a LookupId,
}

impl<'a> LoadingGuard<'a> {
    fn start(entries: &'a Mutex<HashMap<LookupId, BatchState>>, item_id: &'a LookupId) -> Self {
        lock_entries(entries)
            .entry(item_id.clone())
            .or_default()
            .loading = true;
        Self { entries, item_id }
    }

    fn finish(self, batches: Vec<String>) {
        lock_entries(self.entries).insert(
            self.item_id.clone(),
            BatchState {
                batches,
                loading: false,
            },
        );
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = lock_entries(self.entries).get_mut(self.item_id) {
            state.loading = false;
        }
    }
}
