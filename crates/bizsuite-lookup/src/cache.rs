// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use bizsuite_app::LookupItem;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as LoadGate;
use tracing::debug;

#[derive(Debug, Default)]
struct Slot {
    items: Mutex<Arc<Vec<LookupItem>>>,
    gate: LoadGate<()>,
}

/// Bulk-fetched dropdown lists shared by every lookup in a session, one
/// slot per endpoint path. A slot is only ever replaced as a whole.
#[derive(Debug, Default)]
pub struct LookupCache {
    slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl LookupCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slot(&self, endpoint: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(endpoint.to_owned()).or_default())
    }

    pub fn snapshot(&self, endpoint: &str) -> Arc<Vec<LookupItem>> {
        let slot = self.slot(endpoint);
        let items = slot.items.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&items)
    }

    pub fn replace(&self, endpoint: &str, items: Vec<LookupItem>) {
        let slot = self.slot(endpoint);
        *slot.items.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(items);
    }

    /// Returns the cached list, running `load` first if the slot is empty.
    /// Concurrent callers for the same endpoint wait on one load instead of
    /// each fetching. A failed load leaves the slot empty so the next caller
    /// retries.
    pub async fn get_or_load<F, Fut>(&self, endpoint: &str, load: F) -> Result<Arc<Vec<LookupItem>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<LookupItem>>>,
    {
        let slot = self.slot(endpoint);
        let _gate = slot.gate.lock().await;

        let cached = Arc::clone(&slot.items.lock().unwrap_or_else(PoisonError::into_inner));
        if !cached.is_empty() {
            return Ok(cached);
        }

        let items = Arc::new(load().await?);
        debug!(endpoint, count = items.len(), "cached dropdown list");
        *slot.items.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&items);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::LookupCache;
    use anyhow::anyhow;
    use bizsuite_app::LookupItem;

    #[tokio::test]
    async fn failed_load_leaves_slot_empty() {
        let cache = LookupCache::new();
        let result = cache
            .get_or_load("/clients", || async { Err(anyhow!("offline")) })
            .await;
        assert!(result.is_err());
        assert!(cache.snapshot("/clients").is_empty());

        let items = cache
            .get_or_load("/clients", || async {
                Ok(vec![LookupItem::new("c1", "City Hospital")])
            })
            .await
            .expect("second load succeeds");
        assert_eq!(items.len(), 1);
        assert_eq!(cache.snapshot("/clients")[0].name, "City Hospital");
    }

    #[tokio::test]
    async fn filled_slot_skips_loader() {
        let cache = LookupCache::new();
        cache.replace("/inventory", vec![LookupItem::new("i1", "Needles")]);

        let items = cache
            .get_or_load("/inventory", || async {
                panic!("loader must not run for a filled slot")
            })
            .await
            .expect("cached");
        assert_eq!(items[0].name, "Needles");
        assert!(cache.snapshot("/clients").is_empty());
    }
}
