// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use bizsuite_app::{FieldKey, LookupEndpoint};
use std::sync::Arc;
use std::time::Duration;

use crate::batches::BatchLookup;
use crate::cache::LookupCache;
use crate::debounce::DEFAULT_DEBOUNCE;
use crate::field::LookupField;
use crate::lookup::{LookupLimits, SearchableLookup};
use crate::source::DropdownSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupSettings {
    pub limits: LookupLimits,
    pub debounce: Duration,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            limits: LookupLimits::default(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Owns everything lookups share for the lifetime of a signed-in session:
/// the backend handle, the per-endpoint cache and the per-item batch cache.
/// Lookups created from the same session never fetch a bulk list twice.
pub struct LookupSession<S> {
    source: Arc<S>,
    cache: Arc<LookupCache>,
    batches: Arc<BatchLookup<S>>,
    settings: LookupSettings,
}

impl<S> Clone for LookupSession<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            cache: Arc::clone(&self.cache),
            batches: Arc::clone(&self.batches),
            settings: self.settings,
        }
    }
}

impl<S: DropdownSource> LookupSession<S> {
    pub fn new(source: Arc<S>, settings: LookupSettings) -> Self {
        Self {
            batches: Arc::new(BatchLookup::new(Arc::clone(&source))),
            cache: LookupCache::new(),
            source,
            settings,
        }
    }

    pub fn settings(&self) -> LookupSettings {
        self.settings
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }

    pub fn batches(&self) -> &Arc<BatchLookup<S>> {
        &self.batches
    }

    /// A fresh lookup with its own options and request sequence, backed by
    /// the shared cache.
    pub fn lookup(&self, endpoint: LookupEndpoint) -> Arc<SearchableLookup<S>> {
        Arc::new(SearchableLookup::new(
            endpoint.path(),
            Arc::clone(&self.source),
            Arc::clone(&self.cache),
            self.settings.limits,
        ))
    }

    pub fn field(&self, key: FieldKey, lookup: Arc<SearchableLookup<S>>) -> LookupField<S> {
        LookupField::new(key, lookup, self.settings.debounce)
    }
}
