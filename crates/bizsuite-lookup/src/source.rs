// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use bizsuite_app::{LookupId, LookupItem};
use std::future::Future;
use std::sync::Arc;

/// What a dropdown fetch asks the backend for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemQuery {
    /// The first `limit` entities, used to seed the shared cache.
    Browse { limit: usize },
    /// Entities whose name starts with `term`.
    Prefix { term: String, limit: usize },
}

impl ItemQuery {
    pub fn limit(&self) -> usize {
        match self {
            Self::Browse { limit } | Self::Prefix { limit, .. } => *limit,
        }
    }

    pub fn term(&self) -> Option<&str> {
        match self {
            Self::Browse { .. } => None,
            Self::Prefix { term, .. } => Some(term),
        }
    }
}

/// Remote side of the dropdowns. The HTTP client implements this; tests use
/// a scripted fake.
pub trait DropdownSource: Send + Sync + 'static {
    fn fetch_items(
        &self,
        endpoint: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = Result<Vec<LookupItem>>> + Send;

    fn fetch_batches(&self, item_id: &LookupId)
    -> impl Future<Output = Result<Vec<String>>> + Send;
}

impl<S: DropdownSource> DropdownSource for Arc<S> {
    fn fetch_items(
        &self,
        endpoint: &str,
        query: &ItemQuery,
    ) -> impl Future<Output = Result<Vec<LookupItem>>> + Send {
        self.as_ref().fetch_items(endpoint, query)
    }

    fn fetch_batches(
        &self,
        item_id: &LookupId,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        self.as_ref().fetch_batches(item_id)
    }
}
