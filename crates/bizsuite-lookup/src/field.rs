// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use bizsuite_app::{FieldKey, FocusOrigin, LookupItem};
use std::sync::Arc;
use std::time::Duration;

use crate::debounce::DebounceTimer;
use crate::lookup::SearchableLookup;
use crate::source::DropdownSource;

/// One text input wired to a lookup: local filtering on every keystroke, a
/// debounced remote search, and the select/clear hooks the form reacts to.
pub struct LookupField<S> {
    key: FieldKey,
    lookup: Arc<SearchableLookup<S>>,
    text: String,
    open: bool,
    selected: Option<LookupItem>,
    debounce: DebounceTimer,
}

impl<S: DropdownSource> LookupField<S> {
    pub fn new(key: FieldKey, lookup: Arc<SearchableLookup<S>>, debounce: Duration) -> Self {
        Self {
            key,
            lookup,
            text: String::new(),
            open: false,
            selected: None,
            debounce: DebounceTimer::new(debounce),
        }
    }

    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn lookup(&self) -> &Arc<SearchableLookup<S>> {
        &self.lookup
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn selected(&self) -> Option<&LookupItem> {
        self.selected.as_ref()
    }

    pub fn search_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Opens the dropdown and makes sure the cache is loaded. Focus that
    /// code moved here is ignored. Returns whether the field opened.
    pub async fn focus(&mut self, origin: FocusOrigin) -> bool {
        if origin == FocusOrigin::Programmatic {
            return false;
        }
        self.open = true;
        self.lookup.load_initial().await;
        true
    }

    /// Handles a keystroke. Empty text cancels any pending search, shows
    /// the whole cache and runs `on_clear` so dependent form state resets.
    /// Whitespace alone shows the whole cache but keeps the selection.
    pub fn input<C>(&mut self, text: &str, on_clear: C)
    where
        C: FnOnce(),
    {
        self.text = text.to_owned();
        self.open = true;

        if text.trim().is_empty() {
            self.debounce.cancel();
            self.lookup.filter_local("");
            if text.is_empty() {
                self.selected = None;
                on_clear();
            }
            return;
        }

        self.lookup.filter_local(text);
        let lookup = Arc::clone(&self.lookup);
        let term = text.to_owned();
        self.debounce.schedule(async move {
            lookup.search(&term).await;
        });
    }

    pub fn select<C>(&mut self, item: LookupItem, on_select: C)
    where
        C: FnOnce(&LookupItem),
    {
        self.debounce.cancel();
        self.open = false;
        self.text = item.name.clone();
        on_select(&item);
        self.selected = Some(item);
    }

    /// Closes the dropdown and drops any search still waiting on the timer.
    pub fn close(&mut self) {
        self.debounce.cancel();
        self.open = false;
    }
}
