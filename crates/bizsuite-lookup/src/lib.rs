// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod batches;
pub mod cache;
pub mod debounce;
pub mod field;
pub mod lookup;
pub mod order_entry;
pub mod rank;
pub mod session;
pub mod source;

pub use batches::{BatchLookup, BatchState};
pub use cache::LookupCache;
pub use debounce::{DEFAULT_DEBOUNCE, DebounceTimer};
pub use field::LookupField;
pub use lookup::{
    DEFAULT_BULK_LIMIT, DEFAULT_SEARCH_LIMIT, LookupLimits, LookupView, SearchableLookup,
    merge_results,
};
pub use order_entry::OrderEntry;
pub use rank::{match_rank, rank_items};
pub use session::{LookupSession, LookupSettings};
pub use source::{DropdownSource, ItemQuery};
