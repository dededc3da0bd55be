// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Fuzzy ranking of cached dropdown items against a typed term.
//!
//! Candidates fall into tiers (exact, prefix, word prefix, substring,
//! acronym, in-order subsequence). Subsequence matches are sub-scored by how
//! tightly the matched characters cluster, so `dlysr` prefers "Dialyser"
//! over "Dialysis Machine Spare".

use bizsuite_app::LookupItem;
use std::cmp::Ordering;

pub const CASE_SENSITIVE_EQUAL: f64 = 7.0;
pub const EQUAL: f64 = 6.0;
pub const STARTS_WITH: f64 = 5.0;
pub const WORD_STARTS_WITH: f64 = 4.0;
pub const CONTAINS: f64 = 3.0;
pub const ACRONYM: f64 = 2.0;
pub const MATCHES: f64 = 1.0;
pub const NO_MATCH: f64 = 0.0;

pub fn match_rank(candidate: &str, term: &str) -> f64 {
    if term.chars().count() > candidate.chars().count() {
        return NO_MATCH;
    }
    if candidate == term {
        return CASE_SENSITIVE_EQUAL;
    }

    let candidate = candidate.to_lowercase();
    let term = term.to_lowercase();
    if candidate == term {
        return EQUAL;
    }
    if candidate.starts_with(&term) {
        return STARTS_WITH;
    }
    if candidate.contains(&format!(" {term}")) {
        return WORD_STARTS_WITH;
    }
    if candidate.contains(&term) {
        return CONTAINS;
    }
    if term.chars().count() == 1 {
        return NO_MATCH;
    }
    if acronym(&candidate).contains(&term) {
        return ACRONYM;
    }
    closeness(&candidate, &term)
}

fn acronym(value: &str) -> String {
    value
        .split(' ')
        .flat_map(|word| word.split('-'))
        .filter_map(|part| part.chars().next())
        .collect()
}

fn closeness(candidate: &str, term: &str) -> f64 {
    let haystack: Vec<char> = candidate.chars().collect();
    let mut cursor = 0;
    let mut first = None;
    let mut last = 0;

    for wanted in term.chars() {
        let Some(offset) = haystack[cursor..].iter().position(|c| *c == wanted) else {
            return NO_MATCH;
        };
        let index = cursor + offset;
        first.get_or_insert(index);
        last = index;
        cursor = index + 1;
    }

    let spread = last - first.unwrap_or(last);
    if spread == 0 {
        return MATCHES;
    }
    MATCHES + 1.0 / spread as f64
}

/// Matching items, best first. Ties go to the alphabetically earlier name,
/// then to the earlier cache position.
pub fn rank_items(items: &[LookupItem], term: &str) -> Vec<LookupItem> {
    let mut ranked: Vec<(f64, usize, String)> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let rank = match_rank(&item.name, term);
            (rank >= MATCHES).then(|| (rank, index, item.name.to_lowercase()))
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .0
            .partial_cmp(&left.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.2.cmp(&right.2))
            .then_with(|| left.1.cmp(&right.1))
    });

    ranked
        .into_iter()
        .map(|(_, index, _)| items[index].clone())
        .collect()
}
