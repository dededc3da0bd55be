// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;
use std::ops::Range;

use crate::DocumentType;

pub const ORDERS_PAGE_SIZE: usize = 10;
const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRecordItem {
    pub item_name: String,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub tax_percent: f64,
}

/// An order as returned by the orders listing endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRecord {
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub challan_number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderRecordItem>,
    #[serde(default)]
    pub order_type: String,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub total_amount: Option<f64>,
}

impl OrderRecord {
    pub fn document_type(&self) -> DocumentType {
        match self.order_type.as_str() {
            "sale" => DocumentType::SalesInvoice,
            "delivery_challan" => DocumentType::DeliveryChallan,
            _ => DocumentType::Purchase,
        }
    }

    /// Invoice number, falling back to the challan number for challans.
    pub fn display_number(&self) -> &str {
        self.invoice_number
            .as_deref()
            .or(self.challan_number.as_deref())
            .unwrap_or("")
    }

    pub fn party_name(&self) -> &str {
        self.client_name
            .as_deref()
            .or(self.supplier_name.as_deref())
            .unwrap_or("")
    }

    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let hit = |value: Option<&str>| value.is_some_and(|v| v.to_lowercase().contains(&needle));

        hit(self.invoice_number.as_deref())
            || hit(self.challan_number.as_deref())
            || hit(self.client_name.as_deref())
            || hit(self.supplier_name.as_deref())
            || self.items.iter().any(|item| hit(Some(&item.item_name)))
    }
}

pub fn filter_orders<'a>(orders: &'a [OrderRecord], term: &str) -> Vec<&'a OrderRecord> {
    orders.iter().filter(|order| order.matches(term)).collect()
}

/// One-based page cursor over a list of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    total: usize,
    page_size: usize,
    current: usize,
}

impl Pagination {
    pub fn new(total: usize, page_size: usize) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
            current: 1,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn set_page(&mut self, page: usize) {
        self.current = page.clamp(1, self.total_pages().max(1));
    }

    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages()
    }

    pub fn range(&self) -> Range<usize> {
        let start = ((self.current - 1) * self.page_size).min(self.total);
        let end = (start + self.page_size).min(self.total);
        start..end
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        &items[range.start.min(items.len())..range.end.min(items.len())]
    }

    /// Page numbers for the button strip: at most five, sliding so the
    /// current page stays near the middle.
    pub fn window(&self) -> Vec<usize> {
        let pages = self.total_pages();
        if pages <= PAGE_WINDOW {
            return (1..=pages).collect();
        }
        let first = if self.current + 2 > pages {
            pages - (PAGE_WINDOW - 1)
        } else if self.current > 3 {
            self.current - 2
        } else {
            1
        };
        (first..first + PAGE_WINDOW).collect()
    }

    pub fn showing(&self) -> String {
        let range = self.range();
        if range.is_empty() {
            return format!("Showing 0 to 0 of {}", self.total);
        }
        format!(
            "Showing {} to {} of {}",
            range.start + 1,
            range.end,
            self.total
        )
    }
}
