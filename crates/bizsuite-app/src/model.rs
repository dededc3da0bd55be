// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::LookupId;

/// One row returned by a dropdown endpoint.
///
/// Only `id` and `name` are interpreted by the lookup layer. Anything else the
/// backend sends (`rate`, `tax_percent` for inventory) rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupItem {
    pub id: LookupId,
    pub name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LookupItem {
    pub fn new(id: impl Into<LookupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }

    /// Numeric extra field. Backends are inconsistent about quoting numbers,
    /// so numeric strings are accepted too.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.extra.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(raw) => raw.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn rate(&self) -> Option<f64> {
        self.number("rate")
    }

    pub fn tax_percent(&self) -> Option<f64> {
        self.number("tax_percent")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupEndpoint {
    Clients,
    Suppliers,
    Inventory,
    Employees,
}

impl LookupEndpoint {
    pub const ALL: [Self; 4] = [
        Self::Clients,
        Self::Suppliers,
        Self::Inventory,
        Self::Employees,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Self::Clients => "/api/v1/dropdown/clients",
            Self::Suppliers => "/api/v1/dropdown/suppliers",
            Self::Inventory => "/api/v1/dropdown/inventory",
            Self::Employees => "/api/v1/dropdown-employees",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clients => "clients",
            Self::Suppliers => "suppliers",
            Self::Inventory => "inventory",
            Self::Employees => "employees",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "clients" | "client" => Some(Self::Clients),
            "suppliers" | "supplier" => Some(Self::Suppliers),
            "inventory" | "items" | "item" => Some(Self::Inventory),
            "employees" | "employee" => Some(Self::Employees),
            _ => None,
        }
    }
}

pub const BATCHES_PATH: &str = "/api/v1/dropdown/batches";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "purchase")]
    Purchase,
    #[serde(rename = "sales-invoice")]
    SalesInvoice,
    #[serde(rename = "delivery-challan")]
    DeliveryChallan,
}

impl DocumentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::SalesInvoice => "sales-invoice",
            Self::DeliveryChallan => "delivery-challan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "purchase" => Some(Self::Purchase),
            "sales-invoice" | "sale" => Some(Self::SalesInvoice),
            "delivery-challan" | "delivery_challan" | "challan" => Some(Self::DeliveryChallan),
            _ => None,
        }
    }

    pub const fn order_type(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::SalesInvoice => "sale",
            Self::DeliveryChallan => "delivery_challan",
        }
    }

    pub const fn submit_path(self) -> &'static str {
        match self {
            Self::Purchase => "/api/v1/orders/purchase",
            Self::SalesInvoice => "/api/v1/orders/sale",
            Self::DeliveryChallan => "/api/v1/orders/delivery-challan",
        }
    }

    pub const fn party_endpoint(self) -> LookupEndpoint {
        match self {
            Self::Purchase => LookupEndpoint::Suppliers,
            Self::SalesInvoice | Self::DeliveryChallan => LookupEndpoint::Clients,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountType {
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "amount")]
    Amount,
}

impl DiscountType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Amount => "amount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}
