// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use time::Date;
use time::macros::format_description;

use crate::{DiscountType, DocumentType, LookupId, LookupItem, PaymentStatus, RowId};

const PURCHASE_EXPIRY_FALLBACK: &str = "01/2099";
const DEFAULT_PURCHASE_PAYMENT_METHOD: &str = "cash";

/// Treats absent or non-finite numeric input as zero.
pub fn numeric_or_zero(value: Option<f64>) -> f64 {
    value.filter(|number| number.is_finite()).unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub row: RowId,
    pub item_id: Option<LookupId>,
    pub item_name: String,
    pub batch_number: String,
    pub expiry: String,
    pub quantity: u32,
    pub rate: f64,
    pub tax_percent: f64,
}

impl OrderLine {
    pub fn blank(row: RowId) -> Self {
        Self {
            row,
            item_id: None,
            item_name: String::new(),
            batch_number: String::new(),
            expiry: String::new(),
            quantity: 1,
            rate: 0.0,
            tax_percent: 0.0,
        }
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = u32::try_from(quantity.max(1)).unwrap_or(u32::MAX);
    }

    pub fn increment_quantity(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    pub fn decrement_quantity(&mut self) {
        self.quantity = self.quantity.saturating_sub(1).max(1);
    }

    pub fn set_rate(&mut self, rate: Option<f64>) {
        self.rate = numeric_or_zero(rate);
    }

    pub fn set_tax_percent(&mut self, tax_percent: Option<f64>) {
        self.tax_percent = numeric_or_zero(tax_percent);
    }

    /// Copies the chosen inventory item into the line. A different item means
    /// a different set of batches, so the batch choice is reset.
    pub fn apply_item(&mut self, item: &LookupItem) {
        self.item_id = Some(item.id.clone());
        self.item_name = item.name.clone();
        self.rate = numeric_or_zero(item.rate());
        self.tax_percent = numeric_or_zero(item.tax_percent());
        self.batch_number.clear();
    }

    pub fn clear_item(&mut self) {
        self.item_id = None;
        self.item_name.clear();
        self.rate = 0.0;
        self.tax_percent = 0.0;
        self.batch_number.clear();
    }

    /// Stores an expiry as a date input would hold it. Scanned `MM/YYYY`
    /// values become the first of that month; anything else is kept as typed.
    pub fn set_expiry(&mut self, raw: &str) {
        self.expiry = normalize_scanned_expiry(raw).unwrap_or_else(|| raw.trim().to_owned());
    }

    pub fn base_amount(&self) -> f64 {
        f64::from(self.quantity) * self.rate
    }

    pub fn tax_amount(&self) -> f64 {
        self.base_amount() * self.tax_percent / 100.0
    }

    pub fn amount(&self) -> f64 {
        self.base_amount() + self.tax_amount()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSummary {
    pub total_items: usize,
    pub total_quantity: u64,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub discounted_subtotal: f64,
    pub total_tax: f64,
    pub grand_total: f64,
}

impl OrderSummary {
    pub fn compute(lines: &[OrderLine], discount: f64, discount_type: DiscountType) -> Self {
        let subtotal: f64 = lines.iter().map(OrderLine::base_amount).sum();
        let total_tax: f64 = lines.iter().map(OrderLine::tax_amount).sum();
        let discount = numeric_or_zero(Some(discount));
        let discount_amount = match discount_type {
            DiscountType::Percentage => subtotal * discount / 100.0,
            DiscountType::Amount => discount,
        };
        let discounted_subtotal = subtotal - discount_amount;

        Self {
            total_items: lines.len(),
            total_quantity: lines.iter().map(|line| u64::from(line.quantity)).sum(),
            subtotal,
            discount_amount,
            discounted_subtotal,
            total_tax,
            grand_total: discounted_subtotal + total_tax,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub document_type: DocumentType,
    pub number: String,
    pub order_date: Date,
    pub party: Option<LookupItem>,
    pub lines: Vec<OrderLine>,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub amount_paid: f64,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub amount_collected_by: String,
    pub remarks: String,
    next_row: u64,
}

impl OrderDraft {
    pub fn new(document_type: DocumentType, order_date: Date) -> Self {
        Self {
            document_type,
            number: String::new(),
            order_date,
            party: None,
            lines: vec![OrderLine::blank(RowId::new(1))],
            discount: 0.0,
            discount_type: DiscountType::Percentage,
            amount_paid: 0.0,
            payment_status: PaymentStatus::Pending,
            payment_method: String::new(),
            amount_collected_by: String::new(),
            remarks: String::new(),
            next_row: 2,
        }
    }

    pub fn add_line(&mut self) -> RowId {
        let row = RowId::new(self.next_row);
        self.next_row += 1;
        self.lines.push(OrderLine::blank(row));
        row
    }

    pub fn remove_line(&mut self, row: RowId) -> Result<()> {
        if self.lines.len() <= 1 {
            bail!("an order needs at least one line");
        }
        let index = self
            .lines
            .iter()
            .position(|line| line.row == row)
            .ok_or_else(|| anyhow!("no order line with row id {}", row.get()))?;
        self.lines.remove(index);
        Ok(())
    }

    pub fn line(&self, row: RowId) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.row == row)
    }

    pub fn line_mut(&mut self, row: RowId) -> Option<&mut OrderLine> {
        self.lines.iter_mut().find(|line| line.row == row)
    }

    pub fn rows(&self) -> Vec<RowId> {
        self.lines.iter().map(|line| line.row).collect()
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary::compute(&self.lines, self.discount, self.discount_type)
    }

    pub fn validate(&self) -> Result<()> {
        if self.number.trim().is_empty() {
            bail!(
                "{} number is required",
                match self.document_type {
                    DocumentType::DeliveryChallan => "challan",
                    DocumentType::SalesInvoice | DocumentType::Purchase => "invoice",
                }
            );
        }
        if self.party.is_none() {
            match self.document_type.party_endpoint() {
                crate::LookupEndpoint::Suppliers => bail!("select a supplier before submitting"),
                _ => bail!("select a client before submitting"),
            }
        }
        for (index, line) in self.lines.iter().enumerate() {
            let position = index + 1;
            if line.item_id.as_ref().is_none_or(LookupId::is_empty) {
                bail!("line {position}: choose an item");
            }
            if line.quantity == 0 {
                bail!("line {position}: quantity must be at least 1");
            }
            if !line.rate.is_finite() || line.rate < 0.0 {
                bail!("line {position}: rate must be non-negative");
            }
            if !line.tax_percent.is_finite() || line.tax_percent < 0.0 {
                bail!("line {position}: tax percent must be non-negative");
            }
        }
        if !self.discount.is_finite() || self.discount < 0.0 {
            bail!("discount must be non-negative");
        }
        if self.discount_type == DiscountType::Percentage && self.discount > 100.0 {
            bail!("percentage discount cannot exceed 100");
        }
        if !self.amount_paid.is_finite() || self.amount_paid < 0.0 {
            bail!("amount paid must be non-negative");
        }
        Ok(())
    }

    /// Builds the JSON body the orders endpoint expects for this document type.
    pub fn to_request(&self) -> Result<OrderRequest> {
        self.validate()?;
        let summary = self.summary();
        let is_purchase = self.document_type == DocumentType::Purchase;

        let items = self
            .lines
            .iter()
            .map(|line| -> Result<OrderItemRequest> {
                let expiry = if line.expiry.trim().is_empty() {
                    is_purchase.then(|| PURCHASE_EXPIRY_FALLBACK.to_owned())
                } else {
                    Some(format_expiry(&line.expiry)?)
                };
                Ok(OrderItemRequest {
                    item_id: line
                        .item_id
                        .as_ref()
                        .map(|id| id.as_str().to_owned())
                        .unwrap_or_default(),
                    item_name: line.item_name.clone(),
                    batch_number: line.batch_number.clone(),
                    expiry,
                    quantity: line.quantity,
                    price: line.rate,
                    tax_percent: line.tax_percent,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let (party_id, party_name) = self
            .party
            .as_ref()
            .map(|party| (party.id.as_str().to_owned(), party.name.clone()))
            .unwrap_or_default();
        let number = self.number.trim().to_owned();

        let mut request = OrderRequest {
            invoice_number: None,
            challan_number: None,
            client_id: None,
            client_name: None,
            supplier_id: None,
            supplier_name: None,
            order_date: format_date(self.order_date)?,
            items,
            total_quantity: summary.total_quantity,
            total_tax: summary.total_tax,
            total_amount: summary.grand_total,
            discount: summary.discount_amount,
            discount_type: self.discount_type,
            amount_paid: self.amount_paid,
            payment_status: self.payment_status,
            payment_method: self.payment_method.trim().to_owned(),
            amount_collected_by: None,
            remarks: self.remarks.trim().to_owned(),
            document_type: self.document_type,
            order_type: self.document_type.order_type(),
            status: "pending",
            draft: false,
        };

        match self.document_type {
            DocumentType::Purchase => {
                request.invoice_number = Some(number);
                request.supplier_id = Some(party_id);
                request.supplier_name = Some(party_name);
                if request.payment_method.is_empty() {
                    request.payment_method = DEFAULT_PURCHASE_PAYMENT_METHOD.to_owned();
                }
            }
            DocumentType::SalesInvoice => {
                request.invoice_number = Some(number.clone());
                request.challan_number = Some(number);
                request.client_id = Some(party_id);
                request.client_name = Some(party_name);
                request.amount_collected_by = Some(self.amount_collected_by.clone());
            }
            DocumentType::DeliveryChallan => {
                request.challan_number = Some(number);
                request.client_id = Some(party_id);
                request.client_name = Some(party_name);
                request.amount_collected_by = Some(self.amount_collected_by.clone());
            }
        }

        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemRequest {
    pub item_id: String,
    pub item_name: String,
    pub batch_number: String,
    #[serde(rename = "Expiry")]
    pub expiry: Option<String>,
    pub quantity: u32,
    pub price: f64,
    pub tax_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challan_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    pub order_date: String,
    pub items: Vec<OrderItemRequest>,
    pub total_quantity: u64,
    pub total_tax: f64,
    pub total_amount: f64,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub amount_paid: f64,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_collected_by: Option<String>,
    pub remarks: String,
    pub document_type: DocumentType,
    pub order_type: &'static str,
    pub status: &'static str,
    pub draft: bool,
}

fn format_date(date: Date) -> Result<String> {
    date.format(format_description!("[year]-[month]-[day]"))
        .context("format order date")
}

/// Converts a date-picker value (`YYYY-MM-DD` or `YYYY-MM`) into the
/// `MM/YYYY` form the orders endpoint stores.
pub fn format_expiry(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let full = if trimmed.len() == 7 {
        format!("{trimmed}-01")
    } else {
        trimmed.to_owned()
    };
    let date = Date::parse(&full, format_description!("[year]-[month]-[day]"))
        .with_context(|| format!("invalid expiry date {raw:?}; use YYYY-MM-DD or YYYY-MM"))?;
    Ok(format!("{:02}/{}", u8::from(date.month()), date.year()))
}

/// Turns a scanned `MM/YYYY` expiry into the `YYYY-MM-01` form a date input
/// accepts. Returns `None` when the value is not in that shape.
pub fn normalize_scanned_expiry(raw: &str) -> Option<String> {
    let (month, year) = raw.trim().split_once('/')?;
    let month: u8 = month.trim().parse().ok()?;
    let year = year.trim();
    if !(1..=12).contains(&month) || year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    Some(format!("{year}-{month:02}-01"))
}

#[cfg(test)]
mod tests {
    use super::{
        OrderDraft, OrderLine, OrderSummary, format_expiry, normalize_scanned_expiry,
        numeric_or_zero,
    };
    use crate::{DiscountType, DocumentType, LookupItem, PaymentStatus, RowId};
    use time::macros::date;

    fn approx(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    fn inventory_item(id: &str, name: &str, rate: f64, tax: f64) -> LookupItem {
        LookupItem::new(id, name)
            .with_extra("rate", rate)
            .with_extra("tax_percent", tax)
    }

    fn ready_sale() -> OrderDraft {
        let mut draft = OrderDraft::new(DocumentType::SalesInvoice, date!(2025 - 03 - 14));
        draft.number = "INV-204".to_owned();
        draft.party = Some(LookupItem::new("c-1", "City Hospital"));
        let row = draft.rows()[0];
        let line = draft.line_mut(row).expect("first line exists");
        line.apply_item(&inventory_item("inv-1", "Blood Tubing Set", 250.0, 12.0));
        line.set_quantity(4);
        draft
    }

    #[test]
    fn line_amount_includes_tax() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.set_quantity(3);
        line.set_rate(Some(100.0));
        line.set_tax_percent(Some(18.0));
        assert!(approx(line.amount(), 354.0), "got {}", line.amount());
    }

    #[test]
    fn quantity_is_clamped_to_one() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.set_quantity(0);
        assert_eq!(line.quantity, 1);
        line.set_quantity(-5);
        assert_eq!(line.quantity, 1);
        line.decrement_quantity();
        assert_eq!(line.quantity, 1);
        line.increment_quantity();
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn missing_numbers_count_as_zero() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.set_rate(None);
        line.set_tax_percent(Some(f64::NAN));
        assert_eq!(line.rate, 0.0);
        assert_eq!(line.tax_percent, 0.0);
        assert_eq!(numeric_or_zero(Some(f64::INFINITY)), 0.0);
    }

    #[test]
    fn percentage_discount_applies_before_tax() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.set_quantity(10);
        line.set_rate(Some(100.0));
        line.set_tax_percent(Some(5.0));

        let summary = OrderSummary::compute(&[line], 10.0, DiscountType::Percentage);
        assert!(approx(summary.subtotal, 1000.0));
        assert!(approx(summary.total_tax, 50.0));
        assert!(approx(summary.discount_amount, 100.0));
        assert!(approx(summary.discounted_subtotal, 900.0));
        assert!(approx(summary.grand_total, 950.0));
    }

    #[test]
    fn flat_discount_is_taken_as_is() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.set_quantity(2);
        line.set_rate(Some(500.0));

        let summary = OrderSummary::compute(&[line], 75.0, DiscountType::Amount);
        assert!(approx(summary.discount_amount, 75.0));
        assert!(approx(summary.grand_total, 925.0));
        assert_eq!(summary.total_quantity, 2);
        assert_eq!(summary.total_items, 1);
    }

    #[test]
    fn clearing_an_item_resets_derived_fields() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.apply_item(&inventory_item("inv-9", "Dialyser F8", 1200.0, 12.0));
        line.batch_number = "B-77".to_owned();

        line.clear_item();
        assert_eq!(line.item_id, None);
        assert!(line.item_name.is_empty());
        assert_eq!(line.rate, 0.0);
        assert_eq!(line.tax_percent, 0.0);
        assert!(line.batch_number.is_empty());
    }

    #[test]
    fn last_line_cannot_be_removed() {
        let mut draft = OrderDraft::new(DocumentType::Purchase, date!(2025 - 01 - 02));
        let first = draft.rows()[0];
        let error = draft.remove_line(first).expect_err("single line must stay");
        assert!(error.to_string().contains("at least one line"));

        let second = draft.add_line();
        assert_ne!(first, second);
        draft.remove_line(first).expect("two lines allow removal");
        assert_eq!(draft.rows(), vec![second]);
    }

    #[test]
    fn validation_requires_party_and_items() {
        let mut draft = ready_sale();
        draft.party = None;
        let error = draft.validate().expect_err("client is required");
        assert!(error.to_string().contains("select a client"));

        let mut draft = ready_sale();
        draft.add_line();
        let error = draft.validate().expect_err("second line has no item");
        assert!(error.to_string().contains("line 2: choose an item"));
    }

    #[test]
    fn validation_rejects_discount_over_one_hundred_percent() {
        let mut draft = ready_sale();
        draft.discount = 120.0;
        let error = draft.validate().expect_err("discount too large");
        assert!(error.to_string().contains("cannot exceed 100"));

        draft.discount_type = DiscountType::Amount;
        draft.validate().expect("flat discount above 100 is fine");
    }

    #[test]
    fn sale_request_carries_invoice_and_challan_numbers() {
        let draft = ready_sale();
        let request = draft.to_request().expect("valid draft");
        let json = serde_json::to_value(&request).expect("serializable");

        assert_eq!(json["invoice_number"], "INV-204");
        assert_eq!(json["challan_number"], "INV-204");
        assert_eq!(json["client_id"], "c-1");
        assert_eq!(json["order_type"], "sale");
        assert_eq!(json["document_type"], "sales-invoice");
        assert_eq!(json["order_date"], "2025-03-14");
        assert_eq!(json["items"][0]["price"], 250.0);
        assert_eq!(json["items"][0]["Expiry"], serde_json::Value::Null);
        assert!(json.get("supplier_id").is_none());
    }

    #[test]
    fn challan_request_omits_invoice_number() {
        let mut draft = ready_sale();
        draft.document_type = DocumentType::DeliveryChallan;
        draft.amount_collected_by = "Ravi".to_owned();

        let json = serde_json::to_value(draft.to_request().expect("valid draft"))
            .expect("serializable");
        assert!(json.get("invoice_number").is_none());
        assert_eq!(json["challan_number"], "INV-204");
        assert_eq!(json["order_type"], "delivery_challan");
        assert_eq!(json["amount_collected_by"], "Ravi");
    }

    #[test]
    fn purchase_request_fills_defaults() {
        let mut draft = OrderDraft::new(DocumentType::Purchase, date!(2025 - 02 - 01));
        draft.number = "PO-1".to_owned();
        draft.party = Some(LookupItem::new("s-1", "Medical Supplies Co."));
        draft.payment_status = PaymentStatus::Paid;
        let row = draft.rows()[0];
        let line = draft.line_mut(row).expect("line exists");
        line.apply_item(&inventory_item("inv-2", "Surgical Needles", 150.0, 5.0));
        line.expiry = "2027-08-19".to_owned();
        let second = draft.add_line();
        draft
            .line_mut(second)
            .expect("second line exists")
            .apply_item(&inventory_item("inv-3", "Spare Kit", 300.0, 0.0));

        let request = draft.to_request().expect("valid purchase");
        assert_eq!(request.payment_method, "cash");
        assert_eq!(request.supplier_name.as_deref(), Some("Medical Supplies Co."));
        assert_eq!(request.items[0].expiry.as_deref(), Some("08/2027"));
        assert_eq!(request.items[1].expiry.as_deref(), Some("01/2099"));
        assert_eq!(request.order_type, "purchase");
    }

    #[test]
    fn expiry_formats_accept_month_precision() {
        assert_eq!(format_expiry("2026-11").expect("month input"), "11/2026");
        assert_eq!(format_expiry("2026-01-31").expect("date input"), "01/2026");
        assert!(format_expiry("next year").is_err());
    }

    #[test]
    fn scanned_expiry_is_normalized() {
        assert_eq!(
            normalize_scanned_expiry("8/2027").as_deref(),
            Some("2027-08-01")
        );
        assert_eq!(normalize_scanned_expiry("13/2027"), None);
        assert_eq!(normalize_scanned_expiry("2027"), None);
    }

    #[test]
    fn scanned_line_expiry_is_sent_as_month_and_year() {
        let mut line = OrderLine::blank(RowId::new(1));
        line.set_expiry(" 8/2027 ");
        assert_eq!(line.expiry, "2027-08-01");
        line.set_expiry("2026-11");
        assert_eq!(line.expiry, "2026-11");

        let mut draft = ready_sale();
        let row = draft.rows()[0];
        draft.line_mut(row).expect("first line exists").set_expiry("03/2028");
        let request = draft.to_request().expect("valid sale");
        assert_eq!(request.items[0].expiry.as_deref(), Some("03/2028"));
    }
}
