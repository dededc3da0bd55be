// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use bizsuite_app::{
    DocumentType, DropdownFocus, FieldKey, FocusCommand, FocusEvent, FocusOrigin, LookupEndpoint,
    LookupItem, OrderDraft, OrderSummary, RowId,
};
use std::collections::BTreeMap;
use tokio::task::JoinHandle;

use crate::batches::BatchState;
use crate::field::LookupField;
use crate::session::LookupSession;
use crate::source::DropdownSource;

/// An order being composed: the draft plus the party picker and one item
/// picker per line. Each item picker has its own inventory lookup over the
/// session cache, and at most one picker has its dropdown open.
pub struct OrderEntry<S> {
    session: LookupSession<S>,
    draft: OrderDraft,
    focus: DropdownFocus,
    party: LookupField<S>,
    rows: BTreeMap<RowId, LookupField<S>>,
}

impl<S: DropdownSource> OrderEntry<S> {
    pub fn new(session: &LookupSession<S>, draft: OrderDraft) -> Self {
        let party_key = match draft.document_type {
            DocumentType::Purchase => FieldKey::Supplier,
            DocumentType::SalesInvoice | DocumentType::DeliveryChallan => FieldKey::Client,
        };
        let party = session.field(
            party_key,
            session.lookup(draft.document_type.party_endpoint()),
        );
        let rows = draft
            .rows()
            .into_iter()
            .map(|row| (row, row_field(session, row)))
            .collect();

        Self {
            session: session.clone(),
            draft,
            focus: DropdownFocus::default(),
            party,
            rows,
        }
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    /// Header fields only; lines go through `add_line` and `remove_line` so
    /// every line keeps its item picker.
    pub fn draft_mut(&mut self) -> &mut OrderDraft {
        &mut self.draft
    }

    pub fn into_draft(self) -> OrderDraft {
        self.draft
    }

    pub fn summary(&self) -> OrderSummary {
        self.draft.summary()
    }

    pub fn active_field(&self) -> Option<FieldKey> {
        self.focus.active()
    }

    pub fn party_field(&self) -> &LookupField<S> {
        &self.party
    }

    pub fn item_field(&self, row: RowId) -> Option<&LookupField<S>> {
        self.rows.get(&row)
    }

    pub fn add_line(&mut self) -> RowId {
        let row = self.draft.add_line();
        self.rows.insert(row, row_field(&self.session, row));
        row
    }

    pub fn remove_line(&mut self, row: RowId) -> Result<()> {
        self.draft.remove_line(row)?;
        self.rows.remove(&row);
        self.focus.dispatch(FocusCommand::Forget(FieldKey::Item(row)));
        Ok(())
    }

    /// Routes a focus event through the focus group, closing whichever
    /// dropdown was open and loading the newly opened one.
    pub async fn focus_field(&mut self, key: FieldKey, origin: FocusOrigin) -> Result<()> {
        self.ensure_field(key)?;
        for event in self.focus.dispatch(FocusCommand::Focus(key, origin)) {
            match event {
                FocusEvent::Closed(closed) => self.close_field(closed),
                FocusEvent::Opened(opened) => {
                    if let Some(field) = self.field_mut(opened) {
                        field.focus(FocusOrigin::User).await;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn click_outside(&mut self) {
        for event in self.focus.dispatch(FocusCommand::OutsideClick) {
            if let FocusEvent::Closed(closed) = event {
                self.close_field(closed);
            }
        }
    }

    pub fn type_party(&mut self, text: &str) {
        let key = self.party.key();
        self.activate(key);
        let draft = &mut self.draft;
        self.party.input(text, || draft.party = None);
    }

    pub fn select_party(&mut self, item: LookupItem) {
        let key = self.party.key();
        let draft = &mut self.draft;
        self.party
            .select(item, |item| draft.party = Some(item.clone()));
        self.deactivate(key);
    }

    pub fn type_item(&mut self, row: RowId, text: &str) -> Result<()> {
        let key = FieldKey::Item(row);
        self.ensure_field(key)?;
        self.activate(key);

        let draft = &mut self.draft;
        let field = self
            .rows
            .get_mut(&row)
            .ok_or_else(|| missing_row(row))?;
        field.input(text, || {
            if let Some(line) = draft.line_mut(row) {
                line.clear_item();
            }
        });
        Ok(())
    }

    /// Copies the item into its line and starts loading its batch numbers.
    /// The returned handle resolves once the batches are cached.
    pub fn select_item(&mut self, row: RowId, item: LookupItem) -> Result<JoinHandle<Vec<String>>> {
        let key = FieldKey::Item(row);
        let item_id = item.id.clone();

        let draft = &mut self.draft;
        let field = self
            .rows
            .get_mut(&row)
            .ok_or_else(|| missing_row(row))?;
        field.select(item, |item| {
            if let Some(line) = draft.line_mut(row) {
                line.apply_item(item);
            }
        });
        self.deactivate(key);

        Ok(self.session.batches().spawn_load(item_id))
    }

    pub fn choose_batch(&mut self, row: RowId, batch: &str) -> Result<()> {
        let line = self.draft.line_mut(row).ok_or_else(|| missing_row(row))?;
        line.batch_number = batch.to_owned();
        Ok(())
    }

    pub fn set_expiry(&mut self, row: RowId, raw: &str) -> Result<()> {
        let line = self.draft.line_mut(row).ok_or_else(|| missing_row(row))?;
        line.set_expiry(raw);
        Ok(())
    }

    /// Batch choices for a line. A line without an item has none.
    pub fn row_batches(&self, row: RowId) -> BatchState {
        self.draft
            .line(row)
            .and_then(|line| line.item_id.as_ref())
            .map(|item_id| self.session.batches().state(item_id))
            .unwrap_or_default()
    }

    fn activate(&mut self, key: FieldKey) {
        for event in self.focus.dispatch(FocusCommand::Focus(key, FocusOrigin::User)) {
            if let FocusEvent::Closed(closed) = event {
                self.close_field(closed);
            }
        }
    }

    fn deactivate(&mut self, key: FieldKey) {
        self.focus.dispatch(FocusCommand::Blur(key));
    }

    fn close_field(&mut self, key: FieldKey) {
        if let Some(field) = self.field_mut(key) {
            field.close();
        }
    }

    fn ensure_field(&self, key: FieldKey) -> Result<()> {
        let known = match key {
            FieldKey::Item(row) => self.rows.contains_key(&row),
            other => other == self.party.key(),
        };
        if known {
            Ok(())
        } else {
            Err(anyhow!("no lookup field {key:?} on this order"))
        }
    }

    fn field_mut(&mut self, key: FieldKey) -> Option<&mut LookupField<S>> {
        match key {
            FieldKey::Item(row) => self.rows.get_mut(&row),
            other if other == self.party.key() => Some(&mut self.party),
            _ => None,
        }
    }
}

fn row_field<S: DropdownSource>(session: &LookupSession<S>, row: RowId) -> LookupField<S> {
    session.field(FieldKey::Item(row), session.lookup(LookupEndpoint::Inventory))
}

fn missing_row(row: RowId) -> anyhow::Error {
    anyhow!("no order line with row id {}", row.get())
}
