// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::RowId;

/// Identity of a lookup-bound input on the order form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Client,
    Supplier,
    Item(RowId),
}

/// Whether a focus event came from the user or from code moving focus
/// around. Programmatic focus never activates a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOrigin {
    User,
    Programmatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusCommand {
    Focus(FieldKey, FocusOrigin),
    Blur(FieldKey),
    OutsideClick,
    Forget(FieldKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    Opened(FieldKey),
    Closed(FieldKey),
}

/// Tracks the single open dropdown across a group of lookup fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropdownFocus {
    active: Option<FieldKey>,
}

impl DropdownFocus {
    pub fn active(&self) -> Option<FieldKey> {
        self.active
    }

    pub fn is_open(&self, key: FieldKey) -> bool {
        self.active == Some(key)
    }

    pub fn dispatch(&mut self, command: FocusCommand) -> Vec<FocusEvent> {
        match command {
            FocusCommand::Focus(_, FocusOrigin::Programmatic) => Vec::new(),
            FocusCommand::Focus(key, FocusOrigin::User) => {
                if self.active == Some(key) {
                    return Vec::new();
                }
                let mut events = self.close_active();
                self.active = Some(key);
                events.push(FocusEvent::Opened(key));
                events
            }
            FocusCommand::Blur(key) => {
                if self.active == Some(key) {
                    self.close_active()
                } else {
                    Vec::new()
                }
            }
            FocusCommand::OutsideClick => self.close_active(),
            FocusCommand::Forget(key) => {
                if self.active == Some(key) {
                    self.active = None;
                }
                Vec::new()
            }
        }
    }

    fn close_active(&mut self) -> Vec<FocusEvent> {
        self.active
            .take()
            .map(FocusEvent::Closed)
            .into_iter()
            .collect()
    }
}
