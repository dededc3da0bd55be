// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::NotificationId;

const SEEDED_LOG_LIMIT: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Success,
    Error,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub timestamp: OffsetDateTime,
    pub read: bool,
}

/// In-memory notification feed, newest first.
#[derive(Debug, Clone, Default)]
pub struct Notifications {
    entries: Vec<Notification>,
    next_id: u64,
}

impl Notifications {
    pub fn add(
        &mut self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        now: OffsetDateTime,
    ) -> NotificationId {
        self.next_id += 1;
        let id = NotificationId::new(self.next_id);
        self.entries.insert(
            0,
            Notification {
                id,
                title: title.to_owned(),
                message: message.to_owned(),
                kind,
                timestamp: now,
                read: false,
            },
        );
        id
    }

    pub fn error(&mut self, message: &str, now: OffsetDateTime) -> NotificationId {
        self.add(NotificationKind::Error, "Error", message, now)
    }

    /// Replaces the feed with the most recent backend log lines. `messages`
    /// is in the order the logs endpoint returns them (oldest first).
    pub fn seed_from_logs<I, S>(&mut self, messages: I, now: OffsetDateTime)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let messages: Vec<S> = messages.into_iter().collect();
        self.entries.clear();
        for message in messages.iter().rev().take(SEEDED_LOG_LIMIT).rev() {
            self.add(NotificationKind::Info, "System Log", message.as_ref(), now);
        }
    }

    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.read = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.read).count()
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationKind, Notifications};
    use time::macros::datetime;

    #[test]
    fn newest_notification_comes_first() {
        let now = datetime!(2025-01-15 10:00 UTC);
        let mut feed = Notifications::default();
        feed.add(NotificationKind::Success, "Order Created", "INV-1 saved", now);
        feed.error("Failed to fetch clients", now);

        let entries = feed.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, NotificationKind::Error);
        assert_eq!(entries[1].title, "Order Created");
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn mark_read_only_touches_matching_entry() {
        let now = datetime!(2025-01-15 10:00 UTC);
        let mut feed = Notifications::default();
        let first = feed.add(NotificationKind::Info, "a", "a", now);
        feed.add(NotificationKind::Info, "b", "b", now);

        assert!(feed.mark_read(first));
        assert_eq!(feed.unread_count(), 1);
        assert!(!feed.mark_read(crate::NotificationId::new(99)));

        feed.clear();
        assert!(feed.entries().is_empty());
    }

    #[test]
    fn seeding_keeps_the_fifteen_latest_logs_newest_first() {
        let now = datetime!(2025-01-15 10:00 UTC);
        let mut feed = Notifications::default();
        feed.error("stale", now);
        let logs: Vec<String> = (1..=20).map(|n| format!("log {n}")).collect();

        feed.seed_from_logs(&logs, now);
        let entries = feed.entries();
        assert_eq!(entries.len(), 15);
        assert_eq!(entries[0].message, "log 20");
        assert_eq!(entries[14].message, "log 6");
        assert!(entries.iter().all(|entry| entry.title == "System Log"));
    }
}
