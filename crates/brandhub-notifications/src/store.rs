//! Per-session notification store.
//!
//! The store is a synchronous, infallible mutation surface. It holds the
//! records of exactly one scope, newest first, with no two records sharing
//! an id. Records arrive from two sources that may interleave arbitrarily:
//! history fetches and live channel events. Ingesting the same record from
//! both sources, in either order, leaves one copy in the same final state.
//!
//! The displayed unread count is the number of unread records held plus the
//! unread records the server reported for history pages it did not return
//! (`untracked_unread`). A record held by the store is never counted twice:
//! a live record at or below the oldest timestamp of the last page is one of
//! the off-page records and moves out of `untracked_unread` when it is held.

use std::collections::{HashMap, HashSet};

use brandhub_core::ScopeId;
use serde::Serialize;
use time::OffsetDateTime;

use crate::events::LiveEvent;
use crate::types::{HistoryPage, NotificationKind, NotificationRecord, NotificationStatus};

/// Where the store learned about a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    History,
    Live,
}

#[derive(Debug, Clone)]
struct StoredNotification {
    record: NotificationRecord,
    source: RecordSource,
    durable: bool,
}

/// A record taken out of the store by `remove` or `clear`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedRecord {
    pub record: NotificationRecord,
    /// Whether the server knows this record by its id.
    pub durable: bool,
}

/// Outcome of [`NotificationStore::ingest_live_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveIngest {
    Inserted(NotificationKind),
    Duplicate,
    ForeignScope,
}

/// Outcome of [`NotificationStore::ingest_history`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryIngest {
    /// Records held from this page after the merge
    pub history_records: usize,
    /// Live records that were already held and are now confirmed by history
    pub confirmed_live: usize,
    /// Live records kept because the page did not contain them
    pub retained_live: usize,
    /// Records dropped because they belong to another scope
    pub foreign_scope: usize,
}

/// Outcome of [`NotificationStore::mark_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkRead {
    Marked,
    AlreadyRead,
    /// The id is not held; nothing changed.
    NotHeld,
    /// The id is not held and was known to be off-page; the untracked
    /// history total was decremented.
    Untracked,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub scope_id: ScopeId,
    pub records: Vec<NotificationRecord>,
    pub unread_count: usize,
}

#[derive(Debug, Clone)]
pub struct NotificationStore {
    scope: ScopeId,
    entries: Vec<StoredNotification>,
    untracked_unread: usize,
    /// Oldest `created_at` of the last history page
    history_floor: Option<OffsetDateTime>,
}

impl NotificationStore {
    pub fn new(scope: ScopeId) -> Self {
        Self {
            scope,
            entries: Vec::new(),
            untracked_unread: 0,
            history_floor: None,
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// Merge a freshly fetched history page.
    ///
    /// History-sourced records are replaced by the page. Live records not in
    /// the page stay in front. For ids present on both sides `read` wins and
    /// the page's payload is kept.
    pub fn ingest_history(&mut self, page: HistoryPage) -> HistoryIngest {
        let mut outcome = HistoryIngest::default();

        let previous: HashMap<String, (NotificationStatus, RecordSource)> = self
            .entries
            .iter()
            .map(|e| (e.record.id.clone(), (e.record.status, e.source)))
            .collect();

        let mut seen = HashSet::new();
        let mut page_unread = 0usize;
        let mut merged = Vec::with_capacity(page.records.len());

        for mut record in page.records {
            if record.scope_id != self.scope {
                outcome.foreign_scope += 1;
                continue;
            }
            if !seen.insert(record.id.clone()) {
                continue;
            }
            if record.is_unread() {
                page_unread += 1;
            }
            if let Some((status, source)) = previous.get(&record.id) {
                record.status = status.merge(record.status);
                if *source == RecordSource::Live {
                    outcome.confirmed_live += 1;
                }
            }
            merged.push(StoredNotification {
                record,
                source: RecordSource::History,
                durable: true,
            });
        }
        merged.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
        let floor = merged.last().map(|e| e.record.created_at);

        let mut entries: Vec<StoredNotification> = self
            .entries
            .drain(..)
            .filter(|e| e.source == RecordSource::Live && !seen.contains(&e.record.id))
            .collect();
        outcome.retained_live = entries.len();
        outcome.history_records = merged.len();

        // Retained live records older than the page are part of its unread total.
        let held_off_page = entries
            .iter()
            .filter(|e| e.record.is_unread() && Self::is_off_page(floor, &e.record))
            .count();
        entries.extend(merged);
        self.entries = entries;

        self.history_floor = floor;
        self.untracked_unread = page
            .unread_total
            .map(|total| total.saturating_sub(page_unread + held_off_page))
            .unwrap_or(0);

        outcome
    }

    /// Prepend a live event. A record already held, from either source, is left untouched.
    pub fn ingest_live_event(&mut self, event: LiveEvent) -> LiveIngest {
        if event.record.scope_id != self.scope {
            return LiveIngest::ForeignScope;
        }
        if self.position(&event.record.id).is_some() {
            return LiveIngest::Duplicate;
        }
        let kind = event.kind();
        let mut record = event.record;
        record.status = NotificationStatus::Unread;
        if Self::is_off_page(self.history_floor, &record) {
            self.untracked_unread = self.untracked_unread.saturating_sub(1);
        }
        self.entries.insert(
            0,
            StoredNotification {
                record,
                source: RecordSource::Live,
                durable: event.durable,
            },
        );
        LiveIngest::Inserted(kind)
    }

    pub fn mark_read(&mut self, id: &str) -> MarkRead {
        match self.position(id) {
            Some(idx) => {
                let record = &mut self.entries[idx].record;
                if record.is_unread() {
                    record.status = NotificationStatus::Read;
                    MarkRead::Marked
                } else {
                    MarkRead::AlreadyRead
                }
            }
            None => MarkRead::NotHeld,
        }
    }

    /// Mark a record the caller knows sits on a history page that was not
    /// fetched. A held id is marked like [`mark_read`](Self::mark_read).
    pub fn mark_off_page_read(&mut self, id: &str) -> MarkRead {
        match self.mark_read(id) {
            MarkRead::NotHeld if self.untracked_unread > 0 => {
                self.untracked_unread -= 1;
                MarkRead::Untracked
            }
            outcome => outcome,
        }
    }

    /// Mark everything read. Returns how many held records changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for entry in &mut self.entries {
            if entry.record.is_unread() {
                entry.record.status = NotificationStatus::Read;
                changed += 1;
            }
        }
        self.untracked_unread = 0;
        changed
    }

    pub fn remove(&mut self, id: &str) -> Option<RemovedRecord> {
        let idx = self.position(id)?;
        let entry = self.entries.remove(idx);
        Some(RemovedRecord {
            record: entry.record,
            durable: entry.durable,
        })
    }

    /// Empty the store, returning what was held (newest first).
    pub fn clear(&mut self) -> Vec<RemovedRecord> {
        self.untracked_unread = 0;
        self.history_floor = None;
        self.entries
            .drain(..)
            .map(|e| RemovedRecord {
                record: e.record,
                durable: e.durable,
            })
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|e| e.record.is_unread()).count() + self.untracked_unread
    }

    pub fn get(&self, id: &str) -> Option<&NotificationRecord> {
        self.position(id).map(|idx| &self.entries[idx].record)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// `None` when the id is not held.
    pub fn is_durable(&self, id: &str) -> Option<bool> {
        self.position(id).map(|idx| self.entries[idx].durable)
    }

    pub fn source_of(&self, id: &str) -> Option<RecordSource> {
        self.position(id).map(|idx| self.entries[idx].source)
    }

    pub fn records(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            scope_id: self.scope.clone(),
            records: self.records().cloned().collect(),
            unread_count: self.unread_count(),
        }
    }

    fn is_off_page(floor: Option<OffsetDateTime>, record: &NotificationRecord) -> bool {
        floor.is_some_and(|floor| record.created_at <= floor)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.record.id == id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{NotificationPayload, OrderPlaced, RefundRequested};
    use time::OffsetDateTime;

    pub(crate) fn scope(s: &str) -> ScopeId {
        ScopeId::new(s).unwrap()
    }

    pub(crate) fn record(id: &str, scope_id: &str, minute: i64) -> NotificationRecord {
        NotificationRecord {
            id: id.to_string(),
            scope_id: scope(scope_id),
            status: NotificationStatus::Unread,
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + minute * 60)
                .unwrap(),
            payload: NotificationPayload::OrderPlaced(OrderPlaced {
                order_id: format!("order-{id}"),
                customer_name: "Ada".to_string(),
                total_amount: Some(10.0),
                currency: None,
                item_count: None,
            }),
        }
    }

    fn read(mut r: NotificationRecord) -> NotificationRecord {
        r.status = NotificationStatus::Read;
        r
    }

    fn ids(store: &NotificationStore) -> Vec<&str> {
        store.records().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_new_order_event_scenario() {
        let mut store = NotificationStore::new(scope("brandA"));
        let outcome = store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));

        assert_eq!(outcome, LiveIngest::Inserted(NotificationKind::OrderPlaced));
        assert_eq!(store.len(), 1);
        assert!(store.get("n1").unwrap().is_unread());
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_cross_tenant_event_dropped() {
        let mut store = NotificationStore::new(scope("brandA"));
        let outcome = store.ingest_live_event(LiveEvent::from_record(record("n1", "brandB", 0)));

        assert_eq!(outcome, LiveIngest::ForeignScope);
        assert!(store.is_empty());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_live_events_prepend_in_receipt_order() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));
        store.ingest_live_event(LiveEvent::from_record(record("n2", "brandA", 1)));
        store.ingest_live_event(LiveEvent::from_record(record("n3", "brandA", 2)));
        assert_eq!(ids(&store), vec!["n3", "n2", "n1"]);
        assert_eq!(store.unread_count(), 3);
    }

    #[test]
    fn test_duplicate_live_event_ignored() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));
        let outcome = store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));
        assert_eq!(outcome, LiveIngest::Duplicate);
        assert_eq!(store.len(), 1);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_history_then_live_is_idempotent() {
        let r = record("n1", "brandA", 0);
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(HistoryPage::new(vec![r.clone()]));
        store.ingest_live_event(LiveEvent::from_record(r.clone()));

        assert_eq!(ids(&store), vec!["n1"]);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.source_of("n1"), Some(RecordSource::History));
    }

    #[test]
    fn test_live_then_history_is_idempotent() {
        let r = record("n1", "brandA", 0);
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(r.clone()));
        let outcome = store.ingest_history(HistoryPage::new(vec![r.clone()]));

        assert_eq!(outcome.confirmed_live, 1);
        assert_eq!(ids(&store), vec!["n1"]);
        assert_eq!(store.unread_count(), 1);
        assert_eq!(store.source_of("n1"), Some(RecordSource::History));
    }

    #[test]
    fn test_both_orders_converge() {
        let records = vec![record("n2", "brandA", 2), record("n1", "brandA", 1)];
        let live = record("n3", "brandA", 3);

        let mut a = NotificationStore::new(scope("brandA"));
        a.ingest_history(HistoryPage::new(records.clone()));
        a.ingest_live_event(LiveEvent::from_record(records[0].clone()));
        a.ingest_live_event(LiveEvent::from_record(live.clone()));

        let mut b = NotificationStore::new(scope("brandA"));
        b.ingest_live_event(LiveEvent::from_record(live));
        b.ingest_live_event(LiveEvent::from_record(records[0].clone()));
        b.ingest_history(HistoryPage::new(records));

        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(ids(&a), vec!["n3", "n2", "n1"]);
    }

    #[test]
    fn test_read_wins_over_stale_history() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));
        store.mark_read("n1");

        store.ingest_history(HistoryPage::new(vec![record("n1", "brandA", 0)]));
        assert!(!store.get("n1").unwrap().is_unread());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_history_replaces_previous_history_but_keeps_live() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(HistoryPage::new(vec![
            record("h1", "brandA", 1),
            record("h2", "brandA", 0),
        ]));
        store.ingest_live_event(LiveEvent::from_record(record("l1", "brandA", 5)));

        // h2 was deleted server-side in the meantime
        let outcome = store.ingest_history(HistoryPage::new(vec![record("h1", "brandA", 1)]));

        assert_eq!(outcome.retained_live, 1);
        assert_eq!(outcome.history_records, 1);
        assert_eq!(ids(&store), vec!["l1", "h1"]);
    }

    #[test]
    fn test_history_sorted_newest_first_and_deduped() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(HistoryPage::new(vec![
            record("old", "brandA", 0),
            record("new", "brandA", 9),
            record("new", "brandA", 9),
            record("mid", "brandA", 4),
        ]));
        assert_eq!(ids(&store), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_history_drops_foreign_scope_records() {
        let mut store = NotificationStore::new(scope("brandA"));
        let outcome = store.ingest_history(HistoryPage::new(vec![
            record("n1", "brandA", 0),
            record("n2", "brandB", 0),
        ]));
        assert_eq!(outcome.foreign_scope, 1);
        assert_eq!(ids(&store), vec!["n1"]);
    }

    #[test]
    fn test_unread_total_counts_off_page_records_once() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(
            HistoryPage::new(vec![
                record("n1", "brandA", 1),
                read(record("n2", "brandA", 0)),
            ])
            .with_unread_total(4),
        );
        // n1 held and unread, three more unread on later pages
        assert_eq!(store.unread_count(), 4);

        // Re-delivery of a held record does not double count
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 1)));
        assert_eq!(store.unread_count(), 4);

        store.mark_read("n1");
        assert_eq!(store.unread_count(), 3);

        assert_eq!(store.mark_read("off-page"), MarkRead::NotHeld);
        assert_eq!(store.unread_count(), 3);
        assert_eq!(store.mark_off_page_read("off-page"), MarkRead::Untracked);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn test_mark_read_after_remove_keeps_off_page_total() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(
            HistoryPage::new(vec![record("n1", "brandA", 5)]).with_unread_total(4),
        );
        assert_eq!(store.unread_count(), 4);

        assert!(store.remove("n1").is_some());
        assert_eq!(store.unread_count(), 3);

        // A late mark-read confirmation for the removed record
        assert_eq!(store.mark_read("n1"), MarkRead::NotHeld);
        assert_eq!(store.unread_count(), 3);
    }

    #[test]
    fn test_off_page_record_delivered_live_counts_once() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(
            HistoryPage::new(vec![record("n1", "brandA", 5)]).with_unread_total(2),
        );
        assert_eq!(store.unread_count(), 2);

        // x is older than the page, so it is the off-page unread record
        store.ingest_live_event(LiveEvent::from_record(record("x", "brandA", 1)));
        assert_eq!(store.unread_count(), 2);

        // A genuinely new record still adds one
        store.ingest_live_event(LiveEvent::from_record(record("n2", "brandA", 9)));
        assert_eq!(store.unread_count(), 3);

        // Refetching the same page keeps x held and counted once
        store.ingest_history(
            HistoryPage::new(vec![record("n1", "brandA", 5)]).with_unread_total(2),
        );
        assert_eq!(store.unread_count(), 3);
        assert_eq!(ids(&store), vec!["n2", "x", "n1"]);
    }

    #[test]
    fn test_counter_never_negative() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));

        assert_eq!(store.mark_read("n1"), MarkRead::Marked);
        assert_eq!(store.mark_read("n1"), MarkRead::AlreadyRead);
        assert_eq!(store.mark_read("ghost"), MarkRead::NotHeld);
        assert_eq!(store.mark_off_page_read("ghost"), MarkRead::NotHeld);
        assert_eq!(store.unread_count(), 0);

        assert!(store.remove("n1").is_some());
        assert!(store.remove("n1").is_none());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_remove_unread_decrements() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));
        store.ingest_live_event(LiveEvent::from_record(record("n2", "brandA", 1)));
        let removed = store.remove("n2").unwrap();
        assert!(removed.durable);
        assert_eq!(removed.record.id, "n2");
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_mark_all_read_zeroes_counter() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_history(
            HistoryPage::new(vec![record("n1", "brandA", 0)]).with_unread_total(10),
        );
        store.ingest_live_event(LiveEvent::from_record(record("n2", "brandA", 1)));
        assert_eq!(store.unread_count(), 11);

        assert_eq!(store.mark_all_read(), 2);
        assert_eq!(store.unread_count(), 0);
        assert!(store.records().all(|r| !r.is_unread()));
    }

    #[test]
    fn test_clear_returns_durability() {
        let mut store = NotificationStore::new(scope("brandA"));
        store.ingest_live_event(LiveEvent::from_record(record("n1", "brandA", 0)));
        let mut local = LiveEvent::from_record(record("local:x", "brandA", 1));
        local.durable = false;
        store.ingest_live_event(local);

        let cleared = store.clear();
        assert_eq!(cleared.len(), 2);
        assert!(!cleared[0].durable);
        assert!(cleared[1].durable);
        assert!(store.is_empty());
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_history_payload_wins_on_merge() {
        let mut store = NotificationStore::new(scope("brandA"));
        let mut live = record("n1", "brandA", 0);
        live.payload = NotificationPayload::RefundRequested(RefundRequested {
            order_id: "o-1".into(),
            customer_name: "Ada".into(),
            amount: None,
            reason: crate::types::DEFAULT_REASON.into(),
        });
        store.ingest_live_event(LiveEvent::from_record(live));
        store.ingest_history(HistoryPage::new(vec![record("n1", "brandA", 0)]));
        assert_eq!(
            store.get("n1").unwrap().kind(),
            NotificationKind::OrderPlaced
        );
    }
}
