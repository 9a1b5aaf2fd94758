//! Bounded log of sent requests and their outcomes, newest first.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::db::Store;
use crate::types::{HistoryEntry, RequestSnapshot, ResponseOutcome};

/// Maximum number of entries kept
pub const HISTORY_CAPACITY: usize = 20;

/// Store key holding the serialized log
pub const HISTORY_KEY: &str = "requestHistory";

#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    last_id: i64,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            last_id: 0,
        }
    }

    /// Rebuild a log from entries in newest-first order, keeping at most the capacity.
    pub fn from_entries(entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut log = Self::new();
        for entry in entries.into_iter().take(HISTORY_CAPACITY) {
            if let Ok(id) = entry.id.parse::<i64>() {
                log.last_id = log.last_id.max(id);
            }
            log.entries.push_back(entry);
        }
        log
    }

    /// Record a finished send. Returns the new entry's id.
    pub fn record(&mut self, request: RequestSnapshot, outcome: ResponseOutcome) -> String {
        self.record_at(Utc::now(), request, outcome)
    }

    fn record_at(
        &mut self,
        now: DateTime<Utc>,
        request: RequestSnapshot,
        outcome: ResponseOutcome,
    ) -> String {
        // Millisecond timestamps, bumped when two sends land in the same millisecond.
        let id = now.timestamp_millis().max(self.last_id + 1);
        self.last_id = id;

        let entry = HistoryEntry {
            id: id.to_string(),
            created_at: now.to_rfc3339(),
            request,
            outcome,
        };

        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_CAPACITY);
        id.to_string()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of the request and outcome recorded under `id`.
    pub fn load_entry(&self, id: &str) -> Option<(RequestSnapshot, ResponseOutcome)> {
        self.get(id)
            .map(|entry| (entry.request.clone(), entry.outcome.clone()))
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the persisted log. Unreadable data is logged and treated as empty.
    pub fn load(store: &Store) -> Result<Self> {
        let Some(raw) = store.get(HISTORY_KEY)? else {
            return Ok(Self::new());
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => Ok(Self::from_entries(entries)),
            Err(e) => {
                log::warn!("Discarding unreadable request history: {}", e);
                Ok(Self::new())
            }
        }
    }

    /// Persist the log; an empty log removes the stored entry.
    pub fn save(&self, store: &Store) -> Result<()> {
        if self.entries.is_empty() {
            return store.remove(HISTORY_KEY);
        }
        let json = serde_json::to_string(&self.entries)?;
        store.set(HISTORY_KEY, &json)
    }
}

/// Human-friendly age of an entry, e.g. `3 min ago`.
pub fn format_relative_time(timestamp: &str) -> String {
    let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };

    let duration = Utc::now().signed_duration_since(dt);
    if duration.num_seconds() < 60 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        format!("{} min ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{} hours ago", duration.num_hours())
    } else {
        format!("{} days ago", duration.num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_value::KeyValue;
    use crate::types::{HttpMethod, ResponseData};

    fn snapshot(n: usize) -> RequestSnapshot {
        RequestSnapshot::new(HttpMethod::GET, format!("https://example.com/items/{}", n))
    }

    fn outcome() -> ResponseOutcome {
        ResponseOutcome::Failure(ResponseData::client_error("offline", 1))
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = HistoryLog::new();
        for n in 0..25 {
            log.record(snapshot(n), outcome());
        }

        assert_eq!(log.len(), HISTORY_CAPACITY);
        let urls: Vec<_> = log.iter().map(|e| e.request.url.clone()).collect();
        assert_eq!(urls.first().unwrap(), "https://example.com/items/24");
        assert_eq!(urls.last().unwrap(), "https://example.com/items/5");
        assert!(!urls.iter().any(|u| u.ends_with("/items/4")));
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut log = HistoryLog::new();
        let now = Utc::now();
        let first = log.record_at(now, snapshot(1), outcome());
        let second = log.record_at(now, snapshot(2), outcome());
        assert!(second.parse::<i64>().unwrap() > first.parse::<i64>().unwrap());
    }

    #[test]
    fn test_load_entry_round_trip() {
        let mut log = HistoryLog::new();
        let request = RequestSnapshot {
            method: HttpMethod::PUT,
            url: "https://example.com/users/1".to_string(),
            query_params: vec![KeyValue::new("notify", "true")],
            headers: vec![KeyValue::new("X-Trace", "1"), KeyValue::new("X-Trace", "2")],
            body: "{\"name\":\"Ada\"}".to_string(),
        };
        let id = log.record(request.clone(), outcome());
        log.record(snapshot(9), outcome());

        let (loaded, loaded_outcome) = log.load_entry(&id).unwrap();
        assert_eq!(loaded, request);
        assert_eq!(loaded_outcome, outcome());
    }

    #[test]
    fn test_load_unknown_id() {
        let log = HistoryLog::new();
        assert!(log.load_entry("42").is_none());
    }

    #[test]
    fn test_access_does_not_reorder() {
        let mut log = HistoryLog::new();
        let oldest = log.record(snapshot(1), outcome());
        log.record(snapshot(2), outcome());
        log.load_entry(&oldest);
        assert_eq!(log.iter().last().unwrap().id, oldest);
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::new();
        log.record(snapshot(1), outcome());
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_persistence_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let mut log = HistoryLog::new();
        log.record(snapshot(1), outcome());
        let newest = log.record(snapshot(2), outcome());
        log.save(&store).unwrap();

        let mut restored = HistoryLog::load(&store).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.iter().next().unwrap().id, newest);

        // New ids keep increasing after a reload
        let next = restored.record(snapshot(3), outcome());
        assert!(next.parse::<i64>().unwrap() > newest.parse::<i64>().unwrap());

        restored.clear();
        restored.save(&store).unwrap();
        assert_eq!(store.get(HISTORY_KEY).unwrap(), None);
    }

    #[test]
    fn test_corrupt_store_is_empty_history() {
        let store = Store::open_in_memory().unwrap();
        store.set(HISTORY_KEY, "not json").unwrap();
        assert!(HistoryLog::load(&store).unwrap().is_empty());
    }

    #[test]
    fn test_relative_time_fallback() {
        assert_eq!(format_relative_time("yesterday"), "yesterday");
        assert_eq!(format_relative_time(&Utc::now().to_rfc3339()), "just now");
    }
}
