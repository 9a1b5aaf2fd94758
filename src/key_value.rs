//! Editable key/value rows for headers and query parameters.
//!
//! Rows are kept in insertion order and duplicate keys are allowed. Rows with an
//! empty key stay in the list while editing but are skipped when a request is built.
//! The headers editor also offers header-name completions.

use serde::{Deserialize, Serialize};

use crate::types::KnownHeader;

/// A single key/value row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Which half of a row is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Key,
    Value,
}

/// Ordered list of editable rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyValueList {
    rows: Vec<KeyValue>,
}

impl KeyValueList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[KeyValue] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append an empty row.
    pub fn add_row(&mut self) {
        self.rows.push(KeyValue::default());
    }

    /// Append a filled row.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.rows.push(KeyValue::new(key, value));
    }

    /// Remove the row at `index`. Out-of-range indices are ignored.
    pub fn remove_row(&mut self, index: usize) {
        if index < self.rows.len() {
            self.rows.remove(index);
        }
    }

    /// Replace one field of the row at `index`. Returns false when the index is out of range.
    pub fn update_field(&mut self, index: usize, field: Field, value: impl Into<String>) -> bool {
        let Some(row) = self.rows.get_mut(index) else {
            return false;
        };
        match field {
            Field::Key => row.key = value.into(),
            Field::Value => row.value = value.into(),
        }
        true
    }

    /// Rows that take part in a request (non-empty key), in order.
    pub fn active_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows
            .iter()
            .filter(|row| !row.key.is_empty())
            .map(|row| (row.key.as_str(), row.value.as_str()))
    }

    pub fn to_vec(&self) -> Vec<KeyValue> {
        self.rows.clone()
    }
}

impl From<Vec<KeyValue>> for KeyValueList {
    fn from(rows: Vec<KeyValue>) -> Self {
        Self { rows }
    }
}

/// Keyboard input understood by the suggestion list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKey {
    Down,
    Up,
    Enter,
    Escape,
}

/// Header-name completions for the key field currently being typed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderSuggestions {
    items: Vec<&'static str>,
    active: Option<usize>,
}

impl HeaderSuggestions {
    pub fn items(&self) -> &[&'static str] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the highlighted suggestion, if any.
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&'static str> {
        self.active.and_then(|i| self.items.get(i).copied())
    }

    /// Recompute completions for `input`. The highlight is reset.
    pub fn refresh(&mut self, input: &str) {
        self.active = None;
        self.items = filter_known_headers(input);
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.active = None;
    }

    fn move_down(&mut self) {
        let len = self.items.len();
        self.active = Some(match self.active {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        });
    }

    fn move_up(&mut self) {
        let len = self.items.len();
        self.active = Some(match self.active {
            Some(i) if i > 0 => i - 1,
            _ => len - 1,
        });
    }
}

/// Known header names containing `input` (case-insensitive), excluding an exact match.
pub fn filter_known_headers(input: &str) -> Vec<&'static str> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    let needle = input.to_lowercase();
    KnownHeader::all()
        .into_iter()
        .map(|h| h.name())
        .filter(|name| {
            let lower = name.to_lowercase();
            lower.contains(&needle) && lower != needle
        })
        .collect()
}

/// Headers editor: a row list plus the completion state for the key being typed.
#[derive(Debug)]
pub struct HeaderEditor<'a> {
    rows: &'a mut KeyValueList,
    suggestions: &'a mut HeaderSuggestions,
}

impl<'a> HeaderEditor<'a> {
    pub fn new(rows: &'a mut KeyValueList, suggestions: &'a mut HeaderSuggestions) -> Self {
        Self { rows, suggestions }
    }

    pub fn rows(&self) -> &[KeyValue] {
        self.rows.rows()
    }

    pub fn suggestions(&self) -> &HeaderSuggestions {
        self.suggestions
    }

    pub fn add_row(&mut self) {
        self.rows.add_row();
    }

    pub fn remove_row(&mut self, index: usize) {
        self.rows.remove_row(index);
    }

    /// Update a field; key edits recompute the completions.
    pub fn update_field(&mut self, index: usize, field: Field, value: &str) -> bool {
        if !self.rows.update_field(index, field, value) {
            return false;
        }
        if field == Field::Key {
            self.suggestions.refresh(value);
        }
        true
    }

    /// Apply a completion to the key of row `index` and close the list.
    pub fn select_suggestion(&mut self, index: usize, suggestion: &str) {
        self.update_field(index, Field::Key, suggestion);
        self.suggestions.clear();
    }

    /// Apply the only completion for row `index`, if there is exactly one.
    pub fn complete_unique(&mut self, index: usize) -> Option<&'static str> {
        if self.suggestions.items().len() != 1 {
            return None;
        }
        self.handle_key(index, SuggestionKey::Down);
        let name = self.suggestions.active()?;
        self.handle_key(index, SuggestionKey::Enter);
        Some(name)
    }

    /// Handle navigation keys while editing the key of row `index`.
    ///
    /// Returns true when the key was consumed by the suggestion list.
    pub fn handle_key(&mut self, index: usize, key: SuggestionKey) -> bool {
        if self.suggestions.is_empty() {
            return false;
        }

        match key {
            SuggestionKey::Down => {
                self.suggestions.move_down();
                true
            }
            SuggestionKey::Up => {
                self.suggestions.move_up();
                true
            }
            SuggestionKey::Enter => match self.suggestions.active() {
                Some(suggestion) => {
                    self.select_suggestion(index, suggestion);
                    true
                }
                None => false,
            },
            SuggestionKey::Escape => {
                self.suggestions.clear();
                true
            }
        }
    }
}
