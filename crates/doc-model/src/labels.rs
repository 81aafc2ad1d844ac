//! Label set and the per-label summary rows built from text selections.

use crate::Side;
use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free list of labels offered for assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|existing| existing == label.trim())
    }

    /// Appends `label` unless it is blank or already present.
    pub fn insert(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() || self.contains(label) {
            return false;
        }

        self.labels.push(label.to_owned());
        true
    }

    pub fn remove(&mut self, label: &str) -> bool {
        let label = label.trim();
        let Some(index) = self.labels.iter().position(|existing| existing == label) else {
            return false;
        };

        self.labels.remove(index);
        true
    }

    /// Renames in place, keeping the label's position.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        let to = to.trim();
        if to.is_empty() || self.contains(to) {
            return false;
        }

        let from = from.trim();
        match self.labels.iter_mut().find(|existing| existing.as_str() == from) {
            Some(existing) => {
                *existing = to.to_owned();
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub label: String,
    pub left_text: Option<String>,
    pub right_text: Option<String>,
}

impl SummaryEntry {
    fn new(label: &str) -> Self {
        Self { label: label.to_owned(), left_text: None, right_text: None }
    }

    pub fn text(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.left_text.as_deref(),
            Side::Right => self.right_text.as_deref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.left_text.is_some() && self.right_text.is_some()
    }
}

/// Report rows in first-assignment order, one per label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    entries: Vec<SummaryEntry>,
}

impl SummaryTable {
    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&SummaryEntry> {
        self.entries.iter().find(|entry| entry.label == label)
    }

    pub fn is_complete(&self, label: &str) -> bool {
        self.get(label).is_some_and(SummaryEntry::is_complete)
    }

    /// Stores `text` for `side`, replacing any earlier selection on that side.
    pub fn assign(&mut self, label: &str, side: Side, text: String) {
        let index = match self.entries.iter().position(|entry| entry.label == label) {
            Some(index) => index,
            None => {
                self.entries.push(SummaryEntry::new(label));
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        match side {
            Side::Left => entry.left_text = Some(text),
            Side::Right => entry.right_text = Some(text),
        }
    }

    pub fn remove(&mut self, label: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.label != label);
        self.entries.len() != before
    }

    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.label == from) {
            entry.label = to.to_owned();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_keeps_order_and_rejects_duplicates() {
        let mut labels = LabelSet::default();

        assert!(labels.insert("Price"));
        assert!(labels.insert(" Date "));
        assert!(!labels.insert("Price"));
        assert!(!labels.insert("   "));

        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["Price", "Date"]);
    }

    #[test]
    fn rename_refuses_collisions() {
        let mut labels = LabelSet::default();
        labels.insert("Price");
        labels.insert("Date");

        assert!(!labels.rename("Price", "Date"));
        assert!(labels.rename("Price", "Cost"));
        assert_eq!(labels.iter().collect::<Vec<_>>(), vec!["Cost", "Date"]);
    }

    #[test]
    fn assign_replaces_text_on_same_side() {
        let mut table = SummaryTable::default();

        table.assign("Price", Side::Left, "$10".to_owned());
        table.assign("Price", Side::Left, "$11".to_owned());

        assert_eq!(table.len(), 1);
        let entry = table.get("Price").expect("row expected");
        assert_eq!(entry.text(Side::Left), Some("$11"));
        assert_eq!(entry.text(Side::Right), None);
        assert!(!entry.is_complete());
    }
}
