use std::collections::BTreeMap;

use serde::Serialize;

/// Field name to value mapping produced by a node.
pub type ExtractedRecord = BTreeMap<String, ExtractedValue>;

/// Result of applying an extractor; mirrors the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    /// A required single match found nothing.
    Null,
    /// Leaf output.
    Text(String),
    /// Node output.
    Record(ExtractedRecord),
    /// Output of a `multiple` level.
    List(Vec<ExtractedValue>),
}

impl ExtractedValue {
    /// The string, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The record, if this is a record value.
    pub const fn as_record(&self) -> Option<&ExtractedRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The items, if this is a list value.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Field of a record.
    pub fn get(&self, field: &str) -> Option<&Self> {
        self.as_record().and_then(|record| record.get(field))
    }

    /// Text of a record field, empty strings treated as absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Self::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Whether the value carries no data at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(text) => text.is_empty(),
            Self::Record(record) => record.values().all(Self::is_empty),
            Self::List(items) => items.iter().all(Self::is_empty),
        }
    }
}
