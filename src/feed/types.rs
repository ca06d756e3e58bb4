use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Dedup keys already delivered for one feed source.
///
/// Owned by the caller and passed by `&mut` into every parse of the same
/// feed. Pass an empty set on the first poll.
pub type SeenKeys = HashSet<String>;

/// A normalized feed produced from one Atom document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    /// Zero-valued when the document has no `<image>`.
    pub image: Image,
    /// Earliest time the caller should poll this feed again.
    pub refresh: DateTime<Utc>,
    /// Items in document order, duplicates removed.
    pub items: Vec<Item>,
    /// Number of items produced by this parse.
    pub unread: usize,
}

/// One normalized entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub content: String,
    pub link: String,
    /// `None` when the entry carried no timestamp.
    pub date: Option<DateTime<Utc>>,
    /// Dedup key: the entry id, or its link when the id is empty. Never empty.
    pub id: String,
    pub read: bool,
    /// Entry authors, or the feed's default authors when the entry has none.
    /// Inherited lists share the feed's allocation.
    pub authors: Arc<[Author]>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub uri: String,
    pub email: String,
}

impl Author {
    /// An author with no name, uri or email carries nothing worth showing.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.uri.is_empty() && self.email.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub title: String,
    pub url: String,
    pub height: u32,
    pub width: u32,
}
