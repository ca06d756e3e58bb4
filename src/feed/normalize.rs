use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use super::atom::{decode, AtomAuthor, AtomDocument, DecodeError};
use super::charset::{CharsetFilter, Utf8Only};
use super::date::{DateParser, FeedDateParser, TimeParseError};
use super::types::{Author, Feed, Image, Item, SeenKeys};

/// Fixed polling cadence; feed-declared update hints are ignored.
const REFRESH_INTERVAL_MINUTES: i64 = 10;

/// Errors that end a parse without producing a [`Feed`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document could not be decoded.
    #[error("failed to decode Atom document: {0}")]
    Decode(#[from] DecodeError),

    /// The document decoded but declares no entries.
    #[error("no entries found in feed")]
    EmptyFeed,

    /// An entry timestamp could not be parsed.
    #[error("failed to parse entry timestamp: {0}")]
    TimeParse(#[from] TimeParseError),
}

/// Parses an Atom document with the default collaborators.
///
/// Documents must be UTF-8 (or declare it), timestamps are read by
/// [`FeedDateParser`], and the refresh time is measured from now.
///
/// # Arguments
///
/// * `document` - Complete Atom XML payload
/// * `seen` - Dedup keys delivered by earlier polls of the same feed.
///   Keys of the items returned are added to it.
///
/// # Errors
///
/// Returns [`ParseError`] if the document does not decode, has no entries,
/// or has an entry timestamp that cannot be parsed. `seen` is left untouched
/// in every error case.
pub fn parse(document: &[u8], seen: &mut SeenKeys) -> Result<Feed, ParseError> {
    parse_with(document, seen, &Utf8Only, &FeedDateParser, Utc::now())
}

/// Parses an Atom document with injected charset and date handling.
pub fn parse_with(
    document: &[u8],
    seen: &mut SeenKeys,
    charset: &dyn CharsetFilter,
    dates: &dyn DateParser,
    now: DateTime<Utc>,
) -> Result<Feed, ParseError> {
    let doc = decode(document, charset)?;
    normalize(&doc, seen, dates, now)
}

/// Builds the canonical [`Feed`] from a decoded document.
///
/// Entries are visited in document order. An entry is keyed by its id, or
/// by its link when the id is empty; entries with no key, or whose key is
/// already in `seen` or earlier in the same document, are skipped.
///
/// New keys are committed to `seen` only once the whole document has been
/// normalized.
pub fn normalize(
    doc: &AtomDocument,
    seen: &mut SeenKeys,
    dates: &dyn DateParser,
    now: DateTime<Utc>,
) -> Result<Feed, ParseError> {
    if doc.entries.is_empty() {
        return Err(ParseError::EmptyFeed);
    }

    let default_authors: Arc<[Author]> = present_authors(&doc.authors).into();
    let mut fresh: HashSet<&str> = HashSet::with_capacity(doc.entries.len());
    let mut items = Vec::with_capacity(doc.entries.len());
    let mut unidentified = 0usize;
    let mut duplicates = 0usize;

    for entry in &doc.entries {
        let key = if entry.id.is_empty() {
            entry.link_href()
        } else {
            entry.id.as_str()
        };

        if key.is_empty() {
            tracing::debug!(title = %entry.title.value, "Skipping entry with neither id nor link");
            unidentified += 1;
            continue;
        }
        if seen.contains(key) || !fresh.insert(key) {
            tracing::trace!(key = %key, "Skipping already seen entry");
            duplicates += 1;
            continue;
        }

        let date = if entry.updated.is_empty() {
            None
        } else {
            Some(dates.parse(&entry.updated)?)
        };

        items.push(Item {
            title: entry.title.value.clone(),
            content: entry.content_text().to_string(),
            link: entry.link_href().to_string(),
            date,
            id: key.to_string(),
            read: false,
            authors: resolve_authors(present_authors(&entry.authors), &default_authors),
        });
    }

    seen.extend(fresh.into_iter().map(str::to_string));

    tracing::debug!(
        items = items.len(),
        duplicates,
        unidentified,
        "Normalized Atom feed"
    );

    Ok(Feed {
        title: doc.title.value.clone(),
        description: doc.subtitle.value.clone(),
        link: doc.link_href().to_string(),
        image: Image {
            title: doc.image.title.clone(),
            url: doc.image.url.clone(),
            height: doc.image.height,
            width: doc.image.width,
        },
        refresh: now + Duration::minutes(REFRESH_INTERVAL_MINUTES),
        unread: items.len(),
        items,
    })
}

/// Picks the authors an item exposes.
///
/// An entry with no authors of its own inherits `defaults`, sharing the same
/// allocation rather than copying it.
pub fn resolve_authors(entry: Vec<Author>, defaults: &Arc<[Author]>) -> Arc<[Author]> {
    if entry.is_empty() && !defaults.is_empty() {
        Arc::clone(defaults)
    } else {
        entry.into()
    }
}

/// Converts decoded authors, dropping those with every field empty.
fn present_authors(authors: &[AtomAuthor]) -> Vec<Author> {
    authors
        .iter()
        .map(|a| Author {
            name: a.name.clone(),
            uri: a.uri.clone(),
            email: a.email.clone(),
        })
        .filter(|a| !a.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::atom::{AtomEntry, AtomLink, AtomText};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    /// Date parser that accepts only the literal "ok".
    struct OnlyOk;

    impl DateParser for OnlyOk {
        fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError> {
            if value == "ok" {
                Ok(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            } else {
                Err(TimeParseError {
                    value: value.to_string(),
                })
            }
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn text(value: &str) -> AtomText {
        AtomText {
            value: value.to_string(),
        }
    }

    fn entry(id: &str, link: &str) -> AtomEntry {
        AtomEntry {
            title: text(&format!("title {id}{link}")),
            id: id.to_string(),
            links: vec![AtomLink {
                href: link.to_string(),
                rel: String::new(),
            }],
            ..AtomEntry::default()
        }
    }

    fn author(name: &str) -> AtomAuthor {
        AtomAuthor {
            name: name.to_string(),
            ..AtomAuthor::default()
        }
    }

    fn doc(entries: Vec<AtomEntry>) -> AtomDocument {
        AtomDocument {
            entries,
            ..AtomDocument::default()
        }
    }

    #[test]
    fn test_empty_entries_rejected() {
        let mut seen = SeenKeys::new();
        let err = normalize(&doc(vec![]), &mut seen, &OnlyOk, now()).unwrap_err();
        assert!(matches!(err, ParseError::EmptyFeed));
    }

    #[test]
    fn test_refresh_is_ten_minutes_after_now() {
        let mut seen = SeenKeys::new();
        let feed = normalize(&doc(vec![entry("a", "")]), &mut seen, &OnlyOk, now()).unwrap();
        assert_eq!(feed.refresh, Utc.with_ymd_and_hms(2024, 6, 1, 12, 10, 0).unwrap());
    }

    #[test]
    fn test_link_used_when_id_missing() {
        let mut seen = SeenKeys::new();
        let feed = normalize(
            &doc(vec![entry("", "https://example.com/a")]),
            &mut seen,
            &OnlyOk,
            now(),
        )
        .unwrap();
        assert_eq!(feed.items[0].id, "https://example.com/a");
        assert!(seen.contains("https://example.com/a"));
    }

    #[test]
    fn test_unidentifiable_entry_skipped() {
        let mut seen = SeenKeys::new();
        let feed = normalize(
            &doc(vec![entry("", ""), entry("b", "")]),
            &mut seen,
            &OnlyOk,
            now(),
        )
        .unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].id, "b");
        assert_eq!(feed.unread, 1);
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_duplicates_within_document_collapse() {
        let mut seen = SeenKeys::new();
        let feed = normalize(
            &doc(vec![entry("a", ""), entry("b", ""), entry("a", "")]),
            &mut seen,
            &OnlyOk,
            now(),
        )
        .unwrap();
        let ids: Vec<&str> = feed.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(feed.unread, 2);
    }

    #[test]
    fn test_seen_entries_skipped_and_order_kept() {
        let mut seen: SeenKeys = ["b".to_string()].into_iter().collect();
        let feed = normalize(
            &doc(vec![entry("c", ""), entry("b", ""), entry("a", "")]),
            &mut seen,
            &OnlyOk,
            now(),
        )
        .unwrap();
        let ids: Vec<&str> = feed.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        assert!(feed.items.iter().all(|i| !i.read));
    }

    #[test]
    fn test_bad_timestamp_aborts_and_leaves_seen_untouched() {
        let mut first = entry("a", "");
        first.updated = "ok".to_string();
        let mut second = entry("b", "");
        second.updated = "garbage".to_string();

        let mut seen = SeenKeys::new();
        let err = normalize(&doc(vec![first, second]), &mut seen, &OnlyOk, now()).unwrap_err();
        assert!(matches!(err, ParseError::TimeParse(ref e) if e.value == "garbage"));
        assert!(seen.is_empty());
    }

    #[test]
    fn test_missing_timestamp_leaves_date_empty() {
        let mut dated = entry("a", "");
        dated.updated = "ok".to_string();

        let mut seen = SeenKeys::new();
        let feed = normalize(
            &doc(vec![dated, entry("b", "")]),
            &mut seen,
            &OnlyOk,
            now(),
        )
        .unwrap();
        assert_eq!(
            feed.items[0].date,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(feed.items[1].date, None);
    }

    #[test]
    fn test_entry_inherits_shared_default_authors() {
        let mut own = entry("b", "");
        own.authors = vec![author("Bob")];

        let mut document = doc(vec![entry("a", ""), own]);
        document.authors = vec![AtomAuthor::default(), author("Feed Owner")];

        let mut seen = SeenKeys::new();
        let feed = normalize(&document, &mut seen, &OnlyOk, now()).unwrap();

        assert_eq!(feed.items[0].authors.len(), 1);
        assert_eq!(feed.items[0].authors[0].name, "Feed Owner");
        assert_eq!(feed.items[1].authors[0].name, "Bob");
    }

    #[test]
    fn test_empty_entry_authors_filtered_before_inheritance() {
        let mut blank = entry("a", "");
        blank.authors = vec![AtomAuthor::default()];

        let mut document = doc(vec![blank]);
        document.authors = vec![author("Feed Owner")];

        let mut seen = SeenKeys::new();
        let feed = normalize(&document, &mut seen, &OnlyOk, now()).unwrap();
        assert_eq!(feed.items[0].authors[0].name, "Feed Owner");
    }

    #[test]
    fn test_no_authors_anywhere_is_empty() {
        let mut document = doc(vec![entry("a", "")]);
        document.authors = vec![AtomAuthor::default()];

        let mut seen = SeenKeys::new();
        let feed = normalize(&document, &mut seen, &OnlyOk, now()).unwrap();
        assert!(feed.items[0].authors.is_empty());
    }

    #[test]
    fn test_resolve_authors_shares_allocation() {
        let defaults: Arc<[Author]> = vec![Author {
            name: "Owner".to_string(),
            ..Author::default()
        }]
        .into();

        let resolved = resolve_authors(Vec::new(), &defaults);
        assert!(Arc::ptr_eq(&resolved, &defaults));

        let own = resolve_authors(
            vec![Author {
                name: "Writer".to_string(),
                ..Author::default()
            }],
            &defaults,
        );
        assert!(!Arc::ptr_eq(&own, &defaults));
        assert_eq!(own[0].name, "Writer");
    }

    #[test]
    fn test_feed_fields_copied() {
        let mut document = doc(vec![entry("a", "")]);
        document.title = text("Title");
        document.subtitle = text("Sub");
        document.links = vec![AtomLink {
            href: "https://example.com/".to_string(),
            rel: "alternate".to_string(),
        }];
        document.image.url = "https://example.com/logo.png".to_string();
        document.image.height = 32;

        let mut seen = SeenKeys::new();
        let feed = normalize(&document, &mut seen, &OnlyOk, now()).unwrap();
        assert_eq!(feed.title, "Title");
        assert_eq!(feed.description, "Sub");
        assert_eq!(feed.link, "https://example.com/");
        assert_eq!(feed.image.url, "https://example.com/logo.png");
        assert_eq!(feed.image.height, 32);
        assert_eq!(feed.image.width, 0);
    }
}
