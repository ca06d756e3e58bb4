//! Atom feed decoding and normalization.
//!
//! A parse runs in two passes over one document:
//!
//! - **Decoding**: bytes (through an optional [`CharsetFilter`]) into the
//!   intermediate [`AtomDocument`] tree
//! - **Normalizing**: the tree into a canonical [`Feed`], skipping entries
//!   whose dedup key is already in the caller's [`SeenKeys`]
//!
//! # Architecture
//!
//! - [`atom`] - Serde schema for the Atom vocabulary, backed by `quick-xml`
//! - [`charset`] - Pluggable transcoding for non-UTF-8 documents
//! - [`date`] - Pluggable timestamp parsing
//! - [`normalize`] - Dedup, author inheritance and field resolution
//! - [`types`] - The canonical output model
//!
//! # Example
//!
//! ```
//! use atomfeed::feed::{parse, SeenKeys};
//!
//! let xml = br#"<feed><entry><id>urn:1</id><title>Hi</title></entry></feed>"#;
//! let mut seen = SeenKeys::new();
//!
//! let feed = parse(xml, &mut seen).unwrap();
//! assert_eq!(feed.unread, 1);
//!
//! // A second poll with the same set delivers nothing new.
//! let again = parse(xml, &mut seen).unwrap();
//! assert!(again.items.is_empty());
//! ```

pub mod atom;
pub mod charset;
pub mod date;
pub mod normalize;
pub mod types;

pub use atom::{decode, AtomDocument, DecodeError};
pub use charset::{CharsetError, CharsetFilter, Utf8Only};
pub use date::{DateParser, FeedDateParser, TimeParseError};
pub use normalize::{normalize, parse, parse_with, resolve_authors, ParseError};
pub use types::{Author, Feed, Image, Item, SeenKeys};
