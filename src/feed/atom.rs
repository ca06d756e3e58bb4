//! Atom document schema and decoder.
//!
//! The structs here mirror the subset of the Atom vocabulary the normalizer
//! reads. Element names are matched exactly; anything else in the document
//! is ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use std::borrow::Cow;
use thiserror::Error;

use super::charset::{is_utf8_label, CharsetError, CharsetFilter};

/// Errors that can occur while decoding an Atom document.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document body is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The prolog or root tag could not be read.
    #[error("XML prolog error: {0}")]
    Prolog(#[from] quick_xml::Error),

    /// The declared encoding could not be resolved to UTF-8.
    #[error(transparent)]
    Charset(#[from] CharsetError),

    /// The document claims UTF-8 but is not.
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("expected <feed> root element, found <{0}>")]
    UnexpectedRoot(String),

    #[error("document has no root element")]
    MissingRoot,
}

/// Root `<feed>` element.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "RawDocument")]
pub struct AtomDocument {
    pub title: AtomText,
    pub subtitle: AtomText,
    pub links: Vec<AtomLink>,
    pub image: AtomImage,
    pub entries: Vec<AtomEntry>,
    pub authors: Vec<AtomAuthor>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(from = "RawEntry")]
pub struct AtomEntry {
    pub title: AtomText,
    pub summary: AtomText,
    pub content: AtomText,
    pub links: Vec<AtomLink>,
    pub updated: String,
    pub id: String,
    pub authors: Vec<AtomAuthor>,
}

/// Text construct (`title`, `subtitle`, `summary`, `content`).
///
/// The `type` attribute is ignored. Child elements are skipped and the text
/// around them is joined with single spaces.
#[derive(Debug, Default, Deserialize)]
#[serde(from = "RawText")]
pub struct AtomText {
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AtomLink {
    #[serde(rename = "@href")]
    pub href: String,
    #[serde(rename = "@rel")]
    pub rel: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(from = "RawImage")]
pub struct AtomImage {
    pub title: String,
    pub url: String,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawAuthor")]
pub struct AtomAuthor {
    pub name: String,
    pub uri: String,
    pub email: String,
}

// Wire shapes. Every element is collected as a list so a repeated scalar
// element (two `<title>`s in one entry) decodes instead of failing the whole
// document; the last occurrence wins.

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    title: Vec<AtomText>,
    subtitle: Vec<AtomText>,
    link: Vec<AtomLink>,
    image: Vec<AtomImage>,
    entry: Vec<AtomEntry>,
    author: Vec<AtomAuthor>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawEntry {
    title: Vec<AtomText>,
    summary: Vec<AtomText>,
    content: Vec<AtomText>,
    link: Vec<AtomLink>,
    updated: Vec<String>,
    id: Vec<String>,
    author: Vec<AtomAuthor>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawImage {
    title: Vec<String>,
    url: Vec<String>,
    height: Vec<String>,
    width: Vec<String>,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawAuthor {
    name: Vec<String>,
    uri: Vec<String>,
    email: Vec<String>,
}

#[derive(Default, Deserialize)]
struct RawText {
    #[serde(rename = "$value", default)]
    nodes: Vec<TextNode>,
}

#[derive(Deserialize)]
enum TextNode {
    #[serde(rename = "$text")]
    Text(String),
    /// Any child element; its subtree is skipped.
    #[serde(other)]
    Markup,
}

impl From<RawDocument> for AtomDocument {
    fn from(raw: RawDocument) -> Self {
        Self {
            title: last(raw.title),
            subtitle: last(raw.subtitle),
            links: raw.link,
            image: last(raw.image),
            entries: raw.entry,
            authors: raw.author,
        }
    }
}

impl From<RawEntry> for AtomEntry {
    fn from(raw: RawEntry) -> Self {
        Self {
            title: last(raw.title),
            summary: last(raw.summary),
            content: last(raw.content),
            links: raw.link,
            updated: last(raw.updated),
            id: last(raw.id),
            authors: raw.author,
        }
    }
}

impl From<RawImage> for AtomImage {
    fn from(raw: RawImage) -> Self {
        Self {
            title: last(raw.title),
            url: last(raw.url),
            height: lenient_u32(&last(raw.height)),
            width: lenient_u32(&last(raw.width)),
        }
    }
}

impl From<RawAuthor> for AtomAuthor {
    fn from(raw: RawAuthor) -> Self {
        Self {
            name: last(raw.name),
            uri: last(raw.uri),
            email: last(raw.email),
        }
    }
}

impl From<RawText> for AtomText {
    fn from(raw: RawText) -> Self {
        let parts: Vec<&str> = raw
            .nodes
            .iter()
            .filter_map(|node| match node {
                TextNode::Text(text) => Some(text.trim()),
                TextNode::Markup => None,
            })
            .filter(|text| !text.is_empty())
            .collect();
        Self {
            value: parts.join(" "),
        }
    }
}

fn last<T: Default>(values: Vec<T>) -> T {
    values.into_iter().last().unwrap_or_default()
}

impl AtomDocument {
    pub fn link_href(&self) -> &str {
        select_link(&self.links)
    }
}

impl AtomEntry {
    pub fn link_href(&self) -> &str {
        select_link(&self.links)
    }

    /// Summary text, or the full content when the entry has no summary.
    pub fn content_text(&self) -> &str {
        if self.summary.value.is_empty() {
            &self.content.value
        } else {
            &self.summary.value
        }
    }
}

/// Picks the href of the first `alternate` link (an absent `rel` means
/// `alternate`), falling back to the first link that has any href.
fn select_link(links: &[AtomLink]) -> &str {
    links
        .iter()
        .find(|l| !l.href.is_empty() && (l.rel.is_empty() || l.rel == "alternate"))
        .or_else(|| links.iter().find(|l| !l.href.is_empty()))
        .map(|l| l.href.as_str())
        .unwrap_or("")
}

/// Image dimensions decode to 0 when empty or not a number.
fn lenient_u32(raw: &str) -> u32 {
    raw.trim().parse().unwrap_or(0)
}

/// What the prolog scan learned before the body is deserialized.
#[derive(Debug, Default)]
struct Prolog {
    encoding: Option<String>,
}

/// Decodes raw bytes into an [`AtomDocument`].
///
/// Documents that declare an encoding other than UTF-8 are passed through
/// `charset` first. Nothing is returned on failure; a malformed document
/// never yields a partial tree.
///
/// # Security
///
/// SEC-002: `quick-xml` never expands `<!ENTITY>` declarations, so custom
/// entity references in feed text fail to decode rather than pulling in
/// external content.
pub fn decode(document: &[u8], charset: &dyn CharsetFilter) -> Result<AtomDocument, DecodeError> {
    let prolog = scan_prolog(document)?;

    let text: Cow<'_, str> = match prolog.encoding.as_deref() {
        Some(label) if !is_utf8_label(label) => {
            tracing::debug!(encoding = %label, "Transcoding feed document");
            Cow::Owned(charset.to_utf8(label, document)?)
        }
        _ => Cow::Borrowed(std::str::from_utf8(document)?),
    };
    let body = text.as_ref();
    let body = body.strip_prefix('\u{feff}').unwrap_or(body);

    Ok(quick_xml::de::from_str(body)?)
}

/// Reads up to the root element, capturing the declared encoding and
/// checking that the root is `<feed>`.
fn scan_prolog(document: &[u8]) -> Result<Prolog, DecodeError> {
    let mut reader = Reader::from_reader(document);
    let mut buf = Vec::new();
    let mut prolog = Prolog::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Decl(decl) => {
                if let Some(encoding) = decl.encoding() {
                    let encoding = encoding.map_err(quick_xml::Error::InvalidAttr)?;
                    prolog.encoding = Some(String::from_utf8_lossy(&encoding).into_owned());
                }
            }
            Event::Start(e) | Event::Empty(e) => {
                let name = e.local_name();
                if name.as_ref() != b"feed" {
                    return Err(DecodeError::UnexpectedRoot(
                        String::from_utf8_lossy(name.as_ref()).into_owned(),
                    ));
                }
                return Ok(prolog);
            }
            Event::Eof => return Err(DecodeError::MissingRoot),
            _ => {}
        }
        buf.clear();
    }
}
