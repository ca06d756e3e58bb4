use thiserror::Error;

/// Errors raised while transcoding a document into UTF-8.
#[derive(Debug, Error)]
pub enum CharsetError {
    /// No transcoder is available for the declared encoding.
    #[error("unsupported document encoding: {0}")]
    Unsupported(String),

    /// The bytes are not valid in the declared encoding.
    #[error("invalid {label} byte sequence: {reason}")]
    Malformed { label: String, reason: String },
}

/// Transcodes a document whose XML prolog declares a non-UTF-8 encoding.
///
/// The decoder only calls this for labels other than UTF-8 and US-ASCII.
/// Implementations receive the raw document and return it as UTF-8 text,
/// prolog included.
pub trait CharsetFilter {
    fn to_utf8(&self, label: &str, bytes: &[u8]) -> Result<String, CharsetError>;
}

/// Filter that understands nothing but UTF-8.
///
/// Every label reaching it is rejected, so documents declaring another
/// encoding fail to decode instead of being misread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Only;

impl CharsetFilter for Utf8Only {
    fn to_utf8(&self, label: &str, _bytes: &[u8]) -> Result<String, CharsetError> {
        Err(CharsetError::Unsupported(label.to_string()))
    }
}

/// Labels that can be read as UTF-8 without transcoding.
pub(crate) fn is_utf8_label(label: &str) -> bool {
    let label = label.trim();
    ["utf-8", "utf8", "us-ascii", "ascii"]
        .iter()
        .any(|known| label.eq_ignore_ascii_case(known))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_labels_are_case_insensitive() {
        assert!(is_utf8_label("UTF-8"));
        assert!(is_utf8_label("utf8"));
        assert!(is_utf8_label(" US-ASCII "));
        assert!(!is_utf8_label("ISO-8859-1"));
        assert!(!is_utf8_label("windows-1252"));
    }

    #[test]
    fn test_utf8_only_rejects_other_labels() {
        let err = Utf8Only.to_utf8("ISO-8859-1", b"<feed/>").unwrap_err();
        assert!(matches!(err, CharsetError::Unsupported(ref l) if l == "ISO-8859-1"));
        assert!(err.to_string().contains("ISO-8859-1"));
    }
}
