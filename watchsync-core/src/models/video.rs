//! Video identifiers and extraction from user-supplied references.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Length of every platform video identifier
pub const VIDEO_ID_LEN: usize = 11;

/// Video a room shows before anyone picks one
pub const DEFAULT_VIDEO_ID: &str = "M7lc1UVf-VE";

static VIDEO_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("Invalid video reference regex")
});

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid video id regex")
});

/// A validated 11-character video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Validate a bare identifier
    pub fn parse(id: &str) -> Result<Self> {
        if id.len() != VIDEO_ID_LEN {
            return Err(Error::InvalidReference(format!(
                "video id must be exactly {VIDEO_ID_LEN} characters, got {}",
                id.chars().count()
            )));
        }
        if !VIDEO_ID.is_match(id) {
            return Err(Error::InvalidReference(format!(
                "video id contains invalid characters: {id}"
            )));
        }
        Ok(Self(id.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self(DEFAULT_VIDEO_ID.to_string())
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract a video identifier from a link or a bare identifier.
///
/// Accepted link shapes: `youtu.be/ID`, `/v/ID`, `/u/x/ID`, `/embed/ID`,
/// `watch?v=ID` and `&v=ID`; the identifier ends at the first `#`, `&` or `?`.
pub fn extract_video_id(reference: &str) -> Result<VideoId> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(Error::InvalidReference("empty video reference".to_string()));
    }

    let candidate = VIDEO_REFERENCE
        .captures(reference)
        .and_then(|captures| captures.get(2))
        .map_or(reference, |m| m.as_str());

    VideoId::parse(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_known_link_shapes() {
        let links = [
            "https://youtu.be/M7lc1UVf-VE",
            "https://www.youtube.com/watch?v=M7lc1UVf-VE",
            "https://www.youtube.com/watch?v=M7lc1UVf-VE&t=42s",
            "https://www.youtube.com/watch?feature=share&v=M7lc1UVf-VE",
            "https://www.youtube.com/embed/M7lc1UVf-VE?autoplay=1",
            "https://www.youtube.com/v/M7lc1UVf-VE",
            "https://youtu.be/M7lc1UVf-VE#comments",
            "  https://youtu.be/M7lc1UVf-VE  ",
        ];

        for link in links {
            let id = extract_video_id(link).unwrap_or_else(|e| panic!("{link}: {e}"));
            assert_eq!(id.as_str(), "M7lc1UVf-VE", "{link}");
        }
    }

    #[test]
    fn test_extract_bare_id() {
        assert_eq!(extract_video_id("dQw4w9WgXcQ").unwrap().as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_rejects_malformed_references() {
        for reference in [
            "not a url",
            "",
            "   ",
            "https://youtu.be/short",
            "https://www.youtube.com/watch?v=M7lc1UVf-VEtoolong",
            "M7lc1UVf VE",
        ] {
            let err = extract_video_id(reference).unwrap_err();
            assert!(matches!(err, Error::InvalidReference(_)), "{reference}");
        }
    }

    #[test]
    fn test_parse_requires_exact_length() {
        assert!(VideoId::parse("M7lc1UVf-VE").is_ok());
        assert!(VideoId::parse("M7lc1UVf-V").is_err());
        assert!(VideoId::parse("").is_err());
    }

    #[test]
    fn test_default_video() {
        assert_eq!(VideoId::default().as_str(), DEFAULT_VIDEO_ID);
    }
}
