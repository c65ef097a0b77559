use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// Status
// ============================================================================

/// Server-side classification of a feed item.
///
/// Values the server may add later deserialize as [`FeedItemStatus::Unknown`]
/// rather than failing the whole load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeedItemStatus {
    Backlog,
    Fetched,
    New,
    #[default]
    #[serde(other)]
    Unknown,
}

impl FeedItemStatus {
    /// Wire and label form (`"NEW"`, `"FETCHED"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            FeedItemStatus::Unknown => "UNKNOWN",
            FeedItemStatus::Backlog => "BACKLOG",
            FeedItemStatus::Fetched => "FETCHED",
            FeedItemStatus::New => "NEW",
        }
    }
}

impl fmt::Display for FeedItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Feed Item
// ============================================================================

/// One entry of a feed as returned by `viewfeed` / `previewfeed`.
///
/// `url` is the identity: it keys table rows and is what gets enqueued.
/// Items are never mutated after a load; a session shares them behind an
/// `Arc<Vec<FeedItem>>`.
///
/// Size travels in two encodings: `size_mb` (rounded) and a 64-bit byte
/// count split across `size_lo`/`size_hi` for clients without 64-bit ints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedItem {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: FeedItemStatus,
    #[serde(default)]
    pub category: String,
    /// Publication time, epoch seconds. 0 when the feed had no date.
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "SizeMB", default)]
    pub size_mb: f64,
    #[serde(default, deserialize_with = "size_word")]
    pub size_lo: u32,
    #[serde(default, deserialize_with = "size_word")]
    pub size_hi: u32,

    // Informational fields; carried through but unused by projection and dispatch.
    #[serde(default)]
    pub add_category: String,
    #[serde(rename = "Match", default)]
    pub match_status: String,
    #[serde(default)]
    pub rule: i64,
    #[serde(default)]
    pub dupe_key: String,
    #[serde(default)]
    pub dupe_score: i64,
    #[serde(default)]
    pub dupe_mode: String,
}

/// Reads one 32-bit half of a split size.
///
/// The server prints each half as a signed int, so words at or above 2^31
/// arrive negative. Only the low 32 bits are kept.
fn size_word<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Word {
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Word::deserialize(deserializer)? {
        Word::Unsigned(v) => v as u32,
        Word::Signed(v) => v as u32,
    })
}

impl FeedItem {
    /// Byte count joined from the hi/lo words.
    pub fn size_bytes(&self) -> u64 {
        (u64::from(self.size_hi) << 32) | u64::from(self.size_lo)
    }

    /// True when none of the size encodings carries a value.
    pub fn size_unknown(&self) -> bool {
        self.size_mb <= 0.0 && self.size_lo == 0 && self.size_hi == 0
    }

    /// True when the two display names disagree.
    pub fn names_differ(&self) -> bool {
        self.filename != self.title
    }
}

// ============================================================================
// Load-time validation
// ============================================================================

/// Returns the first URL that appears more than once, if any.
///
/// Selection and dispatch key on the URL, so a set with duplicates cannot be
/// presented unambiguously and is rejected by the loader.
pub fn find_duplicate_url(items: &[FeedItem]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(|item| item.url.as_str())
        .find(|url| !seen.insert(*url))
}

#[cfg(test)]
pub(crate) fn test_item(url: &str, status: FeedItemStatus, filename: &str, title: &str) -> FeedItem {
    FeedItem {
        url: url.to_string(),
        title: title.to_string(),
        filename: filename.to_string(),
        status,
        category: String::new(),
        time: 0,
        size_mb: 0.0,
        size_lo: 0,
        size_hi: 0,
        add_category: String::new(),
        match_status: String::new(),
        rule: 0,
        dupe_key: String::new(),
        dupe_score: 0,
        dupe_mode: String::new(),
    }
}
