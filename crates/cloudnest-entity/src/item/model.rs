//! Item entity model.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use cloudnest_core::types::ItemId;

/// Whether an item is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A regular file.
    File,
    /// A folder that may contain other items.
    #[serde(alias = "dir", alias = "directory")]
    Folder,
}

impl ItemKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file or folder as returned by the backend's flat listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Server-assigned identifier.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// File or folder.
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Parent folder; `None` means root-level.
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    /// Byte count, meaningful only for files.
    #[serde(default)]
    pub size: Option<u64>,
    /// MIME type reported by the backend.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// When the item was created.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the item was last updated.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether the item is starred.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_starred: bool,
    /// Whether the item sits in the trash.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_trashed: bool,
    /// Embeddable-content URL, present only on root-level listings.
    #[serde(default)]
    pub iframe_url: Option<String>,
}

impl Item {
    /// Build a minimal item; remaining fields take their empty defaults.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: None,
            size: None,
            mime_type: None,
            created_at: None,
            updated_at: None,
            is_starred: false,
            is_trashed: false,
            iframe_url: None,
        }
    }

    /// Shorthand for a folder.
    pub fn folder(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self::new(id, name, ItemKind::Folder)
    }

    /// Shorthand for a file.
    pub fn file(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self::new(id, name, ItemKind::File)
    }

    /// Set the parent, builder-style.
    pub fn with_parent(mut self, parent_id: impl Into<ItemId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    /// Whether this item is a file.
    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }

    /// The parent id, treating root sentinels as "no parent".
    pub fn effective_parent(&self, sentinels: &[String]) -> Option<&ItemId> {
        self.parent_id
            .as_ref()
            .filter(|pid| !pid.is_root_sentinel(sentinels))
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| *ext != self.name)
            .map(|ext| ext.to_lowercase())
    }
}

/// Epoch values at or above this are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, epoch seconds or milliseconds,
/// or anything else (mapped to `None`).
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Epoch(i64),
        Fractional(f64),
        Other(serde::de::IgnoredAny),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::Text(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        Some(Raw::Epoch(n)) => from_epoch(n),
        Some(Raw::Fractional(f)) if f.is_finite() => from_epoch(f.trunc() as i64),
        Some(Raw::Fractional(_)) | Some(Raw::Other(_)) | None => None,
    })
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(value)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}

/// Accepts `true`/`false`, `0`/`1`, or `null`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Bool(b)) => b,
        Some(Raw::Int(n)) => n != 0,
        None => false,
    })
}
