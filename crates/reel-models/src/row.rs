//! Queue row models.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::status::RowStatus;

/// Header names the pipeline reads and writes.
pub mod columns {
    pub const ID: &str = "id";
    pub const IMAGE_PROMPT: &str = "image_prompt";
    pub const AUDIO_SCRIPT: &str = "audio_script";
    pub const STATUS: &str = "video_status";
    pub const LINK: &str = "video link";
}

/// Errors from validating a row identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowIdError {
    #[error("row id is empty")]
    Empty,

    #[error("row id {0:?} cannot be used as a file name")]
    InvalidFileName(String),
}

/// Identifier of a queue row, used to name every artifact of the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RowId(String);

impl RowId {
    /// Validate and wrap a raw id cell.
    ///
    /// The id becomes a file stem, so separators and `..` are rejected.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, RowIdError> {
        let id = raw.as_ref().trim();
        if id.is_empty() {
            return Err(RowIdError::Empty);
        }
        if id == "." || id.contains("..") || id.contains('/') || id.contains('\\') || id.contains('\0') {
            return Err(RowIdError::InvalidFileName(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RowId {
    type Error = RowIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for RowId {
    type Error = RowIdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<RowId> for String {
    fn from(id: RowId) -> Self {
        id.0
    }
}

/// One unit of work in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRow {
    /// Raw id cell (validated into a [`RowId`] when the row is processed)
    pub id: String,
    /// Prompt for the image stage
    pub image_prompt: String,
    /// Narration for the audio stage, also used as caption
    pub audio_script: String,
    /// Status cell
    pub video_status: RowStatus,
    /// Output location, empty until the row is done
    pub video_link: String,
    /// Any other cells, keyed by header
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl QueueRow {
    /// Build a row from `(header, value)` pairs.
    ///
    /// Missing known columns become empty strings, which mirrors how a
    /// spreadsheet reports blank cells.
    pub fn from_record<I, K, V>(record: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut row = QueueRow {
            id: String::new(),
            image_prompt: String::new(),
            audio_script: String::new(),
            video_status: RowStatus::default(),
            video_link: String::new(),
            extra: BTreeMap::new(),
        };

        for (header, value) in record {
            let value = value.into();
            match header.as_ref().trim() {
                columns::ID => row.id = value,
                columns::IMAGE_PROMPT => row.image_prompt = value,
                columns::AUDIO_SCRIPT => row.audio_script = value,
                columns::STATUS => row.video_status = RowStatus::parse(&value),
                columns::LINK => row.video_link = value,
                other => {
                    row.extra.insert(other.to_string(), value);
                }
            }
        }

        row
    }

    /// Validated identifier of this row.
    pub fn row_id(&self) -> Result<RowId, RowIdError> {
        RowId::parse(&self.id)
    }

    pub fn is_pending(&self) -> bool {
        self.video_status.is_pending()
    }

    /// All fields as `(name, value)` pairs, known columns first.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let mut fields = vec![
            (columns::ID, self.id.as_str()),
            (columns::IMAGE_PROMPT, self.image_prompt.as_str()),
            (columns::AUDIO_SCRIPT, self.audio_script.as_str()),
            (columns::STATUS, self.video_status.as_str()),
            (columns::LINK, self.video_link.as_str()),
        ];
        fields.extend(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_id_is_trimmed() {
        let id = RowId::parse("  001 ").unwrap();
        assert_eq!(id.as_str(), "001");
    }

    #[test]
    fn test_row_id_rejects_path_like_values() {
        assert_eq!(RowId::parse("   "), Err(RowIdError::Empty));
        assert!(matches!(RowId::parse("../etc"), Err(RowIdError::InvalidFileName(_))));
        assert!(matches!(RowId::parse("a/b"), Err(RowIdError::InvalidFileName(_))));
        assert!(matches!(RowId::parse("a\\b"), Err(RowIdError::InvalidFileName(_))));
        assert!(RowId::parse("fox-001_v2").is_ok());
    }

    #[test]
    fn test_from_record_maps_known_columns() {
        let row = QueueRow::from_record([
            ("id", "001"),
            ("image_prompt", "a red fox"),
            ("audio_script", "Hello world"),
            ("video_status", " Pending"),
            ("video link", ""),
            ("notes", "first one"),
        ]);

        assert_eq!(row.id, "001");
        assert_eq!(row.image_prompt, "a red fox");
        assert_eq!(row.audio_script, "Hello world");
        assert!(row.is_pending());
        assert_eq!(row.extra.get("notes").map(String::as_str), Some("first one"));
    }

    #[test]
    fn test_from_record_missing_columns_are_blank() {
        let row = QueueRow::from_record([("id", "7")]);
        assert_eq!(row.image_prompt, "");
        assert!(!row.is_pending());
    }

    #[test]
    fn test_fields_lists_known_columns_first() {
        let row = QueueRow::from_record([("zeta", "z"), ("id", "9")]);
        let fields = row.fields();
        assert_eq!(fields[0], ("id", "9"));
        assert_eq!(fields.last(), Some(&("zeta", "z")));
    }
}
