//! Claimed queue rows and the header index used to address their cells.

use serde::{Deserialize, Serialize};

use crate::row::{columns, QueueRow};

/// Header row of a worksheet, mapping column names to positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderIndex {
    headers: Vec<String>,
}

impl HeaderIndex {
    /// Build from the raw header cells, trimming each name.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// 0-based index of the first column named `name` (case-insensitive).
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// 1-based column number, as used by A1 notation.
    pub fn column_number(&self, name: &str) -> Option<usize> {
        self.position(name).map(|i| i + 1)
    }

    /// Pair each header with its cell, padding short rows with blanks.
    ///
    /// Cells past the last header are dropped; unnamed columns are skipped.
    pub fn record<'a>(&'a self, cells: &'a [String]) -> impl Iterator<Item = (&'a str, String)> + 'a {
        self.headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(move |(i, h)| (h.as_str(), cells.get(i).cloned().unwrap_or_default()))
    }

    /// Build the typed row for a line of cells.
    pub fn to_row(&self, cells: &[String]) -> QueueRow {
        QueueRow::from_record(
            self.record(cells)
                .map(|(h, v)| (canonical_header(h).unwrap_or(h).to_string(), v)),
        )
    }
}

/// Map a header to the known column name it matches, ignoring case.
fn canonical_header(header: &str) -> Option<&'static str> {
    [
        columns::ID,
        columns::IMAGE_PROMPT,
        columns::AUDIO_SCRIPT,
        columns::STATUS,
        columns::LINK,
    ]
    .into_iter()
    .find(|known| known.eq_ignore_ascii_case(header))
}

/// A row selected for processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRow {
    pub row: QueueRow,
    /// 1-based sheet row number (the header is row 1)
    pub row_number: usize,
    /// Header as it was when the row was read
    pub header: HeaderIndex,
}

impl PendingRow {
    /// Position of a data row (0-based, excluding the header) as a sheet row number.
    pub fn sheet_row_number(data_index: usize) -> usize {
        data_index + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_position_ignores_case_and_padding() {
        let header = HeaderIndex::new([" id", "Video_Status ", "video link"]);
        assert_eq!(header.position("video_status"), Some(1));
        assert_eq!(header.column_number("video link"), Some(3));
        assert_eq!(header.position("image_prompt"), None);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let header = HeaderIndex::new(["id", "image_prompt", "video_status"]);
        let row = header.to_row(&cells(&["001"]));

        assert_eq!(row.id, "001");
        assert_eq!(row.image_prompt, "");
        assert!(!row.is_pending());
    }

    #[test]
    fn test_to_row_normalises_known_headers() {
        let header = HeaderIndex::new(["ID", "Video_Status", "Notes"]);
        let row = header.to_row(&cells(&["7", "PENDING", "n"]));

        assert_eq!(row.id, "7");
        assert!(row.is_pending());
        assert_eq!(row.extra.get("Notes").map(String::as_str), Some("n"));
    }

    #[test]
    fn test_sheet_row_number() {
        assert_eq!(PendingRow::sheet_row_number(0), 2);
        assert_eq!(PendingRow::sheet_row_number(9), 11);
    }
}
