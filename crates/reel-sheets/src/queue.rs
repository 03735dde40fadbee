//! Spreadsheet-backed work queue.
//!
//! Row 1 is the header. A row is claimable when its `video_status` cell,
//! trimmed and case-folded, reads `pending`; the first such row in sheet
//! order wins. Claiming is not atomic: two concurrent runs can pick the
//! same row.

use std::sync::Arc;

use reel_models::{columns, HeaderIndex, PendingRow, RowStatus};
use tracing::{debug, info};

use crate::backend::{CellUpdate, QueueBackend};
use crate::error::{SheetsError, SheetsResult};

/// Queue operations over any [`QueueBackend`].
#[derive(Clone)]
pub struct SheetQueue {
    backend: Arc<dyn QueueBackend>,
}

impl SheetQueue {
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend }
    }

    /// First pending row, or `None` when nothing is pending.
    pub async fn next_pending(&self) -> SheetsResult<Option<PendingRow>> {
        let rows = self.backend.read_rows().await?;
        let Some((header_cells, data)) = rows.split_first() else {
            debug!("Worksheet is empty");
            return Ok(None);
        };

        let header = HeaderIndex::new(header_cells);
        let status_col = header
            .position(columns::STATUS)
            .ok_or_else(|| SheetsError::missing_column(columns::STATUS))?;

        for (index, cells) in data.iter().enumerate() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }

            let status = cells.get(status_col).map(String::as_str).unwrap_or_default();
            if !RowStatus::parse(status).is_pending() {
                continue;
            }

            let row_number = PendingRow::sheet_row_number(index);
            let row = header.to_row(cells);
            info!(row_number, id = %row.id, "Found pending row");

            return Ok(Some(PendingRow {
                row,
                row_number,
                header,
            }));
        }

        debug!(rows = data.len(), "No pending rows");
        Ok(None)
    }

    /// Set the row's status to `done` and its link to `link`.
    ///
    /// Both cells go out in one write; a missing column fails before writing.
    pub async fn mark_done(&self, pending: &PendingRow, link: &str) -> SheetsResult<()> {
        let status_col = pending
            .header
            .column_number(columns::STATUS)
            .ok_or_else(|| SheetsError::missing_column(columns::STATUS))?;
        let link_col = pending
            .header
            .column_number(columns::LINK)
            .ok_or_else(|| SheetsError::missing_column(columns::LINK))?;

        let updates = [
            CellUpdate::new(pending.row_number, status_col, RowStatus::Done.as_str()),
            CellUpdate::new(pending.row_number, link_col, link),
        ];
        self.backend.write_cells(&updates).await?;

        info!(row_number = pending.row_number, link, "Marked row done");
        Ok(())
    }
}
