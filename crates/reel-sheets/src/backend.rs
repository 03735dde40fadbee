//! Storage seam behind the queue.
//!
//! `SheetQueue` only needs two primitives: read every row of the worksheet
//! and write a batch of single cells. [`SheetsClient`](crate::SheetsClient)
//! implements them over the Sheets API, [`MemoryQueue`] over a vector.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{SheetsError, SheetsResult};

/// One cell to overwrite. Row and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: usize,
    pub column: usize,
    pub value: String,
}

impl CellUpdate {
    pub fn new(row: usize, column: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            column,
            value: value.into(),
        }
    }
}

/// Raw row storage for the queue.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// All rows in stored order, header first. Trailing blank cells may be omitted.
    async fn read_rows(&self) -> SheetsResult<Vec<Vec<String>>>;

    /// Write every update, or none of them.
    async fn write_cells(&self, updates: &[CellUpdate]) -> SheetsResult<()>;
}

#[async_trait]
impl<T: QueueBackend + ?Sized> QueueBackend for Arc<T> {
    async fn read_rows(&self) -> SheetsResult<Vec<Vec<String>>> {
        (**self).read_rows().await
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> SheetsResult<()> {
        (**self).write_cells(updates).await
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

/// Worksheet held in memory.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<CellUpdate>>,
}

impl MemoryQueue {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Build from a header and string-slice rows.
    pub fn from_table(header: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = vec![header.iter().map(|c| c.to_string()).collect::<Vec<_>>()];
        table.extend(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        );
        Self::new(table)
    }

    /// Current contents.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Value of a 1-based cell, blank if outside the stored range.
    pub fn cell(&self, row: usize, column: usize) -> String {
        self.rows()
            .get(row.wrapping_sub(1))
            .and_then(|r| r.get(column.wrapping_sub(1)))
            .cloned()
            .unwrap_or_default()
    }

    /// Every update applied so far, in order.
    pub fn writes(&self) -> Vec<CellUpdate> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl QueueBackend for MemoryQueue {
    async fn read_rows(&self) -> SheetsResult<Vec<Vec<String>>> {
        Ok(self.rows())
    }

    async fn write_cells(&self, updates: &[CellUpdate]) -> SheetsResult<()> {
        if let Some(bad) = updates.iter().find(|u| u.row == 0 || u.column == 0) {
            return Err(SheetsError::RequestFailed(format!(
                "invalid cell row={} column={}",
                bad.row, bad.column
            )));
        }

        let mut rows = self
            .rows
            .lock()
            .map_err(|_| SheetsError::RequestFailed("memory queue poisoned".into()))?;
        for update in updates {
            if rows.len() < update.row {
                rows.resize_with(update.row, Vec::new);
            }
            let row = &mut rows[update.row - 1];
            if row.len() < update.column {
                row.resize(update.column, String::new());
            }
            row[update.column - 1] = update.value.clone();
        }
        drop(rows);

        if let Ok(mut writes) = self.writes.lock() {
            writes.extend(updates.iter().cloned());
        }
        Ok(())
    }
}
