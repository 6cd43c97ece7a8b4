//! Buffered result sets.

use std::collections::VecDeque;

use crate::types::ColumnDef;

/// Text values of one row; `None` is SQL NULL.
pub type RowValues = Vec<Option<String>>;

/// A fully buffered result set, consumed front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    columns: Vec<ColumnDef>,
    rows: VecDeque<RowValues>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnDef>, rows: impl IntoIterator<Item = RowValues>) -> Self {
        Self {
            columns,
            rows: rows.into_iter().collect(),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn fields(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Rows not yet fetched.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Take the next row.
    pub fn fetch_row(&mut self) -> Option<RowValues> {
        self.rows.pop_front()
    }

    /// Column labels, table-qualified when `include_tables` is set.
    pub fn labels(&self, include_tables: bool) -> impl Iterator<Item = String> + '_ {
        self.columns.iter().map(move |c| c.label(include_tables))
    }

    /// Every remaining value, row by row, NULL read as empty.
    pub fn into_elements(self) -> Vec<String> {
        self.rows
            .into_iter()
            .flatten()
            .map(Option::unwrap_or_default)
            .collect()
    }
}
