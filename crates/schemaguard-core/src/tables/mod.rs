use arrow_array::StringArray;

pub mod csv_table;

/// Data rows of an uploaded file, header already removed.
///
/// Cells are kept as raw strings. Rows may be ragged; a cell past the end
/// of a short row is reported as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of cells in the first row, `None` when there are no rows.
    pub fn width(&self) -> Option<usize> {
        self.rows.first().map(Vec::len)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
    }

    /// Project column `index` into an Arrow string array, one slot per row.
    pub fn column(&self, index: usize) -> StringArray {
        self.rows
            .iter()
            .map(|row| row.get(index).map(String::as_str))
            .collect()
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for RawTable {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}
