use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StoreError;

/// In-memory model of one append-only results table: a header row plus data
/// rows, cell values kept as strings the way a spreadsheet stores them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Worksheet {
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Appends one row under the given header layout. If the stored layout
    /// differs, existing rows are remapped cell-by-cell onto the new headers
    /// first (unknown cells become empty), so no historic column is lost as
    /// long as the caller passes a superset layout.
    pub fn append_aligned(&mut self, headers: &[String], values: &[String]) {
        debug_assert_eq!(headers.len(), values.len(), "row width must match headers");

        if self.headers != headers {
            self.remap_to(headers);
        }
        self.rows.push(values.to_vec());
    }

    fn remap_to(&mut self, new_headers: &[String]) {
        let old_index_by_header: HashMap<&str, usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(index, header)| (header.as_str(), index))
            .collect();

        for row in &mut self.rows {
            let remapped = new_headers
                .iter()
                .map(|header| {
                    old_index_by_header
                        .get(header.as_str())
                        .and_then(|&index| row.get(index))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>();
            *row = remapped;
        }
        self.headers = new_headers.to_vec();
    }

    /// Structural checks applied after parsing a stored worksheet.
    pub(crate) fn validate(&self, path: &Path) -> Result<(), StoreError> {
        let mut seen = HashSet::<&str>::new();
        for header in &self.headers {
            if !seen.insert(header.as_str()) {
                return Err(StoreError::Invalid {
                    path: path.to_path_buf(),
                    message: format!("duplicate header '{header}'"),
                });
            }
        }
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.headers.len() {
                return Err(StoreError::Invalid {
                    path: path.to_path_buf(),
                    message: format!(
                        "row {index} has {} cells, expected {}",
                        row.len(),
                        self.headers.len()
                    ),
                });
            }
        }
        Ok(())
    }
}
