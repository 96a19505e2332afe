//! Parameter batches bound to a sampler pub.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Values for a circuit's free parameters and classical inputs, one row per
/// batch element.
///
/// Column names refer either to symbolic gate parameters or to declared
/// classical inputs; the sampler decides which by looking at the circuit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterBatch {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    /// Row count, kept separately so a batch with no columns still has a size.
    batch_size: usize,
}

impl ParameterBatch {
    /// Create a batch from named columns and rows.
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> HalResult<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != names.len()) {
            return Err(HalError::Configuration(format!(
                "parameter row {i} has {} values, expected {}",
                row.len(),
                names.len()
            )));
        }
        let mut seen = names.clone();
        seen.sort();
        if let Some(dup) = seen.windows(2).find(|w| w[0] == w[1]) {
            return Err(HalError::Configuration(format!(
                "duplicate parameter name '{}'",
                dup[0]
            )));
        }
        Ok(Self {
            batch_size: rows.len(),
            names,
            rows,
        })
    }

    /// A batch of `batch_size` elements with no parameters.
    pub fn empty(batch_size: usize) -> Self {
        Self {
            names: vec![],
            rows: vec![vec![]; batch_size],
            batch_size,
        }
    }

    /// Number of batch elements.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Raw rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Name to value map for one row.
    pub fn row_bindings(&self, index: usize) -> Option<FxHashMap<String, f64>> {
        let row = self.rows.get(index)?;
        Some(
            self.names
                .iter()
                .cloned()
                .zip(row.iter().copied())
                .collect(),
        )
    }

    /// Append a column holding the same value in every row.
    ///
    /// Replaces an existing column of that name.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        match self.names.iter().position(|n| *n == name) {
            Some(col) => {
                for row in &mut self.rows {
                    row[col] = value;
                }
            }
            None => {
                self.names.push(name);
                for row in &mut self.rows {
                    row.push(value);
                }
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_bindings() {
        let batch = ParameterBatch::new(
            vec!["a".into(), "b".into()],
            vec![vec![0.1, 0.2], vec![1.1, 1.2]],
        )
        .unwrap();

        assert_eq!(batch.batch_size(), 2);
        let row = batch.row_bindings(1).unwrap();
        assert_eq!(row["a"], 1.1);
        assert_eq!(row["b"], 1.2);
        assert!(batch.row_bindings(2).is_none());
    }

    #[test]
    fn test_ragged_and_duplicate_rejected() {
        assert!(ParameterBatch::new(vec!["a".into()], vec![vec![0.0, 1.0]]).is_err());
        assert!(ParameterBatch::new(vec!["a".into(), "a".into()], vec![]).is_err());
    }

    #[test]
    fn test_empty_batch_keeps_size() {
        let batch = ParameterBatch::empty(3).with_column("k", 2.0);
        assert_eq!(batch.batch_size(), 3);
        assert_eq!(batch.row_bindings(2).unwrap()["k"], 2.0);

        let batch = batch.with_column("k", 5.0);
        assert_eq!(batch.names().len(), 1);
        assert_eq!(batch.row_bindings(0).unwrap()["k"], 5.0);
    }
}
