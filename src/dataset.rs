//! Training sample feed.
//!
//! The engine's contract with the dataset is minimal: each step
//! consumes up to `input_width` numeric values plus a label string.
//! This module parses the CSV-like measurement format the original
//! feed uses — comma-separated floats with a trailing label column:
//!
//! ```text
//! 5.1,3.5,1.4,0.2,Iris-setosa
//! ```
//!
//! A feed failure mid-training is fatal for the run: malformed rows
//! are reported as errors, never skipped.

use crate::error::{FlatnetError, FlatnetResult};
use std::fs;
use std::path::Path;

/// One training sample: feature values plus a class label.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Numeric feature values, at most the input layer width.
    pub values: Vec<f32>,
    /// Class label, resolved to an index by the label table.
    pub label: String,
}

impl Sample {
    /// Parses one CSV row: leading float columns, trailing label.
    ///
    /// # Errors
    ///
    /// Returns [`FlatnetError::Dataset`] if the row has fewer than two
    /// columns or a feature column is not a number.
    pub fn parse(line: &str) -> FlatnetResult<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            return Err(FlatnetError::dataset(format!(
                "expected at least one value and a label, got {:?}",
                line
            )));
        }

        let (label, value_fields) = fields.split_last().unwrap();
        if label.is_empty() {
            return Err(FlatnetError::dataset(format!("empty label in {:?}", line)));
        }

        let mut values = Vec::with_capacity(value_fields.len());
        for field in value_fields {
            let v: f32 = field.parse().map_err(|_| {
                FlatnetError::dataset(format!("non-numeric value {:?} in {:?}", field, line))
            })?;
            values.push(v);
        }

        Ok(Self {
            values,
            label: (*label).to_owned(),
        })
    }
}

/// Loads all samples from a measurement file.
///
/// Blank lines are ignored; every other line must parse. The first
/// unparsable row aborts the load.
///
/// # Errors
///
/// Propagates I/O errors and per-row [`FlatnetError::Dataset`] errors.
pub fn load_samples<P: AsRef<Path>>(path: P) -> FlatnetResult<Vec<Sample>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    let mut samples = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let sample = Sample::parse(line).map_err(|e| {
            FlatnetError::dataset(format!("{}:{}: {}", path.display(), line_no + 1, e))
        })?;
        samples.push(sample);
    }

    log::info!("Loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_measurement_row() {
        let sample = Sample::parse("5.1,3.5,1.4,0.2,Iris-setosa").unwrap();
        assert_eq!(sample.values, vec![5.1, 3.5, 1.4, 0.2]);
        assert_eq!(sample.label, "Iris-setosa");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let sample = Sample::parse(" 1.0 , 2.0 , label ").unwrap();
        assert_eq!(sample.values, vec![1.0, 2.0]);
        assert_eq!(sample.label, "label");
    }

    #[test]
    fn test_parse_rejects_short_row() {
        assert!(Sample::parse("lonely").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_value() {
        let err = Sample::parse("5.1,oops,label").unwrap_err();
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn test_parse_rejects_empty_label() {
        assert!(Sample::parse("1.0,2.0,").is_err());
    }
}
