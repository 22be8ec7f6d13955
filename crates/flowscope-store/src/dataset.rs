//! The labeled flow dataset, read from CSV into Arrow.

use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, StringArray};
use arrow::compute::{cast, concat_batches, filter_record_batch};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use flowscope_core::{FeatureSchema, FeatureVector, Sample};
use tracing::{debug, info};

use crate::StoreError;

/// Name of the class label column.
pub const LABEL_COLUMN: &str = "Label";

/// Rows of 83 feature values plus one label each.
///
/// Feature columns are nullable `Float64` in [`FeatureSchema`] order; a
/// cell that is empty or not numeric reads as null.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: FeatureSchema,
    features: RecordBatch,
    labels: Vec<String>,
}

impl Dataset {
    /// Read a labeled CSV with a header row.
    ///
    /// Header names are matched after trimming whitespace. The file must
    /// hold a `Label` column plus exactly one column per schema feature.
    pub fn from_csv(path: &Path, schema: &FeatureSchema) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::CsvNotFound(path.to_path_buf()));
        }

        let mut file = File::open(path)?;
        let (header, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut file, Some(100))?;
        file.rewind()?;

        let names: Vec<String> = header
            .fields()
            .iter()
            .map(|f| f.name().trim().to_string())
            .collect();
        let label_idx = names
            .iter()
            .position(|n| n == LABEL_COLUMN)
            .ok_or(StoreError::MissingLabelColumn)?;
        if names.len() - 1 != schema.len() {
            return Err(StoreError::FeatureCount {
                expected: schema.len(),
                actual: names.len() - 1,
            });
        }

        // Read every cell as text; numeric coercion happens per column below.
        let text_schema = Arc::new(Schema::new(
            names
                .iter()
                .map(|n| Field::new(n.as_str(), DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));
        let reader = ReaderBuilder::new(text_schema.clone())
            .with_header(true)
            .build(BufReader::new(file))?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        let text = concat_batches(&text_schema, &batches)?;

        let label_col = text.column(label_idx).as_string::<i32>();
        let labels = read_labels(label_col)?;

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.len());
        for name in schema.names() {
            let idx = names
                .iter()
                .enumerate()
                .position(|(i, n)| i != label_idx && n == name)
                .ok_or_else(|| StoreError::MissingColumn(name.clone()))?;
            columns.push(cast(text.column(idx), &DataType::Float64)?);
        }
        let features = RecordBatch::try_new(nullable_arrow(schema), columns)?;

        info!(
            rows = features.num_rows(),
            labels = label_count(&labels),
            path = %path.display(),
            "loaded dataset"
        );

        Ok(Self {
            schema: schema.clone(),
            features,
            labels,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// All feature columns, in schema order, nulls included.
    pub fn features(&self) -> &RecordBatch {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn num_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Row count per label, in order of first appearance.
    pub fn label_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for label in &self.labels {
            match counts.iter_mut().find(|(l, _)| l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label.clone(), 1)),
            }
        }
        counts
    }

    /// Indices of the rows carrying `label`.
    pub fn rows_with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.labels
            .iter()
            .enumerate()
            .filter(move |(_, l)| *l == label)
            .map(|(i, _)| i)
    }

    /// Feature values of one row; `None` marks a null cell.
    pub fn row_values(&self, row: usize) -> Vec<Option<f64>> {
        self.features
            .columns()
            .iter()
            .map(|col| {
                let col = col.as_primitive::<Float64Type>();
                col.is_valid(row).then(|| col.value(row))
            })
            .collect()
    }

    /// True when every feature of `row` is present and finite.
    pub fn is_complete(&self, row: usize) -> bool {
        self.row_values(row)
            .iter()
            .all(|v| v.is_some_and(f64::is_finite))
    }

    /// The row as a labelled sample, if it is complete.
    pub fn sample(&self, row: usize) -> Option<Sample> {
        let values: Option<Vec<f64>> = self.row_values(row).into_iter().collect();
        let vector = FeatureVector::new(self.schema.clone(), values?).ok()?;
        Some(Sample::from_vector(self.labels[row].clone(), &vector))
    }

    /// Only the complete rows: their features and matching labels.
    pub fn complete_rows(&self) -> Result<(RecordBatch, Vec<String>), StoreError> {
        let mask: Vec<bool> = (0..self.num_rows()).map(|r| self.is_complete(r)).collect();
        let labels = self
            .labels
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(l, _)| l.clone())
            .collect::<Vec<_>>();
        let dropped = self.num_rows() - labels.len();
        if dropped > 0 {
            debug!(dropped, "skipping incomplete dataset rows");
        }
        let batch = filter_record_batch(&self.features, &BooleanArray::from(mask))?;
        Ok((batch, labels))
    }
}

fn read_labels(col: &StringArray) -> Result<Vec<String>, StoreError> {
    (0..col.len())
        .map(|row| {
            if col.is_null(row) {
                Err(StoreError::NullLabel { row })
            } else {
                Ok(col.value(row).to_string())
            }
        })
        .collect()
}

fn label_count(labels: &[String]) -> usize {
    let mut seen: Vec<&str> = Vec::new();
    for l in labels {
        if !seen.contains(&l.as_str()) {
            seen.push(l);
        }
    }
    seen.len()
}

fn nullable_arrow(schema: &FeatureSchema) -> Arc<Schema> {
    Arc::new(Schema::new(
        schema
            .names()
            .iter()
            .map(|n| Field::new(n.as_str(), DataType::Float64, true))
            .collect::<Vec<_>>(),
    ))
}
