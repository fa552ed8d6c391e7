use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow_schema::{Field, Schema};
use itertools::Itertools;
use sift_error::{SiftResult, sift_bail};
use sift_expr::FieldName;

/// An immutable, physically backed table of named columns.
///
/// Every column holds exactly [`Dataset::row_count`] rows. Datasets are shared between views by
/// `Arc` and never change once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<(FieldName, ArrayRef)>,
    row_count: usize,
}

impl Dataset {
    /// Create a dataset, taking the row count from the first column. A dataset without columns
    /// has no rows.
    pub fn try_new<N: Into<FieldName>>(
        columns: impl IntoIterator<Item = (N, ArrayRef)>,
    ) -> SiftResult<Self> {
        let columns = columns
            .into_iter()
            .map(|(name, array)| (name.into(), array))
            .collect::<Vec<_>>();
        let row_count = columns.first().map(|(_, array)| array.len()).unwrap_or(0);
        Self::try_new_with_row_count(row_count, columns)
    }

    /// Create a dataset with an explicit row count, which every column must match.
    pub fn try_new_with_row_count(
        row_count: usize,
        columns: Vec<(FieldName, ArrayRef)>,
    ) -> SiftResult<Self> {
        for (name, array) in &columns {
            if array.len() != row_count {
                sift_bail!(
                    "column {} has {} rows, expected {}",
                    name,
                    array.len(),
                    row_count
                );
            }
        }
        if let Some(name) = columns.iter().map(|(name, _)| name).duplicates().next() {
            sift_bail!("duplicate column {}", name);
        }

        Ok(Self { columns, row_count })
    }

    pub fn from_record_batch(batch: &RecordBatch) -> SiftResult<Self> {
        let columns = batch
            .schema_ref()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| (FieldName::from(field.name().as_str()), array.clone()))
            .collect();
        Self::try_new_with_row_count(batch.num_rows(), columns)
    }

    pub fn to_record_batch(&self) -> SiftResult<RecordBatch> {
        record_batch(self.row_count, &self.columns)
    }

    /// The number of physical rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.columns
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, array)| array)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &FieldName> {
        self.columns.iter().map(|(name, _)| name)
    }

    pub fn columns(&self) -> &[(FieldName, ArrayRef)] {
        &self.columns
    }
}

impl TryFrom<RecordBatch> for Dataset {
    type Error = sift_error::SiftError;

    fn try_from(value: RecordBatch) -> SiftResult<Self> {
        Self::from_record_batch(&value)
    }
}

pub(crate) fn record_batch(
    row_count: usize,
    columns: &[(FieldName, ArrayRef)],
) -> SiftResult<RecordBatch> {
    let schema = Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(name.as_ref(), array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    );
    Ok(RecordBatch::try_new_with_options(
        Arc::new(schema),
        columns.iter().map(|(_, array)| array.clone()).collect(),
        &RecordBatchOptions::new().with_row_count(Some(row_count)),
    )?)
}
