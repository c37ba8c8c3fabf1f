use std::sync::Arc;

use crate::{FromValue, MappingError, RecordError, RecordResult, Value};

/// A backend-neutral result row: column names plus positionally aligned values.
///
/// Column names are shared between the rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of a column. Names are compared case-insensitively.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .map(|i| &self.values[i])
    }

    /// Typed value of a column, or `None` when the row has no such column.
    pub fn try_get<V: FromValue>(&self, column: &str) -> RecordResult<Option<V>> {
        match self.value(column) {
            Some(v) => V::from_value(v.clone()).map(Some).map_err(|e| {
                RecordError::mapping(MappingError::Column {
                    column: column.to_string(),
                    source: Box::new(e),
                })
            }),
            None => Ok(None),
        }
    }

    /// Typed value of a column that must be present.
    pub fn get<V: FromValue>(&self, column: &str) -> RecordResult<V> {
        self.try_get(column)?
            .ok_or_else(|| RecordError::mapping(MappingError::MissingColumn(column.to_string())))
    }

    /// Typed value by position.
    pub fn get_index<V: FromValue>(&self, index: usize) -> RecordResult<V> {
        let v = self
            .values
            .get(index)
            .ok_or_else(|| RecordError::mapping(MappingError::MissingColumn(index.to_string())))?;
        V::from_value(v.clone()).map_err(RecordError::mapping)
    }
}
