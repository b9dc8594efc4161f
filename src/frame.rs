//! In-memory tabular frames: the data boundary snapshots are taken from

use crate::error::{PipediffError, Result};
use crate::output::write_grid;
use crate::value::{DType, Label, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// A typed column of cells
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    dtype: DType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, inferring its dtype. Integers are widened to floats
    /// when the column mixes both.
    pub fn new(values: Vec<Value>) -> Self {
        let dtype = DType::infer(&values);
        let values = if dtype == DType::Float64 {
            values
                .into_iter()
                .map(|v| match v {
                    Value::Int(i) => Value::Float(i as f64),
                    other => other,
                })
                .collect()
        } else {
            values
        };
        Self { dtype, values }
    }

    /// Build a column with an explicit dtype, e.g. an empty but typed column
    pub fn with_dtype(dtype: DType, values: Vec<Value>) -> Self {
        Self { dtype, values }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&self, positions: &[usize]) -> Column {
        Column {
            dtype: self.dtype,
            values: positions
                .iter()
                .filter_map(|&p| self.values.get(p).cloned())
                .collect(),
        }
    }
}

impl<T: Into<Value>> FromIterator<T> for Column {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Column::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A row-labelled table with insertion-ordered, uniquely named columns
#[derive(Debug, Clone, Default, Serialize)]
pub struct Frame {
    index: Vec<Label>,
    columns: IndexMap<String, Column>,
}

impl Frame {
    /// Create a frame with a default `0..n` integer index
    pub fn new<I, K>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Column)>,
        K: Into<String>,
    {
        let mut map: IndexMap<String, Column> = IndexMap::new();
        let mut n_rows = None;

        for (name, column) in columns {
            let name = name.into();
            match n_rows {
                None => n_rows = Some(column.len()),
                Some(n) if n != column.len() => {
                    return Err(PipediffError::frame(format!(
                        "Column '{}' has {} values, expected {}",
                        name,
                        column.len(),
                        n
                    )));
                }
                Some(_) => {}
            }
            if map.contains_key(&name) {
                return Err(PipediffError::frame(format!("Duplicate column name: {}", name)));
            }
            map.insert(name, column);
        }

        let index = (0..n_rows.unwrap_or(0)).map(Label::from).collect();
        Ok(Self {
            index,
            columns: map,
        })
    }

    /// A frame without rows or columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Replace the row index
    pub fn with_index(mut self, index: Vec<Label>) -> Result<Self> {
        if !self.columns.is_empty() && index.len() != self.n_rows() {
            return Err(PipediffError::frame(format!(
                "Index has {} labels, frame has {} rows",
                index.len(),
                self.n_rows()
            )));
        }
        self.index = index;
        Ok(self)
    }

    pub(crate) fn from_parts(index: Vec<Label>, columns: IndexMap<String, Column>) -> Self {
        Self { index, columns }
    }

    pub fn index(&self) -> &[Label] {
        &self.index
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// `(row_count, column_count)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows(), self.n_columns())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn dtypes(&self) -> IndexMap<String, DType> {
        self.columns
            .iter()
            .map(|(name, col)| (name.clone(), col.dtype()))
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Column)> {
        self.columns.iter()
    }

    /// Cells of the row at `position`, in column order
    pub fn row_values(&self, position: usize) -> Vec<Value> {
        self.columns
            .values()
            .map(|col| col.values().get(position).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Cell addressed by row label and column name (first matching row)
    pub fn value(&self, row: &Label, column: &str) -> Option<&Value> {
        let position = self.index.iter().position(|l| l == row)?;
        self.columns.get(column)?.values().get(position)
    }

    /// Restrict the frame to the given row and column labels.
    ///
    /// Labels that do not exist are ignored, and the frame's own order is
    /// kept. `None` keeps every label along that axis. An empty column
    /// intersection yields a zero-column frame that still carries the
    /// selected rows.
    pub fn select(&self, rows: Option<&[Label]>, columns: Option<&[String]>) -> Frame {
        let positions: Vec<usize> = match rows {
            Some(wanted) => self
                .index
                .iter()
                .enumerate()
                .filter(|(_, label)| wanted.contains(label))
                .map(|(i, _)| i)
                .collect(),
            None => (0..self.n_rows()).collect(),
        };

        let selected = self
            .columns
            .iter()
            .filter(|(name, _)| columns.map_or(true, |wanted| wanted.iter().any(|c| c == *name)))
            .map(|(name, col)| (name.clone(), col.take(&positions)))
            .collect();

        Frame {
            index: positions.iter().map(|&i| self.index[i].clone()).collect(),
            columns: selected,
        }
    }

    /// Build a frame from JSON: either a column-oriented object
    /// (`{"a": [1, 2], "b": [3, 4]}`) or an array of record objects.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => {
                let mut columns = Vec::with_capacity(map.len());
                for (name, cells) in map {
                    let cells = cells.as_array().ok_or_else(|| {
                        PipediffError::frame(format!("Column '{}' must be a JSON array", name))
                    })?;
                    let values = cells
                        .iter()
                        .map(|c| json_cell(name, c))
                        .collect::<Result<Vec<_>>>()?;
                    columns.push((name.clone(), Column::new(values)));
                }
                Frame::new(columns)
            }
            serde_json::Value::Array(records) => {
                let mut names: Vec<String> = Vec::new();
                for record in records {
                    let record = record.as_object().ok_or_else(|| {
                        PipediffError::frame("Records must be JSON objects")
                    })?;
                    for name in record.keys() {
                        if !names.contains(name) {
                            names.push(name.clone());
                        }
                    }
                }

                let mut columns = Vec::with_capacity(names.len());
                for name in names {
                    let values = records
                        .iter()
                        .map(|record| match record.get(&name) {
                            Some(cell) => json_cell(&name, cell),
                            None => Ok(Value::Null),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    columns.push((name, Column::new(values)));
                }
                let frame = Frame::new(columns)?;
                let index = (0..records.len()).map(Label::from).collect();
                frame.with_index(index)
            }
            _ => Err(PipediffError::frame(
                "Expected a JSON object of columns or an array of records",
            )),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipediffError::invalid_input(format!(
                "File not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let json: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_json(&json)
    }
}

fn json_cell(column: &str, cell: &serde_json::Value) -> Result<Value> {
    if cell.is_array() || cell.is_object() {
        return Err(PipediffError::frame(format!(
            "Column '{}' contains a nested value: {}",
            column, cell
        )));
    }
    Ok(serde_json::from_value(cell.clone())?)
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.columns.len() == other.columns.len()
            && self.columns.iter().eq(other.columns.iter())
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec![String::new()];
        header.extend(self.columns.keys().cloned());

        let rows = self
            .index
            .iter()
            .enumerate()
            .map(|(pos, label)| {
                let mut row = vec![label.to_string()];
                row.extend(self.row_values(pos).iter().map(|v| v.to_string()));
                row
            })
            .collect::<Vec<_>>();

        write_grid(f, &[header], &rows)
    }
}
