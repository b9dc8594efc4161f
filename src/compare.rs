//! Cross-snapshot comparison tables

use crate::collection::{EntryRef, SnapshotLog};
use crate::error::{PipediffError, Result};
use crate::frame::Frame;
use crate::output::write_grid;
use crate::value::{DType, Label, Value};
use blake3::Hasher;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Label of the boolean row placed above the aggregated values
pub const EXISTS_ROW: &str = "exists";

/// Which level of the two-level column labels is the outer grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelOrder {
    /// Column label outside, entry inside: all entries of one column sit together
    #[default]
    ColumnsFirst,
    /// Entry outside, column label inside: all columns of one entry sit together
    EntriesFirst,
}

/// One column of a comparison table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonKey {
    pub column: String,
    pub entry: String,
}

/// Combined existence and values table for two or more entries.
///
/// Column keys are `(column, entry)` pairs covering the union of columns
/// for every compared entry, sorted within both levels. The `exists` row
/// reports whether the entry had the column; value rows hold the entries'
/// aggregation results, null where an entry has nothing for that cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    order: LevelOrder,
    keys: Vec<ComparisonKey>,
    exists: Vec<bool>,
    rows: IndexMap<Label, Vec<Value>>,
}

/// What one compared entry contributes
pub(crate) struct Side<'a> {
    pub entry: String,
    pub columns: Vec<String>,
    pub agg: Option<&'a Frame>,
}

impl ComparisonTable {
    pub(crate) fn build(sides: &[Side<'_>], order: LevelOrder) -> Self {
        let union: BTreeSet<&str> = sides
            .iter()
            .flat_map(|s| s.columns.iter().map(String::as_str))
            .collect();
        let mut entries: Vec<&Side<'_>> = sides.iter().collect();
        entries.sort_by(|a, b| a.entry.cmp(&b.entry));

        let mut pairs: Vec<(&str, &Side<'_>)> = Vec::with_capacity(union.len() * entries.len());
        match order {
            LevelOrder::ColumnsFirst => {
                for &column in &union {
                    pairs.extend(entries.iter().map(|&side| (column, side)));
                }
            }
            LevelOrder::EntriesFirst => {
                for &side in &entries {
                    pairs.extend(union.iter().map(|&column| (column, side)));
                }
            }
        }

        let mut row_labels: Vec<&Label> = Vec::new();
        for side in sides {
            if let Some(agg) = side.agg {
                for label in agg.index() {
                    if !row_labels.contains(&label) {
                        row_labels.push(label);
                    }
                }
            }
        }

        let exists = pairs
            .iter()
            .map(|(column, side)| side.columns.iter().any(|c| c == column))
            .collect();
        let rows = row_labels
            .into_iter()
            .map(|label| {
                let values = pairs
                    .iter()
                    .map(|(column, side)| {
                        side.agg
                            .and_then(|agg| agg.value(label, column))
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                (label.clone(), values)
            })
            .collect();
        let keys = pairs
            .into_iter()
            .map(|(column, side)| ComparisonKey {
                column: column.to_string(),
                entry: side.entry.clone(),
            })
            .collect();

        ComparisonTable {
            order,
            keys,
            exists,
            rows,
        }
    }

    pub fn order(&self) -> LevelOrder {
        self.order
    }

    pub fn keys(&self) -> &[ComparisonKey] {
        &self.keys
    }

    /// Compared entries, sorted
    pub fn entries(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.keys.iter().map(|k| k.entry.as_str()).collect();
        set.into_iter().collect()
    }

    /// Union of column labels, sorted
    pub fn columns(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.keys.iter().map(|k| k.column.as_str()).collect();
        set.into_iter().collect()
    }

    /// Labels of the value rows, excluding the existence row
    pub fn row_labels(&self) -> impl Iterator<Item = &Label> {
        self.rows.keys()
    }

    fn position(&self, column: &str, entry: &str) -> Option<usize> {
        self.keys
            .iter()
            .position(|k| k.column == column && k.entry == entry)
    }

    pub fn exists(&self, entry: &str, column: &str) -> Option<bool> {
        self.position(column, entry).map(|i| self.exists[i])
    }

    pub fn value(&self, row: &Label, column: &str, entry: &str) -> Option<&Value> {
        let i = self.position(column, entry)?;
        self.rows.get(row).map(|values| &values[i])
    }

    /// True when every entry has every column and all value rows agree
    /// across entries
    pub fn is_uniform(&self) -> bool {
        if !self.exists.iter().all(|&e| e) {
            return false;
        }
        self.rows.values().all(|values| {
            self.columns().into_iter().all(|column| {
                let mut cells = self
                    .keys
                    .iter()
                    .zip(values)
                    .filter(|(k, _)| k.column == column)
                    .map(|(_, v)| v);
                match cells.next() {
                    Some(first) => cells.all(|v| v == first),
                    None => true,
                }
            })
        })
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (outer, inner): (Vec<String>, Vec<String>) = self
            .keys
            .iter()
            .map(|k| match self.order {
                LevelOrder::ColumnsFirst => (k.column.clone(), k.entry.clone()),
                LevelOrder::EntriesFirst => (k.entry.clone(), k.column.clone()),
            })
            .unzip();

        let mut outer_header = vec![String::new()];
        let mut last: Option<&String> = None;
        for label in &outer {
            if last == Some(label) {
                outer_header.push(String::new());
            } else {
                outer_header.push(label.clone());
            }
            last = Some(label);
        }
        let mut inner_header = vec![String::new()];
        inner_header.extend(inner);

        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        let mut exists_row = vec![EXISTS_ROW.to_string()];
        exists_row.extend(self.exists.iter().map(|e| e.to_string()));
        rows.push(exists_row);
        for (label, values) in &self.rows {
            let mut row = vec![label.to_string()];
            row.extend(values.iter().map(|v| v.to_string()));
            rows.push(row);
        }

        write_grid(f, &[outer_header, inner_header], &rows)
    }
}

/// Compare any two or more entries of a log
pub fn compare_entries(log: &SnapshotLog, refs: &[EntryRef], order: LevelOrder) -> Result<ComparisonTable> {
    if log.len() < 2 {
        return Err(PipediffError::InsufficientEntries { found: log.len() });
    }
    if refs.len() < 2 {
        return Err(PipediffError::InsufficientEntries { found: refs.len() });
    }

    let mut sides: Vec<Side<'_>> = Vec::with_capacity(refs.len());
    for entry in refs {
        let (key, snapshot) = log.resolve(entry)?;
        if sides.iter().any(|s| s.entry == key) {
            return Err(PipediffError::invalid_input(format!(
                "Entry '{}' selected more than once",
                key
            )));
        }
        sides.push(Side {
            entry: key.to_string(),
            columns: snapshot.observed_columns(),
            agg: snapshot.agg.as_ref(),
        });
    }

    log::debug!(
        "Comparing entries [{}]",
        sides.iter().map(|s| s.entry.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(ComparisonTable::build(&sides, order))
}

/// Compare two entries addressed by key or position
pub fn compare_pair(
    log: &SnapshotLog,
    a: impl Into<EntryRef>,
    b: impl Into<EntryRef>,
    order: LevelOrder,
) -> Result<ComparisonTable> {
    compare_entries(log, &[a.into(), b.into()], order)
}

/// Compare the two most recently appended entries
pub fn compare_latest(log: &SnapshotLog, order: LevelOrder) -> Result<ComparisonTable> {
    compare_pair(log, -2isize, -1isize, order)
}

/// Compare every entry in the log
pub fn compare_all(log: &SnapshotLog, order: LevelOrder) -> Result<ComparisonTable> {
    let refs: Vec<EntryRef> = log.keys().map(EntryRef::from).collect();
    compare_entries(log, &refs, order)
}

/// Recorded dtypes of every entry, one row per entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DtypeTable {
    columns: Vec<String>,
    rows: IndexMap<String, Vec<Option<DType>>>,
}

impl DtypeTable {
    /// Every column label seen in any entry, in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// `None` when the entry did not record that column
    pub fn get(&self, entry: &str, column: &str) -> Option<DType> {
        let i = self.columns.iter().position(|c| c == column)?;
        self.rows.get(entry).and_then(|row| row[i])
    }
}

impl fmt::Display for DtypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = vec![String::new()];
        header.extend(self.columns.iter().cloned());
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|(entry, dtypes)| {
                let mut row = vec![entry.clone()];
                row.extend(dtypes.iter().map(|d| d.map(|d| d.to_string()).unwrap_or_default()));
                row
            })
            .collect();
        write_grid(f, &[header], &rows)
    }
}

pub fn dtypes_table(log: &SnapshotLog) -> DtypeTable {
    let mut columns: Vec<String> = Vec::new();
    for (_, snapshot) in log.iter() {
        if let Some(dtypes) = &snapshot.dtypes {
            for column in dtypes.keys() {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
    }

    let rows = log
        .iter()
        .map(|(key, snapshot)| {
            let row = columns
                .iter()
                .map(|c| snapshot.dtypes.as_ref().and_then(|d| d.get(c).copied()))
                .collect();
            (key.to_string(), row)
        })
        .collect();

    DtypeTable { columns, rows }
}

/// A column whose recorded dtype differs between two entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeChange {
    pub column: String,
    pub from: DType,
    pub to: DType,
}

/// Structural difference between the schemas two entries recorded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDrift {
    pub left: String,
    pub right: String,
    pub left_fingerprint: Option<String>,
    pub right_fingerprint: Option<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub type_changes: Vec<TypeChange>,
}

impl SchemaDrift {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.type_changes.is_empty()
    }
}

/// blake3 over the schema's `name|dtype|` pairs sorted by name, so column
/// order does not change the fingerprint
pub fn schema_fingerprint(schema: &IndexMap<String, Option<DType>>) -> String {
    let mut columns: Vec<(&String, &Option<DType>)> = schema.iter().collect();
    columns.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Hasher::new();
    for (name, dtype) in columns {
        hasher.update(name.as_bytes());
        hasher.update(b"|");
        hasher.update(dtype.map(|d| d.name()).unwrap_or("unknown").as_bytes());
        hasher.update(b"||");
    }
    hasher.finalize().to_hex().to_string()
}

/// Columns added, removed and retyped between two entries. Entries that
/// recorded neither dtypes nor column names count as having no columns.
pub fn schema_drift(
    log: &SnapshotLog,
    left: impl Into<EntryRef>,
    right: impl Into<EntryRef>,
) -> Result<SchemaDrift> {
    let (left_key, left_snapshot) = log.resolve(&left.into())?;
    let (right_key, right_snapshot) = log.resolve(&right.into())?;

    let left_schema = left_snapshot.schema();
    let right_schema = right_snapshot.schema();
    let empty = IndexMap::new();
    let before = left_schema.as_ref().unwrap_or(&empty);
    let after = right_schema.as_ref().unwrap_or(&empty);

    let added = after
        .keys()
        .filter(|c| !before.contains_key(*c))
        .cloned()
        .collect();
    let removed = before
        .keys()
        .filter(|c| !after.contains_key(*c))
        .cloned()
        .collect();
    let type_changes = before
        .iter()
        .filter_map(|(column, from)| match (from, after.get(column)) {
            (Some(from), Some(Some(to))) if from != to => Some(TypeChange {
                column: column.clone(),
                from: *from,
                to: *to,
            }),
            _ => None,
        })
        .collect();

    let drift = SchemaDrift {
        left: left_key.to_string(),
        right: right_key.to_string(),
        left_fingerprint: left_schema.as_ref().map(schema_fingerprint),
        right_fingerprint: right_schema.as_ref().map(schema_fingerprint),
        added,
        removed,
        type_changes,
    };
    log::debug!(
        "Schema drift {} -> {}: {} added, {} removed, {} retyped",
        drift.left,
        drift.right,
        drift.added.len(),
        drift.removed.len(),
        drift.type_changes.len()
    );
    Ok(drift)
}
