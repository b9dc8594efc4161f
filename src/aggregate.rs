//! Aggregation specs: normalization and execution
//!
//! Callers describe aggregations in several equivalent shapes (one function,
//! a list, or a per-column mapping). [`normalize`] turns every shape into a
//! [`NormalizedSpec`] whose leaves are always lists of resolved functions, so
//! [`aggregate`] always produces a table rather than a bare value.

use crate::error::{PipediffError, Result};
use crate::frame::{Column, Frame};
use crate::registry::{lookup_agg_func, AggFunc};
use crate::value::{Label, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Reference to an aggregation: a registered name or a callable
#[derive(Debug, Clone, PartialEq)]
pub enum AggRef {
    Name(String),
    Func(AggFunc),
}

impl From<&str> for AggRef {
    fn from(name: &str) -> Self {
        AggRef::Name(name.to_string())
    }
}

impl From<String> for AggRef {
    fn from(name: String) -> Self {
        AggRef::Name(name)
    }
}

impl From<AggFunc> for AggRef {
    fn from(func: AggFunc) -> Self {
        AggRef::Func(func)
    }
}

/// Functions assigned to one column of a per-column spec
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFuncs {
    One(AggRef),
    Many(Vec<AggRef>),
}

impl From<AggRef> for ColumnFuncs {
    fn from(r: AggRef) -> Self {
        ColumnFuncs::One(r)
    }
}

impl From<&str> for ColumnFuncs {
    fn from(name: &str) -> Self {
        ColumnFuncs::One(name.into())
    }
}

impl From<AggFunc> for ColumnFuncs {
    fn from(func: AggFunc) -> Self {
        ColumnFuncs::One(func.into())
    }
}

impl From<Vec<AggRef>> for ColumnFuncs {
    fn from(refs: Vec<AggRef>) -> Self {
        ColumnFuncs::Many(refs)
    }
}

impl From<Vec<&str>> for ColumnFuncs {
    fn from(names: Vec<&str>) -> Self {
        ColumnFuncs::Many(names.into_iter().map(AggRef::from).collect())
    }
}

impl From<Vec<AggFunc>> for ColumnFuncs {
    fn from(funcs: Vec<AggFunc>) -> Self {
        ColumnFuncs::Many(funcs.into_iter().map(AggRef::Func).collect())
    }
}

/// User-facing aggregation specification
#[derive(Debug, Clone, PartialEq)]
pub enum AggSpec {
    Single(AggRef),
    List(Vec<AggRef>),
    PerColumn(IndexMap<String, ColumnFuncs>),
}

impl AggSpec {
    /// List of registered function names
    pub fn names(names: &[&str]) -> Self {
        AggSpec::List(names.iter().map(|&n| AggRef::from(n)).collect())
    }

    pub fn per_column<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ColumnFuncs>,
    {
        AggSpec::PerColumn(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&str> for AggSpec {
    fn from(name: &str) -> Self {
        AggSpec::Single(name.into())
    }
}

impl From<AggFunc> for AggSpec {
    fn from(func: AggFunc) -> Self {
        AggSpec::Single(func.into())
    }
}

impl From<Vec<AggRef>> for AggSpec {
    fn from(refs: Vec<AggRef>) -> Self {
        AggSpec::List(refs)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedFuncs {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NamedSpec {
    One(String),
    Many(Vec<String>),
    PerColumn(IndexMap<String, NamedFuncs>),
}

impl From<NamedFuncs> for ColumnFuncs {
    fn from(named: NamedFuncs) -> Self {
        match named {
            NamedFuncs::One(name) => ColumnFuncs::One(AggRef::Name(name)),
            NamedFuncs::Many(names) => ColumnFuncs::Many(names.into_iter().map(AggRef::Name).collect()),
        }
    }
}

/// Name-based specs only; callables cannot come from configuration
impl<'de> Deserialize<'de> for AggSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match NamedSpec::deserialize(deserializer)? {
            NamedSpec::One(name) => AggSpec::Single(AggRef::Name(name)),
            NamedSpec::Many(names) => AggSpec::List(names.into_iter().map(AggRef::Name).collect()),
            NamedSpec::PerColumn(map) => {
                AggSpec::PerColumn(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        })
    }
}

/// Canonical spec: every leaf is a non-empty list of resolved functions
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedSpec {
    Funcs(Vec<AggFunc>),
    PerColumn(IndexMap<String, Vec<AggFunc>>),
}

impl From<NormalizedSpec> for AggSpec {
    fn from(spec: NormalizedSpec) -> Self {
        let refs = |funcs: Vec<AggFunc>| funcs.into_iter().map(AggRef::Func).collect::<Vec<_>>();
        match spec {
            NormalizedSpec::Funcs(funcs) => AggSpec::List(refs(funcs)),
            NormalizedSpec::PerColumn(map) => AggSpec::PerColumn(
                map.into_iter()
                    .map(|(col, funcs)| (col, ColumnFuncs::Many(refs(funcs))))
                    .collect(),
            ),
        }
    }
}

/// Axis an aggregation runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Axis {
    /// One result per column (axis 0)
    #[default]
    PerColumn,
    /// One result per row (axis 1)
    PerRow,
}

impl TryFrom<u8> for Axis {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Axis::PerColumn),
            1 => Ok(Axis::PerRow),
            other => Err(format!("Invalid axis: {}. Use 0 or 1", other)),
        }
    }
}

impl From<Axis> for u8 {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::PerColumn => 0,
            Axis::PerRow => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Normalize an aggregation spec.
///
/// Single references become one-element lists, registered names are
/// resolved to their callables under the name the caller typed, and, when
/// `known_labels` is given, per-column entries for unknown labels are
/// dropped. Normalizing an already normalized spec yields an equal result.
pub fn normalize(spec: &AggSpec, known_labels: Option<&[String]>) -> Result<NormalizedSpec> {
    let normalized = match spec {
        AggSpec::Single(r) => NormalizedSpec::Funcs(vec![resolve(r)?]),
        AggSpec::List(refs) => NormalizedSpec::Funcs(resolve_all(refs, None)?),
        AggSpec::PerColumn(map) => {
            let mut resolved = IndexMap::with_capacity(map.len());
            for (column, funcs) in map {
                if let Some(known) = known_labels {
                    if !known.contains(column) {
                        log::trace!("Dropping aggregation for unknown label '{}'", column);
                        continue;
                    }
                }
                let funcs = match funcs {
                    ColumnFuncs::One(r) => vec![resolve(r)?],
                    ColumnFuncs::Many(refs) => resolve_all(refs, Some(column))?,
                };
                resolved.insert(column.clone(), funcs);
            }
            NormalizedSpec::PerColumn(resolved)
        }
    };
    Ok(normalized)
}

fn resolve_all(refs: &[AggRef], column: Option<&str>) -> Result<Vec<AggFunc>> {
    if refs.is_empty() {
        return Err(PipediffError::invalid_aggregation(match column {
            Some(c) => format!("function list for '{}' is empty", c),
            None => "function list is empty".to_string(),
        }));
    }
    refs.iter().map(resolve).collect()
}

fn resolve(r: &AggRef) -> Result<AggFunc> {
    match r {
        AggRef::Func(func) => Ok(func.clone()),
        AggRef::Name(name) => lookup_agg_func(name)
            .map(|func| func.renamed(name.as_str()))
            .ok_or_else(|| {
                PipediffError::invalid_aggregation(format!("'{}' is not a registered function", name))
            }),
    }
}

/// Run a normalized spec against a frame.
///
/// Along [`Axis::PerColumn`] the result has one row per function and one
/// column per aggregated column; along [`Axis::PerRow`] one row per frame row
/// and one column per function. Per-row mappings address rows by label text.
pub fn aggregate(frame: &Frame, spec: &NormalizedSpec, axis: Axis) -> Result<Frame> {
    match (spec, axis) {
        (NormalizedSpec::Funcs(funcs), Axis::PerColumn) => {
            ensure_unique(funcs)?;
            let index = funcs.iter().map(|f| Label::from(f.name())).collect();
            let mut columns = IndexMap::with_capacity(frame.n_columns());
            for (name, column) in frame.columns() {
                let values = funcs
                    .iter()
                    .map(|f| f.call(column.values()))
                    .collect::<Result<Vec<_>>>()?;
                columns.insert(name.clone(), Column::new(values));
            }
            Ok(Frame::from_parts(index, columns))
        }
        (NormalizedSpec::Funcs(funcs), Axis::PerRow) => {
            ensure_unique(funcs)?;
            let rows: Vec<Vec<Value>> = (0..frame.n_rows()).map(|i| frame.row_values(i)).collect();
            let mut columns = IndexMap::with_capacity(funcs.len());
            for func in funcs {
                let values = rows
                    .iter()
                    .map(|row| func.call(row))
                    .collect::<Result<Vec<_>>>()?;
                columns.insert(func.name().to_string(), Column::new(values));
            }
            Ok(Frame::from_parts(frame.index().to_vec(), columns))
        }
        (NormalizedSpec::PerColumn(map), Axis::PerColumn) => {
            let names = function_names(map)?;
            let index = names.iter().map(|n| Label::from(n.as_str())).collect();
            let mut columns = IndexMap::with_capacity(map.len());
            for (name, funcs) in map {
                let column = frame.column(name).ok_or_else(|| {
                    PipediffError::invalid_input(format!("Column '{}' not found", name))
                })?;
                let values = apply_by_name(&names, funcs, column.values())?;
                columns.insert(name.clone(), Column::new(values));
            }
            Ok(Frame::from_parts(index, columns))
        }
        (NormalizedSpec::PerColumn(map), Axis::PerRow) => {
            let names = function_names(map)?;
            let mut index = Vec::with_capacity(map.len());
            let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(map.len()); names.len()];
            for (key, funcs) in map {
                let position = frame
                    .index()
                    .iter()
                    .position(|label| label.to_string() == *key)
                    .ok_or_else(|| PipediffError::invalid_input(format!("Row '{}' not found", key)))?;
                index.push(frame.index()[position].clone());
                let row = apply_by_name(&names, funcs, &frame.row_values(position))?;
                for (slot, value) in cells.iter_mut().zip(row) {
                    slot.push(value);
                }
            }
            let columns = names
                .into_iter()
                .zip(cells)
                .map(|(name, values)| (name, Column::new(values)))
                .collect();
            Ok(Frame::from_parts(index, columns))
        }
    }
}

fn ensure_unique(funcs: &[AggFunc]) -> Result<()> {
    for (i, func) in funcs.iter().enumerate() {
        if funcs[..i].iter().any(|f| f.name() == func.name()) {
            return Err(PipediffError::invalid_aggregation(format!(
                "function names must be unique, '{}' appears twice",
                func.name()
            )));
        }
    }
    Ok(())
}

/// Union of function names across a mapping, in first-seen order
fn function_names(map: &IndexMap<String, Vec<AggFunc>>) -> Result<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for funcs in map.values() {
        ensure_unique(funcs)?;
        for func in funcs {
            if !names.iter().any(|n| n == func.name()) {
                names.push(func.name().to_string());
            }
        }
    }
    Ok(names)
}

/// One cell per name in `names`; null where the function was not requested
fn apply_by_name(names: &[String], funcs: &[AggFunc], values: &[Value]) -> Result<Vec<Value>> {
    names
        .iter()
        .map(|name| match funcs.iter().find(|f| f.name() == name) {
            Some(func) => func.call(values),
            None => Ok(Value::Null),
        })
        .collect()
}
