//! Direct differences between two frames

use crate::aggregate::{aggregate, normalize, AggSpec, Axis};
use crate::compare::{ComparisonTable, LevelOrder, Side};
use crate::error::Result;
use crate::frame::Frame;
use crate::value::{Label, Value};
use serde::Serialize;
use std::collections::BTreeSet;

/// Entry names used when two frames are compared directly
pub const LEFT: &str = "left";
pub const RIGHT: &str = "right";

/// Label sets of two frames. Every list is sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelDiff<T> {
    /// Only in the left frame
    pub left: Vec<T>,
    /// Only in the right frame
    pub right: Vec<T>,
    pub intersection: Vec<T>,
    pub union: Vec<T>,
}

impl<T: Ord + Clone> LabelDiff<T> {
    fn new(left: &[T], right: &[T]) -> Self {
        let l: BTreeSet<&T> = left.iter().collect();
        let r: BTreeSet<&T> = right.iter().collect();
        let collect = |set: BTreeSet<&T>| set.into_iter().cloned().collect::<Vec<T>>();

        LabelDiff {
            left: collect(l.difference(&r).copied().collect()),
            right: collect(r.difference(&l).copied().collect()),
            intersection: collect(l.intersection(&r).copied().collect()),
            union: collect(l.union(&r).copied().collect()),
        }
    }
}

impl<T> LabelDiff<T> {
    pub fn is_identical(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// One cell that differs on the shared rows and columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellChange {
    pub row: Label,
    pub column: String,
    pub before: Value,
    pub after: Value,
}

/// Differences between a left and a right frame
#[derive(Debug, Clone)]
pub struct FrameDiff<'a> {
    left: &'a Frame,
    right: &'a Frame,
}

impl<'a> FrameDiff<'a> {
    pub fn new(left: &'a Frame, right: &'a Frame) -> Self {
        Self { left, right }
    }

    pub fn columns(&self) -> LabelDiff<String> {
        LabelDiff::new(&self.left.column_names(), &self.right.column_names())
    }

    pub fn rows(&self) -> LabelDiff<Label> {
        LabelDiff::new(self.left.index(), self.right.index())
    }

    /// Cells that differ on the intersection of rows and columns, row-major
    /// in sorted label order
    pub fn compare_intersection(&self) -> Vec<CellChange> {
        let rows = self.rows().intersection;
        let columns = self.columns().intersection;

        let mut changes = Vec::new();
        for row in &rows {
            for column in &columns {
                let before = self.left.value(row, column).cloned().unwrap_or(Value::Null);
                let after = self.right.value(row, column).cloned().unwrap_or(Value::Null);
                if before != after {
                    changes.push(CellChange {
                        row: row.clone(),
                        column: column.clone(),
                        before,
                        after,
                    });
                }
            }
        }
        changes
    }

    /// Aggregate both frames and compare them as entries `left` and `right`.
    /// Per-column specs are split so each side only aggregates columns it has.
    pub fn compare(&self, spec: Option<&AggSpec>, order: LevelOrder) -> Result<ComparisonTable> {
        let left_agg = aggregate_side(self.left, spec)?;
        let right_agg = aggregate_side(self.right, spec)?;

        let sides = [
            Side {
                entry: LEFT.to_string(),
                columns: self.left.column_names(),
                agg: left_agg.as_ref(),
            },
            Side {
                entry: RIGHT.to_string(),
                columns: self.right.column_names(),
                agg: right_agg.as_ref(),
            },
        ];
        Ok(ComparisonTable::build(&sides, order))
    }
}

fn aggregate_side(frame: &Frame, spec: Option<&AggSpec>) -> Result<Option<Frame>> {
    match spec {
        Some(spec) => {
            let normalized = normalize(spec, Some(frame.column_names().as_slice()))?;
            Ok(Some(aggregate(frame, &normalized, Axis::PerColumn)?))
        }
        None => Ok(None),
    }
}
