//! Snapshot records: one captured observation of a frame

use crate::aggregate::Axis;
use crate::frame::Frame;
use crate::value::DType;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Whatever was captured for one snapshot.
///
/// Only requested fields are populated. `dtypes`, `shape` and `column_names`
/// always describe the full frame, even when the aggregation ran on a slice.
#[derive(Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub agg: Option<Frame>,
    pub axis: Option<Axis>,
    pub dtypes: Option<IndexMap<String, DType>>,
    pub shape: Option<(usize, usize)>,
    pub column_names: Option<Vec<String>>,
    pub copy: Option<Frame>,
}

impl Snapshot {
    /// Column labels the snapshot knows about: the aggregation table's
    /// columns, falling back to recorded column names and then dtypes
    pub fn observed_columns(&self) -> Vec<String> {
        if let Some(agg) = &self.agg {
            agg.column_names()
        } else if let Some(names) = &self.column_names {
            names.clone()
        } else if let Some(dtypes) = &self.dtypes {
            dtypes.keys().cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// Recorded schema: dtypes when captured, otherwise column names with
    /// unknown types
    pub fn schema(&self) -> Option<IndexMap<String, Option<DType>>> {
        if let Some(dtypes) = &self.dtypes {
            Some(dtypes.iter().map(|(k, v)| (k.clone(), Some(*v))).collect())
        } else {
            self.column_names
                .as_ref()
                .map(|names| names.iter().map(|n| (n.clone(), None)).collect())
        }
    }
}

fn frame_field(frame: Option<&Frame>) -> &'static str {
    if frame.is_some() {
        "Frame(...)"
    } else {
        "None"
    }
}

/// Bounded summary: tables render as `Frame(...)` placeholders
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot(agg={}, axis=", frame_field(self.agg.as_ref()))?;
        match &self.axis {
            Some(axis) => write!(f, "{}", axis)?,
            None => write!(f, "None")?,
        }
        write!(f, ", dtypes=")?;
        match &self.dtypes {
            Some(dtypes) => {
                let pairs: Vec<String> = dtypes.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", pairs.join(", "))?;
            }
            None => write!(f, "None")?,
        }
        write!(f, ", shape=")?;
        match &self.shape {
            Some((rows, cols)) => write!(f, "({}, {})", rows, cols)?,
            None => write!(f, "None")?,
        }
        write!(f, ", column_names=")?;
        match &self.column_names {
            Some(names) => write!(f, "[{}]", names.join(", "))?,
            None => write!(f, "None")?,
        }
        write!(f, ", copy={})", frame_field(self.copy.as_ref()))
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
