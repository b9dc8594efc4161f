//! # pipediff
//!
//! Snapshot logging and cross-snapshot comparison for tabular data pipelines.
//! A [`SnapshotLogger`] captures aggregated statistics and structural
//! metadata of frames into an ordered [`SnapshotLog`]; the [`compare`]
//! module lines entries up side by side so drift between pipeline steps is
//! easy to spot.

pub mod aggregate;
pub mod cli;
pub mod collection;
pub mod commands;
pub mod compare;
pub mod error;
pub mod frame;
pub mod frame_diff;
pub mod logger;
pub mod output;
pub mod registry;
pub mod snapshot;
pub mod track;
pub mod value;

pub use aggregate::{aggregate, normalize, AggRef, AggSpec, Axis, ColumnFuncs, NormalizedSpec};
pub use collection::{EntryRef, SnapshotLog};
pub use compare::{
    compare_all, compare_entries, compare_latest, compare_pair, dtypes_table, schema_drift,
    ComparisonTable, DtypeTable, LevelOrder, SchemaDrift,
};
pub use error::{PipediffError, Result};
pub use frame::{Column, Frame};
pub use frame_diff::{CellChange, FrameDiff, LabelDiff};
pub use logger::{CaptureOptions, CaptureOverrides, SnapshotLogger};
pub use registry::{register_agg_func, AggFunc};
pub use snapshot::Snapshot;
pub use track::{Observed, Tracker};
pub use value::{DType, Label, Value};
