//! Snapshot logger: capture options, per-call overrides and the log itself

use crate::aggregate::{aggregate, normalize, AggRef, AggSpec, Axis};
use crate::collection::SnapshotLog;
use crate::error::{PipediffError, Result};
use crate::frame::Frame;
use crate::snapshot::Snapshot;
use crate::value::Label;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

/// Option names accepted in config files and by [`CaptureOverrides::set`]
pub const OPTION_NAMES: [&str; 8] = [
    "row_labels",
    "column_labels",
    "agg",
    "axis",
    "dtypes",
    "shape",
    "column_names",
    "copy",
];

/// Default capture configuration of a [`SnapshotLogger`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureOptions {
    /// Rows to aggregate; `None` keeps every row
    pub row_labels: Option<Vec<Label>>,
    /// Columns to aggregate; `None` keeps every column
    pub column_labels: Option<Vec<String>>,
    pub agg: Option<AggSpec>,
    pub axis: Axis,
    pub dtypes: bool,
    pub shape: bool,
    pub column_names: bool,
    pub copy: bool,
}

impl CaptureOptions {
    /// Load defaults from a JSON config file. Unrecognised keys are rejected.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if let Some(option) = value
            .as_object()
            .and_then(|map| map.keys().find(|key| !OPTION_NAMES.contains(&key.as_str())))
        {
            return Err(PipediffError::unknown_option(option.as_str()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Effective options for one call: every override that is set wins,
    /// everything unset falls through to these defaults
    pub fn resolve(&self, overrides: &CaptureOverrides) -> CaptureOptions {
        CaptureOptions {
            row_labels: overrides.row_labels.clone().or_else(|| self.row_labels.clone()),
            column_labels: overrides
                .column_labels
                .clone()
                .or_else(|| self.column_labels.clone()),
            agg: overrides.agg.clone().or_else(|| self.agg.clone()),
            axis: overrides.axis.unwrap_or(self.axis),
            dtypes: overrides.dtypes.unwrap_or(self.dtypes),
            shape: overrides.shape.unwrap_or(self.shape),
            column_names: overrides.column_names.unwrap_or(self.column_names),
            copy: overrides.copy.unwrap_or(self.copy),
        }
    }
}

/// Per-call overrides. `None` means "not given" and never shadows a default,
/// so `Some(false)` can still switch off a default that is on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOverrides {
    pub row_labels: Option<Vec<Label>>,
    pub column_labels: Option<Vec<String>>,
    pub agg: Option<AggSpec>,
    pub axis: Option<Axis>,
    pub dtypes: Option<bool>,
    pub shape: Option<bool>,
    pub column_names: Option<bool>,
    pub copy: Option<bool>,
}

impl CaptureOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_labels<I, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        self.row_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn column_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn agg(mut self, spec: impl Into<AggSpec>) -> Self {
        self.agg = Some(spec.into());
        self
    }

    pub fn axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn dtypes(mut self, on: bool) -> Self {
        self.dtypes = Some(on);
        self
    }

    pub fn shape(mut self, on: bool) -> Self {
        self.shape = Some(on);
        self
    }

    pub fn column_names(mut self, on: bool) -> Self {
        self.column_names = Some(on);
        self
    }

    pub fn copy(mut self, on: bool) -> Self {
        self.copy = Some(on);
        self
    }

    /// Set an option from its textual form, e.g. `("agg", "min,max")`
    pub fn set(&mut self, option: &str, raw: &str) -> Result<()> {
        match option {
            "row_labels" => self.row_labels = Some(split_list(raw).map(Label::parse).collect()),
            "column_labels" => self.column_labels = Some(split_list(raw).map(str::to_string).collect()),
            "agg" => {
                let mut refs: Vec<AggRef> = split_list(raw).map(AggRef::from).collect();
                self.agg = Some(match refs.len() {
                    0 => return Err(PipediffError::invalid_aggregation("no function given")),
                    1 => AggSpec::Single(refs.remove(0)),
                    _ => AggSpec::List(refs),
                });
            }
            "axis" => {
                let axis = raw
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| PipediffError::invalid_input(format!("Invalid axis: {}", raw)))
                    .and_then(|n| Axis::try_from(n).map_err(PipediffError::invalid_input))?;
                self.axis = Some(axis);
            }
            "dtypes" => self.dtypes = Some(parse_flag(option, raw)?),
            "shape" => self.shape = Some(parse_flag(option, raw)?),
            "column_names" => self.column_names = Some(parse_flag(option, raw)?),
            "copy" => self.copy = Some(parse_flag(option, raw)?),
            other => return Err(PipediffError::unknown_option(other)),
        }
        Ok(())
    }

    /// Parse a `key=value` assignment
    pub fn set_assignment(&mut self, assignment: &str) -> Result<()> {
        let (option, raw) = assignment.split_once('=').ok_or_else(|| {
            PipediffError::invalid_input(format!("Expected key=value, got '{}'", assignment))
        })?;
        self.set(option.trim(), raw)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_flag(option: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(PipediffError::invalid_input(format!(
            "Invalid value for {}: {}",
            option, other
        ))),
    }
}

/// Captures snapshots of frames into a [`SnapshotLog`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotLogger {
    defaults: CaptureOptions,
    logs: SnapshotLog,
}

impl SnapshotLogger {
    pub fn new(defaults: CaptureOptions) -> Self {
        Self {
            defaults,
            logs: SnapshotLog::new(),
        }
    }

    pub fn defaults(&self) -> &CaptureOptions {
        &self.defaults
    }

    pub fn logs(&self) -> &SnapshotLog {
        &self.logs
    }

    /// Capture a snapshot with the default options
    pub fn log_frame(&mut self, frame: &Frame, key: Option<&str>) -> Result<Arc<Snapshot>> {
        self.log(frame, key, &CaptureOverrides::default())
    }

    /// Capture a snapshot of `frame` and append it under `key`.
    ///
    /// Row and column labels only restrict what gets aggregated (and
    /// copied); dtypes, shape and column names always describe the full
    /// frame.
    pub fn log(
        &mut self,
        frame: &Frame,
        key: Option<&str>,
        overrides: &CaptureOverrides,
    ) -> Result<Arc<Snapshot>> {
        let options = self.defaults.resolve(overrides);
        let snapshot = Arc::new(capture(frame, &options)?);

        let key = self.logs.append_shared(Arc::clone(&snapshot), key)?;
        log::debug!("Logged snapshot '{}': {}", key, snapshot);
        Ok(snapshot)
    }

    /// Start over with an empty log
    pub fn reset(&mut self) {
        log::debug!("Resetting snapshot log ({} entries)", self.logs.len());
        self.logs.reset();
    }
}

/// Build a snapshot from resolved options without storing it
pub fn capture(frame: &Frame, options: &CaptureOptions) -> Result<Snapshot> {
    let view: Cow<'_, Frame> = if options.row_labels.is_some() || options.column_labels.is_some() {
        Cow::Owned(frame.select(
            options.row_labels.as_deref(),
            options.column_labels.as_deref(),
        ))
    } else {
        Cow::Borrowed(frame)
    };

    let mut snapshot = Snapshot::default();

    if let Some(spec) = &options.agg {
        let known: Vec<String> = match options.axis {
            Axis::PerColumn => view.column_names(),
            Axis::PerRow => view.index().iter().map(|l| l.to_string()).collect(),
        };
        let normalized = normalize(spec, Some(known.as_slice()))?;
        snapshot.agg = Some(aggregate(&view, &normalized, options.axis)?);
        snapshot.axis = Some(options.axis);
    }
    if options.dtypes {
        snapshot.dtypes = Some(frame.dtypes());
    }
    if options.shape {
        snapshot.shape = Some(frame.shape());
    }
    if options.column_names {
        snapshot.column_names = Some(frame.column_names());
    }
    if options.copy {
        snapshot.copy = Some(view.into_owned());
    }

    Ok(snapshot)
}
