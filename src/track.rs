//! Snapshots around pipeline steps
//!
//! [`Tracker::track`] wraps a step so that its input frame is logged before
//! the step runs and its output frame after it returns. Steps that take or
//! return several values do so through tuples whose first element is the
//! frame.

use crate::collection::SnapshotLog;
use crate::error::{PipediffError, Result};
use crate::frame::Frame;
use crate::logger::{CaptureOptions, CaptureOverrides, SnapshotLogger};
use crate::snapshot::Snapshot;
use crate::value::Value;
use std::cell::{Cell, Ref, RefCell};
use std::sync::Arc;

/// A value crossing a tracked step boundary
pub trait Observed {
    /// The frame this value carries, or the name of its type when it carries
    /// none
    fn observe(&self) -> std::result::Result<&Frame, &'static str> {
        Err(std::any::type_name::<Self>())
    }
}

impl Observed for Frame {
    fn observe(&self) -> std::result::Result<&Frame, &'static str> {
        Ok(self)
    }
}

impl<T: Observed + ?Sized> Observed for &T {
    fn observe(&self) -> std::result::Result<&Frame, &'static str> {
        (**self).observe()
    }
}

impl<T: Observed + ?Sized> Observed for Box<T> {
    fn observe(&self) -> std::result::Result<&Frame, &'static str> {
        (**self).observe()
    }
}

impl<T: Observed + ?Sized> Observed for Arc<T> {
    fn observe(&self) -> std::result::Result<&Frame, &'static str> {
        (**self).observe()
    }
}

macro_rules! not_a_frame {
    ($($ty:ty),* $(,)?) => {
        $(impl Observed for $ty {})*
    };
}

not_a_frame!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    str, String, Value, Snapshot,
);

impl<T> Observed for Vec<T> {}

impl<T> Observed for Option<T> {}

macro_rules! tuple_primary {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first: Observed $(, $rest)*> Observed for ($first, $($rest,)*) {
            fn observe(&self) -> std::result::Result<&Frame, &'static str> {
                self.0.observe()
            }
        }
    };
}

tuple_primary!(A);
tuple_primary!(A, B);
tuple_primary!(A, B, C);
tuple_primary!(A, B, C, D);
tuple_primary!(A, B, C, D, E);

/// Owns a [`SnapshotLogger`] and wraps pipeline steps with it.
///
/// Tracking is single-threaded: the logger sits in a `RefCell` and is only
/// borrowed while a snapshot is captured, never across a step call, so
/// tracked steps may call other tracked steps.
#[derive(Debug)]
pub struct Tracker {
    logger: RefCell<SnapshotLogger>,
    active: Cell<bool>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::with_logger(SnapshotLogger::default())
    }
}

impl Tracker {
    pub fn new(options: CaptureOptions) -> Self {
        Self::with_logger(SnapshotLogger::new(options))
    }

    pub fn with_logger(logger: SnapshotLogger) -> Self {
        Self {
            logger: RefCell::new(logger),
            active: Cell::new(true),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn activate(&self) {
        self.active.set(true);
    }

    /// Turn every tracked step into a plain passthrough
    pub fn deactivate(&self) {
        self.active.set(false);
    }

    pub fn logs(&self) -> Ref<'_, SnapshotLog> {
        Ref::map(self.logger.borrow(), |logger| logger.logs())
    }

    pub fn into_logger(self) -> SnapshotLogger {
        self.logger.into_inner()
    }

    /// Log a frame directly, outside any tracked step
    pub fn log(
        &self,
        frame: &Frame,
        key: Option<&str>,
        overrides: &CaptureOverrides,
    ) -> Result<Arc<Snapshot>> {
        self.logger.borrow_mut().log(frame, key, overrides)
    }

    pub fn reset(&self) {
        self.logger.borrow_mut().reset();
    }

    /// Wrap `step` so each call logs `{name}_#1` for its input frame and
    /// `{name}_#2` for its output frame.
    ///
    /// A non-frame input fails before the step runs. A step error is
    /// returned as is, without an after snapshot. A non-frame output fails
    /// after the step has run. The output itself is handed back untouched.
    pub fn track<'a, I, O, E, F>(
        &'a self,
        name: impl Into<String>,
        step: F,
    ) -> impl Fn(I) -> std::result::Result<O, E> + 'a
    where
        I: Observed,
        O: Observed,
        E: From<PipediffError>,
        F: Fn(I) -> std::result::Result<O, E> + 'a,
    {
        let name = name.into();
        move |input: I| {
            if !self.active.get() {
                return step(input);
            }

            let before = input
                .observe()
                .map_err(|observed| PipediffError::type_mismatch(&name, "first argument", observed))?;
            self.capture(before, &name, 1)?;

            let output = step(input)?;

            let after = output
                .observe()
                .map_err(|observed| PipediffError::type_mismatch(&name, "first return value", observed))?;
            self.capture(after, &name, 2)?;

            Ok(output)
        }
    }

    fn capture(&self, frame: &Frame, name: &str, ordinal: u8) -> Result<()> {
        let key = format!("{}_#{}", name, ordinal);
        self.logger.borrow_mut().log_frame(frame, Some(&key))?;
        Ok(())
    }
}
