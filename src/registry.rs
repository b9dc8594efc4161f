//! Named aggregation functions
//!
//! A process-wide registry maps short names such as `"min"` or `"nans"` to
//! aggregation callables. It is consulted when an aggregation spec is
//! normalized and can be extended with [`register_agg_func`] before use.

use crate::error::{PipediffError, Result};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Signature shared by every aggregation: a slice of cells in, one cell out
pub type AggFnPtr = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// An aggregation callable paired with the name it is displayed under
#[derive(Clone)]
pub struct AggFunc {
    name: String,
    func: AggFnPtr,
}

impl AggFunc {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Display name, used as the label in aggregation tables
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, values: &[Value]) -> Result<Value> {
        (self.func)(values)
    }

    /// Same callable under a different display name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            func: Arc::clone(&self.func),
        }
    }
}

impl PartialEq for AggFunc {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && Arc::as_ptr(&self.func) as *const u8 == Arc::as_ptr(&other.func) as *const u8
    }
}

impl fmt::Debug for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggFunc({})", self.name)
    }
}

/// Table of named aggregation functions
#[derive(Debug, Clone, Default)]
pub struct AggRegistry {
    funcs: IndexMap<String, AggFunc>,
}

impl AggRegistry {
    /// Registry holding the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        let builtins: [(&str, fn(&[Value]) -> Result<Value>); 10] = [
            ("sum", sum),
            ("mean", mean),
            ("min", min),
            ("max", max),
            ("count", count),
            ("median", median),
            ("std", std_dev),
            ("var", variance),
            ("nunique", nunique),
            ("nans", nans),
        ];
        for (name, func) in builtins {
            registry.funcs.insert(name.to_string(), AggFunc::new(name, func));
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&AggFunc> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Add a function under its display name. Names are never overwritten.
    pub fn register(&mut self, func: AggFunc) -> Result<()> {
        if self.funcs.contains_key(func.name()) {
            return Err(PipediffError::invalid_aggregation(format!(
                "function '{}' is already registered",
                func.name()
            )));
        }
        self.funcs.insert(func.name().to_string(), func);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }
}

fn global() -> &'static RwLock<AggRegistry> {
    static REGISTRY: OnceLock<RwLock<AggRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(AggRegistry::with_builtins()))
}

/// Register a custom aggregation in the process-wide registry.
/// Errors raised with `anyhow` convert into [`PipediffError::Generic`].
pub fn register_agg_func<F>(name: impl Into<String>, func: F) -> Result<()>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
{
    let func = AggFunc::new(name, func);
    log::debug!("Registering aggregation function '{}'", func.name());
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(func)
}

/// Look up a registered aggregation by name
pub fn lookup_agg_func(name: &str) -> Option<AggFunc> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .cloned()
}

pub fn registered_names() -> Vec<String> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .names()
        .map(str::to_string)
        .collect()
}

enum Numbers {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl Numbers {
    fn into_floats(self) -> Vec<f64> {
        match self {
            Numbers::Ints(ints) => ints.into_iter().map(|i| i as f64).collect(),
            Numbers::Floats(floats) => floats,
        }
    }
}

/// Numeric view of the non-missing cells. Booleans count as 0/1.
fn numbers(func: &str, values: &[Value]) -> Result<Numbers> {
    let mut ints = Vec::new();
    let mut floats: Option<Vec<f64>> = None;

    for value in values.iter().filter(|v| !v.is_missing()) {
        if matches!(value, Value::Str(_)) {
            return Err(PipediffError::aggregation(
                func,
                "cannot aggregate string values",
            ));
        }
        if let Some(fs) = floats.as_mut() {
            fs.extend(value.as_f64());
            continue;
        }
        match value {
            Value::Int(i) => ints.push(*i),
            Value::Bool(b) => ints.push(i64::from(*b)),
            Value::Float(f) => {
                let mut widened: Vec<f64> = ints.iter().map(|&i| i as f64).collect();
                widened.push(*f);
                floats = Some(widened);
            }
            _ => {}
        }
    }

    Ok(match floats {
        Some(fs) => Numbers::Floats(fs),
        None => Numbers::Ints(ints),
    })
}

fn sum(values: &[Value]) -> Result<Value> {
    match numbers("sum", values)? {
        Numbers::Ints(ints) => ints
            .iter()
            .try_fold(0i64, |acc, &i| acc.checked_add(i))
            .map(Value::Int)
            .ok_or_else(|| PipediffError::aggregation("sum", "integer overflow")),
        Numbers::Floats(fs) => Ok(Value::Float(fs.iter().sum())),
    }
}

fn mean(values: &[Value]) -> Result<Value> {
    let xs = numbers("mean", values)?.into_floats();
    if xs.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Float(xs.iter().sum::<f64>() / xs.len() as f64))
}

fn extreme(func: &str, values: &[Value], keep_smaller: bool) -> Result<Value> {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_missing()).collect();
    if present.is_empty() {
        return Ok(Value::Null);
    }

    let all_str = present.iter().all(|v| matches!(v, Value::Str(_)));
    let all_bool = present.iter().all(|v| matches!(v, Value::Bool(_)));
    if all_str || all_bool {
        let mut best = present[0];
        for &candidate in &present[1..] {
            let ord = candidate.partial_order(best).ok_or_else(|| {
                PipediffError::aggregation(func, "values are not comparable")
            })?;
            if (keep_smaller && ord.is_lt()) || (!keep_smaller && ord.is_gt()) {
                best = candidate;
            }
        }
        return Ok(best.clone());
    }

    let pick_i = |a: i64, b: i64| if keep_smaller { a.min(b) } else { a.max(b) };
    let pick_f = |a: f64, b: f64| if keep_smaller { a.min(b) } else { a.max(b) };
    Ok(match numbers(func, values)? {
        Numbers::Ints(ints) => ints.into_iter().reduce(pick_i).map_or(Value::Null, Value::Int),
        Numbers::Floats(fs) => fs.into_iter().reduce(pick_f).map_or(Value::Null, Value::Float),
    })
}

fn min(values: &[Value]) -> Result<Value> {
    extreme("min", values, true)
}

fn max(values: &[Value]) -> Result<Value> {
    extreme("max", values, false)
}

fn count(values: &[Value]) -> Result<Value> {
    Ok(Value::Int(values.iter().filter(|v| !v.is_missing()).count() as i64))
}

fn median(values: &[Value]) -> Result<Value> {
    let mut xs = numbers("median", values)?.into_floats();
    if xs.is_empty() {
        return Ok(Value::Null);
    }
    xs.sort_by(f64::total_cmp);
    let mid = xs.len() / 2;
    let median = if xs.len() % 2 == 0 {
        (xs[mid - 1] + xs[mid]) / 2.0
    } else {
        xs[mid]
    };
    Ok(Value::Float(median))
}

fn sample_variance(func: &str, values: &[Value]) -> Result<Option<f64>> {
    let xs = numbers(func, values)?.into_floats();
    if xs.len() < 2 {
        return Ok(None);
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let squares: f64 = xs.iter().map(|x| (x - mean).powi(2)).sum();
    Ok(Some(squares / (n - 1.0)))
}

fn variance(values: &[Value]) -> Result<Value> {
    Ok(sample_variance("var", values)?.map_or(Value::Null, Value::Float))
}

fn std_dev(values: &[Value]) -> Result<Value> {
    Ok(sample_variance("std", values)?.map_or(Value::Null, |v| Value::Float(v.sqrt())))
}

/// Hashable identity of a present cell. Floats key on their bits with
/// `-0.0` folded into `0.0`.
#[derive(PartialEq, Eq, Hash)]
enum Distinct<'a> {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(&'a str),
}

fn distinct_key(value: &Value) -> Option<Distinct<'_>> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(Distinct::Bool(*b)),
        Value::Int(i) => Some(Distinct::Int(*i)),
        Value::Float(f) if f.is_nan() => None,
        Value::Float(f) if *f == 0.0 => Some(Distinct::Float(0.0f64.to_bits())),
        Value::Float(f) => Some(Distinct::Float(f.to_bits())),
        Value::Str(s) => Some(Distinct::Str(s)),
    }
}

fn nunique(values: &[Value]) -> Result<Value> {
    let distinct: HashSet<Distinct<'_>> = values.iter().filter_map(distinct_key).collect();
    Ok(Value::Int(distinct.len() as i64))
}

/// Number of missing cells (nulls and NaN)
fn nans(values: &[Value]) -> Result<Value> {
    Ok(Value::Int(values.iter().filter(|v| v.is_missing()).count() as i64))
}
