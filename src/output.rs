//! Output formatting utilities

use crate::compare::{ComparisonTable, DtypeTable, SchemaDrift};
use crate::error::Result;
use crate::frame_diff::{CellChange, LabelDiff};
use crate::snapshot::Snapshot;
use crate::value::Label;
use std::fmt::{self, Write as _};

/// Write rows of cells as aligned text. The first column is left aligned,
/// the rest right aligned; columns are separated by two spaces.
pub(crate) fn write_grid(
    f: &mut fmt::Formatter<'_>,
    headers: &[Vec<String>],
    rows: &[Vec<String>],
) -> fmt::Result {
    let all: Vec<&Vec<String>> = headers.iter().chain(rows.iter()).collect();
    let n_columns = all.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; n_columns];
    for row in &all {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    for (line_no, row) in all.iter().enumerate() {
        if line_no > 0 {
            f.write_char('\n')?;
        }
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i == 0 {
                write!(line, "{:<width$}", cell, width = widths[i])?;
            } else {
                write!(line, "  {:>width$}", cell, width = widths[i])?;
            }
        }
        f.write_str(line.trim_end())?;
    }
    Ok(())
}

/// Pretty printer for pipediff output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print a comparison table followed by a short summary
    pub fn print_comparison(table: &ComparisonTable) {
        println!("🔍 Comparison: {}", table.entries().join(" ↔ "));
        println!("{}", table);
        println!();

        let missing: Vec<String> = table
            .keys()
            .iter()
            .filter(|k| table.exists(&k.entry, &k.column) == Some(false))
            .map(|k| format!("{}.{}", k.entry, k.column))
            .collect();

        println!("├─ Columns: {}", table.columns().len());
        if missing.is_empty() {
            println!("├─ ✅ Columns: present in every entry");
        } else {
            println!("├─ ❌ Missing: {}", missing.len());
            println!("│  └─ {}", missing.join(", "));
        }
        if table.is_uniform() {
            println!("└─ ✅ Values: identical across entries");
        } else {
            println!("└─ ❌ Values: differ across entries");
        }
    }

    pub fn print_dtypes(table: &DtypeTable) {
        println!("🧬 Recorded dtypes");
        println!("{}", table);
    }

    pub fn print_schema_drift(drift: &SchemaDrift) {
        println!("📐 Schema: {} → {}", drift.left, drift.right);
        if !drift.has_changes() {
            println!("└─ ✅ Schema: unchanged");
            return;
        }

        if !drift.added.is_empty() {
            println!("├─ Columns added: {}", drift.added.len());
            println!("│  └─ {}", drift.added.join(", "));
        }
        if !drift.removed.is_empty() {
            println!("├─ Columns removed: {}", drift.removed.len());
            println!("│  └─ {}", drift.removed.join(", "));
        }
        if !drift.type_changes.is_empty() {
            println!("├─ Type changes: {}", drift.type_changes.len());
            for change in &drift.type_changes {
                println!("│  └─ {}: {} → {}", change.column, change.from, change.to);
            }
        }
        println!(
            "└─ Fingerprints: {} → {}",
            short_hash(drift.left_fingerprint.as_deref()),
            short_hash(drift.right_fingerprint.as_deref())
        );
    }

    /// Print label differences and changed cells of two frames
    pub fn print_frame_diff(columns: &LabelDiff<String>, rows: &LabelDiff<Label>, changes: &[CellChange]) {
        println!("🔍 Frame diff");
        Self::print_label_diff("Columns", columns);
        Self::print_label_diff("Rows", rows);

        if changes.is_empty() {
            println!("└─ ✅ Cells: unchanged");
            return;
        }
        println!("└─ ❌ Cells changed: {}", changes.len());
        for (i, change) in changes.iter().take(10).enumerate() {
            let marker = if i == changes.len().min(10) - 1 { "└─" } else { "├─" };
            println!(
                "   {} [{}, {}]: '{}' → '{}'",
                marker, change.row, change.column, change.before, change.after
            );
        }
        if changes.len() > 10 {
            println!("   ... and {} more", changes.len() - 10);
        }
    }

    fn print_label_diff<T: fmt::Display>(what: &str, diff: &LabelDiff<T>) {
        if diff.is_identical() {
            println!("├─ ✅ {}: identical ({})", what, diff.union.len());
            return;
        }
        println!("├─ ❌ {}: {} shared of {}", what, diff.intersection.len(), diff.union.len());
        if !diff.left.is_empty() {
            println!("│  ├─ Only left: {}", join(&diff.left));
        }
        if !diff.right.is_empty() {
            println!("│  └─ Only right: {}", join(&diff.right));
        }
    }

    pub fn print_snapshot(key: &str, snapshot: &Snapshot) {
        println!("📸 Snapshot: {}", key);
        if let Some((rows, columns)) = snapshot.shape {
            println!("├─ Shape: {} rows × {} columns", rows, columns);
        }
        if let Some(dtypes) = &snapshot.dtypes {
            println!("├─ Dtypes:");
            for (i, (name, dtype)) in dtypes.iter().enumerate() {
                let prefix = if i == dtypes.len() - 1 { "│  └─" } else { "│  ├─" };
                println!("{} {}: {}", prefix, name, dtype);
            }
        }
        if let Some(names) = &snapshot.column_names {
            println!("├─ Columns: {}", names.join(", "));
        }
        if let Some(copy) = &snapshot.copy {
            println!("├─ Copy: {} rows × {} columns", copy.n_rows(), copy.n_columns());
        }
        match &snapshot.agg {
            Some(agg) => {
                println!("└─ Aggregation:");
                for line in agg.to_string().lines() {
                    println!("   {}", line);
                }
            }
            None => println!("└─ Aggregation: none"),
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_frame_diff(
        columns: &LabelDiff<String>,
        rows: &LabelDiff<Label>,
        changes: &[CellChange],
    ) -> Result<String> {
        let json = serde_json::json!({
            "columns": columns,
            "rows": rows,
            "changes": changes,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}

fn short_hash(hash: Option<&str>) -> &str {
    match hash {
        Some(h) => &h[..h.len().min(12)],
        None => "n/a",
    }
}
