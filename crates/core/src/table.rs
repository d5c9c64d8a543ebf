//! In-memory tables.
//!
//! A [`Table`] is the unit that flows through the pipeline: rows are ordered
//! column maps so every upstream column survives untouched and in upstream
//! order. Only key columns are interpreted, through the accessors below.

use std::collections::HashSet;

use serde_json::{Number, Value};

/// One row. Column order is the insertion order (`preserve_order`).
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    /// Union of record keys in first-seen order, plus derived columns.
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Build a table from records, deriving the column list from their keys.
    pub fn from_records(name: impl Into<String>, rows: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for row in &rows {
            for key in row.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Append a column name if it is not already present.
    pub fn push_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Rows matching `pred`, same name and columns.
    pub fn filter(&self, pred: impl Fn(&Record) -> bool) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// Keep rows matching `pred`. Returns how many were removed.
    pub fn retain(&mut self, pred: impl Fn(&Record) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|r| pred(r));
        before - self.rows.len()
    }

    /// Keep only `columns` that exist in this table, in the given order.
    pub fn project(&self, columns: &[&str]) -> Table {
        let kept: Vec<String> = columns
            .iter()
            .filter(|c| self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = Record::new();
                for c in &kept {
                    out.insert(c.clone(), row.get(c).cloned().unwrap_or(Value::Null));
                }
                out
            })
            .collect();
        Table {
            name: self.name.clone(),
            columns: kept,
            rows,
        }
    }

    /// Normalized key strings of `column` across all rows (nulls skipped).
    pub fn key_set(&self, column: &str) -> HashSet<String> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column).and_then(key_string))
            .collect()
    }

    /// Distinct integer values of `column`, ascending.
    pub fn sorted_ints(&self, column: &str) -> Vec<i64> {
        let mut out: Vec<i64> = self
            .rows
            .iter()
            .filter_map(|r| r.get(column).and_then(as_i64))
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Cell text for every column of `row`, in column order.
    pub fn row_cells(&self, row: &Record) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| row.get(c).map(cell_text).unwrap_or_default())
            .collect()
    }
}

// ── Cell accessors ──────────────────────────────────────────────────

/// Integer view of a cell: JSON integers, integral floats, numeric strings.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Normalized join key. `3`, `3.0` and `"3"` all map to `"3"`.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(match as_i64(value) {
            Some(i) => i.to_string(),
            None => s.trim().to_string(),
        }),
        Value::Number(n) => Some(match as_i64(value) {
            Some(i) => i.to_string(),
            None => n.to_string(),
        }),
        Value::Bool(b) => Some(bool_text(*b).to_string()),
        other => Some(other.to_string()),
    }
}

/// Text written to a CSV cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => bool_text(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        nested => nested.to_string(),
    }
}

/// Inverse of [`cell_text`] for cells read back from CSV.
pub fn parse_cell(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match text {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(text.to_string())
}

/// Truthiness used for flags such as `finished`.
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(_) => as_i64(value).map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some(true),
            "false" | "f" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn bool_text(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}
