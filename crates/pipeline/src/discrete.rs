//! Per-gameweek player stats from season-to-date totals.
//!
//! `playerstats` rows are cumulative: gameweek `n` carries totals up to and
//! including `n`. Differencing against the previous gameweek's rows yields
//! what happened in `n` alone.

use std::collections::HashMap;

use fplsnap_core::schema::{discrete_output_columns, CUMULATIVE_COLS};
use fplsnap_core::table::key_string;
use fplsnap_core::{Record, Table};
use serde_json::Value;

pub const DISCRETE_TABLE: &str = "player_gameweek_stats";

/// Output columns present in `current`: identity, snapshot, then cumulative.
pub fn output_columns<'a>(current: &Table, id_column: &'a str) -> Vec<&'a str> {
    let mut cols: Vec<&str> = vec![id_column];
    cols.extend(discrete_output_columns().into_iter().filter(|c| *c != id_column));
    cols.retain(|c| current.has_column(c));
    cols
}

/// Discrete stats for one gameweek.
///
/// With no `previous` the projected `current` rows are the baseline. With a
/// previous gameweek, each cumulative column is reduced by that player's
/// previous value (0 when the player or value is absent). Columns the
/// previous table does not carry at all are passed through.
pub fn discrete_stats(current: &Table, previous: Option<&Table>, id_column: &str) -> Table {
    let mut out = current.project(&output_columns(current, id_column));
    out.name = DISCRETE_TABLE.to_string();

    let Some(previous) = previous else {
        return out;
    };

    let mut by_id: HashMap<String, &Record> = HashMap::with_capacity(previous.len());
    for row in &previous.rows {
        if let Some(id) = row.get(id_column).and_then(key_string) {
            by_id.entry(id).or_insert(row);
        }
    }

    let differenced: Vec<&str> = CUMULATIVE_COLS
        .iter()
        .copied()
        .filter(|c| out.has_column(c) && previous.has_column(c))
        .collect();

    for row in &mut out.rows {
        let prev_row = row.get(id_column).and_then(key_string).and_then(|id| by_id.get(&id));
        for col in &differenced {
            let prev = prev_row.and_then(|r| r.get(*col)).unwrap_or(&Value::Null);
            let Some(cur) = row.get(*col) else { continue };
            if let Some(diff) = subtract(cur, prev) {
                row.insert((*col).to_string(), diff);
            }
        }
    }
    out
}

// ── Decimal arithmetic ──────────────────────────────────────────────

/// `current - previous`, or `None` when either side is not numeric.
/// A null `previous` counts as 0.
///
/// The result carries the larger number of decimal places of the two
/// operands, taken from their text. Integer results are JSON integers; any
/// other result is a string with exactly that many places, so `"0.00"` minus
/// `"0.00"` stays `"0.00"`.
pub fn subtract(current: &Value, previous: &Value) -> Option<Value> {
    let (a, a_scale) = decimal(current)?;
    let (b, b_scale) = match previous {
        Value::Null => (0, 0),
        v => decimal(v)?,
    };
    let scale = a_scale.max(b_scale);
    let diff = rescale(a, a_scale, scale)?.checked_sub(rescale(b, b_scale, scale)?)?;
    if scale == 0 {
        return i64::try_from(diff).ok().map(Value::from);
    }
    Some(Value::String(format_decimal(diff, scale)))
}

/// Mantissa and decimal places of a numeric cell, read from the text it
/// is written as.
fn decimal(value: &Value) -> Option<(i128, u32)> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

/// `mantissa / 10^scale` with exactly `scale` decimal places.
fn format_decimal(mantissa: i128, scale: u32) -> String {
    let width = scale as usize + 1;
    let digits = format!("{:0>width$}", mantissa.unsigned_abs());
    let (int_part, frac_part) = digits.split_at(digits.len() - scale as usize);
    let sign = if mantissa < 0 { "-" } else { "" };
    format!("{sign}{int_part}.{frac_part}")
}

fn parse_decimal(text: &str) -> Option<(i128, u32)> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut mantissa: i128 = 0;
    for b in int_part.bytes().chain(frac_part.bytes()) {
        mantissa = mantissa.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    let scale = u32::try_from(frac_part.len()).ok()?;
    Some((if negative { -mantissa } else { mantissa }, scale))
}

fn rescale(mantissa: i128, from: u32, to: u32) -> Option<i128> {
    mantissa.checked_mul(10i128.checked_pow(to - from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn table(rows: Vec<Value>) -> Table {
        Table::from_records(
            "playerstats",
            rows.into_iter().map(|v| v.as_object().cloned().unwrap()).collect::<Vec<Record>>(),
        )
    }

    #[test]
    fn baseline_is_projection() {
        let gw1 = table(vec![json!({
            "id": 10, "gw": 1, "web_name": "Saka", "status": "a",
            "total_points": 12, "minutes": 90, "unrelated": "x"
        })]);
        let out = discrete_stats(&gw1, None, "id");
        assert_eq!(out.name, DISCRETE_TABLE);
        assert_eq!(out.columns, vec!["id", "web_name", "status", "total_points", "minutes"]);
        assert_eq!(out.rows[0]["total_points"], json!(12));
    }

    #[test]
    fn later_gameweek_is_differenced() {
        let gw1 = table(vec![
            json!({"id": 10, "total_points": 12, "minutes": 90, "expected_goals": "0.35", "now_cost": 100}),
        ]);
        let gw2 = table(vec![
            json!({"id": 10, "total_points": 20, "minutes": 180, "expected_goals": "1.05", "now_cost": 101}),
            json!({"id": 11, "total_points": 3, "minutes": 45, "expected_goals": "0.1", "now_cost": 45}),
        ]);
        let out = discrete_stats(&gw2, Some(&gw1), "id");
        assert_eq!(out.rows[0]["total_points"], json!(8));
        assert_eq!(out.rows[0]["minutes"], json!(90));
        assert_eq!(out.rows[0]["expected_goals"], json!("0.70"));
        // Snapshot columns pass through
        assert_eq!(out.rows[0]["now_cost"], json!(101));
        // New player: previous counts as zero
        assert_eq!(out.rows[1]["total_points"], json!(3));
        assert_eq!(out.rows[1]["expected_goals"], json!("0.1"));
    }

    #[test]
    fn column_missing_from_previous_passes_through() {
        let gw1 = table(vec![json!({"id": 10, "minutes": 90})]);
        let gw2 = table(vec![json!({"id": 10, "minutes": 180, "bonus": 3})]);
        let out = discrete_stats(&gw2, Some(&gw1), "id");
        assert_eq!(out.rows[0]["minutes"], json!(90));
        assert_eq!(out.rows[0]["bonus"], json!(3));
    }

    #[test]
    fn non_numeric_and_null_current_pass_through() {
        let gw1 = table(vec![json!({"id": 10, "minutes": 90, "bps": 5})]);
        let gw2 = table(vec![json!({"id": 10, "minutes": null, "bps": "n/a"})]);
        let out = discrete_stats(&gw2, Some(&gw1), "id");
        assert_eq!(out.rows[0]["minutes"], Value::Null);
        assert_eq!(out.rows[0]["bps"], json!("n/a"));
    }

    #[test]
    fn first_previous_row_wins_on_duplicate_id() {
        let gw1 = table(vec![json!({"id": 10, "minutes": 90}), json!({"id": 10, "minutes": 0})]);
        let gw2 = table(vec![json!({"id": 10, "minutes": 100})]);
        let out = discrete_stats(&gw2, Some(&gw1), "id");
        assert_eq!(out.rows[0]["minutes"], json!(10));
    }

    #[test]
    fn custom_id_column_leads() {
        let gw1 = table(vec![json!({"player_id": 10, "web_name": "Saka", "minutes": 90})]);
        let out = discrete_stats(&gw1, None, "player_id");
        assert_eq!(out.columns, vec!["player_id", "web_name", "minutes"]);
    }

    #[test]
    fn subtract_rules() {
        assert_eq!(subtract(&json!(5), &Value::Null), Some(json!(5)));
        assert_eq!(subtract(&json!(2.5), &json!(1)), Some(json!("1.5")));
        assert_eq!(subtract(&json!("10.0"), &json!("2.25")), Some(json!("7.75")));
        assert_eq!(subtract(&json!("0.1"), &json!("0.25")), Some(json!("-0.15")));
        assert_eq!(subtract(&json!(true), &json!(1)), None);
        assert_eq!(subtract(&json!(3), &json!("x")), None);
        assert_eq!(subtract(&json!("1e5"), &json!(1)), None);
    }

    #[test]
    fn trailing_zeros_keep_their_places() {
        assert_eq!(subtract(&json!("0.00"), &json!("0.00")), Some(json!("0.00")));
        assert_eq!(subtract(&json!("1.50"), &json!("0.50")), Some(json!("1.00")));
        assert_eq!(subtract(&json!("0.0"), &json!(0)), Some(json!("0.0")));
        assert_eq!(subtract(&json!(90.0), &json!(45)), Some(json!("45.0")));
        assert_eq!(subtract(&json!("0.50"), &Value::Null), Some(json!("0.50")));
    }

    fn decimal_value(mantissa: i64, scale: u32) -> Value {
        if scale == 0 {
            return json!(mantissa);
        }
        Value::String(format_decimal(i128::from(mantissa), scale))
    }

    proptest! {
        #[test]
        fn integer_difference_restores_current(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let diff = subtract(&json!(a), &json!(b)).unwrap();
            prop_assert_eq!(diff.as_i64().unwrap() + b, a);
        }

        #[test]
        fn decimal_difference_is_exact(
            a in -1_000_000_000i64..1_000_000_000,
            b in -1_000_000_000i64..1_000_000_000,
            sa in 0u32..4,
            sb in 0u32..4,
        ) {
            let diff = subtract(&decimal_value(a, sa), &decimal_value(b, sb)).unwrap();
            let scale = sa.max(sb);
            let expected = a as i128 * 10i128.pow(scale - sa) - b as i128 * 10i128.pow(scale - sb);
            let (m, s) = decimal(&diff).unwrap();
            prop_assert_eq!(s, scale);
            prop_assert_eq!(m, expected);
        }
    }
}
