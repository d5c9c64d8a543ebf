//! CSV import/export for [`Table`].
//!
//! Output is deterministic: `\n` terminators, header always written (even
//! with zero rows), cells rendered by [`cell_text`]. A table without columns
//! produces an empty file. Input cells go back
//! through [`parse_cell`], so numbers and `True`/`False` regain their types.
//! The `_text` readers keep every non-empty cell as the exact string on disk.

use std::io::{Read, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::table::{parse_cell, Record, Table};

pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    // A zero-field record would be written as `""`
    if table.columns.is_empty() {
        out.flush()?;
        return Ok(());
    }
    out.write_record(&table.columns)?;
    for row in &table.rows {
        out.write_record(table.row_cells(row))?;
    }
    out.flush()?;
    Ok(())
}

/// Write `table` to `path`, creating or truncating the file.
pub fn write_csv_file(table: &Table, path: &Path) -> Result<()> {
    let f = std::fs::File::create(path).map_err(|e| Error::io_at(path, e))?;
    write_csv(table, std::io::BufWriter::new(f))
}

pub fn read_csv<R: Read>(name: &str, reader: R) -> Result<Table> {
    read_with(name, reader, parse_cell)
}

/// Like [`read_csv`] but cells stay text; only empty cells become null.
pub fn read_csv_text<R: Read>(name: &str, reader: R) -> Result<Table> {
    read_with(name, reader, |cell| {
        if cell.is_empty() {
            Value::Null
        } else {
            Value::String(cell.to_string())
        }
    })
}

fn read_with<R: Read>(name: &str, reader: R, cell_value: impl Fn(&str) -> Value) -> Result<Table> {
    let mut input = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = input.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in input.records() {
        let record = result?;
        let mut row = Record::new();
        for (i, column) in headers.iter().enumerate() {
            row.insert(column.clone(), cell_value(record.get(i).unwrap_or("")));
        }
        rows.push(row);
    }

    Ok(Table {
        name: name.to_string(),
        columns: headers,
        rows,
    })
}

/// Read a CSV file into a table named after the file stem.
pub fn read_csv_file(path: &Path) -> Result<Table> {
    read_csv(&file_stem(path), open(path)?)
}

/// [`read_csv_text`] for a file.
pub fn read_csv_text_file(path: &Path) -> Result<Table> {
    read_csv_text(&file_stem(path), open(path)?)
}

fn open(path: &Path) -> Result<std::io::BufReader<std::fs::File>> {
    let f = std::fs::File::open(path).map_err(|e| Error::io_at(path, e))?;
    Ok(std::io::BufReader::new(f))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_written_for_empty_table() {
        let mut t = Table::new("playermatchstats");
        t.columns = vec!["player_id".into(), "match_id".into()];
        let mut buf = Vec::new();
        write_csv(&t, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "player_id,match_id\n");
    }

    #[test]
    fn quoting_and_missing_cells() {
        let rows = vec![
            json!({"id": 1, "news": "Knee injury, 75% chance", "finished": true}),
            json!({"id": 2}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        let t = Table::from_records("x", rows);
        let mut buf = Vec::new();
        write_csv(&t, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "id,news,finished\n1,\"Knee injury, 75% chance\",True\n2,,\n"
        );
    }

    #[test]
    fn read_restores_types() {
        let text = "id,web_name,now_cost,finished,news\n7,Saka,10.5,False,\n";
        let t = read_csv("players", text.as_bytes()).unwrap();
        assert_eq!(t.columns, vec!["id", "web_name", "now_cost", "finished", "news"]);
        let row = &t.rows[0];
        assert_eq!(row["id"], json!(7));
        assert_eq!(row["web_name"], json!("Saka"));
        assert_eq!(row["now_cost"], json!(10.5));
        assert_eq!(row["finished"], json!(false));
        assert_eq!(row["news"], serde_json::Value::Null);
    }

    #[test]
    fn text_read_keeps_cells_verbatim() {
        let text = "id,expected_goals,ict_index,news\n10,0.00,1.50,\n";
        let t = read_csv_text("playerstats", text.as_bytes()).unwrap();
        let row = &t.rows[0];
        assert_eq!(row["id"], json!("10"));
        assert_eq!(row["expected_goals"], json!("0.00"));
        assert_eq!(row["ict_index"], json!("1.50"));
        assert_eq!(row["news"], serde_json::Value::Null);
    }

    #[test]
    fn short_rows_are_padded_with_null() {
        let t = read_csv("t", "a,b,c\n1,2\n".as_bytes()).unwrap();
        assert_eq!(t.rows[0]["c"], serde_json::Value::Null);
    }
}
