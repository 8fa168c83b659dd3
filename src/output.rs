//! Rendering of revealed result rows.
//!
//! Rows arrive in increments as a [`ResultModel`](crate::model::ResultModel)
//! grows, so both writers print each increment as it comes and never hold
//! the whole result.

use crate::cli::OutputFormat;
use crate::db::{Row, Value};
use std::io::{self, Write};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Writes revealed rows in the selected format.
#[derive(Debug)]
pub enum RowWriter {
    Text(TableWriter),
    Json(JsonWriter),
}

impl RowWriter {
    /// Creates a writer for the given format and column headers.
    pub fn new(format: OutputFormat, headers: &[String]) -> Self {
        match format {
            OutputFormat::Text => Self::Text(TableWriter::new(headers)),
            OutputFormat::Json => Self::Json(JsonWriter::new(headers)),
        }
    }

    /// Writes one increment of rows.
    pub fn write_rows<W: Write>(&mut self, out: &mut W, rows: &[Row]) -> io::Result<()> {
        match self {
            Self::Text(table) => table.write_rows(out, rows),
            Self::Json(json) => json.write_rows(out, rows),
        }
    }

    /// Writes whatever closes the output.
    pub fn finish<W: Write>(&mut self, out: &mut W, more_available: bool) -> io::Result<()> {
        match self {
            Self::Text(table) => table.finish(out, more_available),
            Self::Json(_) => Ok(()),
        }
    }
}

/// Aligned text table with box-drawing borders.
///
/// Column widths are fixed by the first increment; later values wider than
/// their column are truncated.
#[derive(Debug)]
pub struct TableWriter {
    headers: Vec<String>,
    widths: Option<Vec<usize>>,
    rows_written: usize,
}

impl TableWriter {
    pub fn new(headers: &[String]) -> Self {
        Self {
            headers: headers.to_vec(),
            widths: None,
            rows_written: 0,
        }
    }

    /// Calculates the width of each column from the headers and `rows`.
    fn calculate_column_widths(&self, rows: &[Row]) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|name| name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in rows {
            for (i, value) in row.iter().enumerate() {
                if i < widths.len() {
                    let value_len = value.to_display_string().chars().count();
                    widths[i] = widths[i].max(value_len);
                }
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Truncates a string to fit within the given width, adding ellipsis if needed.
    fn truncate(s: &str, max_width: usize) -> String {
        let len = s.chars().count();
        if len <= max_width {
            s.to_string()
        } else if max_width <= 3 {
            s.chars().take(max_width).collect()
        } else {
            let head: String = s.chars().take(max_width - 3).collect();
            format!("{head}...")
        }
    }

    fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
        let mut border = String::new();
        border.push(left);

        for (i, &width) in widths.iter().enumerate() {
            border.push_str(&"─".repeat(width + 2));
            if i < widths.len() - 1 {
                border.push(mid);
            }
        }

        border.push(right);
        border
    }

    fn line<'v>(widths: &[usize], cells: impl Iterator<Item = &'v str>) -> String {
        let mut line = String::from("│");
        for (cell, &width) in cells.zip(widths) {
            let cell = Self::truncate(cell, width);
            line.push_str(&format!(" {cell:width$} │"));
        }
        line
    }

    /// Writes rows, preceded by the header on the first call.
    pub fn write_rows<W: Write>(&mut self, out: &mut W, rows: &[Row]) -> io::Result<()> {
        if self.headers.is_empty() {
            return Ok(());
        }

        let widths = match &self.widths {
            Some(widths) => widths.clone(),
            None => {
                let widths = self.calculate_column_widths(rows);
                writeln!(out, "{}", Self::border(&widths, '┌', '┬', '┐'))?;
                writeln!(
                    out,
                    "{}",
                    Self::line(&widths, self.headers.iter().map(String::as_str))
                )?;
                writeln!(out, "{}", Self::border(&widths, '├', '┼', '┤'))?;
                self.widths = Some(widths.clone());
                widths
            }
        };

        for row in rows {
            let cells: Vec<String> = row.iter().map(Value::to_display_string).collect();
            writeln!(out, "{}", Self::line(&widths, cells.iter().map(String::as_str)))?;
        }
        self.rows_written += rows.len();

        Ok(())
    }

    /// Writes the bottom border and a row count footer.
    pub fn finish<W: Write>(&mut self, out: &mut W, more_available: bool) -> io::Result<()> {
        if self.headers.is_empty() {
            return writeln!(out, "(empty result)");
        }
        if self.widths.is_none() {
            self.write_rows(out, &[])?;
        }
        if let Some(widths) = &self.widths {
            writeln!(out, "{}", Self::border(widths, '└', '┴', '┘'))?;
        }

        let count = self.rows_written;
        let suffix = if more_available { " (more available)" } else { "" };
        writeln!(
            out,
            "{count} row{} shown{suffix}",
            if count == 1 { "" } else { "s" }
        )
    }
}

/// One JSON object per row, keyed by column header.
#[derive(Debug)]
pub struct JsonWriter {
    headers: Vec<String>,
}

impl JsonWriter {
    pub fn new(headers: &[String]) -> Self {
        Self {
            headers: headers.to_vec(),
        }
    }

    pub fn write_rows<W: Write>(&mut self, out: &mut W, rows: &[Row]) -> io::Result<()> {
        for row in rows {
            let object: serde_json::Map<String, serde_json::Value> = self
                .headers
                .iter()
                .cloned()
                .zip(row.iter().map(Value::to_json))
                .collect();
            serde_json::to_writer(&mut *out, &object)?;
            writeln!(out)?;
        }
        Ok(())
    }
}
