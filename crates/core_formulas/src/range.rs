//! Range rendering for data analysis prompts
//!
//! Turns a block of cells into the compact text layout the model sees.
//! At most ten data rows are included; the remainder is summarised.

use crate::types::{CellValue, Range};
use std::fmt::Write as _;

/// Maximum number of data rows rendered into a prompt
pub const MAX_PROMPT_ROWS: usize = 10;

impl Range {
    /// Parse delimited text (one row per line) into a range
    ///
    /// Fields wrapped in double quotes may contain the delimiter, and `""`
    /// inside them is a literal quote. Quoted fields cannot span lines.
    /// Blank lines are skipped. Ragged rows are kept as they are.
    pub fn from_delimited(text: &str, delimiter: char) -> Self {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                split_fields(line, delimiter)
                    .iter()
                    .map(|field| CellValue::parse(field))
                    .collect()
            })
            .collect();

        Self { rows }
    }

    /// First row counts as headers when none of its cells is numeric
    /// and at least one data row follows it
    pub fn has_headers(&self) -> bool {
        match self.rows.first() {
            Some(first) => self.rows.len() > 1 && !first.iter().any(CellValue::is_numeric),
            None => false,
        }
    }

    /// Render the range as prompt text
    pub fn to_prompt_text(&self) -> String {
        let mut out = String::new();
        let total = self.rows.len();

        if self.has_headers() {
            let _ = writeln!(out, "Headers: {}", join_row(&self.rows[0]));
            out.push_str("Data rows:\n");

            for (n, row) in self.rows.iter().skip(1).take(MAX_PROMPT_ROWS).enumerate() {
                let _ = writeln!(out, "Row {}: {}", n + 1, join_row(row));
            }

            if total > MAX_PROMPT_ROWS + 1 {
                let _ = writeln!(out, "... and {} more rows", total - (MAX_PROMPT_ROWS + 1));
            }
        } else {
            for (n, row) in self.rows.iter().take(MAX_PROMPT_ROWS).enumerate() {
                let _ = writeln!(out, "Row {}: {}", n + 1, join_row(row));
            }

            if total > MAX_PROMPT_ROWS {
                let _ = writeln!(out, "... and {} more rows", total - MAX_PROMPT_ROWS);
            }
        }

        out
    }
}

fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
        } else if c == '"' && field.trim().is_empty() {
            field.clear();
            quoted = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}

fn join_row(row: &[CellValue]) -> String {
    row.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
