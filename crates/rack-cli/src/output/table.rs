//! Column-aligned plain-text tables.

use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "  ";

/// A table with a header row.
pub(crate) struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(crate) fn new<const N: usize>(header: [&str; N]) -> Self {
        Self {
            rows: vec![header.iter().map(|cell| (*cell).to_owned()).collect()],
        }
    }

    pub(crate) fn add_row<const N: usize>(&mut self, row: [&str; N]) {
        self.rows
            .push(row.iter().map(|cell| (*cell).to_owned()).collect());
    }

    pub(crate) fn render(&self) -> String {
        render_rows(&self.rows)
    }
}

/// Two aligned columns without a header.
#[derive(Default)]
pub(crate) struct KeyValue {
    rows: Vec<Vec<String>>,
}

impl KeyValue {
    pub(crate) fn add(&mut self, key: &str, value: &str) {
        self.rows.push(vec![key.to_owned(), value.to_owned()]);
    }

    pub(crate) fn render(&self) -> String {
        render_rows(&self.rows)
    }
}

fn render_rows(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    let mut output = String::new();
    for row in rows {
        let mut line = String::new();
        for (index, (cell, width)) in row.iter().zip(&widths).enumerate() {
            if index > 0 {
                line.push_str(COLUMN_GAP);
            }
            line.push_str(cell);
            let padding = width.saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            line.extend(std::iter::repeat_n(' ', padding));
        }
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}
