use serde::Serialize;
use serde_json::Value;

/// Sheet of string cells with fully blank rows removed.
///
/// Rows may have different lengths; reads past the end of a row yield `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Build from caller-supplied JSON rows (numbers, strings, nulls, ...).
    pub fn from_json_rows(rows: &[Value]) -> Self {
        let rows = rows.iter().map(json_row_to_cells).collect();
        Self::from_string_rows(rows)
    }

    /// Build from already-stringified rows, dropping fully blank ones.
    pub fn from_string_rows(rows: Vec<Vec<String>>) -> Self {
        let before = rows.len();
        let rows: Vec<Vec<String>> = rows.into_iter().filter(|r| !is_blank_row(r)).collect();
        if rows.len() != before {
            tracing::debug!(dropped = before - rows.len(), kept = rows.len(), "Dropped blank rows");
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Cell text, or `""` when the row or column is out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column count as reported to callers: the first row's length.
    pub fn col_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// The first `limit` rows.
    pub fn head(&self, limit: usize) -> &[Vec<String>] {
        &self.rows[..limit.min(self.rows.len())]
    }
}

/// True when every cell is empty after trimming (an empty row counts as blank).
pub fn is_blank_row<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().all(|c| c.as_ref().trim().is_empty())
}

fn json_row_to_cells(row: &Value) -> Vec<String> {
    match row {
        Value::Array(cells) => cells.iter().map(cell_to_string).collect(),
        Value::Null => Vec::new(),
        other => vec![cell_to_string(other)],
    }
}

/// Coerce one JSON cell to text the way a spreadsheet would display it.
pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())
            }
        }
        other => other.to_string(),
    }
}

/// Render a float without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_rows_are_removed_not_replaced() {
        let rows = vec![
            json!(["ITEM", "PRICE"]),
            json!(["", "   ", null]),
            json!([]),
            json!(["A-1", 10.5]),
        ];
        let grid = Grid::from_json_rows(&rows);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.cell(1, 0), "A-1");
        assert_eq!(grid.cell(1, 1), "10.5");
    }

    #[test]
    fn cells_are_coerced_to_strings() {
        let rows = vec![json!([12, 12.0, 0.125, true, null, "  x  "])];
        let grid = Grid::from_json_rows(&rows);
        assert_eq!(grid.row(0).unwrap(), ["12", "12", "0.125", "true", "", "  x  "]);
    }

    #[test]
    fn non_array_rows_become_single_cells() {
        let rows = vec![json!("header only"), json!(null), json!(7)];
        let grid = Grid::from_json_rows(&rows);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.cell(0, 0), "header only");
        assert_eq!(grid.cell(1, 0), "7");
    }

    #[test]
    fn out_of_range_reads_return_empty() {
        let grid = Grid::from_string_rows(vec![vec!["a".into(), "b".into(), "c".into()], vec!["d".into()]]);
        assert_eq!(grid.cell(1, 2), "");
        assert_eq!(grid.cell(9, 0), "");
        assert_eq!(grid.col_count(), 3);
    }

    #[test]
    fn whitespace_only_grid_is_empty() {
        let grid = Grid::from_string_rows(vec![vec![" ".into()], vec!["\t".into(), "".into()]]);
        assert!(grid.is_empty());
        assert_eq!(grid.col_count(), 0);
    }

    #[test]
    fn head_is_bounded() {
        let grid = Grid::from_string_rows((0..30).map(|i| vec![i.to_string()]).collect());
        assert_eq!(grid.head(25).len(), 25);
        assert_eq!(grid.head(100).len(), 30);
    }

    #[test]
    fn format_number_drops_integral_fraction() {
        assert_eq!(format_number(180.0), "180");
        assert_eq!(format_number(119.9), "119.9");
        assert_eq!(format_number(-3.0), "-3");
    }
}
