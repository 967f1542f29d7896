//! Workbook decoding: base64 payload → bytes → first worksheet as string rows.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use super::grid::format_number;
use super::types::{DecodedSheet, SpreadsheetDecoder};
use super::QuoteError;

/// Decode a base64 workbook payload.
///
/// Accepts a `data:<mime>;base64,` prefix and embedded whitespace or line
/// breaks, both common when the payload comes from a browser `FileReader`.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, QuoteError> {
    let trimmed = payload.trim();
    let body = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| QuoteError::DecodeFailure("data URL without payload".into()))?,
        None => trimmed,
    };

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(QuoteError::DecodeFailure("empty workbook payload".into()));
    }

    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| QuoteError::DecodeFailure(format!("invalid base64: {e}")))
}

/// [`SpreadsheetDecoder`] backed by calamine; reads the first worksheet of
/// any format calamine auto-detects (xlsx, xlsm, xlsb, xls, ods).
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineDecoder;

impl SpreadsheetDecoder for CalamineDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedSheet, QuoteError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| QuoteError::DecodeFailure(format!("unreadable workbook: {e}")))?;

        let name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| QuoteError::DecodeFailure("workbook has no worksheets".into()))?;

        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| QuoteError::DecodeFailure(format!("failed to read sheet '{name}': {e}")))?;

        let rows = range_to_rows(&range);
        tracing::debug!(sheet = %name, rows = rows.len(), "Workbook decoded");
        Ok(DecodedSheet { name, rows })
    }
}

/// Flatten a worksheet range into string rows.
///
/// calamine ranges start at the first used cell; leading empty columns are
/// padded back so column indices match the sheet's own A, B, C... layout.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let col_offset = range.start().map_or(0, |(_, col)| col as usize);

    range
        .rows()
        .map(|row| {
            let mut cells = vec![String::new(); col_offset];
            cells.extend(row.iter().map(data_to_string));
            cells
        })
        .collect()
}

fn data_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| format_number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        // Formula errors (#DIV/0!, #N/A) carry no product data.
        Data::Error(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_base64_decodes() {
        assert_eq!(decode_base64_payload("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn data_url_prefix_and_whitespace_are_tolerated() {
        let payload = "data:application/vnd.openxmlformats-officedocument.spreadsheetml.sheet;base64,aGVs\r\nbG8=\n";
        assert_eq!(decode_base64_payload(payload).unwrap(), b"hello");
    }

    #[test]
    fn invalid_base64_is_decode_failure() {
        let err = decode_base64_payload("not base64!!").unwrap_err();
        assert!(matches!(err, QuoteError::DecodeFailure(_)));
    }

    #[test]
    fn empty_payload_is_decode_failure() {
        assert!(matches!(decode_base64_payload("  "), Err(QuoteError::DecodeFailure(_))));
        assert!(matches!(
            decode_base64_payload("data:text/plain;base64"),
            Err(QuoteError::DecodeFailure(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_not_a_workbook() {
        let err = CalamineDecoder.decode(b"definitely not a spreadsheet").unwrap_err();
        assert!(matches!(err, QuoteError::DecodeFailure(_)));
    }

    #[test]
    fn range_cells_become_strings() {
        let mut range = Range::new((0, 0), (1, 2));
        range.set_value((0, 0), Data::String("ITEM".into()));
        range.set_value((0, 1), Data::String("PRICE".into()));
        range.set_value((0, 2), Data::String("CTNS".into()));
        range.set_value((1, 0), Data::String("PSP001".into()));
        range.set_value((1, 1), Data::Float(12.5));
        range.set_value((1, 2), Data::Float(40.0));

        let rows = range_to_rows(&range);
        assert_eq!(rows[0], vec!["ITEM", "PRICE", "CTNS"]);
        assert_eq!(rows[1], vec!["PSP001", "12.5", "40"]);
    }

    #[test]
    fn leading_empty_columns_are_padded() {
        let mut range = Range::new((2, 1), (2, 2));
        range.set_value((2, 1), Data::String("SKU".into()));
        range.set_value((2, 2), Data::Bool(true));

        let rows = range_to_rows(&range);
        assert_eq!(rows, vec![vec!["".to_string(), "SKU".into(), "true".into()]]);
    }

    #[test]
    fn empty_and_error_cells_are_blank() {
        assert_eq!(data_to_string(&Data::Empty), "");
        assert_eq!(data_to_string(&Data::Error(calamine::CellErrorType::Div0)), "");
        assert_eq!(data_to_string(&Data::Int(7)), "7");
    }
}
