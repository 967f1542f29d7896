use super::types::Field;

pub const MAPPING_SYSTEM_PROMPT: &str = r#"
You are a data analyst who maps supplier quote spreadsheets onto a fixed set of
logistics and pricing fields. Supplier sheets are messy: headers may be missing,
misspelled, split across columns, or written in several languages.

APPROACH:
1. Find the header row by looking for descriptive labels rather than data values.
2. Map columns using the data underneath each header, not only the header text.
3. Cross-check every mapping against the sample rows before answering.

OUTPUT REQUIREMENTS:
- Return ONLY valid JSON with the exact structure requested.
- Every mapping field must be present. Use null for fields you cannot locate.
- Column indices are 0-based integers.
"#;

/// Per-field hints, in canonical field order.
const FIELD_HINTS: [(Field, &str); Field::COUNT] = [
    (Field::Sku, "product code, often alphanumeric with a prefix (PSP001, COMP-22) or a plain number"),
    (Field::Title, "longest descriptive text about the product"),
    (Field::Price, "unit price; may carry a currency symbol or code (FOB USD, $)"),
    (Field::ProductLength, "product length, or a combined size cell like 25x20x15"),
    (Field::ProductWidth, "product width"),
    (Field::ProductHeight, "product height"),
    (Field::CartonLength, "carton length, or a combined CARTON SIZE cell like 56X10X127CM"),
    (Field::CartonWidth, "carton width; often an unlabeled column right after CARTON SIZE"),
    (Field::CartonHeight, "carton height; often the second unlabeled column after CARTON SIZE"),
    (Field::DimsText, "free-text size description"),
    (Field::Pack, "pack quantity, e.g. PACKING column with 12PCS/CTN or 1SET"),
    (Field::TotalCartons, "number of cartons ordered (CTNS)"),
    (Field::GrossWeight, "gross weight per carton (G.W), usually 1-200 kg"),
    (Field::NetWeight, "net weight per carton (N.W)"),
    (Field::SupplierCbm, "carton volume in cubic meters (CBM), usually 0.001-1.000"),
];

/// Render one preview row as `Row i: "a" | "b" | ...`.
fn render_row(index: usize, row: &[String]) -> String {
    let cells: Vec<String> = row.iter().map(|c| format!("\"{c}\"")).collect();
    format!("Row {index}: {}", cells.join(" | "))
}

/// Build the mapping prompt for the leading rows of a sheet.
pub fn build_mapping_prompt(preview: &[Vec<String>]) -> String {
    let table = preview
        .iter()
        .enumerate()
        .map(|(i, row)| render_row(i, row))
        .collect::<Vec<_>>()
        .join("\n");

    let hints = FIELD_HINTS
        .iter()
        .map(|(field, hint)| format!("- {}: {hint}", field.key()))
        .collect::<Vec<_>>()
        .join("\n");

    let schema = Field::ALL
        .iter()
        .map(|field| {
            format!(
                "    \"{}\": {{\"col\": <column_index_or_null>, \"name\": \"<header_text_or_null>\", \"unit\": \"<unit_or_null>\"}}",
                field.key()
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"SPREADSHEET DATA (first {count} rows):
{table}

FIELDS TO LOCATE:
{hints}

MAPPING RULES:
- If dimensions are combined in one cell (e.g. "25x20x15"), map length, width and height to that column.
- Empty header cells right after a size header usually continue it (width, then height).
- Prefer carton dimensions over product dimensions when only one set exists.

Return ONLY this JSON (no extra text):
{{
  "headerRow": <header_row_index>,
  "mapping": {{
{schema}
  }}
}}"#,
        count = preview.len(),
    )
}
