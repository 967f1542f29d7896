use super::accept::accept_product;
use super::grid::{is_blank_row, Grid};
use super::heuristics::{find_price, find_sku, find_title};
use super::numeric::{count_or_none, numeric_or_none, numeric_or_zero, numeric_tokens, parse_pack};
use super::types::{Field, Mapping, ProductRecord};

/// Skipped rows beyond this index are not logged individually.
const SKIP_LOG_LIMIT: usize = 50;

/// Extract product records from every data row strictly after `header_row`.
///
/// Row order is preserved; rows failing the acceptance filter are dropped.
pub fn extract_products(grid: &Grid, mapping: &Mapping, header_row: usize) -> Vec<ProductRecord> {
    let first_data_row = header_row.saturating_add(1);
    let data_rows = grid.rows().get(first_data_row..).unwrap_or_default();
    tracing::info!(
        header_row,
        data_rows = data_rows.len(),
        mapped_fields = mapping.located_count(),
        "Extracting products"
    );

    let mut products = Vec::with_capacity(data_rows.len());
    let mut skipped = 0usize;

    for (i, row) in data_rows.iter().enumerate() {
        if is_blank_row(row) {
            continue;
        }

        let product = extract_row(row, mapping, i);
        match accept_product(&product) {
            Some(reason) => {
                tracing::trace!(row = i, ?reason, "Row accepted");
                products.push(product);
            }
            None => {
                skipped += 1;
                if i < SKIP_LOG_LIMIT {
                    tracing::debug!(
                        row = i,
                        price = product.unit_price,
                        "Skipped row without SKU, price or dimensions"
                    );
                }
            }
        }
    }

    tracing::info!(products = products.len(), skipped, "Product extraction complete");
    products
}

/// Build one record from a data row. Never fails: bad cells become defaults.
pub fn extract_row(row: &[String], mapping: &Mapping, row_index: usize) -> ProductRecord {
    let mut product = ProductRecord::default();

    if let Some(sku) = mapped_cell(row, mapping, Field::Sku) {
        product.sku = sku.trim().to_string();
    }
    if product.sku.is_empty() {
        if let Some(sku) = find_sku(row) {
            tracing::debug!(row = row_index, "SKU fallback matched");
            product.sku = sku;
        }
    }

    if let Some(title) = mapped_cell(row, mapping, Field::Title) {
        product.title = title.trim().to_string();
    }
    if product.title.is_empty() {
        if let Some(title) = find_title(row) {
            tracing::debug!(row = row_index, "Title fallback matched");
            product.title = title;
        }
    }

    if let Some(price) = mapped_cell(row, mapping, Field::Price) {
        product.unit_price = numeric_or_zero(price);
    }
    if product.unit_price == 0.0 {
        if let Some(price) = find_price(row) {
            tracing::debug!(row = row_index, price, "Price fallback matched");
            product.unit_price = price;
        }
    }

    let dims = read_dimensions(
        row,
        mapping,
        [Field::ProductLength, Field::ProductWidth, Field::ProductHeight],
    );
    product.product_length = dims.length;
    product.product_width = dims.width;
    product.product_height = dims.height;
    product.product_source = dims.source;

    // Carton dimensions drive freight, read independently of product ones.
    let carton = read_dimensions(
        row,
        mapping,
        [Field::CartonLength, Field::CartonWidth, Field::CartonHeight],
    );
    product.carton_length = carton.length;
    product.carton_width = carton.width;
    product.carton_height = carton.height;
    product.carton_source = carton.source;

    if let Some(dims_text) = mapped_cell(row, mapping, Field::DimsText) {
        product.dims_text = dims_text.trim().to_string();
    }

    if let Some(pack) = mapped_cell(row, mapping, Field::Pack) {
        product.pack_text = pack.trim().to_string();
        product.pack = parse_pack(pack);
    }

    if let Some(cartons) = mapped_cell(row, mapping, Field::TotalCartons) {
        product.total_cartons = count_or_none(cartons);
    }

    if let Some(weight) = mapped_cell(row, mapping, Field::GrossWeight) {
        product.gross_weight = numeric_or_zero(weight);
        if let Some(unit) = &mapping.get(Field::GrossWeight).unit {
            product.weight_unit = unit.clone();
        }
    }

    if let Some(weight) = mapped_cell(row, mapping, Field::NetWeight) {
        product.net_weight = numeric_or_none(weight);
    }

    if let Some(cbm) = mapped_cell(row, mapping, Field::SupplierCbm) {
        product.supplier_cbm = numeric_or_none(cbm);
        product.cbm_source = label(mapping, Field::SupplierCbm);
    }

    product
}

/// The mapped cell for `field`, `Some("")` when the column is past the row end,
/// `None` when the field is not mapped.
fn mapped_cell<'a>(row: &'a [String], mapping: &Mapping, field: Field) -> Option<&'a str> {
    let col = mapping.col(field)?;
    Some(row.get(col).map(String::as_str).unwrap_or(""))
}

fn label(mapping: &Mapping, field: Field) -> String {
    mapping.get(field).name.clone().unwrap_or_default()
}

#[derive(Debug, Default, PartialEq)]
struct Dimensions {
    length: f64,
    width: f64,
    height: f64,
    source: String,
}

/// Length/width/height from either one combined cell ("56X10X127CM") or
/// three separately mapped columns.
fn read_dimensions(row: &[String], mapping: &Mapping, [length, width, height]: [Field; 3]) -> Dimensions {
    let mut dims = Dimensions::default();
    let length_col = mapping.col(length);

    if let Some(cell) = mapped_cell(row, mapping, length) {
        let tokens = numeric_tokens(cell);
        if tokens.len() >= 3 {
            dims.length = tokens[0];
            dims.width = tokens[1];
            dims.height = tokens[2];
            dims.source = label(mapping, length);
            return dims;
        }
        // "60x40" is a length of 60, never 6040.
        dims.length = tokens.first().copied().unwrap_or(0.0);
    }

    let separate = |field: Field| -> f64 {
        match mapping.col(field) {
            Some(col) if Some(col) != length_col => {
                let value = numeric_or_zero(row.get(col).map(String::as_str).unwrap_or(""));
                if value > 0.0 { value } else { 0.0 }
            }
            _ => 0.0,
        }
    };
    dims.width = separate(width);
    dims.height = separate(height);
    dims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::quote::types::FieldMapping;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_string_rows(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn sku_and_price_from_mapped_columns() {
        let mapping = Mapping::default()
            .with(Field::Sku, FieldMapping::at(1, "ITEM"))
            .with(Field::Price, FieldMapping::at(2, "PRICE"));
        let g = grid(&[&["x", "ITEM", "PRICE"], &["x", "ABC-1", "10.50"]]);

        let products = extract_products(&g, &mapping, 0);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].sku, "ABC-1");
        assert_eq!(products[0].unit_price, 10.5);
    }

    #[test]
    fn combined_carton_cell_splits_into_three() {
        let mapping = Mapping::default().with(Field::CartonLength, FieldMapping::at(0, "CARTON SIZE"));
        let p = extract_row(&row(&["119.9X50X180CM"]), &mapping, 0);
        assert_eq!(p.carton_length, 119.9);
        assert_eq!(p.carton_width, 50.0);
        assert_eq!(p.carton_height, 180.0);
        assert_eq!(p.carton_source, "CARTON SIZE");
    }

    #[test]
    fn split_carton_columns_are_read_separately() {
        let mapping = Mapping::default()
            .with(Field::CartonLength, FieldMapping::at(0, "CARTON SIZE"))
            .with(Field::CartonWidth, FieldMapping::at(1, ""))
            .with(Field::CartonHeight, FieldMapping::at(2, ""));
        let p = extract_row(&row(&["56", "10cm", "127"]), &mapping, 0);
        assert_eq!((p.carton_length, p.carton_width, p.carton_height), (56.0, 10.0, 127.0));
        assert_eq!(p.carton_source, "");
    }

    #[test]
    fn width_mapped_to_length_column_is_not_double_read() {
        let mapping = Mapping::default()
            .with(Field::CartonLength, FieldMapping::at(0, "CTN"))
            .with(Field::CartonWidth, FieldMapping::at(0, "CTN"));
        let p = extract_row(&row(&["60x40"]), &mapping, 0);
        assert_eq!(p.carton_length, 60.0);
        assert_eq!(p.carton_width, 0.0);
    }

    #[test]
    fn partial_dimension_cell_keeps_first_number_as_length() {
        let mapping = Mapping::default().with(Field::CartonLength, FieldMapping::at(0, "CTN"));
        let p = extract_row(&row(&["L60*W40"]), &mapping, 0);
        assert_eq!(p.carton_length, 60.0);
        assert_eq!((p.carton_width, p.carton_height), (0.0, 0.0));
        assert_eq!(p.carton_source, "");
    }

    #[test]
    fn trailing_full_stop_counts_as_a_dimension_token() {
        let mapping = Mapping::default().with(Field::CartonLength, FieldMapping::at(0, "CARTON SIZE"));
        let p = extract_row(&row(&["56 x 10 cm."]), &mapping, 0);
        assert_eq!((p.carton_length, p.carton_width, p.carton_height), (56.0, 10.0, 0.0));
        assert_eq!(p.carton_source, "CARTON SIZE");
    }

    #[test]
    fn negative_separate_dimensions_stay_zero() {
        let mapping = Mapping::default()
            .with(Field::CartonLength, FieldMapping::at(0, "L"))
            .with(Field::CartonWidth, FieldMapping::at(1, "W"))
            .with(Field::CartonHeight, FieldMapping::at(2, "H"));
        let p = extract_row(&row(&["56", "-5", "30"]), &mapping, 0);
        assert_eq!((p.carton_length, p.carton_width, p.carton_height), (56.0, 0.0, 30.0));
    }

    #[test]
    fn product_dimensions_are_independent_of_carton() {
        let mapping = Mapping::default()
            .with(Field::ProductLength, FieldMapping::at(0, "SIZE"))
            .with(Field::CartonLength, FieldMapping::at(1, "CARTON"));
        let p = extract_row(&row(&["30*20*10", "62X42X33"]), &mapping, 0);
        assert_eq!((p.product_length, p.product_width, p.product_height), (30.0, 20.0, 10.0));
        assert_eq!(p.product_source, "SIZE");
        assert_eq!((p.carton_length, p.carton_width, p.carton_height), (62.0, 42.0, 33.0));
    }

    #[test]
    fn pack_weights_cbm_and_cartons() {
        let mapping = Mapping::default()
            .with(Field::Pack, FieldMapping::at(0, "PACKING"))
            .with(Field::GrossWeight, FieldMapping::at(1, "G.W").with_unit("lb"))
            .with(Field::NetWeight, FieldMapping::at(2, "N.W"))
            .with(Field::SupplierCbm, FieldMapping::at(3, "CBM"))
            .with(Field::TotalCartons, FieldMapping::at(4, "CTNS"))
            .with(Field::DimsText, FieldMapping::at(5, "SIZE"));
        let p = extract_row(&row(&[" 12PCS/CTN ", "18.5", "n/a", "0.085", "40", " 60x40x30 "]), &mapping, 0);
        assert_eq!(p.pack, 12);
        assert_eq!(p.pack_text, "12PCS/CTN");
        assert_eq!(p.gross_weight, 18.5);
        assert_eq!(p.weight_unit, "lb");
        assert_eq!(p.net_weight, None);
        assert_eq!(p.supplier_cbm, Some(0.085));
        assert_eq!(p.cbm_source, "CBM");
        assert_eq!(p.total_cartons, Some(40));
        assert_eq!(p.dims_text, "60x40x30");
    }

    #[test]
    fn unparseable_defaults_keep_their_asymmetry() {
        let mapping = Mapping::default()
            .with(Field::Price, FieldMapping::at(0, "PRICE"))
            .with(Field::GrossWeight, FieldMapping::at(0, "G.W"))
            .with(Field::NetWeight, FieldMapping::at(0, "N.W"))
            .with(Field::TotalCartons, FieldMapping::at(0, "CTNS"));
        let p = extract_row(&row(&["TBD"]), &mapping, 0);
        assert_eq!(p.unit_price, 0.0);
        assert_eq!(p.gross_weight, 0.0);
        assert_eq!(p.net_weight, None);
        assert_eq!(p.total_cartons, None);
    }

    #[test]
    fn out_of_range_columns_resolve_to_defaults() {
        let mapping = Mapping::default()
            .with(Field::Sku, FieldMapping::at(40, "SKU"))
            .with(Field::Pack, FieldMapping::at(41, "PACK"))
            .with(Field::CartonLength, FieldMapping::at(42, "CTN"));
        let p = extract_row(&row(&["a", "b"]), &mapping, 0);
        assert_eq!(p.sku, "");
        assert_eq!(p.pack, 1);
        assert_eq!(p.carton_length, 0.0);
    }

    #[test]
    fn fallbacks_fill_unmapped_fields() {
        let p = extract_row(
            &row(&["", "PSP001", "Folding bamboo stool with cushion", "$12.50"]),
            &Mapping::default(),
            0,
        );
        assert_eq!(p.sku, "PSP001");
        assert_eq!(p.title, "Folding bamboo stool with cushion");
        assert_eq!(p.unit_price, 12.5);
    }

    #[test]
    fn zero_mapped_price_falls_back() {
        let mapping = Mapping::default().with(Field::Price, FieldMapping::at(0, "PRICE"));
        let p = extract_row(&row(&["-", "4.75"]), &mapping, 0);
        assert_eq!(p.unit_price, 4.75);
    }

    #[test]
    fn rows_without_signal_are_dropped_in_order() {
        let mapping = Mapping::default()
            .with(Field::Sku, FieldMapping::at(0, "SKU"))
            .with(Field::CartonLength, FieldMapping::at(1, "L"))
            .with(Field::CartonWidth, FieldMapping::at(2, "W"));
        let g = grid(&[
            &["SKU", "L", "W"],
            &["A1", "", ""],
            &["", "0", "0"],
            &["", "50", "40"],
            &["  ", " ", ""],
            &["B2", "", ""],
        ]);
        let products = extract_products(&g, &mapping, 0);
        let skus: Vec<&str> = products.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["A1", "", "B2"]);
        assert_eq!(products[1].carton_length, 50.0);
    }

    #[test]
    fn header_row_past_end_yields_nothing() {
        let g = grid(&[&["PSP001", "12.00"]]);
        assert!(extract_products(&g, &Mapping::default(), 5).is_empty());
        assert!(extract_products(&g, &Mapping::default(), usize::MAX).is_empty());
    }
}
