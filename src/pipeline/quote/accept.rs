use super::types::ProductRecord;

/// Why a row was kept, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Sku,
    Price,
    Dimensions,
}

/// Decide whether a row denotes a real product.
///
/// A row is kept when it has a SKU, a positive unit price, or usable
/// dimensions (length and width of either the product or the carton).
pub fn accept_product(product: &ProductRecord) -> Option<Acceptance> {
    if !product.sku.is_empty() {
        Some(Acceptance::Sku)
    } else if product.unit_price > 0.0 {
        Some(Acceptance::Price)
    } else if has_usable_dimensions(product) {
        Some(Acceptance::Dimensions)
    } else {
        None
    }
}

pub fn has_usable_dimensions(product: &ProductRecord) -> bool {
    let product_dims = product.product_length > 0.0 && product.product_width > 0.0;
    let carton_dims = product.carton_length > 0.0 && product.carton_width > 0.0;
    product_dims || carton_dims
}
