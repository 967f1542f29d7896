use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::grid::Grid;
use super::mapping::normalize_mapping;
use super::QuoteError;

/// Logical fields the mapping collaborator is asked to locate.
///
/// The set is closed: every mapping and output structure is keyed by exactly
/// these fields, in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    #[serde(rename = "sku")]
    Sku,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "productLength")]
    ProductLength,
    #[serde(rename = "productWidth")]
    ProductWidth,
    #[serde(rename = "productHeight")]
    ProductHeight,
    #[serde(rename = "cartonLength")]
    CartonLength,
    #[serde(rename = "cartonWidth")]
    CartonWidth,
    #[serde(rename = "cartonHeight")]
    CartonHeight,
    #[serde(rename = "dims_text")]
    DimsText,
    #[serde(rename = "pack")]
    Pack,
    #[serde(rename = "totalCartons")]
    TotalCartons,
    #[serde(rename = "grossWeight")]
    GrossWeight,
    #[serde(rename = "netWeight")]
    NetWeight,
    #[serde(rename = "supplierCBM")]
    SupplierCbm,
}

impl Field {
    pub const COUNT: usize = 15;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Sku,
        Field::Title,
        Field::Price,
        Field::ProductLength,
        Field::ProductWidth,
        Field::ProductHeight,
        Field::CartonLength,
        Field::CartonWidth,
        Field::CartonHeight,
        Field::DimsText,
        Field::Pack,
        Field::TotalCartons,
        Field::GrossWeight,
        Field::NetWeight,
        Field::SupplierCbm,
    ];

    /// Wire key used in mapping JSON.
    pub fn key(self) -> &'static str {
        match self {
            Field::Sku => "sku",
            Field::Title => "title",
            Field::Price => "price",
            Field::ProductLength => "productLength",
            Field::ProductWidth => "productWidth",
            Field::ProductHeight => "productHeight",
            Field::CartonLength => "cartonLength",
            Field::CartonWidth => "cartonWidth",
            Field::CartonHeight => "cartonHeight",
            Field::DimsText => "dims_text",
            Field::Pack => "pack",
            Field::TotalCartons => "totalCartons",
            Field::GrossWeight => "grossWeight",
            Field::NetWeight => "netWeight",
            Field::SupplierCbm => "supplierCBM",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Where one field lives in the grid. `col == None` means "not located".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub col: Option<usize>,
    pub name: Option<String>,
    pub unit: Option<String>,
}

impl FieldMapping {
    pub fn at(col: usize, name: &str) -> Self {
        Self {
            col: Some(col),
            name: Some(name.to_string()),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    pub fn is_located(&self) -> bool {
        self.col.is_some()
    }
}

/// Total function from [`Field`] to [`FieldMapping`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: [FieldMapping; Field::COUNT],
}

impl Mapping {
    pub fn get(&self, field: Field) -> &FieldMapping {
        &self.entries[field.index()]
    }

    pub fn set(&mut self, field: Field, entry: FieldMapping) {
        self.entries[field.index()] = entry;
    }

    /// Builder-style `set`, handy for fixtures.
    pub fn with(mut self, field: Field, entry: FieldMapping) -> Self {
        self.set(field, entry);
        self
    }

    pub fn col(&self, field: Field) -> Option<usize> {
        self.get(field).col
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldMapping)> {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    pub fn located_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_located()).count()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Field::COUNT))?;
        for (field, entry) in self.iter() {
            map.serialize_entry(field.key(), entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(normalize_mapping(Some(&value)))
    }
}

/// The mapping collaborator's reply after repair and normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResponse {
    pub header_row: i64,
    pub mapping: Mapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One structured product line extracted from a data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub sku: String,
    pub title: String,
    pub unit_price: f64,
    // Product dimensions (reference only)
    pub product_length: f64,
    pub product_width: f64,
    pub product_height: f64,
    pub product_source: String,
    // Carton dimensions (freight)
    pub carton_length: f64,
    pub carton_width: f64,
    pub carton_height: f64,
    pub carton_source: String,
    pub pack: u32,
    #[serde(rename = "pack_text")]
    pub pack_text: String,
    pub total_cartons: Option<u32>,
    pub gross_weight: f64,
    pub net_weight: Option<f64>,
    pub weight_unit: String,
    #[serde(rename = "supplierCBM")]
    pub supplier_cbm: Option<f64>,
    pub cbm_source: String,
    #[serde(rename = "dims_text")]
    pub dims_text: String,
}

impl Default for ProductRecord {
    fn default() -> Self {
        Self {
            sku: String::new(),
            title: String::new(),
            unit_price: 0.0,
            product_length: 0.0,
            product_width: 0.0,
            product_height: 0.0,
            product_source: String::new(),
            carton_length: 0.0,
            carton_width: 0.0,
            carton_height: 0.0,
            carton_source: String::new(),
            pack: 1,
            pack_text: String::new(),
            total_cartons: None,
            gross_weight: 0.0,
            net_weight: None,
            weight_unit: "kg".to_string(),
            supplier_cbm: None,
            cbm_source: String::new(),
            dims_text: String::new(),
        }
    }
}

/// A normalized sheet plus the metadata echoed back to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub sheet_name: String,
    pub grid: Grid,
}

impl SheetData {
    pub fn new(sheet_name: &str, grid: Grid) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            grid,
        }
    }

    pub fn headers(&self) -> Vec<String> {
        self.grid.rows().first().cloned().unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.grid.len()
    }

    pub fn col_count(&self) -> usize {
        self.grid.col_count()
    }
}

/// Raw worksheet produced by a [`SpreadsheetDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// LLM client abstraction (allows mocking).
pub trait LlmClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, QuoteError>;
}

impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, QuoteError> {
        (**self).generate(model, prompt, system)
    }
}

/// Turns a workbook blob into a grid of string cells.
pub trait SpreadsheetDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedSheet, QuoteError>;
}
