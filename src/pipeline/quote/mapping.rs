use serde_json::Value;

use super::types::{Field, FieldMapping, Mapping, MappingResponse};

/// Coerce a raw `mapping` object into a total [`Mapping`].
///
/// Every field is present afterwards; missing or malformed entries become
/// "not located", and attributes other than `col`/`name`/`unit` are dropped.
/// Never fails.
pub fn normalize_mapping(raw: Option<&Value>) -> Mapping {
    let mut mapping = Mapping::default();
    let Some(obj) = raw.and_then(Value::as_object) else {
        return mapping;
    };

    for field in Field::ALL {
        if let Some(entry) = obj.get(field.key()) {
            mapping.set(field, normalize_entry(entry));
        }
    }
    mapping
}

fn normalize_entry(entry: &Value) -> FieldMapping {
    let Some(obj) = entry.as_object() else {
        return FieldMapping::default();
    };
    FieldMapping {
        col: obj.get("col").and_then(coerce_col),
        name: obj.get("name").and_then(coerce_label),
        unit: obj.get("unit").and_then(coerce_label),
    }
}

/// Column indices must be non-negative integers; hallucinated shapes are dropped.
fn coerce_col(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                usize::try_from(u).ok()
            } else {
                let f = n.as_f64()?;
                (f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as usize)
            }
        }
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}

fn coerce_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret the top-level reply object: header row, mapping and passthrough notes.
pub fn interpret_mapping_response(raw: &Value) -> MappingResponse {
    let header_row = match raw.get("headerRow") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };

    MappingResponse {
        header_row,
        mapping: normalize_mapping(raw.get("mapping")),
        confidence: raw.get("confidence").and_then(Value::as_f64),
        notes: raw
            .get("notes")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}
