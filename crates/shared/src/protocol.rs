use serde_json::Value;

use crate::{domain::Truck, error::DecodeError};

/// Name of the only streaming endpoint the feed serves.
pub const TRUCKS_ENDPOINT: &str = "trucks";

/// Decodes one snapshot frame: a JSON array holding every truck, in display
/// order.
pub fn decode_truck_snapshot(text: &str) -> Result<Vec<Truck>, DecodeError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(DecodeError::NotAnArray {
            found: json_kind(&value),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let truck: Truck = serde_json::from_value(item)
                .map_err(|source| DecodeError::InvalidTruck { index, source })?;
            if truck.id.as_str().is_empty() {
                return Err(DecodeError::EmptyId { index });
            }
            Ok(truck)
        })
        .collect()
}

pub fn encode_truck_snapshot(trucks: &[Truck]) -> serde_json::Result<String> {
    serde_json::to_string(trucks)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
