//! Inbound payload parsing
//!
//! Wire format: `r1,r2,...,rN,warehouse_id,device_id` (UTF-8, comma
//! separated, N >= 1). Whitespace around fields is ignored.

use crate::error::{IngestError, Result};
use crate::types::{DeviceKey, Reading};

/// A parsed inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub key: DeviceKey,
    pub reading: Reading,
}

/// Parse a raw payload into a device key and a reading
pub fn parse_payload(payload: &[u8]) -> Result<ParsedMessage> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| IngestError::MalformedMessage(format!("payload is not UTF-8: {}", e)))?;

    let fields: Vec<&str> = text.trim().split(',').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(IngestError::MalformedMessage(format!(
            "expected at least one reading followed by warehouse and device ids, got {} field(s)",
            fields.len()
        )));
    }

    let (values, ids) = fields.split_at(fields.len() - 2);
    let (warehouse_id, device_id) = (ids[0], ids[1]);
    if warehouse_id.is_empty() || device_id.is_empty() {
        return Err(IngestError::MalformedMessage(
            "warehouse id and device id must be non-empty".to_string(),
        ));
    }

    let values = values
        .iter()
        .enumerate()
        .map(|(i, field)| {
            field.parse::<f64>().map_err(|_| {
                IngestError::MalformedMessage(format!("reading {} is not numeric: {:?}", i, field))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(ParsedMessage {
        key: DeviceKey::new(warehouse_id, device_id),
        reading: Reading::new(values),
    })
}
