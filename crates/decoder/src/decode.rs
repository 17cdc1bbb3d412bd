//! Raw message decoding.

use crate::convention::{FlatConfig, LabeledConfig, PayloadConvention};
use crate::error::{DecodeError, Result};
use crate::schema::{DecodedRecord, OutletValue};
use serde_json::Value;
use tracing::{debug, warn};

/// Turns raw text frames into decoded records for one configured convention.
///
/// Decoding is pure: it never touches the outlet and keeps no state between
/// calls. The record index of the labeled convention restarts at zero for
/// every message.
#[derive(Debug, Clone)]
pub struct Decoder {
    convention: PayloadConvention,
}

impl Decoder {
    pub fn new(convention: PayloadConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> &PayloadConvention {
        &self.convention
    }

    /// Parse a raw frame and decode it.
    ///
    /// Returns an empty vector when the message is well formed but carries
    /// no complete record (e.g. a labeled vector shorter than one block).
    pub fn decode(&self, raw: &str) -> Result<Vec<DecodedRecord>> {
        let value: Value = serde_json::from_str(raw)?;
        self.decode_value(value)
    }

    /// Decode an already parsed JSON value.
    pub fn decode_value(&self, value: Value) -> Result<Vec<DecodedRecord>> {
        match &self.convention {
            PayloadConvention::Flat(config) => decode_flat(config, value),
            PayloadConvention::Labeled(config) => decode_labeled(config, value),
            PayloadConvention::AddressedVector => decode_addressed_vector(value),
            PayloadConvention::AddressedObject => decode_addressed_object(value),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_flat(config: &FlatConfig, value: Value) -> Result<Vec<DecodedRecord>> {
    if config.address.is_empty() {
        return Err(DecodeError::shape("flat vector address is empty"));
    }

    let args = match value {
        Value::Array(items) => items.into_iter().map(OutletValue::from).collect(),
        other @ (Value::Object(_) | Value::Null) => {
            return Err(DecodeError::shape(format!(
                "flat vector expects an array, got {}",
                json_type(&other)
            )));
        }
        scalar if config.require_array => {
            return Err(DecodeError::shape(format!(
                "flat vector expects an array, got {}",
                json_type(&scalar)
            )));
        }
        scalar => vec![OutletValue::from(scalar)],
    };

    Ok(vec![DecodedRecord::new(config.address.clone(), args)])
}

fn decode_labeled(config: &LabeledConfig, value: Value) -> Result<Vec<DecodedRecord>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::shape(format!(
                "labeled vector expects an array, got {}",
                json_type(&other)
            )));
        }
    };
    let block_len = config.block_len().ok_or_else(|| {
        DecodeError::shape(format!(
            "labeled vector block size {} is out of range",
            config.block_values
        ))
    })?;
    let complete = items.len() / block_len;
    let trailing = items.len() % block_len;
    if trailing > 0 {
        debug!(
            trailing,
            block_len, "Dropping partial trailing block from labeled vector"
        );
    }

    let prefix = config.prefix.trim_end_matches('/');
    let mut records = Vec::with_capacity(complete);
    let mut tokens = items.into_iter();

    for index in 0..complete {
        let label = match tokens.next() {
            Some(Value::String(label)) => label,
            Some(other) => {
                warn!(
                    "Block {} has a {} label, dropping the rest of the message",
                    index,
                    json_type(&other)
                );
                break;
            }
            None => break,
        };

        let args: Vec<OutletValue> = tokens
            .by_ref()
            .take(config.block_values)
            .map(OutletValue::from)
            .collect();

        records.push(DecodedRecord::new(
            format!("{}/{}/{}", prefix, index, label.to_lowercase()),
            args,
        ));
    }

    Ok(records)
}

fn decode_addressed_vector(value: Value) -> Result<Vec<DecodedRecord>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(DecodeError::shape(format!(
                "addressed vector expects an array, got {}",
                json_type(&other)
            )));
        }
    };
    if items.len() < 2 {
        return Err(DecodeError::shape(format!(
            "addressed vector needs an address and at least one argument, got {} element(s)",
            items.len()
        )));
    }

    let mut tokens = items.into_iter();
    let address = match tokens.next() {
        Some(Value::String(address)) if !address.is_empty() => address,
        _ => {
            return Err(DecodeError::shape(
                "addressed vector must start with a non-empty string address",
            ));
        }
    };

    Ok(vec![DecodedRecord::new(
        address,
        tokens.map(OutletValue::from).collect(),
    )])
}

fn decode_addressed_object(value: Value) -> Result<Vec<DecodedRecord>> {
    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(DecodeError::shape(format!(
                "addressed object expects an object, got {}",
                json_type(&other)
            )));
        }
    };

    let address = match fields.remove("address") {
        Some(Value::String(address)) if !address.is_empty() => address,
        _ => {
            return Err(DecodeError::shape(
                "addressed object needs a non-empty string `address`",
            ));
        }
    };
    let args = match fields.remove("args") {
        Some(Value::Array(args)) => args,
        _ => return Err(DecodeError::shape("addressed object needs an array `args`")),
    };

    Ok(vec![DecodedRecord::new(
        address,
        args.into_iter().map(OutletValue::from).collect(),
    )])
}
