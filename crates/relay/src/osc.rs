//! OSC 1.0 message encoding.
//!
//! Layout of an encoded message:
//! - Address pattern: NUL-terminated string, padded to a multiple of 4 bytes
//! - Type tag string: `,` followed by one tag per argument, padded the same way
//! - Arguments: big-endian, each a multiple of 4 bytes
//!
//! Tags used: `i` (int32), `h` (int64), `f` (float32), `s` (string),
//! `T`/`F` (booleans) and `N` (nil). Booleans and nil carry no payload.
//! Nested JSON values are sent as their compact JSON text.

use crate::error::OutletError;
use bytes::{BufMut, Bytes, BytesMut};
use decoder::OutletValue;

/// Encode an outlet value list (address first) as one OSC message.
pub fn encode_message(values: &[OutletValue]) -> Result<Bytes, OutletError> {
    let (address, args) = values
        .split_first()
        .ok_or_else(|| OutletError::Encode("empty value list".to_string()))?;
    let address = address
        .as_str()
        .ok_or_else(|| OutletError::Encode("first value must be a string address".to_string()))?;

    let mut buf = BytesMut::with_capacity(padded_len(address.len()) + 8 + args.len() * 4);
    put_padded_str(&mut buf, address)?;

    let mut tags = String::with_capacity(args.len() + 1);
    tags.push(',');
    tags.extend(args.iter().map(type_tag));
    put_padded_str(&mut buf, &tags)?;

    for arg in args {
        match arg {
            OutletValue::Int(v) => match i32::try_from(*v) {
                Ok(v) => buf.put_i32(v),
                Err(_) => buf.put_i64(*v),
            },
            OutletValue::Float(v) => buf.put_f32(*v as f32),
            OutletValue::Str(s) => put_padded_str(&mut buf, s)?,
            OutletValue::Raw(v) => put_padded_str(&mut buf, &v.to_string())?,
            OutletValue::Bool(_) | OutletValue::Nil => {}
        }
    }

    Ok(buf.freeze())
}

fn type_tag(value: &OutletValue) -> char {
    match value {
        OutletValue::Int(v) if i32::try_from(*v).is_ok() => 'i',
        OutletValue::Int(_) => 'h',
        OutletValue::Float(_) => 'f',
        OutletValue::Str(_) | OutletValue::Raw(_) => 's',
        OutletValue::Bool(true) => 'T',
        OutletValue::Bool(false) => 'F',
        OutletValue::Nil => 'N',
    }
}

/// Length of a NUL-terminated string rounded up to 4 bytes.
#[inline]
fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

fn put_padded_str(buf: &mut BytesMut, s: &str) -> Result<(), OutletError> {
    if s.as_bytes().contains(&0) {
        return Err(OutletError::Encode(format!(
            "string {:?} contains a NUL byte",
            s
        )));
    }
    buf.put_slice(s.as_bytes());
    buf.put_bytes(0, padded_len(s.len()) - s.len());
    Ok(())
}
