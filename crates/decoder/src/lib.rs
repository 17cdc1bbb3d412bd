//! Decoding of landmark payloads into address-tagged records.
//!
//! A producer (typically a browser vision pipeline) sends one JSON text frame
//! per tracking update. Each deployment is configured with a single
//! [`PayloadConvention`] that describes how those frames are laid out, and the
//! [`Decoder`] turns every frame into zero or more [`DecodedRecord`]s.
//!
//! # Architecture
//!
//! ```text
//! Raw frame --> serde_json::Value --> PayloadConvention --> Vec<DecodedRecord>
//!                (MalformedPayload)     (ShapeMismatch)
//! ```
//!
//! # Conventions
//!
//! | convention          | shape                                  | records |
//! |---------------------|----------------------------------------|---------|
//! | `Flat`              | `[v0, v1, ...]`                        | 1, static address |
//! | `Labeled`           | `[label, v0..vK, label, v0..vK, ...]`  | 1 per block, `prefix/i/label` |
//! | `AddressedVector`   | `[address, a0, a1, ...]`               | 1 |
//! | `AddressedObject`   | `{"address": ..., "args": [...]}`      | 1 |
//!
//! # Usage
//!
//! ```
//! use decoder::{Decoder, PayloadConvention};
//!
//! let decoder = Decoder::new(PayloadConvention::AddressedObject);
//! let records = decoder.decode(r#"{"address":"/pose","args":[1,2,3]}"#).unwrap();
//! assert_eq!(records[0].address, "/pose");
//! ```

pub mod convention;
pub mod decode;
pub mod error;
pub mod schema;

pub use convention::{FlatConfig, LabeledConfig, PayloadConvention, HAND_BLOCK_VALUES, MAX_BLOCK_VALUES};
pub use decode::Decoder;
pub use error::{DecodeError, Result};
pub use schema::{DecodedRecord, OutletValue};
