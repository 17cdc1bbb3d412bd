//! Payload conventions a producer may use to encode a message.
//!
//! The convention is fixed per deployment; a message is never sniffed to
//! pick one.

/// Landmarks reported per hand.
pub const HAND_LANDMARKS: usize = 21;

/// Coordinates per landmark (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;

/// Values following each label in a hand block.
pub const HAND_BLOCK_VALUES: usize = HAND_LANDMARKS * COORDS_PER_LANDMARK;

/// Largest `K` a labeled convention may be configured with.
pub const MAX_BLOCK_VALUES: usize = 1 << 16;

/// Configuration for the flat vector convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatConfig {
    /// Static address every record is sent under (e.g. `/facemesh`).
    /// Must not be empty; an empty address fails every decode.
    pub address: String,
    /// Reject scalar payloads instead of forwarding them as a single argument.
    pub require_array: bool,
}

/// Configuration for the labeled multi-record convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledConfig {
    /// Path prefix for synthesized addresses (e.g. `/hand`).
    pub prefix: String,
    /// Number of values after each label (`K`).
    pub block_values: usize,
}

impl LabeledConfig {
    /// Tokens consumed per record: the label plus `K` values.
    ///
    /// `None` when `K` is zero or the block length overflows.
    pub fn block_len(&self) -> Option<usize> {
        match self.block_values {
            0 => None,
            k => k.checked_add(1),
        }
    }
}

/// Structural shape of an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadConvention {
    /// `[v0, v1, ...]` sent under one static address.
    Flat(FlatConfig),
    /// `[label, v0..vK, label, v0..vK, ...]`, one record per block.
    Labeled(LabeledConfig),
    /// `[address, a0, a1, ...]`.
    AddressedVector,
    /// `{"address": ..., "args": [...]}`.
    AddressedObject,
}

impl PayloadConvention {
    /// Flat vector under `address`, accepting scalars too.
    pub fn flat(address: impl Into<String>) -> Self {
        PayloadConvention::Flat(FlatConfig {
            address: address.into(),
            require_array: false,
        })
    }

    /// Flat vector under `address` that only accepts arrays.
    pub fn flat_strict(address: impl Into<String>) -> Self {
        PayloadConvention::Flat(FlatConfig {
            address: address.into(),
            require_array: true,
        })
    }

    /// Labeled blocks of `block_values` values each.
    pub fn labeled(prefix: impl Into<String>, block_values: usize) -> Self {
        PayloadConvention::Labeled(LabeledConfig {
            prefix: prefix.into(),
            block_values,
        })
    }

    /// Two-hand tracking layout: `/hand/<i>/<left|right>` with 21×3 values.
    pub fn hands() -> Self {
        Self::labeled("/hand", HAND_BLOCK_VALUES)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PayloadConvention::Flat(_) => "flat",
            PayloadConvention::Labeled(_) => "labeled",
            PayloadConvention::AddressedVector => "addressed_vector",
            PayloadConvention::AddressedObject => "addressed_object",
        }
    }
}
