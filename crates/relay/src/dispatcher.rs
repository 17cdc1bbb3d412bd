//! Dispatcher: decoded records → outlet.
//!
//! Each record becomes one outlet call, address first, in decode order.
//! Every failure ends here: it is logged, counted and swallowed, so the
//! connection that delivered the frame keeps running.

use crate::outlet::Outlet;
use decoder::{DecodeError, Decoder};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

/// What happened to one raw message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Decoded into `decoded` records, `forwarded` of which reached the outlet.
    Delivered { decoded: usize, forwarded: usize },
    /// Not valid JSON.
    Malformed,
    /// Valid JSON in the wrong shape for the configured convention.
    ShapeMismatch,
}

/// Decodes raw frames and forwards the records to an outlet.
pub struct Dispatcher {
    decoder: Decoder,
    outlet: Arc<dyn Outlet>,
}

impl Dispatcher {
    pub fn new(decoder: Decoder, outlet: Arc<dyn Outlet>) -> Self {
        Self { decoder, outlet }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Decode one raw frame and forward every record.
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        counter!("relay_messages_received_total").increment(1);

        let records = match self.decoder.decode(raw) {
            Ok(records) => records,
            Err(e) => {
                counter!("relay_decode_errors_total", "kind" => e.kind()).increment(1);
                return match e {
                    DecodeError::MalformedPayload(err) => {
                        warn!("Error parsing message: {}", err);
                        DispatchOutcome::Malformed
                    }
                    DecodeError::ShapeMismatch(reason) => {
                        debug!("Dropping message: {}", reason);
                        DispatchOutcome::ShapeMismatch
                    }
                };
            }
        };

        let decoded = records.len();
        let mut forwarded = 0;
        for record in records {
            let address = record.address.clone();
            match self.outlet.emit(record.into_outlet_values()) {
                Ok(()) => forwarded += 1,
                Err(e) => {
                    counter!("relay_outlet_errors_total").increment(1);
                    warn!("Outlet dropped record {}: {}", address, e);
                }
            }
        }

        counter!("relay_records_dispatched_total").increment(forwarded as u64);
        DispatchOutcome::Delivered { decoded, forwarded }
    }
}
