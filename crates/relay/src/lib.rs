//! WebSocket relay from landmark producers to an outlet sink.
//!
//! This service:
//! - Accepts WebSocket connections from a tracking producer
//! - Decodes each text frame under the variant's payload convention
//! - Forwards every decoded record, address first, to the outlet
//!
//! ## Architecture
//!
//! ```text
//! producer (ws://host:port/)
//!         ↓
//! handle_socket (one task per connection)
//!         ↓
//! Dispatcher → decoder::Decoder
//!         ↓
//! Outlet (stdout JSON lines | UDP OSC | channel)
//! ```
//!
//! Connections share only the dispatcher and the outlet. A bad frame is
//! logged and dropped; it never closes the connection or stops the server.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod osc;
pub mod outlet;
pub mod ws_server;

pub use config::{OutletSpec, RelayConfig, TrackingVariant, DEFAULT_VARIANT};
pub use connection::{ConnectionId, ConnectionRegistry, ConnectionState};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{OutletError, RelayError, Result};
pub use outlet::{build_outlet, ChannelOutlet, Outlet, StdoutOutlet, UdpOscOutlet};
pub use ws_server::{create_router, serve, AppState};
