//! Outlet sinks.
//!
//! An outlet receives one ordered value list per decoded record (address
//! first) and forwards it downstream. Calls are fire-and-forget and must not
//! block the connection task, so every sink uses a non-blocking write.

use crate::config::OutletSpec;
use crate::error::{OutletError, Result};
use crate::osc;
use decoder::OutletValue;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Downstream sink for decoded records.
pub trait Outlet: Send + Sync + 'static {
    /// Forward one value list. The first value is the address.
    fn emit(&self, values: Vec<OutletValue>) -> std::result::Result<(), OutletError>;

    /// Human-readable description for startup logs.
    fn describe(&self) -> String;
}

/// Outlet backed by a bounded in-process channel.
///
/// Uses `try_send`, so a full channel drops the values instead of waiting.
#[derive(Debug, Clone)]
pub struct ChannelOutlet {
    tx: mpsc::Sender<Vec<OutletValue>>,
}

impl ChannelOutlet {
    pub fn new(tx: mpsc::Sender<Vec<OutletValue>>) -> Self {
        Self { tx }
    }

    /// Create an outlet together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<OutletValue>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl Outlet for ChannelOutlet {
    fn emit(&self, values: Vec<OutletValue>) -> std::result::Result<(), OutletError> {
        self.tx.try_send(values).map_err(OutletError::from)
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// Lines buffered between the stdout outlet and its writer task.
pub const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Outlet printing one compact JSON array per line.
///
/// `emit` serializes and hands the line to a bounded channel; a dedicated
/// task owns the writer. A stalled stdout fills the channel and lines are
/// dropped with `ChannelFull`.
#[derive(Debug, Clone)]
pub struct StdoutOutlet {
    tx: mpsc::Sender<String>,
}

impl StdoutOutlet {
    /// Spawn a writer task on the process stdout.
    pub fn spawn(capacity: usize) -> Self {
        Self::with_writer(tokio::io::stdout(), capacity)
    }

    /// Spawn a writer task on an arbitrary async writer.
    pub fn with_writer<W>(writer: W, capacity: usize) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(write_lines(writer, rx));
        Self { tx }
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        let written = match writer.write_all(line.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Line writer stopped: {}", e);
            return;
        }
    }
    debug!("Line writer finished");
}

impl Outlet for StdoutOutlet {
    fn emit(&self, values: Vec<OutletValue>) -> std::result::Result<(), OutletError> {
        let line =
            serde_json::to_string(&values).map_err(|e| OutletError::Encode(e.to_string()))?;
        self.tx.try_send(line).map_err(OutletError::from)
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// Outlet sending each value list as an OSC message over UDP.
#[derive(Debug)]
pub struct UdpOscOutlet {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpOscOutlet {
    /// Bind an ephemeral local socket and connect it to `target`.
    pub async fn connect(target: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        Ok(Self { socket, target })
    }
}

impl Outlet for UdpOscOutlet {
    fn emit(&self, values: Vec<OutletValue>) -> std::result::Result<(), OutletError> {
        let packet = osc::encode_message(&values)?;
        self.socket.try_send(&packet)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("udp://{} (OSC)", self.target)
    }
}

/// Build the outlet selected by configuration.
pub async fn build_outlet(spec: &OutletSpec) -> Result<Arc<dyn Outlet>> {
    let outlet: Arc<dyn Outlet> = match spec {
        OutletSpec::Stdout => Arc::new(StdoutOutlet::spawn(LINE_CHANNEL_CAPACITY)),
        OutletSpec::Udp(target) => Arc::new(UdpOscOutlet::connect(*target).await?),
    };
    info!("Outlet ready: {}", outlet.describe());
    Ok(outlet)
}
