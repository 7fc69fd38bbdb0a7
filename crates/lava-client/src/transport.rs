//! Transports carrying packets to a scheduler master.
//!
//! The [`Transport`] trait is the seam between the session logic and the
//! bytes on the wire. [`TcpTransport`] talks to a real master; the
//! simulator crate provides an in-process implementation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::{LavaError, LavaResult};
use crate::protocol::{Packet, read_packet, write_packet};

/// One request, one reply.
#[async_trait]
pub trait Transport: Send {
    /// Send `request` and wait for the matching reply.
    ///
    /// Transport failures are reported as [`LavaError::Connection`]. A reply
    /// carrying a failure code is still `Ok`; interpreting it is up to the
    /// caller.
    async fn exchange(&mut self, request: Packet) -> LavaResult<Packet>;

    /// Drop any connection state. Called after a timeout so that a late
    /// reply cannot be mistaken for the answer to the next request.
    async fn reset(&mut self) {}

    /// Where this transport points, for logs.
    fn endpoint(&self) -> String;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn exchange(&mut self, request: Packet) -> LavaResult<Packet> {
        (**self).exchange(request).await
    }

    async fn reset(&mut self) {
        (**self).reset().await;
    }

    fn endpoint(&self) -> String {
        (**self).endpoint()
    }
}

/// Transport over a TCP connection, opened on first use.
#[derive(Debug)]
pub struct TcpTransport {
    addr: String,
    max_packet: u32,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(addr: impl Into<String>, max_packet: u32, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            max_packet,
            connect_timeout,
            stream: None,
        }
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn connect(&mut self) -> LavaResult<&mut TcpStream> {
        if self.stream.is_none() {
            debug!(addr = %self.addr, "Connecting to master");
            let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
                .await
                .map_err(|_| {
                    LavaError::Connection(format!(
                        "connect to {} timed out after {:?}",
                        self.addr, self.connect_timeout
                    ))
                })?
                .map_err(|e| LavaError::Connection(format!("connect to {}: {e}", self.addr)))?;
            stream.set_nodelay(true).ok();
            self.stream = Some(stream);
        }
        self.stream
            .as_mut()
            .ok_or_else(|| LavaError::Connection("no connection".into()))
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn exchange(&mut self, request: Packet) -> LavaResult<Packet> {
        let max_packet = self.max_packet;
        let addr = self.addr.clone();
        let stream = self.connect().await?;

        let outcome: std::io::Result<Option<Packet>> = async {
            write_packet(stream, &request).await?;
            read_packet(stream, max_packet).await
        }
        .await;

        match outcome {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => {
                warn!(addr = %addr, "Master closed the connection");
                self.stream = None;
                Err(LavaError::Connection(format!("{addr} closed the connection")))
            }
            Err(e) => {
                warn!(addr = %addr, error = %e, "Transport failure");
                self.stream = None;
                Err(LavaError::Connection(format!("{addr}: {e}")))
            }
        }
    }

    async fn reset(&mut self) {
        if self.stream.take().is_some() {
            debug!(addr = %self.addr, "Dropped connection");
        }
    }

    fn endpoint(&self) -> String {
        self.addr.clone()
    }
}
