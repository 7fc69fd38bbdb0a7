//! TCP front end for the simulated master.

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lava_client::protocol::{DEFAULT_MAX_PACKET, read_packet, write_packet};

use crate::master::{SharedCluster, SimMaster};

/// Accepts client connections and serves each one with its own
/// [`SimMaster`] over a shared cluster.
#[derive(Debug)]
pub struct SimServer {
    listener: TcpListener,
    cluster: SharedCluster,
    max_packet: u32,
}

impl SimServer {
    /// Bind to `addr`. Use port 0 to pick a free port.
    pub async fn bind(addr: &str, cluster: SharedCluster) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            cluster,
            max_packet: DEFAULT_MAX_PACKET,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped or accepting fails.
    pub async fn serve(self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "Simulated master listening");
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let master = SimMaster::new(self.cluster.clone());
            let max_packet = self.max_packet;
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, master, max_packet).await {
                    warn!(%peer, error = %e, "Connection closed with error");
                }
            });
        }
    }

    /// Run [`serve`](Self::serve) on a background task.
    pub fn spawn(self) -> JoinHandle<io::Result<()>> {
        tokio::spawn(self.serve())
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    mut master: SimMaster,
    max_packet: u32,
) -> io::Result<()> {
    stream.set_nodelay(true)?;
    while let Some(request) = read_packet(&mut stream, max_packet).await? {
        let reply = master.handle(request).await;
        write_packet(&mut stream, &reply).await?;
    }
    debug!("Client disconnected");
    Ok(())
}
