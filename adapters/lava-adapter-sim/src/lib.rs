//! Lava Simulated Scheduler Master
//!
//! An in-process stand-in for the scheduler master daemon. It answers the
//! same requests as a real master, so a [`Session`](lava_client::Session)
//! can run against it either directly, with [`SimMaster`] as the
//! transport, or over TCP through [`SimServer`].
//!
//! # Features
//!
//! - **Seeded cluster**: three hosts, five queues and a few jobs in
//!   different states ([`SimCluster::seeded`])
//! - **First-fit admission**: submitted jobs start on the first candidate
//!   host with enough free slots, otherwise they pend with a reason
//! - **Per-connection cursors**: each connection enumerates its own
//!   snapshot of the job table
//! - **Fault injection**: offline masters and slow replies ([`Faults`])
//!
//! # Example
//!
//! ```ignore
//! use lava_adapter_sim::SimMaster;
//! use lava_client::{ClientConfig, JobFilter, Session, Submit};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = Session::init(SimMaster::seeded(), ClientConfig::default()).await?;
//!
//!     let reply = session.submit(&Submit::new("hostname")).await?;
//!     println!("Submitted job {:?} to {}", reply.job_id, reply.queue);
//!
//!     for job in session.jobs(&JobFilter::by_user("alice")).await? {
//!         println!("{} {}", job.job_id, job.state());
//!     }
//!     Ok(())
//! }
//! ```

mod cluster;
mod master;
mod server;

pub use cluster::{Refusal, SimCluster};
pub use master::{Faults, SharedCluster, SimMaster};
pub use server::SimServer;

use std::sync::Arc;

use tokio::sync::Mutex;

/// Wrap a cluster for sharing between connections.
pub fn shared(cluster: SimCluster) -> SharedCluster {
    Arc::new(Mutex::new(cluster))
}
