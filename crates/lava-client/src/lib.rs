//! Lava batch scheduler client
//!
//! This crate talks to the master daemon of an openlava-style batch
//! scheduler and reads the logs it writes.
//!
//! # Overview
//!
//! - A [`Session`] owns one connection to the master. It answers cluster
//!   queries (cluster and master names, hosts, queues, users), enumerates
//!   jobs through a cursor, and submits jobs.
//! - Every operation leaves its outcome in the session's last-result
//!   register ([`Session::last_result`]) as well as returning a
//!   [`LavaResult`].
//! - [`EventLogReader`] parses the event and accounting logs line by line,
//!   skipping lines it cannot parse.
//! - The [`Transport`] trait is the seam between sessions and the wire.
//!   [`TcpTransport`] speaks to a real master; the simulator adapter
//!   implements it in-process.
//!
//! # Example: Listing Pending Jobs
//!
//! ```ignore
//! use lava_client::{ClientConfig, JobFilter, JobState, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load(None)?;
//!     let mut session = Session::connect(config).await?;
//!
//!     for job in session.jobs(&JobFilter::by_user("alice")).await? {
//!         if job.state() == JobState::Pend {
//!             println!("{} {}", job.job_id, job.submit.command);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Example: Submitting a Job
//!
//! ```ignore
//! use lava_client::{Session, Submit};
//!
//! let request = Submit::new("hostname").with_queue("normal").with_processors(1, 1);
//! let reply = session.submit(&request).await?;
//! match reply.job_id {
//!     Some(id) => println!("Job <{id}> is submitted to queue <{}>.", reply.queue),
//!     None => eprintln!("{}", reply.rejection.unwrap().message),
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod cursor;
pub mod error;
pub mod eventlog;
pub mod protocol;
pub mod reasons;
pub mod records;
pub mod registry;
pub mod session;
pub mod submission;
pub mod transport;
pub mod xdr;

pub use config::{ClientConfig, find_installation};
pub use cursor::CursorState;
pub use error::{ErrorKind, LavaError, LavaResult};
pub use eventlog::{EventBody, EventLogReader, EventRecord, EventType, MalformedLine};
pub use protocol::{OpCode, Packet};
pub use records::{
    HostInfo, HostInfoEnt, HostState, HostStatus, JobFilter, JobInfoEnt, JobState, JobStatus,
    LoadIndexLog, LsInfo, QueueInfoEnt, Submit, SubmitField, SubmitRejection, SubmitReply,
    UserInfoEnt, format_job_id,
};
pub use registry::LastResult;
pub use session::Session;
pub use transport::{TcpTransport, Transport};
