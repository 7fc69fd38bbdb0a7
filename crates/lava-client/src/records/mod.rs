//! Structured records exchanged with the master.
//!
//! Every record implements [`XdrEncode`](crate::xdr::XdrEncode) and
//! [`XdrDecode`](crate::xdr::XdrDecode). Decoding enforces the record
//! invariants: count fields equal their array lengths, resource limits and
//! rusage values are `>= -1`, enumerated fields hold known values, and
//! name fields are non-empty. A record that violates any of them is
//! rejected as a whole.

pub mod host;
pub mod job;
pub mod load;
pub mod queue;
pub mod resource;
pub mod submit;
pub mod user;

pub use host::{HostInfo, HostInfoEnt, HostState, HostStatus, host_status};
pub use job::{
    JobFilter, JobInfoEnt, JobState, JobStatus, PidInfo, RunRusage, format_job_id, job_options,
    job_status,
};
pub use load::LoadIndexLog;
pub use queue::{QueueInfoEnt, queue_attrib, queue_status};
pub use resource::{LsInfo, OrderType, ResItem, ValueType, res_flags};
pub use submit::{
    InvalidSubmit, Submit, SubmitField, SubmitRejection, SubmitReply, XFile, rlimit, sub_options,
    sub_options2, xf_options,
};
pub use user::{INFINIT_INT, UserInfoEnt};
