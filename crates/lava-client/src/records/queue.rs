//! Queue records.

use serde::Serialize;

use crate::records::host::counter;
use crate::xdr::{MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder};

/// Number of resource limit slots carried by a queue.
pub const QUEUE_RLIMITS: usize = 11;

/// Queue status bits (`QueueInfoEnt::q_status`).
pub mod queue_status {
    pub const OPEN: i32 = 0x01;
    pub const ACTIVE: i32 = 0x02;
    pub const RUN_WINDOW: i32 = 0x04;
    pub const DISPATCH_WINDOW: i32 = 0x08;
}

/// Queue attribute bits (`QueueInfoEnt::q_attrib`).
pub mod queue_attrib {
    pub const EXCLUSIVE: i32 = 0x01;
    pub const DEFAULT: i32 = 0x02;
    pub const ROUND_ROBIN: i32 = 0x04;
    pub const BACKFILL: i32 = 0x08;
    pub const IGNORE_DEADLINE: i32 = 0x10;
    pub const CHKPNT: i32 = 0x20;
    pub const RERUNNABLE: i32 = 0x40;
}

/// State of a batch queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueInfoEnt {
    pub queue: String,
    pub description: String,
    pub priority: i32,
    pub nice: i32,
    pub user_list: Vec<String>,
    pub host_list: Vec<String>,
    pub load_sched: Vec<f32>,
    pub load_stop: Vec<f32>,
    pub user_job_limit: i32,
    pub proc_job_limit: f32,
    pub windows: String,
    /// Resource limits, `-1` = unlimited.
    pub r_limits: [i32; QUEUE_RLIMITS],
    pub host_spec: String,
    pub q_attrib: i32,
    pub q_status: i32,
    pub max_jobs: i32,
    pub num_jobs: i32,
    pub num_pend: i32,
    pub num_run: i32,
    pub num_ssusp: i32,
    pub num_ususp: i32,
    pub mig: i32,
    pub sched_delay: i32,
    pub accept_intvl: i32,
}

impl QueueInfoEnt {
    pub fn n_idx(&self) -> usize {
        self.load_sched.len()
    }

    pub fn is_open(&self) -> bool {
        self.q_status & queue_status::OPEN != 0
    }

    pub fn is_active(&self) -> bool {
        self.q_status & queue_status::ACTIVE != 0
    }

    /// `Open:Active`, `Closed:Inact`, ... as printed by `bqueues`.
    pub fn status_label(&self) -> String {
        format!(
            "{}:{}",
            if self.is_open() { "Open" } else { "Closed" },
            if self.is_active() { "Active" } else { "Inact" }
        )
    }
}

impl XdrEncode for QueueInfoEnt {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_str(&self.queue);
        enc.put_str(&self.description);
        enc.put_i32(self.priority);
        enc.put_i32(self.nice);
        enc.put_i32(self.user_job_limit);
        enc.put_f32(self.proc_job_limit);
        enc.put_str(&self.windows);
        for limit in &self.r_limits {
            enc.put_i32(*limit);
        }
        enc.put_str(&self.host_spec);
        enc.put_i32(self.q_attrib);
        enc.put_i32(self.q_status);
        enc.put_i32(self.max_jobs);
        enc.put_i32(self.num_jobs);
        enc.put_i32(self.num_pend);
        enc.put_i32(self.num_run);
        enc.put_i32(self.num_ssusp);
        enc.put_i32(self.num_ususp);
        enc.put_i32(self.mig);
        enc.put_i32(self.sched_delay);
        enc.put_i32(self.accept_intvl);
        enc.put_count(self.user_list.len());
        enc.put_count(self.host_list.len());
        enc.put_count(self.load_sched.len());
        enc.put_strs(&self.user_list);
        enc.put_strs(&self.host_list);
        enc.put_array(&self.load_sched, |enc, v| enc.put_f32(*v));
        enc.put_array(&self.load_stop, |enc, v| enc.put_f32(*v));
    }
}

impl XdrDecode for QueueInfoEnt {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let queue = dec.name("queueInfoEnt.queue")?;
        let description = dec.string("queueInfoEnt.description")?;
        let priority = dec.i32("queueInfoEnt.priority")?;
        let nice = dec.i32("queueInfoEnt.nice")?;
        let user_job_limit = dec.i32("queueInfoEnt.userJobLimit")?;
        let proc_job_limit = dec.factor("queueInfoEnt.procJobLimit")?;
        let windows = dec.string("queueInfoEnt.windows")?;
        let r_limits = dec.limits::<QUEUE_RLIMITS>("queueInfoEnt.rLimits")?;
        let host_spec = dec.string("queueInfoEnt.hostSpec")?;
        let q_attrib = dec.i32("queueInfoEnt.qAttrib")?;
        let q_status = dec.i32("queueInfoEnt.qStatus")?;
        let max_jobs = dec.i32("queueInfoEnt.maxJobs")?;
        let num_jobs = counter(dec, "queueInfoEnt.numJobs")?;
        let num_pend = counter(dec, "queueInfoEnt.numPEND")?;
        let num_run = counter(dec, "queueInfoEnt.numRUN")?;
        let num_ssusp = counter(dec, "queueInfoEnt.numSSUSP")?;
        let num_ususp = counter(dec, "queueInfoEnt.numUSUSP")?;
        let mig = dec.i32("queueInfoEnt.mig")?;
        let sched_delay = dec.i32("queueInfoEnt.schedDelay")?;
        let accept_intvl = dec.i32("queueInfoEnt.acceptIntvl")?;
        let n_users = dec.count("queueInfoEnt.nUsers")?;
        let n_hosts = dec.count("queueInfoEnt.nHosts")?;
        let n_idx = dec.count("queueInfoEnt.nIdx")?;
        Ok(Self {
            queue,
            description,
            priority,
            nice,
            user_list: dec.names("queueInfoEnt.userList", n_users)?,
            host_list: dec.names("queueInfoEnt.hostList", n_hosts)?,
            load_sched: dec.floats("queueInfoEnt.loadSched", n_idx)?,
            load_stop: dec.floats("queueInfoEnt.loadStop", n_idx)?,
            user_job_limit,
            proc_job_limit,
            windows,
            r_limits,
            host_spec,
            q_attrib,
            q_status,
            max_jobs,
            num_jobs,
            num_pend,
            num_run,
            num_ssusp,
            num_ususp,
            mig,
            sched_delay,
            accept_intvl,
        })
    }
}
