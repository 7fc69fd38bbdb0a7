//! Host records: static capabilities and runtime batch state.

use std::fmt;

use serde::Serialize;

use crate::records::resource::ResItem;
use crate::xdr::{MarshalError, MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder};

/// Static per-host capability snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostInfo {
    pub host_name: String,
    pub host_type: String,
    pub host_model: String,
    pub cpu_factor: f32,
    pub max_cpus: i32,
    /// Maximum memory in MB.
    pub max_mem: i32,
    pub max_swap: i32,
    pub max_tmp: i32,
    pub n_disks: i32,
    pub resources: Vec<ResItem>,
    pub windows: String,
    /// Busy threshold per load index.
    pub busy_threshold: Vec<f32>,
    pub is_server: bool,
    pub rex_priority: i32,
}

impl HostInfo {
    pub fn n_res(&self) -> usize {
        self.resources.len()
    }

    pub fn num_indx(&self) -> usize {
        self.busy_threshold.len()
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.iter().any(|r| r.name == name)
    }
}

impl XdrEncode for HostInfo {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_str(&self.host_name);
        enc.put_str(&self.host_type);
        enc.put_str(&self.host_model);
        enc.put_f32(self.cpu_factor);
        enc.put_i32(self.max_cpus);
        enc.put_i32(self.max_mem);
        enc.put_i32(self.max_swap);
        enc.put_i32(self.max_tmp);
        enc.put_i32(self.n_disks);
        enc.put_str(&self.windows);
        enc.put_bool(self.is_server);
        enc.put_i32(self.rex_priority);
        enc.put_count(self.resources.len());
        enc.put_count(self.busy_threshold.len());
        enc.put_records(&self.resources);
        enc.put_array(&self.busy_threshold, |enc, v| enc.put_f32(*v));
    }
}

impl XdrDecode for HostInfo {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let host_name = dec.name("hostInfo.hostName")?;
        let host_type = dec.name("hostInfo.hostType")?;
        let host_model = dec.name("hostInfo.hostModel")?;
        let cpu_factor = dec.factor("hostInfo.cpuFactor")?;
        let max_cpus = dec.i32_min("hostInfo.maxCpus", 0)?;
        let max_mem = dec.i32_min("hostInfo.maxMem", 0)?;
        let max_swap = dec.i32_min("hostInfo.maxSwap", 0)?;
        let max_tmp = dec.i32_min("hostInfo.maxTmp", 0)?;
        let n_disks = dec.i32_min("hostInfo.nDisks", 0)?;
        let windows = dec.string("hostInfo.windows")?;
        let is_server = dec.bool("hostInfo.isServer")?;
        let rex_priority = dec.i32("hostInfo.rexPriority")?;
        let n_res = dec.count("hostInfo.nRes")?;
        let num_indx = dec.count("hostInfo.numIndx")?;
        Ok(Self {
            host_name,
            host_type,
            host_model,
            cpu_factor,
            max_cpus,
            max_mem,
            max_swap,
            max_tmp,
            n_disks,
            resources: dec.records("hostInfo.resources", n_res)?,
            windows,
            busy_threshold: dec.floats("hostInfo.busyThreshold", num_indx)?,
            is_server,
            rex_priority,
        })
    }
}

/// Host status bits (`HostInfoEnt::status`).
pub mod host_status {
    pub const OK: i32 = 0x00;
    pub const BUSY: i32 = 0x01;
    pub const WIND: i32 = 0x02;
    pub const DISABLED: i32 = 0x04;
    pub const LOCKED: i32 = 0x08;
    pub const FULL: i32 = 0x10;
    pub const UNREACH: i32 = 0x20;
    pub const UNAVAIL: i32 = 0x40;
    pub const NO_LIM: i32 = 0x80;
    pub const EXCLUSIVE: i32 = 0x100;
    pub const LOCKED_MASTER: i32 = 0x200;
}

/// Symbolic batch status of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HostState {
    Ok,
    Closed,
    Unreachable,
    Unavailable,
}

/// Host status bitmask with its raw value preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostStatus(pub i32);

impl HostStatus {
    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn has(self, bit: i32) -> bool {
        self.0 & bit != 0
    }

    pub fn state(self) -> HostState {
        if self.has(host_status::UNAVAIL) {
            HostState::Unavailable
        } else if self.has(host_status::UNREACH) {
            HostState::Unreachable
        } else if self.0 == host_status::OK {
            HostState::Ok
        } else {
            HostState::Closed
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.state() {
            HostState::Ok => "ok",
            HostState::Unreachable => "unreach",
            HostState::Unavailable => "unavail",
            HostState::Closed if self.has(host_status::DISABLED) => "closed_Adm",
            HostState::Closed if self.has(host_status::LOCKED) => "closed_Lock",
            HostState::Closed if self.has(host_status::WIND) => "closed_Wind",
            HostState::Closed if self.has(host_status::FULL) => "closed_Full",
            HostState::Closed if self.has(host_status::BUSY) => "closed_Busy",
            HostState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Runtime batch state of a host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostInfoEnt {
    pub host: String,
    pub status: HostStatus,
    pub cpu_factor: f32,
    pub windows: String,
    pub user_job_limit: i32,
    pub max_jobs: i32,
    pub num_jobs: i32,
    pub num_run: i32,
    pub num_ssusp: i32,
    pub num_ususp: i32,
    pub num_reserve: i32,
    pub mig: i32,
    pub attr: i32,
    /// Current load, one value per load index.
    pub load: Vec<f32>,
    pub load_sched: Vec<f32>,
    pub load_stop: Vec<f32>,
}

impl HostInfoEnt {
    pub fn n_idx(&self) -> usize {
        self.load.len()
    }
}

impl XdrEncode for HostInfoEnt {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_str(&self.host);
        enc.put_i32(self.status.raw());
        enc.put_f32(self.cpu_factor);
        enc.put_str(&self.windows);
        enc.put_i32(self.user_job_limit);
        enc.put_i32(self.max_jobs);
        enc.put_i32(self.num_jobs);
        enc.put_i32(self.num_run);
        enc.put_i32(self.num_ssusp);
        enc.put_i32(self.num_ususp);
        enc.put_i32(self.num_reserve);
        enc.put_i32(self.mig);
        enc.put_i32(self.attr);
        enc.put_count(self.load.len());
        enc.put_array(&self.load, |enc, v| enc.put_f32(*v));
        enc.put_array(&self.load_sched, |enc, v| enc.put_f32(*v));
        enc.put_array(&self.load_stop, |enc, v| enc.put_f32(*v));
    }
}

impl XdrDecode for HostInfoEnt {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let host = dec.name("hostInfoEnt.host")?;
        let status = HostStatus(dec.i32("hostInfoEnt.hStatus")?);
        let cpu_factor = dec.factor("hostInfoEnt.cpuFactor")?;
        let windows = dec.string("hostInfoEnt.windows")?;
        let user_job_limit = dec.i32("hostInfoEnt.userJobLimit")?;
        let max_jobs = dec.i32("hostInfoEnt.maxJobs")?;
        let num_jobs = counter(dec, "hostInfoEnt.numJobs")?;
        let num_run = counter(dec, "hostInfoEnt.numRUN")?;
        let num_ssusp = counter(dec, "hostInfoEnt.numSSUSP")?;
        let num_ususp = counter(dec, "hostInfoEnt.numUSUSP")?;
        let num_reserve = counter(dec, "hostInfoEnt.numRESERVE")?;
        let mig = dec.i32("hostInfoEnt.mig")?;
        let attr = dec.i32("hostInfoEnt.attr")?;
        let n_idx = dec.count("hostInfoEnt.nIdx")?;
        Ok(Self {
            host,
            status,
            cpu_factor,
            windows,
            user_job_limit,
            max_jobs,
            num_jobs,
            num_run,
            num_ssusp,
            num_ususp,
            num_reserve,
            mig,
            attr,
            load: dec.floats("hostInfoEnt.load", n_idx)?,
            load_sched: dec.floats("hostInfoEnt.loadSched", n_idx)?,
            load_stop: dec.floats("hostInfoEnt.loadStop", n_idx)?,
        })
    }
}

/// Job counters must never be negative.
pub(crate) fn counter(dec: &mut XdrDecoder<'_>, field: &'static str) -> MarshalResult<i32> {
    let v = dec.i32(field)?;
    if v < 0 {
        return Err(MarshalError::OutOfRange {
            field,
            value: v.to_string(),
        });
    }
    Ok(v)
}
