//! Job records produced by the job cursor.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::records::submit::Submit;
use crate::xdr::{MarshalError, MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder};

/// Number of slots in `JobInfoEnt::counter`.
pub const JOB_COUNTERS: usize = 7;

/// Job status bits.
pub mod job_status {
    pub const NULL: i32 = 0x00;
    pub const PEND: i32 = 0x01;
    pub const PSUSP: i32 = 0x02;
    pub const RUN: i32 = 0x04;
    pub const SSUSP: i32 = 0x08;
    pub const USUSP: i32 = 0x10;
    pub const EXIT: i32 = 0x20;
    pub const DONE: i32 = 0x40;
    pub const PDONE: i32 = 0x80;
    pub const PERR: i32 = 0x100;
    pub const WAIT: i32 = 0x200;
    pub const UNKWN: i32 = 0x10000;

    pub(crate) const KNOWN: i32 =
        PEND | PSUSP | RUN | SSUSP | USUSP | EXIT | DONE | PDONE | PERR | WAIT | UNKWN;
}

/// Symbolic job state derived from the status bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobState {
    Null,
    Pend,
    Psusp,
    Run,
    Ssusp,
    Ususp,
    Exit,
    Done,
    Wait,
    Unknown,
}

impl JobState {
    pub fn name(self) -> &'static str {
        match self {
            JobState::Null => "NULL",
            JobState::Pend => "PEND",
            JobState::Psusp => "PSUSP",
            JobState::Run => "RUN",
            JobState::Ssusp => "SSUSP",
            JobState::Ususp => "USUSP",
            JobState::Exit => "EXIT",
            JobState::Done => "DONE",
            JobState::Wait => "WAIT",
            JobState::Unknown => "UNKWN",
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Done | JobState::Exit)
    }

    pub fn is_suspended(self) -> bool {
        matches!(self, JobState::Psusp | JobState::Ssusp | JobState::Ususp)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Job status bitmask with its raw value preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatus(pub i32);

impl JobStatus {
    pub fn raw(self) -> i32 {
        self.0
    }

    pub fn has(self, bit: i32) -> bool {
        self.0 & bit != 0
    }

    /// The dominant state. Post-processing bits (`PDONE`, `PERR`) do not
    /// change the state. Bits this client does not know make it `Unknown`.
    pub fn state(self) -> JobState {
        use job_status::*;
        if self.has(UNKWN) || self.0 & !KNOWN != 0 {
            JobState::Unknown
        } else if self.has(DONE) {
            JobState::Done
        } else if self.has(EXIT) {
            JobState::Exit
        } else if self.has(USUSP) {
            JobState::Ususp
        } else if self.has(SSUSP) {
            JobState::Ssusp
        } else if self.has(PSUSP) {
            JobState::Psusp
        } else if self.has(RUN) {
            JobState::Run
        } else if self.has(WAIT) {
            JobState::Wait
        } else if self.has(PEND) {
            JobState::Pend
        } else {
            JobState::Null
        }
    }
}

impl From<JobState> for JobStatus {
    fn from(state: JobState) -> Self {
        use job_status::*;
        JobStatus(match state {
            JobState::Null => NULL,
            JobState::Pend => PEND,
            JobState::Psusp => PSUSP,
            JobState::Run => RUN,
            JobState::Ssusp => SSUSP,
            JobState::Ususp => USUSP,
            JobState::Exit => EXIT,
            JobState::Done => DONE,
            JobState::Wait => WAIT,
            JobState::Unknown => UNKWN,
        })
    }
}

/// Array index encoded in the high word of a job id.
pub fn array_index(job_id: i64) -> i64 {
    (job_id >> 32) & 0xFFFF
}

/// Job id with the array index stripped.
pub fn base_job_id(job_id: i64) -> i64 {
    job_id & 0xFFFF_FFFF
}

/// Display form of a job id: `42` or `42[3]`.
pub fn format_job_id(job_id: i64) -> String {
    match array_index(job_id) {
        0 => base_job_id(job_id).to_string(),
        idx => format!("{}[{}]", base_job_id(job_id), idx),
    }
}

/// One process of a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PidInfo {
    pub pid: i32,
    pub ppid: i32,
    pub pgid: i32,
    pub jobid: i32,
}

impl XdrEncode for PidInfo {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_i32(self.pid);
        enc.put_i32(self.ppid);
        enc.put_i32(self.pgid);
        enc.put_i32(self.jobid);
    }
}

impl XdrDecode for PidInfo {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        Ok(Self {
            pid: dec.limit("pidInfo.pid")?,
            ppid: dec.limit("pidInfo.ppid")?,
            pgid: dec.limit("pidInfo.pgid")?,
            jobid: dec.limit("pidInfo.jobid")?,
        })
    }
}

/// Resource usage of a running job. `-1` means not yet sampled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRusage {
    /// Resident memory in KB.
    pub mem: i32,
    /// Virtual memory in KB.
    pub swap: i32,
    /// User time in seconds.
    pub utime: i32,
    /// System time in seconds.
    pub stime: i32,
    pub pid_info: Vec<PidInfo>,
    pub pgid: Vec<i32>,
}

impl Default for RunRusage {
    fn default() -> Self {
        Self {
            mem: -1,
            swap: -1,
            utime: -1,
            stime: -1,
            pid_info: Vec::new(),
            pgid: Vec::new(),
        }
    }
}

impl RunRusage {
    pub fn npids(&self) -> usize {
        self.pid_info.len()
    }

    pub fn npgids(&self) -> usize {
        self.pgid.len()
    }
}

impl XdrEncode for RunRusage {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_i32(self.mem);
        enc.put_i32(self.swap);
        enc.put_i32(self.utime);
        enc.put_i32(self.stime);
        enc.put_count(self.pid_info.len());
        enc.put_count(self.pgid.len());
        enc.put_records(&self.pid_info);
        enc.put_array(&self.pgid, |enc, g| enc.put_i32(*g));
    }
}

impl XdrDecode for RunRusage {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let mem = dec.limit("runRusage.mem")?;
        let swap = dec.limit("runRusage.swap")?;
        let utime = dec.limit("runRusage.utime")?;
        let stime = dec.limit("runRusage.stime")?;
        let npids = dec.count("runRusage.npids")?;
        let npgids = dec.count("runRusage.npgids")?;
        Ok(Self {
            mem,
            swap,
            utime,
            stime,
            pid_info: dec.records("runRusage.pidInfo", npids)?,
            pgid: dec.array("runRusage.pgid", npgids, |d| d.limit("runRusage.pgid"))?,
        })
    }
}

/// A job as reported by the master.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfoEnt {
    pub job_id: i64,
    pub user: String,
    pub status: JobStatus,
    /// Main pending or suspending reason.
    pub reasons: i32,
    pub subreasons: i32,
    /// Pending reason table; see [`crate::reasons::pending_reasons`].
    pub reason_tb: Vec<i32>,
    pub job_pid: i32,
    pub port: i32,
    pub exec_uid: i32,
    pub exit_status: i32,
    pub counter: [i32; JOB_COUNTERS],
    pub submit_time: DateTime<Utc>,
    pub reserve_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub predicted_start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub umask: i32,
    pub j_type: i32,
    pub job_priority: i32,
    pub j_rusage_update_time: Option<DateTime<Utc>>,
    pub load_sched: Vec<f32>,
    pub load_stop: Vec<f32>,
    pub cpu_factor: f32,
    pub cpu_time: Duration,
    pub cwd: String,
    pub sub_home_dir: String,
    pub from_host: String,
    pub exec_home: String,
    pub exec_cwd: String,
    pub exec_username: String,
    pub parent_group: String,
    pub j_name: String,
    pub ex_hosts: Vec<String>,
    pub submit: Submit,
    pub run_rusage: RunRusage,
}

impl JobInfoEnt {
    pub fn state(&self) -> JobState {
        self.status.state()
    }

    pub fn num_reasons(&self) -> usize {
        self.reason_tb.len()
    }

    pub fn num_ex_hosts(&self) -> usize {
        self.ex_hosts.len()
    }

    pub fn n_idx(&self) -> usize {
        self.load_sched.len()
    }

    /// Queue the job sits in.
    pub fn queue(&self) -> &str {
        &self.submit.queue
    }
}

impl XdrEncode for JobInfoEnt {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_i64(self.job_id);
        enc.put_str(&self.user);
        enc.put_i32(self.status.raw());
        enc.put_i32(self.reasons);
        enc.put_i32(self.subreasons);
        enc.put_i32(self.job_pid);
        enc.put_i32(self.port);
        enc.put_i32(self.exec_uid);
        enc.put_i32(self.exit_status);
        for c in &self.counter {
            enc.put_i32(*c);
        }
        enc.put_time(&self.submit_time);
        enc.put_opt_time(self.reserve_time.as_ref());
        enc.put_opt_time(self.start_time.as_ref());
        enc.put_opt_time(self.predicted_start_time.as_ref());
        enc.put_opt_time(self.end_time.as_ref());
        enc.put_i32(self.umask);
        enc.put_i32(self.j_type);
        enc.put_i32(self.job_priority);
        enc.put_opt_time(self.j_rusage_update_time.as_ref());
        enc.put_f32(self.cpu_factor);
        enc.put_duration(self.cpu_time);
        for s in [
            &self.cwd,
            &self.sub_home_dir,
            &self.from_host,
            &self.exec_home,
            &self.exec_cwd,
            &self.exec_username,
            &self.parent_group,
            &self.j_name,
        ] {
            enc.put_str(s);
        }
        enc.put_count(self.reason_tb.len());
        enc.put_count(self.load_sched.len());
        enc.put_count(self.ex_hosts.len());
        enc.put_array(&self.reason_tb, |enc, r| enc.put_i32(*r));
        enc.put_array(&self.load_sched, |enc, v| enc.put_f32(*v));
        enc.put_array(&self.load_stop, |enc, v| enc.put_f32(*v));
        enc.put_strs(&self.ex_hosts);
        self.submit.encode(enc);
        self.run_rusage.encode(enc);
    }
}

impl XdrDecode for JobInfoEnt {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let job_id = dec.i64("jobInfoEnt.jobId")?;
        if job_id < 0 {
            return Err(MarshalError::OutOfRange {
                field: "jobInfoEnt.jobId",
                value: job_id.to_string(),
            });
        }
        let user = dec.name("jobInfoEnt.user")?;
        let status = dec.i32("jobInfoEnt.status")?;
        let reasons = dec.i32("jobInfoEnt.reasons")?;
        let subreasons = dec.i32("jobInfoEnt.subreasons")?;
        let job_pid = dec.i32("jobInfoEnt.jobPid")?;
        let port = dec.i32("jobInfoEnt.port")?;
        let exec_uid = dec.i32("jobInfoEnt.execUid")?;
        let exit_status = dec.i32("jobInfoEnt.exitStatus")?;
        let mut counter = [0i32; JOB_COUNTERS];
        for slot in &mut counter {
            *slot = dec.i32_min("jobInfoEnt.counter", 0)?;
        }
        let submit_time = dec.time("jobInfoEnt.submitTime")?;
        let reserve_time = dec.opt_time("jobInfoEnt.reserveTime")?;
        let start_time = dec.opt_time("jobInfoEnt.startTime")?;
        let predicted_start_time = dec.opt_time("jobInfoEnt.predictedStartTime")?;
        let end_time = dec.opt_time("jobInfoEnt.endTime")?;
        let umask = dec.i32("jobInfoEnt.umask")?;
        let j_type = dec.i32("jobInfoEnt.jType")?;
        let job_priority = dec.i32("jobInfoEnt.jobPriority")?;
        let j_rusage_update_time = dec.opt_time("jobInfoEnt.jRusageUpdateTime")?;
        let cpu_factor = dec.factor("jobInfoEnt.cpuFactor")?;
        let cpu_time = dec.duration("jobInfoEnt.cpuTime")?;
        let cwd = dec.string("jobInfoEnt.cwd")?;
        let sub_home_dir = dec.string("jobInfoEnt.subHomeDir")?;
        let from_host = dec.string("jobInfoEnt.fromHost")?;
        let exec_home = dec.string("jobInfoEnt.execHome")?;
        let exec_cwd = dec.string("jobInfoEnt.execCwd")?;
        let exec_username = dec.string("jobInfoEnt.execUsername")?;
        let parent_group = dec.string("jobInfoEnt.parentGroup")?;
        let j_name = dec.string("jobInfoEnt.jName")?;
        let num_reasons = dec.count("jobInfoEnt.numReasons")?;
        let n_idx = dec.count("jobInfoEnt.nIdx")?;
        let num_ex_hosts = dec.count("jobInfoEnt.numExHosts")?;
        let reason_tb = dec.array("jobInfoEnt.reasonTb", num_reasons, |d| {
            d.i32("jobInfoEnt.reasonTb")
        })?;
        let load_sched = dec.floats("jobInfoEnt.loadSched", n_idx)?;
        let load_stop = dec.floats("jobInfoEnt.loadStop", n_idx)?;
        let ex_hosts = dec.names("jobInfoEnt.exHosts", num_ex_hosts)?;
        let submit = Submit::decode(dec)?;
        let run_rusage = RunRusage::decode(dec)?;
        Ok(Self {
            job_id,
            user,
            status: JobStatus(status),
            reasons,
            subreasons,
            reason_tb,
            job_pid,
            port,
            exec_uid,
            exit_status,
            counter,
            submit_time,
            reserve_time,
            start_time,
            predicted_start_time,
            end_time,
            umask,
            j_type,
            job_priority,
            j_rusage_update_time,
            load_sched,
            load_stop,
            cpu_factor,
            cpu_time,
            cwd,
            sub_home_dir,
            from_host,
            exec_home,
            exec_cwd,
            exec_username,
            parent_group,
            j_name,
            ex_hosts,
            submit,
            run_rusage,
        })
    }
}

/// Which job classes a cursor should include (`JobFilter::options`).
pub mod job_options {
    pub const ALL_JOB: i32 = 0x0001;
    pub const DONE_JOB: i32 = 0x0002;
    pub const PEND_JOB: i32 = 0x0004;
    pub const SUSP_JOB: i32 = 0x0008;
    pub const CUR_JOB: i32 = 0x0010;
    pub const LAST_JOB: i32 = 0x0020;
    pub const RUN_JOB: i32 = 0x0040;
}

/// Selection criteria for opening a job cursor.
///
/// Unset criteria match everything. `options` selects job classes; zero
/// means unfinished jobs only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobFilter {
    pub job_id: Option<i64>,
    pub user: Option<String>,
    pub queue: Option<String>,
    pub host: Option<String>,
    pub options: i32,
}

impl JobFilter {
    /// Every job the master still knows about.
    pub fn all() -> Self {
        Self {
            options: job_options::ALL_JOB,
            ..Self::default()
        }
    }

    pub fn by_id(job_id: i64) -> Self {
        Self {
            job_id: Some(job_id),
            ..Self::all()
        }
    }

    pub fn by_user(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::all()
        }
    }

    pub fn by_queue(queue: impl Into<String>) -> Self {
        Self {
            queue: Some(queue.into()),
            ..Self::all()
        }
    }

    pub fn by_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::all()
        }
    }

    pub fn with_options(mut self, options: i32) -> Self {
        self.options = options;
        self
    }

    /// Whether `job` is selected by this filter.
    pub fn matches(&self, job: &JobInfoEnt) -> bool {
        if self.job_id.is_some_and(|id| id != job.job_id) {
            return false;
        }
        if self.user.as_deref().is_some_and(|u| u != "all" && u != job.user) {
            return false;
        }
        if self.queue.as_deref().is_some_and(|q| q != job.queue()) {
            return false;
        }
        if self
            .host
            .as_deref()
            .is_some_and(|h| !job.ex_hosts.iter().any(|x| x == h))
        {
            return false;
        }
        self.matches_state(job.state())
    }

    fn matches_state(&self, state: JobState) -> bool {
        use job_options::*;
        let opts = self.options;
        if opts & ALL_JOB != 0 {
            return true;
        }
        if opts == 0 || opts & (CUR_JOB | LAST_JOB) != 0 {
            return !state.is_finished();
        }
        (opts & DONE_JOB != 0 && state.is_finished())
            || (opts & PEND_JOB != 0 && state == JobState::Pend)
            || (opts & SUSP_JOB != 0 && state.is_suspended())
            || (opts & RUN_JOB != 0 && state == JobState::Run)
    }
}

impl XdrEncode for JobFilter {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_i64(self.job_id.unwrap_or(0));
        enc.put_str(self.user.as_deref().unwrap_or_default());
        enc.put_str(self.queue.as_deref().unwrap_or_default());
        enc.put_str(self.host.as_deref().unwrap_or_default());
        enc.put_i32(self.options);
    }
}

impl XdrDecode for JobFilter {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let job_id = dec.i64("jobFilter.jobId")?;
        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        Ok(Self {
            job_id: (job_id != 0).then_some(job_id),
            user: non_empty(dec.string("jobFilter.user")?),
            queue: non_empty(dec.string("jobFilter.queue")?),
            host: non_empty(dec.string("jobFilter.host")?),
            options: dec.i32("jobFilter.options")?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::xdr::{from_bytes, to_bytes};
    use chrono::TimeZone;

    pub(crate) fn sample_job(job_id: i64, state: JobState) -> JobInfoEnt {
        JobInfoEnt {
            job_id,
            user: "alice".into(),
            status: state.into(),
            reasons: 0,
            subreasons: 0,
            reason_tb: vec![1],
            job_pid: 4242,
            port: -1,
            exec_uid: 1000,
            exit_status: 0,
            counter: [0; JOB_COUNTERS],
            submit_time: Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap(),
            reserve_time: None,
            start_time: Some(Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 5).unwrap()),
            predicted_start_time: None,
            end_time: None,
            umask: 0o022,
            j_type: 0,
            job_priority: -1,
            j_rusage_update_time: None,
            load_sched: vec![-1.0; 2],
            load_stop: vec![-1.0; 2],
            cpu_factor: 1.0,
            cpu_time: Duration::from_secs_f64(1.5),
            cwd: "/home/alice".into(),
            sub_home_dir: "/home/alice".into(),
            from_host: "master01".into(),
            exec_home: "/home/alice".into(),
            exec_cwd: "/home/alice".into(),
            exec_username: "alice".into(),
            parent_group: "/".into(),
            j_name: "sleep 60".into(),
            ex_hosts: vec!["node01".into()],
            submit: Submit::new("sleep 60").with_queue("normal"),
            run_rusage: RunRusage {
                mem: 1024,
                swap: 2048,
                utime: 1,
                stime: 0,
                pid_info: vec![PidInfo {
                    pid: 4242,
                    ppid: 4241,
                    pgid: 4242,
                    jobid: 7,
                }],
                pgid: vec![4242],
            },
        }
    }

    #[test]
    fn test_job_decode() {
        let job = sample_job(7, JobState::Run);
        let back: JobInfoEnt = from_bytes(&to_bytes(&job)).unwrap();
        assert_eq!(back, job);
        assert_eq!(back.state(), JobState::Run);
        assert_eq!(back.num_ex_hosts(), 1);
        assert_eq!(back.run_rusage.npids(), 1);
    }

    #[test]
    fn test_pgid_count_enforced() {
        let mut enc = XdrEncoder::new();
        for v in [512, 1024, 3, 1] {
            enc.put_i32(v);
        }
        enc.put_count(0);
        enc.put_count(2);
        enc.put_records::<PidInfo>(&[]);
        enc.put_array(&[4242], |enc, g| enc.put_i32(*g));
        let err = from_bytes::<RunRusage>(&enc.into_bytes()).unwrap_err();
        assert_eq!(
            err,
            MarshalError::CountMismatch {
                field: "runRusage.pgid",
                declared: 2,
                encoded: 1,
            }
        );
    }

    #[test]
    fn test_newer_status_bits_survive_decoding() {
        let mut job = sample_job(7, JobState::Run);
        job.status = JobStatus(job_status::RUN | 0x2_0000);
        let decoded = from_bytes::<JobInfoEnt>(&to_bytes(&job)).unwrap();
        assert_eq!(decoded.status.raw(), job_status::RUN | 0x2_0000);
        assert_eq!(decoded.state(), JobState::Unknown);
        assert!(decoded.status.has(job_status::RUN));
    }

    #[test]
    fn test_rusage_floor() {
        let mut job = sample_job(7, JobState::Run);
        job.run_rusage.mem = -2;
        assert!(from_bytes::<JobInfoEnt>(&to_bytes(&job)).is_err());
    }

    #[test]
    fn test_status_precedence() {
        use job_status::*;
        assert_eq!(JobStatus(DONE | PDONE).state(), JobState::Done);
        assert_eq!(JobStatus(EXIT | PERR).state(), JobState::Exit);
        assert_eq!(JobStatus(RUN | SSUSP).state(), JobState::Ssusp);
        assert_eq!(JobStatus(0).state(), JobState::Null);
        assert_eq!(JobState::Ususp.to_string(), "USUSP");
    }

    #[test]
    fn test_array_job_ids() {
        let id = (3i64 << 32) | 42;
        assert_eq!(base_job_id(id), 42);
        assert_eq!(array_index(id), 3);
        assert_eq!(format_job_id(id), "42[3]");
        assert_eq!(format_job_id(42), "42");
    }

    #[test]
    fn test_filter_matching() {
        let running = sample_job(7, JobState::Run);
        let done = sample_job(8, JobState::Done);

        assert!(JobFilter::all().matches(&done));
        assert!(!JobFilter::default().matches(&done));
        assert!(JobFilter::default().matches(&running));
        assert!(JobFilter::by_id(7).matches(&running));
        assert!(!JobFilter::by_id(8).matches(&running));
        assert!(JobFilter::by_user("all").matches(&running));
        assert!(!JobFilter::by_user("bob").matches(&running));
        assert!(JobFilter::by_queue("normal").matches(&running));
        assert!(JobFilter::by_host("node01").matches(&running));
        assert!(!JobFilter::by_host("node02").matches(&running));

        let pending_only = JobFilter::default().with_options(job_options::PEND_JOB);
        assert!(!pending_only.matches(&running));
        let run_only = JobFilter::default().with_options(job_options::RUN_JOB);
        assert!(run_only.matches(&running));
    }

    #[test]
    fn test_filter_wire_form() {
        let filter = JobFilter::by_user("alice").with_options(job_options::CUR_JOB);
        let back: JobFilter = from_bytes(&to_bytes(&filter)).unwrap();
        assert_eq!(back, filter);
    }
}
