//! Job submission template and the master's reply.
//!
//! [`Submit`] is both the request sent to the master and the copy of it
//! embedded in every [`JobInfoEnt`](crate::records::JobInfoEnt). Templates
//! can be loaded from YAML or JSON; unset fields take their defaults, which
//! for resource limits means `-1` (unlimited).
//!
//! ```
//! use lava_client::records::{Submit, sub_options};
//!
//! let submit = Submit::new("hostname")
//!     .with_queue("normal")
//!     .with_processors(1, 1)
//!     .with_job_name("probe");
//! assert!(submit.options & sub_options::QUEUE != 0);
//! assert!(submit.validate().is_ok());
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;
use crate::xdr::{MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder};

/// Number of resource limit slots on a submission.
pub const SUBMIT_RLIMITS: usize = 10;

/// Unlimited value for a resource limit slot.
pub const DEFAULT_RLIMIT: i32 = -1;

/// Indices into [`Submit::r_limits`].
pub mod rlimit {
    pub const CPU: usize = 0;
    pub const FSIZE: usize = 1;
    pub const DATA: usize = 2;
    pub const STACK: usize = 3;
    pub const CORE: usize = 4;
    pub const RSS: usize = 5;
    pub const NOFILE: usize = 6;
    pub const OPEN_MAX: usize = 7;
    pub const SWAP: usize = 8;
    pub const RUN: usize = 9;
}

/// Bits of [`Submit::options`]. Each marks the matching field as set.
pub mod sub_options {
    pub const JOB_NAME: i32 = 0x01;
    pub const QUEUE: i32 = 0x02;
    pub const HOST: i32 = 0x04;
    pub const IN_FILE: i32 = 0x08;
    pub const OUT_FILE: i32 = 0x10;
    pub const ERR_FILE: i32 = 0x20;
    pub const EXCLUSIVE: i32 = 0x40;
    pub const NOTIFY_END: i32 = 0x80;
    pub const NOTIFY_BEGIN: i32 = 0x100;
    pub const CHKPNT_PERIOD: i32 = 0x400;
    pub const CHKPNT_DIR: i32 = 0x800;
    pub const RERUNNABLE: i32 = 0x4000;
    pub const HOST_SPEC: i32 = 0x10000;
    pub const DEPEND_COND: i32 = 0x20000;
    pub const RES_REQ: i32 = 0x40000;
    pub const OTHER_FILES: i32 = 0x80000;
    pub const PRE_EXEC: i32 = 0x100000;
    pub const LOGIN_SHELL: i32 = 0x200000;
    pub const MAIL_USER: i32 = 0x400000;
    pub const PROJECT_NAME: i32 = 0x2000000;
}

/// Bits of [`Submit::options2`].
pub mod sub_options2 {
    pub const HOLD: i32 = 0x04;
    pub const MODIFY_CMD: i32 = 0x08;
    pub const BSUB_BLOCK: i32 = 0x10;
}

/// Bits of [`XFile::options`].
pub mod xf_options {
    pub const SUB2EXEC: i32 = 0x1;
    pub const EXEC2SUB: i32 = 0x2;
    pub const SUB2EXEC_APPEND: i32 = 0x4;
    pub const EXEC2SUB_APPEND: i32 = 0x8;
    pub const URL_SOURCE: i32 = 0x10;
    pub const URL_DEST: i32 = 0x20;
}

/// A file-transfer directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XFile {
    /// Path on the submission host.
    pub sub_fn: String,
    /// Path on the execution host.
    pub exec_fn: String,
    #[serde(default = "default_xf_options")]
    pub options: i32,
}

fn default_xf_options() -> i32 {
    xf_options::SUB2EXEC
}

impl XFile {
    /// Copy `sub_fn` to `exec_fn` before the job starts.
    pub fn stage_in(sub_fn: impl Into<String>, exec_fn: impl Into<String>) -> Self {
        Self {
            sub_fn: sub_fn.into(),
            exec_fn: exec_fn.into(),
            options: xf_options::SUB2EXEC,
        }
    }

    /// Copy `exec_fn` back to `sub_fn` after the job finishes.
    pub fn stage_out(sub_fn: impl Into<String>, exec_fn: impl Into<String>) -> Self {
        Self {
            sub_fn: sub_fn.into(),
            exec_fn: exec_fn.into(),
            options: xf_options::EXEC2SUB,
        }
    }
}

impl XdrEncode for XFile {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_str(&self.sub_fn);
        enc.put_str(&self.exec_fn);
        enc.put_i32(self.options);
    }
}

impl XdrDecode for XFile {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        Ok(Self {
            sub_fn: dec.name("xFile.subFn")?,
            exec_fn: dec.name("xFile.execFn")?,
            options: dec.i32_min("xFile.options", 0)?,
        })
    }
}

/// A job submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Submit {
    pub options: i32,
    pub options2: i32,
    pub num_processors: i32,
    pub max_num_processors: i32,
    pub sig_value: i32,
    pub begin_time: Option<DateTime<Utc>>,
    pub term_time: Option<DateTime<Utc>>,
    pub chkpnt_period: i32,
    pub user_priority: i32,
    pub del_options: i32,
    pub del_options2: i32,
    pub r_limits: [i32; SUBMIT_RLIMITS],
    pub job_name: String,
    pub queue: String,
    pub res_req: String,
    pub host_spec: String,
    pub depend_cond: String,
    pub in_file: String,
    pub out_file: String,
    pub err_file: String,
    pub command: String,
    pub chkpnt_dir: String,
    pub pre_exec_cmd: String,
    pub mail_user: String,
    pub project_name: String,
    pub login_shell: String,
    pub asked_hosts: Vec<String>,
    pub xf: Vec<XFile>,
}

impl Default for Submit {
    fn default() -> Self {
        Self {
            options: 0,
            options2: 0,
            num_processors: 0,
            max_num_processors: 0,
            sig_value: 0,
            begin_time: None,
            term_time: None,
            chkpnt_period: 0,
            user_priority: -1,
            del_options: 0,
            del_options2: 0,
            r_limits: [DEFAULT_RLIMIT; SUBMIT_RLIMITS],
            job_name: String::new(),
            queue: String::new(),
            res_req: String::new(),
            host_spec: String::new(),
            depend_cond: String::new(),
            in_file: String::new(),
            out_file: String::new(),
            err_file: String::new(),
            command: String::new(),
            chkpnt_dir: String::new(),
            pre_exec_cmd: String::new(),
            mail_user: String::new(),
            project_name: String::new(),
            login_shell: String::new(),
            asked_hosts: Vec::new(),
            xf: Vec::new(),
        }
    }
}

impl Submit {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn num_asked_hosts(&self) -> usize {
        self.asked_hosts.len()
    }

    pub fn nxf(&self) -> usize {
        self.xf.len()
    }

    pub fn has_option(&self, bit: i32) -> bool {
        self.options & bit != 0
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self.options |= sub_options::JOB_NAME;
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self.options |= sub_options::QUEUE;
        self
    }

    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asked_hosts = hosts.into_iter().map(Into::into).collect();
        self.options |= sub_options::HOST;
        self
    }

    pub fn with_in_file(mut self, path: impl Into<String>) -> Self {
        self.in_file = path.into();
        self.options |= sub_options::IN_FILE;
        self
    }

    pub fn with_out_file(mut self, path: impl Into<String>) -> Self {
        self.out_file = path.into();
        self.options |= sub_options::OUT_FILE;
        self
    }

    pub fn with_err_file(mut self, path: impl Into<String>) -> Self {
        self.err_file = path.into();
        self.options |= sub_options::ERR_FILE;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.options |= sub_options::EXCLUSIVE;
        self
    }

    pub fn notify_begin(mut self) -> Self {
        self.options |= sub_options::NOTIFY_BEGIN;
        self
    }

    pub fn notify_end(mut self) -> Self {
        self.options |= sub_options::NOTIFY_END;
        self
    }

    pub fn rerunnable(mut self) -> Self {
        self.options |= sub_options::RERUNNABLE;
        self
    }

    pub fn hold(mut self) -> Self {
        self.options2 |= sub_options2::HOLD;
        self
    }

    /// Checkpoint every `period` minutes into `dir`.
    pub fn with_checkpoint(mut self, dir: impl Into<String>, period: i32) -> Self {
        self.chkpnt_dir = dir.into();
        self.chkpnt_period = period;
        self.options |= sub_options::CHKPNT_DIR | sub_options::CHKPNT_PERIOD;
        self
    }

    pub fn with_host_spec(mut self, spec: impl Into<String>) -> Self {
        self.host_spec = spec.into();
        self.options |= sub_options::HOST_SPEC;
        self
    }

    pub fn with_depend_cond(mut self, cond: impl Into<String>) -> Self {
        self.depend_cond = cond.into();
        self.options |= sub_options::DEPEND_COND;
        self
    }

    pub fn with_res_req(mut self, res_req: impl Into<String>) -> Self {
        self.res_req = res_req.into();
        self.options |= sub_options::RES_REQ;
        self
    }

    pub fn with_file(mut self, xf: XFile) -> Self {
        self.xf.push(xf);
        self.options |= sub_options::OTHER_FILES;
        self
    }

    pub fn with_pre_exec(mut self, cmd: impl Into<String>) -> Self {
        self.pre_exec_cmd = cmd.into();
        self.options |= sub_options::PRE_EXEC;
        self
    }

    pub fn with_login_shell(mut self, shell: impl Into<String>) -> Self {
        self.login_shell = shell.into();
        self.options |= sub_options::LOGIN_SHELL;
        self
    }

    pub fn with_mail_user(mut self, user: impl Into<String>) -> Self {
        self.mail_user = user.into();
        self.options |= sub_options::MAIL_USER;
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project_name = project.into();
        self.options |= sub_options::PROJECT_NAME;
        self
    }

    pub fn with_processors(mut self, min: i32, max: i32) -> Self {
        self.num_processors = min;
        self.max_num_processors = max;
        self
    }

    pub fn with_begin_time(mut self, at: DateTime<Utc>) -> Self {
        self.begin_time = Some(at);
        self
    }

    pub fn with_term_time(mut self, at: DateTime<Utc>) -> Self {
        self.term_time = Some(at);
        self
    }

    pub fn with_limit(mut self, slot: usize, value: i32) -> Self {
        if let Some(limit) = self.r_limits.get_mut(slot) {
            *limit = value;
        }
        self
    }

    /// Set the option bit of every non-empty string or list field.
    ///
    /// Templates loaded from files usually carry values without bits.
    pub fn imply_options(&mut self) {
        let implied = [
            (!self.job_name.is_empty(), sub_options::JOB_NAME),
            (!self.queue.is_empty(), sub_options::QUEUE),
            (!self.asked_hosts.is_empty(), sub_options::HOST),
            (!self.in_file.is_empty(), sub_options::IN_FILE),
            (!self.out_file.is_empty(), sub_options::OUT_FILE),
            (!self.err_file.is_empty(), sub_options::ERR_FILE),
            (!self.chkpnt_dir.is_empty(), sub_options::CHKPNT_DIR),
            (!self.host_spec.is_empty(), sub_options::HOST_SPEC),
            (!self.depend_cond.is_empty(), sub_options::DEPEND_COND),
            (!self.res_req.is_empty(), sub_options::RES_REQ),
            (!self.xf.is_empty(), sub_options::OTHER_FILES),
            (!self.pre_exec_cmd.is_empty(), sub_options::PRE_EXEC),
            (!self.login_shell.is_empty(), sub_options::LOGIN_SHELL),
            (!self.mail_user.is_empty(), sub_options::MAIL_USER),
            (!self.project_name.is_empty(), sub_options::PROJECT_NAME),
        ];
        for (set, bit) in implied {
            if set {
                self.options |= bit;
            }
        }
    }

    /// Checks that can be made without asking the master.
    pub fn validate(&self) -> Result<(), InvalidSubmit> {
        if self.command.trim().is_empty() {
            return Err(InvalidSubmit::new(SubmitField::Command, "command is empty"));
        }
        if self.num_processors < 0 || self.max_num_processors < 0 {
            return Err(InvalidSubmit::new(
                SubmitField::NumProcessors,
                "processor counts must not be negative",
            ));
        }
        if self.max_num_processors > 0 && self.num_processors == 0 {
            return Err(InvalidSubmit::new(
                SubmitField::NumProcessors,
                "numProcessors must be at least 1 when maxNumProcessors is set",
            ));
        }
        if self.max_num_processors > 0 && self.num_processors > self.max_num_processors {
            return Err(InvalidSubmit::new(
                SubmitField::NumProcessors,
                format!(
                    "numProcessors {} exceeds maxNumProcessors {}",
                    self.num_processors, self.max_num_processors
                ),
            ));
        }
        if let Some(slot) = self.r_limits.iter().position(|l| *l < DEFAULT_RLIMIT) {
            return Err(InvalidSubmit::new(
                SubmitField::RLimits,
                format!("resource limit {slot} is below -1"),
            )
            .at(slot));
        }
        if let Some(idx) = self.asked_hosts.iter().position(|h| h.trim().is_empty()) {
            return Err(InvalidSubmit::new(SubmitField::AskedHosts, "empty host name").at(idx));
        }
        if let Some(idx) = self
            .xf
            .iter()
            .position(|x| x.sub_fn.is_empty() || x.exec_fn.is_empty())
        {
            return Err(InvalidSubmit::new(SubmitField::XFile, "empty transfer path").at(idx));
        }
        if let (Some(begin), Some(term)) = (self.begin_time, self.term_time) {
            if begin > term {
                return Err(InvalidSubmit::new(
                    SubmitField::BeginTime,
                    "begin time is after termination time",
                ));
            }
        }
        Ok(())
    }
}

impl XdrEncode for Submit {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_i32(self.options);
        enc.put_i32(self.options2);
        enc.put_i32(self.num_processors);
        enc.put_i32(self.max_num_processors);
        enc.put_i32(self.sig_value);
        enc.put_opt_time(self.begin_time.as_ref());
        enc.put_opt_time(self.term_time.as_ref());
        enc.put_i32(self.chkpnt_period);
        enc.put_i32(self.user_priority);
        enc.put_i32(self.del_options);
        enc.put_i32(self.del_options2);
        for limit in &self.r_limits {
            enc.put_i32(*limit);
        }
        for s in [
            &self.job_name,
            &self.queue,
            &self.res_req,
            &self.host_spec,
            &self.depend_cond,
            &self.in_file,
            &self.out_file,
            &self.err_file,
            &self.command,
            &self.chkpnt_dir,
            &self.pre_exec_cmd,
            &self.mail_user,
            &self.project_name,
            &self.login_shell,
        ] {
            enc.put_str(s);
        }
        enc.put_count(self.asked_hosts.len());
        enc.put_count(self.xf.len());
        enc.put_strs(&self.asked_hosts);
        enc.put_records(&self.xf);
    }
}

impl XdrDecode for Submit {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let options = dec.i32("submit.options")?;
        let options2 = dec.i32("submit.options2")?;
        let num_processors = dec.i32_min("submit.numProcessors", 0)?;
        let max_num_processors = dec.i32_min("submit.maxNumProcessors", 0)?;
        let sig_value = dec.i32("submit.sigValue")?;
        let begin_time = dec.opt_time("submit.beginTime")?;
        let term_time = dec.opt_time("submit.termTime")?;
        let chkpnt_period = dec.i32("submit.chkpntPeriod")?;
        let user_priority = dec.i32("submit.userPriority")?;
        let del_options = dec.i32("submit.delOptions")?;
        let del_options2 = dec.i32("submit.delOptions2")?;
        let r_limits = dec.limits::<SUBMIT_RLIMITS>("submit.rLimits")?;
        let job_name = dec.string("submit.jobName")?;
        let queue = dec.string("submit.queue")?;
        let res_req = dec.string("submit.resReq")?;
        let host_spec = dec.string("submit.hostSpec")?;
        let depend_cond = dec.string("submit.dependCond")?;
        let in_file = dec.string("submit.inFile")?;
        let out_file = dec.string("submit.outFile")?;
        let err_file = dec.string("submit.errFile")?;
        let command = dec.string("submit.command")?;
        let chkpnt_dir = dec.string("submit.chkpntDir")?;
        let pre_exec_cmd = dec.string("submit.preExecCmd")?;
        let mail_user = dec.string("submit.mailUser")?;
        let project_name = dec.string("submit.projectName")?;
        let login_shell = dec.string("submit.loginShell")?;
        let num_asked_hosts = dec.count("submit.numAskedHosts")?;
        let nxf = dec.count("submit.nxf")?;
        Ok(Self {
            options,
            options2,
            num_processors,
            max_num_processors,
            sig_value,
            begin_time,
            term_time,
            chkpnt_period,
            user_priority,
            del_options,
            del_options2,
            r_limits,
            job_name,
            queue,
            res_req,
            host_spec,
            depend_cond,
            in_file,
            out_file,
            err_file,
            command,
            chkpnt_dir,
            pre_exec_cmd,
            mail_user,
            project_name,
            login_shell,
            asked_hosts: dec.names("submit.askedHosts", num_asked_hosts)?,
            xf: dec.records("submit.xf", nxf)?,
        })
    }
}

/// The submission field a rejection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubmitField {
    Queue,
    AskedHosts,
    NumProcessors,
    BeginTime,
    TermTime,
    RLimits,
    Command,
    SigValue,
    DependCond,
    ResReq,
    ProjectName,
    HostSpec,
    XFile,
    User,
}

impl SubmitField {
    pub fn name(self) -> &'static str {
        match self {
            SubmitField::Queue => "queue",
            SubmitField::AskedHosts => "askedHosts",
            SubmitField::NumProcessors => "numProcessors",
            SubmitField::BeginTime => "beginTime",
            SubmitField::TermTime => "termTime",
            SubmitField::RLimits => "rLimits",
            SubmitField::Command => "command",
            SubmitField::SigValue => "sigValue",
            SubmitField::DependCond => "dependCond",
            SubmitField::ResReq => "resReq",
            SubmitField::ProjectName => "projectName",
            SubmitField::HostSpec => "hostSpec",
            SubmitField::XFile => "xf",
            SubmitField::User => "user",
        }
    }
}

impl fmt::Display for SubmitField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A template that failed local checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSubmit {
    pub field: SubmitField,
    /// Offending element for list fields.
    pub index: Option<usize>,
    pub reason: String,
}

impl InvalidSubmit {
    fn new(field: SubmitField, reason: impl Into<String>) -> Self {
        Self {
            field,
            index: None,
            reason: reason.into(),
        }
    }

    fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for InvalidSubmit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(idx) => write!(f, "{}[{}]: {}", self.field, idx, self.reason),
            None => write!(f, "{}: {}", self.field, self.reason),
        }
    }
}

/// Why the master refused a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitRejection {
    /// Raw reply code from the master.
    pub code: i32,
    pub kind: ErrorKind,
    pub field: Option<SubmitField>,
    /// Offending element for list fields (`badReqIndx`).
    pub index: Option<usize>,
    pub message: String,
}

/// Outcome of a submission the master answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReply {
    /// Set when the job was accepted.
    pub job_id: Option<i64>,
    /// Queue the job landed in, or the queue the master looked at.
    pub queue: String,
    pub rejection: Option<SubmitRejection>,
}

impl SubmitReply {
    pub fn accepted(job_id: i64, queue: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id),
            queue: queue.into(),
            rejection: None,
        }
    }

    pub fn rejected(rejection: SubmitRejection, queue: impl Into<String>) -> Self {
        Self {
            job_id: None,
            queue: queue.into(),
            rejection: Some(rejection),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.job_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::{MarshalError, from_bytes, to_bytes};
    use chrono::TimeZone;

    fn full() -> Submit {
        Submit::new("sleep 60")
            .with_job_name("nightly")
            .with_queue("priority")
            .with_hosts(["node01", "node02"])
            .with_out_file("/tmp/%J.out")
            .with_res_req("select[mem>100]")
            .with_project("climate")
            .with_file(XFile::stage_in("input.dat", "/scratch/input.dat"))
            .with_processors(2, 4)
            .with_limit(rlimit::RUN, 3600)
            .with_begin_time(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_builder_sets_option_bits() {
        let submit = full();
        for bit in [
            sub_options::JOB_NAME,
            sub_options::QUEUE,
            sub_options::HOST,
            sub_options::OUT_FILE,
            sub_options::RES_REQ,
            sub_options::PROJECT_NAME,
            sub_options::OTHER_FILES,
        ] {
            assert!(submit.has_option(bit), "missing bit {bit:#x}");
        }
        assert!(!submit.has_option(sub_options::IN_FILE));
        assert_eq!(submit.num_asked_hosts(), 2);
        assert_eq!(submit.nxf(), 1);
    }

    #[test]
    fn test_submit_survives_codec() {
        let submit = full();
        let back: Submit = from_bytes(&to_bytes(&submit)).unwrap();
        assert_eq!(back, submit);
    }

    #[test]
    fn test_validate_processor_counts() {
        let err = Submit::new("hostname")
            .with_processors(4, 2)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, SubmitField::NumProcessors);

        let err = Submit::new("hostname")
            .with_processors(0, 2)
            .validate()
            .unwrap_err();
        assert_eq!(err.field, SubmitField::NumProcessors);

        assert!(Submit::new("hostname").with_processors(1, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_lists_and_times() {
        let err = Submit::new("hostname")
            .with_hosts(["node01", ""])
            .validate()
            .unwrap_err();
        assert_eq!(err.field, SubmitField::AskedHosts);
        assert_eq!(err.index, Some(1));

        let err = Submit::new("hostname")
            .with_limit(rlimit::CPU, -3)
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "rLimits[0]: resource limit 0 is below -1");

        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let err = Submit::new("hostname")
            .with_begin_time(t0)
            .with_term_time(t0 - chrono::Duration::hours(1))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, SubmitField::BeginTime);
    }

    #[test]
    fn test_empty_asked_host_rejected_on_decode() {
        let mut submit = Submit::new("hostname");
        submit.asked_hosts = vec![String::new()];
        let err = from_bytes::<Submit>(&to_bytes(&submit)).unwrap_err();
        assert_eq!(
            err,
            MarshalError::EmptyString {
                field: "submit.askedHosts"
            }
        );
    }

    #[test]
    fn test_template_from_yaml() {
        let yaml = r#"
command: "hostname"
queue: "normal"
num_processors: 1
max_num_processors: 1
xf:
  - sub_fn: "a.txt"
    exec_fn: "/tmp/a.txt"
"#;
        let mut submit: Submit = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(submit.command, "hostname");
        assert_eq!(submit.options, 0);
        submit.imply_options();
        assert!(submit.has_option(sub_options::QUEUE));
        assert!(submit.has_option(sub_options::OTHER_FILES));
        assert!(!submit.has_option(sub_options::JOB_NAME));
        assert_eq!(submit.r_limits, [DEFAULT_RLIMIT; SUBMIT_RLIMITS]);
        assert_eq!(submit.xf[0].options, xf_options::SUB2EXEC);
        assert!(submit.validate().is_ok());
    }
}
