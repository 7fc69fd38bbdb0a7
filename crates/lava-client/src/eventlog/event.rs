//! Typed event records.
//!
//! Every line starts with the event type and format version as quoted
//! strings, then the event time in seconds since the epoch, then the
//! type-specific body. Known types decode their leading fields; the rest
//! of the line is kept verbatim in `extra`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::lexer::{Fields, Token, tokenize};

/// Kind of a logged event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EventType {
    JobNew,
    JobStart,
    JobStatus,
    JobFinish,
    JobSignal,
    JobClean,
    MbdStart,
    MbdDie,
    QueueCtrl,
    HostCtrl,
    LogSwitch,
    Other(String),
}

impl EventType {
    pub fn parse(name: &str) -> Self {
        match name {
            "JOB_NEW" => EventType::JobNew,
            "JOB_START" => EventType::JobStart,
            "JOB_STATUS" => EventType::JobStatus,
            "JOB_FINISH" => EventType::JobFinish,
            "JOB_SIGNAL" => EventType::JobSignal,
            "JOB_CLEAN" => EventType::JobClean,
            "MBD_START" => EventType::MbdStart,
            "MBD_DIE" => EventType::MbdDie,
            "QUEUE_CTRL" => EventType::QueueCtrl,
            "HOST_CTRL" => EventType::HostCtrl,
            "LOG_SWITCH" => EventType::LogSwitch,
            other => EventType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EventType::JobNew => "JOB_NEW",
            EventType::JobStart => "JOB_START",
            EventType::JobStatus => "JOB_STATUS",
            EventType::JobFinish => "JOB_FINISH",
            EventType::JobSignal => "JOB_SIGNAL",
            EventType::JobClean => "JOB_CLEAN",
            EventType::MbdStart => "MBD_START",
            EventType::MbdDie => "MBD_DIE",
            EventType::QueueCtrl => "QUEUE_CTRL",
            EventType::HostCtrl => "HOST_CTRL",
            EventType::LogSwitch => "LOG_SWITCH",
            EventType::Other(name) => name,
        }
    }
}

/// Body of an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventBody {
    JobNew {
        job_id: i64,
        user_id: i32,
        options: i32,
        num_processors: i32,
        submit_time: Option<DateTime<Utc>>,
        begin_time: Option<DateTime<Utc>>,
        term_time: Option<DateTime<Utc>>,
        sig_value: i32,
        chkpnt_period: i32,
        restart_pid: i32,
        user_name: String,
        r_limits: Vec<i32>,
        host_spec: String,
        host_factor: f64,
        umask: i32,
        queue: String,
        res_req: String,
        from_host: String,
        cwd: String,
    },
    JobStart {
        job_id: i64,
        status: i32,
        job_pid: i32,
        job_pgid: i32,
        host_factor: f64,
        ex_hosts: Vec<String>,
    },
    JobStatus {
        job_id: i64,
        status: i32,
        reason: i32,
        subreasons: i32,
        cpu_time: f64,
        end_time: Option<DateTime<Utc>>,
    },
    JobFinish {
        job_id: i64,
        user_id: i32,
        options: i32,
        num_processors: i32,
        submit_time: Option<DateTime<Utc>>,
        begin_time: Option<DateTime<Utc>>,
        term_time: Option<DateTime<Utc>>,
        start_time: Option<DateTime<Utc>>,
        user_name: String,
        queue: String,
        res_req: String,
        depend_cond: String,
        pre_exec_cmd: String,
        from_host: String,
        cwd: String,
        in_file: String,
        out_file: String,
        err_file: String,
        job_file: String,
        asked_hosts: Vec<String>,
        ex_hosts: Vec<String>,
        status: i32,
        host_factor: f64,
        job_name: String,
        command: String,
    },
    JobSignal {
        job_id: i64,
        user_id: i32,
        run_count: i32,
        signal: String,
    },
    JobClean {
        job_id: i64,
    },
    MbdStart {
        master: String,
        cluster: String,
        num_hosts: i32,
        num_queues: i32,
    },
    MbdDie {
        master: String,
        num_remove_jobs: i32,
        exit_code: i32,
    },
    QueueCtrl {
        op_code: i32,
        queue: String,
        user_id: i32,
        user_name: String,
    },
    HostCtrl {
        op_code: i32,
        host: String,
        user_id: i32,
        user_name: String,
    },
    LogSwitch {
        last_job_id: i64,
    },
    /// Event type this reader does not decode.
    Unrecognized,
}

/// One decoded log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    /// 1-based line number in the log.
    pub line: usize,
    pub event_type: EventType,
    pub version: String,
    pub event_time: DateTime<Utc>,
    pub body: EventBody,
    /// Fields after the decoded ones.
    #[serde(skip)]
    pub extra: Vec<Token>,
}

impl EventRecord {
    /// Job the event refers to, if any.
    pub fn job_id(&self) -> Option<i64> {
        match &self.body {
            EventBody::JobNew { job_id, .. }
            | EventBody::JobStart { job_id, .. }
            | EventBody::JobStatus { job_id, .. }
            | EventBody::JobFinish { job_id, .. }
            | EventBody::JobSignal { job_id, .. }
            | EventBody::JobClean { job_id } => Some(*job_id),
            _ => None,
        }
    }
}

/// A line that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedLine {
    pub line: usize,
    pub raw: String,
    pub reason: String,
}

fn time(f: &mut Fields<'_>, field: &str) -> Result<DateTime<Utc>, String> {
    let secs = f.int(field)?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("field {field}: bad timestamp {secs}"))
}

fn opt_time(f: &mut Fields<'_>, field: &str) -> Result<Option<DateTime<Utc>>, String> {
    match f.int(field)? {
        0 => Ok(None),
        secs => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or_else(|| format!("field {field}: bad timestamp {secs}")),
    }
}

fn job_id(f: &mut Fields<'_>) -> Result<i64, String> {
    let id = f.int("jobId")?;
    if id < 0 {
        return Err(format!("field jobId: negative job id {id}"));
    }
    Ok(id)
}

/// Decode one line. `line` is the 1-based line number.
pub fn parse_line(raw: &str, line: usize) -> Result<EventRecord, String> {
    let tokens = tokenize(raw)?;
    let mut f = Fields::new(&tokens);
    let event_type = EventType::parse(&f.string("eventType")?);
    let version = f.string("version")?;
    let event_time = time(&mut f, "eventTime")?;

    let body = match event_type {
        EventType::JobNew => EventBody::JobNew {
            job_id: job_id(&mut f)?,
            user_id: f.i32("userId")?,
            options: f.i32("options")?,
            num_processors: f.i32("numProcessors")?,
            submit_time: opt_time(&mut f, "submitTime")?,
            begin_time: opt_time(&mut f, "beginTime")?,
            term_time: opt_time(&mut f, "termTime")?,
            sig_value: f.i32("sigValue")?,
            chkpnt_period: f.i32("chkpntPeriod")?,
            restart_pid: f.i32("restartPid")?,
            user_name: f.string("userName")?,
            r_limits: (0..11)
                .map(|_| {
                    let v = f.i32("rLimits")?;
                    if v < -1 {
                        return Err(format!("field rLimits: {v} below -1"));
                    }
                    Ok(v)
                })
                .collect::<Result<_, String>>()?,
            host_spec: f.string("hostSpec")?,
            host_factor: f.float("hostFactor")?,
            umask: f.i32("umask")?,
            queue: f.string("queue")?,
            res_req: f.string("resReq")?,
            from_host: f.string("fromHost")?,
            cwd: f.string("cwd")?,
        },
        EventType::JobStart => EventBody::JobStart {
            job_id: job_id(&mut f)?,
            status: f.i32("jStatus")?,
            job_pid: f.i32("jobPid")?,
            job_pgid: f.i32("jobPGid")?,
            host_factor: f.float("hostFactor")?,
            ex_hosts: f.string_list("execHosts")?,
        },
        EventType::JobStatus => EventBody::JobStatus {
            job_id: job_id(&mut f)?,
            status: f.i32("jStatus")?,
            reason: f.i32("reason")?,
            subreasons: f.i32("subreasons")?,
            cpu_time: f.float("cpuTime")?,
            end_time: opt_time(&mut f, "endTime")?,
        },
        EventType::JobFinish => EventBody::JobFinish {
            job_id: job_id(&mut f)?,
            user_id: f.i32("userId")?,
            options: f.i32("options")?,
            num_processors: f.i32("numProcessors")?,
            submit_time: opt_time(&mut f, "submitTime")?,
            begin_time: opt_time(&mut f, "beginTime")?,
            term_time: opt_time(&mut f, "termTime")?,
            start_time: opt_time(&mut f, "startTime")?,
            user_name: f.string("userName")?,
            queue: f.string("queue")?,
            res_req: f.string("resReq")?,
            depend_cond: f.string("dependCond")?,
            pre_exec_cmd: f.string("preExecCmd")?,
            from_host: f.string("fromHost")?,
            cwd: f.string("cwd")?,
            in_file: f.string("inFile")?,
            out_file: f.string("outFile")?,
            err_file: f.string("errFile")?,
            job_file: f.string("jobFile")?,
            asked_hosts: f.string_list("askedHosts")?,
            ex_hosts: f.string_list("execHosts")?,
            status: f.i32("jStatus")?,
            host_factor: f.float("hostFactor")?,
            job_name: f.string("jobName")?,
            command: f.string("command")?,
        },
        EventType::JobSignal => EventBody::JobSignal {
            job_id: job_id(&mut f)?,
            user_id: f.i32("userId")?,
            run_count: f.i32("runCount")?,
            signal: f.string("signalSymbol")?,
        },
        EventType::JobClean => EventBody::JobClean {
            job_id: job_id(&mut f)?,
        },
        EventType::MbdStart => EventBody::MbdStart {
            master: f.string("master")?,
            cluster: f.string("cluster")?,
            num_hosts: f.i32("numHosts")?,
            num_queues: f.i32("numQueues")?,
        },
        EventType::MbdDie => EventBody::MbdDie {
            master: f.string("master")?,
            num_remove_jobs: f.i32("numRemoveJobs")?,
            exit_code: f.i32("exitCode")?,
        },
        EventType::QueueCtrl => EventBody::QueueCtrl {
            op_code: f.i32("opCode")?,
            queue: f.string("queue")?,
            user_id: f.i32("userId")?,
            user_name: f.string("userName")?,
        },
        EventType::HostCtrl => EventBody::HostCtrl {
            op_code: f.i32("opCode")?,
            host: f.string("host")?,
            user_id: f.i32("userId")?,
            user_name: f.string("userName")?,
        },
        EventType::LogSwitch => EventBody::LogSwitch {
            last_job_id: f.int("lastJobId")?,
        },
        EventType::Other(_) => EventBody::Unrecognized,
    };

    Ok(EventRecord {
        line,
        event_type,
        version,
        event_time,
        body,
        extra: f.rest(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_start() {
        let ev = parse_line(
            r#""JOB_START" "2.0" 1389283740 101 4 3201 3201 1.000000 2 "node01" "node02" "" "" 0 "" 0"#,
            3,
        )
        .unwrap();
        assert_eq!(ev.line, 3);
        assert_eq!(ev.event_type, EventType::JobStart);
        assert_eq!(ev.job_id(), Some(101));
        match &ev.body {
            EventBody::JobStart { ex_hosts, .. } => assert_eq!(ex_hosts, &["node01", "node02"]),
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(ev.extra.len(), 5);
    }

    #[test]
    fn test_job_new() {
        let limits = "-1 ".repeat(11);
        let line = format!(
            r#""JOB_NEW" "2.0" 1389283733 101 1000 2 1 1389283733 0 0 0 0 0 "alice" {limits}"" 1.0 18 "normal" "" "master01" "/home/alice" "hostname""#
        );
        let ev = parse_line(&line, 1).unwrap();
        match ev.body {
            EventBody::JobNew {
                job_id,
                queue,
                begin_time,
                r_limits,
                ..
            } => {
                assert_eq!(job_id, 101);
                assert_eq!(queue, "normal");
                assert_eq!(begin_time, None);
                assert_eq!(r_limits, vec![-1; 11]);
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let ev = parse_line(r#""JOB_MOVE" "2.0" 1389283733 101 1"#, 9).unwrap();
        assert_eq!(ev.event_type, EventType::Other("JOB_MOVE".into()));
        assert_eq!(ev.body, EventBody::Unrecognized);
        assert_eq!(ev.extra, vec![Token::Int(101), Token::Int(1)]);
    }

    #[test]
    fn test_truncated_line_rejected() {
        let err = parse_line(r#""JOB_STATUS" "2.0" 1389283733 101"#, 1).unwrap_err();
        assert!(err.contains("jStatus"), "{err}");
    }

    #[test]
    fn test_negative_job_id_rejected() {
        assert!(parse_line(r#""JOB_CLEAN" "2.0" 1389283733 -5 0"#, 1).is_err());
    }
}
