//! Rendering of pending and suspension reason codes.
//!
//! A pending job carries a reason table: each entry packs a reason code in
//! the low 16 bits and the index of the host it applies to in the high 16
//! bits. Host-specific reasons are counted across hosts; everything else
//! is listed once. Load reasons name the load index through a
//! [`LoadIndexLog`].

use rustc_hash::FxHashMap;

use crate::records::{JobInfoEnt, LoadIndexLog};

/// First job-related pending reason.
pub const PEND_JOB_REASON: i32 = 0;
/// First queue-related pending reason.
pub const PEND_QUEUE_REASON: i32 = 300;
/// First user-related pending reason.
pub const PEND_USER_REASON: i32 = 600;
/// First host-related pending reason.
pub const PEND_HOST_REASON: i32 = 1000;
/// First per-host load-index reason; the offset is the load index.
pub const PEND_HOST_LOAD: i32 = 3000;
/// One past the last load-index reason.
const PEND_HOST_LOAD_END: i32 = 4000;

/// Suspension reason bits.
pub mod susp {
    pub const USER_STOP: i32 = 0x0000_0002;
    pub const ADMIN_STOP: i32 = 0x0000_0004;
    pub const QUEUE_WINDOW: i32 = 0x0000_0008;
    pub const RESCHED_PREEMPT: i32 = 0x0000_0010;
    pub const HOST_LOCK: i32 = 0x0000_0020;
    pub const LOAD_REASON: i32 = 0x0000_0040;
    pub const MBD_PREEMPT: i32 = 0x0000_0080;
    pub const SBD_PREEMPT: i32 = 0x0000_0100;
    pub const QUE_STOP_COND: i32 = 0x0000_0200;
    pub const QUE_RESUME_COND: i32 = 0x0000_0400;
    pub const PG_IT: i32 = 0x0000_0800;
    pub const REASON_RESET: i32 = 0x0000_1000;
    pub const LOAD_UNAVAIL: i32 = 0x0000_2000;
    pub const RES_RESERVE: i32 = 0x0000_8000;
    pub const MBD_LOCK: i32 = 0x0001_0000;
    pub const RES_LIMIT: i32 = 0x0002_0000;
}

fn pending_text(code: i32) -> Option<&'static str> {
    let text = match code {
        1 => "New job is waiting for scheduling",
        2 => "The job has a specified start time",
        3 => "Job dependency condition not satisfied",
        4 => "Dependency condition invalid or never satisfied",
        5 => "Migrating job is waiting for rescheduling",
        6 => "The job's pre-exec command exited with non-zero status",
        7 => "Unable to access job file",
        8 => "Unable to set job's environment variables",
        9 => "Unable to determine job's home/working directories",
        10 => "Unable to open job's I/O buffers",
        11 => "Job execution initialization failed",
        12 => "Unable to copy restarting job's checkpoint files",
        13 => "The schedule of the job is postponed for a while",
        14 => "Waiting for re-scheduling after switching queue",
        17 => "Failed to get user password",
        19 => "Waiting for re-scheduling after parameters have been changed",
        23 => "Requeue the job for the next run",
        35 => "System is not able to dispatch the job",
        38 => "The job array has reached its running element limit",

        301 => "The queue is inactivated by the administrator",
        302 => "The queue is inactivated by its time windows",
        303 => "The queue has reached its job slot limit",
        304 => "The user has reached the per-user job slot limit of the queue",
        305 => "Not enough per-user job slots of the queue for the parallel job",
        306 => "The queue's pre-exec command exited with non-zero status",
        310 => "System is not ready for scheduling after reconfiguration",
        311 => "Requeued job is waiting for rescheduling",
        312 => "Not enough hosts to meet the job's spanning requirement",
        313 => "Not enough hosts to meet the queue's spanning requirement",
        314 => "The queue has not enough job slots for the parallel job",
        315 => "Job will not finish before queue's run window is closed",
        316 => "Job no longer satisfies queue PROCLIMIT configuration",

        601 => "The user has reached the job slot limit",
        602 => "One of the user's groups has reached its job slot limit",
        603 => "The user has not enough job slots for the parallel job",
        604 => "One of user's groups has not enough job slots for the parallel job",
        605 => "Waiting for scheduling after resumed by user",
        607 => "The job was suspended by the user while pending",
        608 => "The job was suspended by the administrator while pending",
        609 => "Unable to determine user account for execution",
        610 => "The user has no permission to run the job on remote host",

        1001 => "Job's resource requirements not satisfied",
        1002 => "Job's requirement for exclusive execution not satisfied",
        1003 => "Higher or equal priority jobs suspended by host load",
        1004 => "Job's requirements for resource reservation not satisfied",
        1005 => "Not enough job slots",
        1006 => "Closed by the administrator",
        1007 => "Host is locked",
        1008 => "Not specified in job submission",
        1009 => "Not used by the queue",
        1010 => "Host's run window is closed",
        1011 => "Job slot limit reached",
        1012 => "Queue's per-host job slot limit reached",
        1013 => "User's per-host job slot limit reached",
        1014 => "User group's per-host job slot limit reached",
        1015 => "Host is unreachable",
        1016 => "Load information unavailable",
        1017 => "Host is closed because it is full",
        _ => return None,
    };
    Some(text)
}

fn is_host_reason(code: i32) -> bool {
    code > PEND_HOST_REASON
}

fn load_reason_text(index: usize, load: &LoadIndexLog) -> String {
    match load.name(index) {
        Some(name) => format!("The {name} load index is beyond its threshold"),
        None => format!("Load index {index} is beyond its threshold"),
    }
}

fn pending_reason_text(code: i32, load: &LoadIndexLog) -> String {
    if (PEND_HOST_LOAD..PEND_HOST_LOAD_END).contains(&code) {
        return load_reason_text((code - PEND_HOST_LOAD) as usize, load);
    }
    pending_text(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unknown pending reason code {code}"))
}

/// Split a reason table entry into (reason code, host index).
pub fn split_reason(entry: i32) -> (i32, i32) {
    (entry & 0xFFFF, (entry >> 16) & 0xFFFF)
}

/// Aggregate a reason table into one line per distinct reason, in order of
/// first appearance. Host reasons carry the number of hosts they apply to.
pub fn pending_reason_list(reason_tb: &[i32], load: &LoadIndexLog) -> Vec<String> {
    let mut order: Vec<i32> = Vec::new();
    let mut hosts: FxHashMap<i32, Vec<i32>> = FxHashMap::default();
    for &entry in reason_tb {
        let (code, host) = split_reason(entry);
        if code == 0 {
            continue;
        }
        let seen = hosts.entry(code).or_default();
        if seen.is_empty() && !order.contains(&code) {
            order.push(code);
        }
        if !seen.contains(&host) {
            seen.push(host);
        }
    }

    order
        .into_iter()
        .map(|code| {
            let text = pending_reason_text(code, load);
            let n = hosts.get(&code).map_or(0, Vec::len);
            if is_host_reason(code) {
                let noun = if n == 1 { "host" } else { "hosts" };
                format!("{text}: {n} {noun}")
            } else {
                text
            }
        })
        .collect()
}

/// Render a reason table, one `reason;` line per distinct reason.
pub fn decode_pending_reason(reason_tb: &[i32], load: &LoadIndexLog) -> String {
    pending_reason_list(reason_tb, load)
        .into_iter()
        .map(|line| format!(" {line};"))
        .collect::<Vec<_>>()
        .join("\n")
}

const SUSPEND_TEXT: [(i32, &str); 15] = [
    (susp::USER_STOP, "The job was suspended by user"),
    (susp::ADMIN_STOP, "The job was suspended by the administrator"),
    (susp::QUEUE_WINDOW, "The run window of the queue is closed"),
    (susp::RESCHED_PREEMPT, "The job was preempted for rescheduling"),
    (susp::HOST_LOCK, "The execution host is locked"),
    (susp::MBD_PREEMPT, "The job was preempted by a higher priority job"),
    (susp::SBD_PREEMPT, "The job was preempted by the execution host"),
    (susp::QUE_STOP_COND, "The queue's stop condition is satisfied"),
    (susp::QUE_RESUME_COND, "The queue's resume condition is not satisfied"),
    (susp::PG_IT, "The job was suspended due to paging rate and idle time"),
    (susp::REASON_RESET, "The job's suspension reason was reset"),
    (susp::LOAD_UNAVAIL, "Load information on the execution host is unavailable"),
    (susp::RES_RESERVE, "The job is holding a resource reservation"),
    (susp::MBD_LOCK, "The execution host is locked by the master"),
    (susp::RES_LIMIT, "The job reached a resource limit"),
];

/// Render a suspension reason bitmask. `subreasons` names the load index
/// when the load bit is set.
pub fn decode_suspend_reason(reasons: i32, subreasons: i32, load: &LoadIndexLog) -> String {
    let mut parts = Vec::new();
    let mut known = 0;
    for (bit, text) in SUSPEND_TEXT {
        known |= bit;
        if reasons & bit != 0 {
            parts.push(text.to_string());
        }
    }
    known |= susp::LOAD_REASON;
    if reasons & susp::LOAD_REASON != 0 {
        let index = usize::try_from(subreasons).unwrap_or(usize::MAX);
        parts.push(load_reason_text(index, load));
    }
    let unknown = reasons & !known;
    if unknown != 0 {
        parts.push(format!("Unknown suspending reason code {unknown:#x}"));
    }
    if parts.is_empty() {
        return "Unknown suspending reason".to_string();
    }
    parts.join("; ")
}

/// Pending reasons of `job`, falling back to its main reason code when the
/// table is empty.
pub fn job_pending_reasons(job: &JobInfoEnt, load: &LoadIndexLog) -> Vec<String> {
    if job.reason_tb.is_empty() && job.reasons != 0 {
        return vec![pending_reason_text(job.reasons, load)];
    }
    pending_reason_list(&job.reason_tb, load)
}
