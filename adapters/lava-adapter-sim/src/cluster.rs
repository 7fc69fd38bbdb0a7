//! Simulated cluster state: hosts, queues, users and the job table.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::debug;

use lava_client::protocol::reply;
use lava_client::reasons::PEND_HOST_REASON;
use lava_client::records::{
    HostInfo, HostInfoEnt, HostStatus, INFINIT_INT, JobInfoEnt, JobState, LsInfo, QueueInfoEnt,
    RunRusage, Submit, UserInfoEnt, host_status, queue_attrib, queue_status, sub_options2,
};
use lava_client::records::job::JOB_COUNTERS;
use lava_client::records::queue::QUEUE_RLIMITS;
use lava_client::records::resource::{OrderType, ResItem, ValueType, res_flags};

/// Number of load indices every simulated host reports.
const NUM_INDX: usize = 11;

/// Pending because the job waits for a free slot.
const PEND_NO_SLOT: i32 = PEND_HOST_REASON + 5;
/// Pending because the queue is inactive.
const PEND_QUEUE_INACTIVE: i32 = 301;
/// Pending because of a begin time in the future.
const PEND_BEGIN_TIME: i32 = 2;
/// Pending because of an unsatisfied dependency.
const PEND_DEPENDENCY: i32 = 3;

/// Why a submission was refused: reply code and offending index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refusal {
    pub code: i32,
    pub index: i32,
}

impl Refusal {
    fn new(code: i32) -> Self {
        Self { code, index: -1 }
    }

    fn at(code: i32, index: usize) -> Self {
        Self {
            code,
            index: i32::try_from(index).unwrap_or(i32::MAX),
        }
    }
}

/// The whole state of a simulated cluster.
#[derive(Debug, Clone)]
pub struct SimCluster {
    pub cluster_name: String,
    pub master_name: String,
    pub ls_info: LsInfo,
    pub hosts: Vec<HostInfo>,
    pub host_runtime: Vec<HostInfoEnt>,
    pub queues: Vec<QueueInfoEnt>,
    pub users: Vec<UserInfoEnt>,
    pub jobs: Vec<JobInfoEnt>,
    next_job_id: i64,
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn host(name: &str, model: &str, cpu_factor: f32, max_cpus: i32) -> HostInfo {
    HostInfo {
        host_name: name.to_string(),
        host_type: "linux".to_string(),
        host_model: model.to_string(),
        cpu_factor,
        max_cpus,
        max_mem: 64_000,
        max_swap: 8_000,
        max_tmp: 100_000,
        n_disks: 1,
        resources: vec![ResItem::new("cs", ValueType::Boolean, OrderType::NotApplicable)],
        windows: "-".to_string(),
        busy_threshold: vec![f32::MAX; NUM_INDX],
        is_server: true,
        rex_priority: 0,
    }
}

fn runtime(info: &HostInfo) -> HostInfoEnt {
    HostInfoEnt {
        host: info.host_name.clone(),
        status: HostStatus(host_status::OK),
        cpu_factor: info.cpu_factor,
        windows: "-".to_string(),
        user_job_limit: -1,
        max_jobs: info.max_cpus,
        num_jobs: 0,
        num_run: 0,
        num_ssusp: 0,
        num_ususp: 0,
        num_reserve: 0,
        mig: -1,
        attr: 0,
        load: vec![0.0; NUM_INDX],
        load_sched: vec![-1.0; NUM_INDX],
        load_stop: vec![-1.0; NUM_INDX],
    }
}

fn queue(name: &str, description: &str, priority: i32, hosts: &[&str]) -> QueueInfoEnt {
    QueueInfoEnt {
        queue: name.to_string(),
        description: description.to_string(),
        priority,
        nice: 20,
        user_list: vec!["all".to_string()],
        host_list: hosts.iter().map(|h| (*h).to_string()).collect(),
        load_sched: vec![-1.0; NUM_INDX],
        load_stop: vec![-1.0; NUM_INDX],
        user_job_limit: -1,
        proc_job_limit: f32::MAX,
        windows: String::new(),
        r_limits: [-1; QUEUE_RLIMITS],
        host_spec: String::new(),
        q_attrib: 0,
        q_status: queue_status::OPEN | queue_status::ACTIVE,
        max_jobs: -1,
        num_jobs: 0,
        num_pend: 0,
        num_run: 0,
        num_ssusp: 0,
        num_ususp: 0,
        mig: -1,
        sched_delay: 0,
        accept_intvl: 0,
    }
}

fn user(name: &str, max_jobs: i32) -> UserInfoEnt {
    UserInfoEnt {
        user: name.to_string(),
        proc_job_limit: f32::MAX,
        max_jobs,
        num_start_jobs: 0,
        num_jobs: 0,
        num_pend: 0,
        num_run: 0,
        num_ssusp: 0,
        num_ususp: 0,
        num_reserve: 0,
    }
}

impl SimCluster {
    /// A cluster with no hosts and no jobs.
    pub fn empty(cluster_name: &str, master_name: &str) -> Self {
        Self {
            cluster_name: cluster_name.to_string(),
            master_name: master_name.to_string(),
            ls_info: LsInfo {
                res_table: Vec::new(),
                host_types: Vec::new(),
                host_models: Vec::new(),
                host_archs: Vec::new(),
                model_refs: Vec::new(),
                cpu_factor: Vec::new(),
                num_indx: NUM_INDX as i32,
                num_usr_indx: NUM_INDX as i32,
            },
            hosts: Vec::new(),
            host_runtime: Vec::new(),
            queues: Vec::new(),
            users: Vec::new(),
            jobs: Vec::new(),
            next_job_id: 1,
        }
    }

    /// Three hosts, five queues, three users and three seeded jobs.
    ///
    /// | queue    | state           | hosts          | users |
    /// |----------|-----------------|----------------|-------|
    /// | normal   | open, active    | node01, node02 | all   |
    /// | priority | open, active    | all            | all   |
    /// | idle     | open, inactive  | all            | all   |
    /// | night    | closed, active  | all            | all   |
    /// | admin    | open, active    | master01       | root  |
    pub fn seeded() -> Self {
        let mut cluster = Self::empty("lava", "master01");
        cluster.ls_info = LsInfo {
            res_table: vec![
                ResItem::new("cs", ValueType::Boolean, OrderType::NotApplicable)
                    .with_description("Compute server"),
                ResItem::new("mem", ValueType::Numeric, OrderType::Decreasing)
                    .with_description("Available memory (Mbytes)")
                    .with_flags(res_flags::BUILTIN | res_flags::DYNAMIC)
                    .with_interval(15),
                ResItem::new("type", ValueType::String, OrderType::NotApplicable)
                    .with_description("Host type")
                    .with_flags(res_flags::BUILTIN),
            ],
            host_types: vec!["linux".to_string()],
            host_models: vec!["IntelXeon".to_string(), "AMDEpyc".to_string()],
            host_archs: vec!["x86_64".to_string(), "x86_64".to_string()],
            model_refs: vec![0, 1],
            cpu_factor: vec![1.0, 2.0],
            num_indx: NUM_INDX as i32,
            num_usr_indx: NUM_INDX as i32,
        };

        cluster.hosts = vec![
            host("master01", "IntelXeon", 1.0, 4),
            host("node01", "AMDEpyc", 2.0, 8),
            host("node02", "AMDEpyc", 2.0, 8),
        ];
        cluster.host_runtime = cluster.hosts.iter().map(runtime).collect();

        let mut normal = queue(
            "normal",
            "For normal low priority jobs, running only if hosts are lightly loaded.",
            30,
            &["node01", "node02"],
        );
        normal.q_attrib = queue_attrib::DEFAULT;
        let priority = queue("priority", "Jobs submitted for this queue are scheduled as urgent jobs.", 43, &[]);
        let mut idle = queue("idle", "Running only if the machine is idle.", 20, &[]);
        idle.q_status = queue_status::OPEN;
        let mut night = queue("night", "For large heavy duty jobs, running during off hours.", 40, &[]);
        night.q_status = queue_status::ACTIVE;
        let mut admin = queue("admin", "Reserved for cluster administration.", 50, &["master01"]);
        admin.user_list = vec!["root".to_string()];
        cluster.queues = vec![normal, priority, idle, night, admin];

        cluster.users = vec![user("alice", INFINIT_INT), user("bob", 10), user("root", INFINIT_INT)];

        let seeds = [
            ("alice", Submit::new("sleep 3600").with_queue("normal"), JobState::Run),
            ("bob", Submit::new("./simulate --steps 100").with_queue("normal"), JobState::Pend),
            ("alice", Submit::new("hostname").with_queue("priority"), JobState::Done),
        ];
        for (owner, request, state) in seeds {
            let job_id = cluster.allocate_id();
            let mut job = cluster.new_job(job_id, owner, request);
            match state {
                JobState::Run => cluster.start(&mut job, "node01", 1),
                JobState::Done => {
                    cluster.start(&mut job, "node02", 1);
                    job.status = JobState::Done.into();
                    job.end_time = job.start_time;
                    job.cpu_time = Duration::from_millis(40);
                }
                _ => {
                    job.reasons = PEND_NO_SLOT;
                    job.reason_tb = vec![PEND_NO_SLOT, (1 << 16) | PEND_NO_SLOT];
                }
            }
            cluster.jobs.push(job);
        }
        cluster.next_job_id = 101;
        cluster.recount();
        cluster
    }

    pub fn host(&self, name: &str) -> Option<&HostInfo> {
        self.hosts.iter().find(|h| h.host_name == name)
    }

    pub fn queue(&self, name: &str) -> Option<&QueueInfoEnt> {
        self.queues.iter().find(|q| q.queue == name)
    }

    pub fn job(&self, job_id: i64) -> Option<&JobInfoEnt> {
        self.jobs.iter().find(|j| j.job_id == job_id)
    }

    fn default_queue(&self) -> Option<&QueueInfoEnt> {
        self.queues
            .iter()
            .find(|q| q.q_attrib & queue_attrib::DEFAULT != 0)
            .or_else(|| self.queues.first())
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }

    fn new_job(&self, job_id: i64, owner: &str, request: Submit) -> JobInfoEnt {
        let home = format!("/home/{owner}");
        let j_name = if request.job_name.is_empty() {
            request.command.clone()
        } else {
            request.job_name.clone()
        };
        JobInfoEnt {
            job_id,
            user: owner.to_string(),
            status: JobState::Pend.into(),
            reasons: 0,
            subreasons: 0,
            reason_tb: Vec::new(),
            job_pid: 0,
            port: -1,
            exec_uid: 1000,
            exit_status: 0,
            counter: [0; JOB_COUNTERS],
            submit_time: now(),
            reserve_time: None,
            start_time: None,
            predicted_start_time: None,
            end_time: None,
            umask: 0o022,
            j_type: 0,
            job_priority: request.user_priority,
            j_rusage_update_time: None,
            load_sched: Vec::new(),
            load_stop: Vec::new(),
            cpu_factor: 0.0,
            cpu_time: Duration::ZERO,
            cwd: home.clone(),
            sub_home_dir: home.clone(),
            from_host: self.master_name.clone(),
            exec_home: String::new(),
            exec_cwd: String::new(),
            exec_username: String::new(),
            parent_group: "/".to_string(),
            j_name,
            ex_hosts: Vec::new(),
            submit: request,
            run_rusage: RunRusage::default(),
        }
    }

    fn start(&self, job: &mut JobInfoEnt, host: &str, slots: usize) {
        job.status = JobState::Run.into();
        job.start_time = Some(now());
        job.job_pid = 10_000 + i32::try_from(job.job_id).unwrap_or(0);
        job.ex_hosts = vec![host.to_string(); slots];
        job.cpu_factor = self.host(host).map_or(1.0, |h| h.cpu_factor);
        job.exec_home = job.sub_home_dir.clone();
        job.exec_cwd = job.cwd.clone();
        job.exec_username = job.user.clone();
        job.reasons = 0;
        job.reason_tb.clear();
        job.run_rusage = RunRusage {
            mem: 0,
            swap: 0,
            utime: 0,
            stime: 0,
            ..RunRusage::default()
        };
    }

    fn free_slots(&self, host: &str) -> i32 {
        self.host_runtime
            .iter()
            .find(|h| h.host == host && h.status.raw() == host_status::OK)
            .map_or(0, |h| h.max_jobs - h.num_jobs)
    }

    /// Admit a job submitted by `owner`. Returns the new job id and the
    /// queue it landed in.
    pub fn admit(&mut self, owner: &str, mut request: Submit) -> Result<(i64, String), Refusal> {
        if request.queue.is_empty() {
            request.queue = self
                .default_queue()
                .map(|q| q.queue.clone())
                .ok_or(Refusal::new(reply::QUEUE_NAME))?;
        }
        let queue = self
            .queue(&request.queue)
            .cloned()
            .ok_or(Refusal::new(reply::BAD_QUEUE))?;

        if !self.users.iter().any(|u| u.user == owner) {
            return Err(Refusal::new(reply::BAD_USER));
        }
        if !queue.user_list.iter().any(|u| u == "all" || u == owner) {
            return Err(Refusal::new(reply::PERMISSION));
        }
        if !queue.is_open() {
            return Err(Refusal::new(reply::QUEUE_CLOSED));
        }
        if let Some(idx) = request
            .asked_hosts
            .iter()
            .position(|h| self.host(h).is_none())
        {
            return Err(Refusal::at(reply::BAD_HOST, idx));
        }

        let candidates: Vec<String> = if !request.asked_hosts.is_empty() {
            request.asked_hosts.clone()
        } else if !queue.host_list.is_empty() {
            queue.host_list.clone()
        } else {
            self.hosts.iter().map(|h| h.host_name.clone()).collect()
        };

        let slots = request.num_processors.max(1);
        let widest = candidates
            .iter()
            .filter_map(|h| self.host(h))
            .map(|h| h.max_cpus)
            .max()
            .unwrap_or(0);
        if slots > widest {
            return Err(Refusal::new(reply::PROC_NUM));
        }

        let job_id = self.allocate_id();
        let mut job = self.new_job(job_id, owner, request);
        let submit = &job.submit;

        if submit.options2 & sub_options2::HOLD != 0 {
            job.status = JobState::Psusp.into();
        } else if !queue.is_active() {
            job.reasons = PEND_QUEUE_INACTIVE;
            job.reason_tb = vec![PEND_QUEUE_INACTIVE];
        } else if submit.begin_time.is_some_and(|t| t > job.submit_time) {
            job.reasons = PEND_BEGIN_TIME;
            job.reason_tb = vec![PEND_BEGIN_TIME];
        } else if !submit.depend_cond.is_empty() {
            job.reasons = PEND_DEPENDENCY;
            job.reason_tb = vec![PEND_DEPENDENCY];
        } else if let Some(host) = candidates.iter().find(|h| self.free_slots(h) >= slots) {
            let host = host.clone();
            self.start(&mut job, &host, slots as usize);
        } else {
            job.reasons = PEND_NO_SLOT;
            job.reason_tb = candidates
                .iter()
                .filter_map(|c| self.hosts.iter().position(|h| &h.host_name == c))
                .map(|idx| ((idx as i32) << 16) | PEND_NO_SLOT)
                .collect();
        }

        debug!(job_id, state = %job.state(), queue = %queue.queue, "Admitted job");
        let queue_name = queue.queue;
        self.jobs.push(job);
        self.recount();
        Ok((job_id, queue_name))
    }

    /// Mark a job finished, releasing its slots.
    pub fn finish(&mut self, job_id: i64, exit_status: i32) -> bool {
        let Some(job) = self.jobs.iter_mut().find(|j| j.job_id == job_id) else {
            return false;
        };
        job.status = if exit_status == 0 {
            JobState::Done.into()
        } else {
            JobState::Exit.into()
        };
        job.exit_status = exit_status;
        job.end_time = Some(now());
        self.recount();
        true
    }

    /// Recompute host, queue and user counters from the job table.
    pub fn recount(&mut self) {
        for h in &mut self.host_runtime {
            h.num_jobs = 0;
            h.num_run = 0;
            h.num_ssusp = 0;
            h.num_ususp = 0;
        }
        for q in &mut self.queues {
            q.num_jobs = 0;
            q.num_pend = 0;
            q.num_run = 0;
            q.num_ssusp = 0;
            q.num_ususp = 0;
        }
        for u in &mut self.users {
            u.num_start_jobs = 0;
            u.num_jobs = 0;
            u.num_pend = 0;
            u.num_run = 0;
            u.num_ssusp = 0;
            u.num_ususp = 0;
        }

        for job in self.jobs.iter().filter(|j| !j.state().is_finished()) {
            let state = job.state();
            let started = matches!(state, JobState::Run | JobState::Ssusp | JobState::Ususp);
            for ex in &job.ex_hosts {
                if let Some(h) = self.host_runtime.iter_mut().find(|h| &h.host == ex) {
                    h.num_jobs += 1;
                    match state {
                        JobState::Run => h.num_run += 1,
                        JobState::Ssusp => h.num_ssusp += 1,
                        JobState::Ususp => h.num_ususp += 1,
                        _ => {}
                    }
                }
            }
            if let Some(q) = self.queues.iter_mut().find(|q| q.queue == job.queue()) {
                q.num_jobs += 1;
                match state {
                    JobState::Pend | JobState::Psusp => q.num_pend += 1,
                    JobState::Run => q.num_run += 1,
                    JobState::Ssusp => q.num_ssusp += 1,
                    JobState::Ususp => q.num_ususp += 1,
                    _ => {}
                }
            }
            if let Some(u) = self.users.iter_mut().find(|u| u.user == job.user) {
                u.num_jobs += 1;
                if started {
                    u.num_start_jobs += 1;
                }
                match state {
                    JobState::Pend | JobState::Psusp => u.num_pend += 1,
                    JobState::Run => u.num_run += 1,
                    JobState::Ssusp => u.num_ssusp += 1,
                    JobState::Ususp => u.num_ususp += 1,
                    _ => {}
                }
            }
        }
    }
}

impl Default for SimCluster {
    fn default() -> Self {
        Self::seeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_counters() {
        let cluster = SimCluster::seeded();
        let node01 = cluster.host_runtime.iter().find(|h| h.host == "node01").unwrap();
        assert_eq!(node01.num_jobs, 1);
        assert_eq!(node01.num_run, 1);

        let normal = cluster.queue("normal").unwrap();
        assert_eq!(normal.num_jobs, 2);
        assert_eq!(normal.num_pend, 1);
        assert_eq!(normal.num_run, 1);
    }

    #[test]
    fn test_first_fit_starts_job() {
        let mut cluster = SimCluster::seeded();
        let (job_id, queue) = cluster
            .admit("alice", Submit::new("hostname").with_processors(2, 2))
            .unwrap();
        assert_eq!(job_id, 101);
        assert_eq!(queue, "normal");
        let job = cluster.job(job_id).unwrap();
        assert_eq!(job.state(), JobState::Run);
        assert_eq!(job.ex_hosts, vec!["node01", "node01"]);
        assert_eq!(job.submit.queue, "normal");
    }

    #[test]
    fn test_full_hosts_leave_job_pending() {
        let mut cluster = SimCluster::seeded();
        for _ in 0..2 {
            cluster
                .admit("alice", Submit::new("sleep 1").with_processors(8, 8).with_queue("normal"))
                .ok();
        }
        let (job_id, _) = cluster
            .admit("alice", Submit::new("sleep 1").with_processors(8, 8).with_queue("normal"))
            .unwrap();
        let job = cluster.job(job_id).unwrap();
        assert_eq!(job.state(), JobState::Pend);
        assert_eq!(job.reason_tb.len(), 2);
    }

    #[test]
    fn test_refusals() {
        let mut cluster = SimCluster::seeded();
        assert_eq!(
            cluster.admit("alice", Submit::new("x").with_queue("nosuch")),
            Err(Refusal { code: reply::BAD_QUEUE, index: -1 })
        );
        assert_eq!(
            cluster
                .admit("alice", Submit::new("x").with_hosts(["node02", "node09"]))
                .unwrap_err(),
            Refusal { code: reply::BAD_HOST, index: 1 }
        );
        assert_eq!(
            cluster.admit("alice", Submit::new("x").with_processors(64, 64)).unwrap_err().code,
            reply::PROC_NUM
        );
        assert_eq!(
            cluster.admit("alice", Submit::new("x").with_queue("admin")).unwrap_err().code,
            reply::PERMISSION
        );
        assert_eq!(
            cluster.admit("alice", Submit::new("x").with_queue("night")).unwrap_err().code,
            reply::QUEUE_CLOSED
        );
    }

    #[test]
    fn test_hold_and_inactive_queue() {
        let mut cluster = SimCluster::seeded();
        let mut held = Submit::new("x");
        held.options2 |= sub_options2::HOLD;
        let (id, _) = cluster.admit("bob", held).unwrap();
        assert_eq!(cluster.job(id).unwrap().state(), JobState::Psusp);

        let (id, _) = cluster.admit("bob", Submit::new("x").with_queue("idle")).unwrap();
        assert_eq!(cluster.job(id).unwrap().reasons, PEND_QUEUE_INACTIVE);
    }

    #[test]
    fn test_finish_releases_slots() {
        let mut cluster = SimCluster::seeded();
        assert!(cluster.finish(1, 0));
        let node01 = cluster.host_runtime.iter().find(|h| h.host == "node01").unwrap();
        assert_eq!(node01.num_jobs, 0);
        assert_eq!(cluster.job(1).unwrap().state(), JobState::Done);
        assert!(!cluster.finish(9999, 0));
    }
}
