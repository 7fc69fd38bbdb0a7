//! Simulated master: answers protocol requests from a [`SimCluster`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use lava_client::error::{LavaError, LavaResult};
use lava_client::protocol::{List, OpCode, PROTOCOL_VERSION, Packet, decode_names, reply};
use lava_client::records::{JobFilter, JobInfoEnt, JobState, Submit};
use lava_client::transport::Transport;
use lava_client::xdr::{MarshalError, XdrDecoder, XdrEncode, XdrEncoder, from_bytes};

use crate::cluster::SimCluster;

/// Cluster state shared by every connection to one simulated master.
pub type SharedCluster = Arc<Mutex<SimCluster>>;

/// Injected failures.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Every exchange fails with a connection error.
    pub offline: bool,
    /// Delay before each reply.
    pub latency: Option<Duration>,
}

impl Faults {
    pub fn offline() -> Self {
        Self {
            offline: true,
            latency: None,
        }
    }

    pub fn latency(delay: Duration) -> Self {
        Self {
            offline: false,
            latency: Some(delay),
        }
    }
}

/// One connection to the simulated master.
///
/// Each connection has its own job cursor, a snapshot of the matching jobs
/// taken when the cursor was opened. Cluster state is shared.
#[derive(Debug)]
pub struct SimMaster {
    cluster: SharedCluster,
    user: String,
    app_name: Option<String>,
    cursor: Option<VecDeque<JobInfoEnt>>,
    pub faults: Faults,
}

impl SimMaster {
    /// A connection to `cluster`, acting for user `alice`.
    pub fn new(cluster: SharedCluster) -> Self {
        Self {
            cluster,
            user: "alice".to_string(),
            app_name: None,
            cursor: None,
            faults: Faults::default(),
        }
    }

    /// A connection to a fresh seeded cluster.
    pub fn seeded() -> Self {
        Self::new(Arc::new(Mutex::new(SimCluster::seeded())))
    }

    /// Act for `user` when submitting.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_faults(mut self, faults: Faults) -> Self {
        self.faults = faults;
        self
    }

    pub fn cluster(&self) -> SharedCluster {
        Arc::clone(&self.cluster)
    }

    /// Application name announced by the client, once initialised.
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    /// Answer one request.
    #[instrument(skip(self, request), fields(op = request.op_code))]
    pub async fn handle(&mut self, request: Packet) -> Packet {
        if request.version != PROTOCOL_VERSION {
            warn!(version = request.version, "Unsupported protocol version");
            return Packet::error(reply::PROTOCOL);
        }
        let Some(op) = request.op() else {
            warn!("Unknown operation code");
            return Packet::error(reply::PROTOCOL);
        };
        match self.dispatch(op, &request.body).await {
            Ok(packet) => {
                debug!(op = op.name(), code = packet.op_code, "Answered request");
                packet
            }
            Err(e) => {
                warn!(op = op.name(), error = %e, "Malformed request body");
                Packet::error(reply::PROTOCOL)
            }
        }
    }

    async fn dispatch(&mut self, op: OpCode, body: &[u8]) -> Result<Packet, MarshalError> {
        let packet = match op {
            OpCode::Init => {
                let mut dec = XdrDecoder::new(body);
                let app = dec.name("init.appName")?;
                let version = dec.string("init.version")?;
                dec.finish()?;
                debug!(app = %app, client_version = %version, "Client initialised");
                self.app_name = Some(app);
                self.cursor = None;
                Packet::reply(reply::NO_ERROR, Vec::new())
            }
            OpCode::ClusterName => name_reply(&self.cluster.lock().await.cluster_name),
            OpCode::MasterName => name_reply(&self.cluster.lock().await.master_name),
            OpCode::LsInfo => Packet::ok_with(&self.cluster.lock().await.ls_info),
            OpCode::HostInfo => {
                let names = decode_names(body)?;
                let cluster = self.cluster.lock().await;
                select(&cluster.hosts, &names, reply::BAD_HOST, |h, n| {
                    h.host_name == n
                })
            }
            OpCode::HostRuntimeInfo => {
                let names = decode_names(body)?;
                let cluster = self.cluster.lock().await;
                select(&cluster.host_runtime, &names, reply::BAD_HOST, |h, n| {
                    h.host == n
                })
            }
            OpCode::QueueInfo => {
                let names = decode_names(body)?;
                let cluster = self.cluster.lock().await;
                select(&cluster.queues, &names, reply::BAD_QUEUE, |q, n| q.queue == n)
            }
            OpCode::UserInfo => {
                let mut names = decode_names(body)?;
                if names.iter().any(|n| n == "all") {
                    names.clear();
                }
                let cluster = self.cluster.lock().await;
                select(&cluster.users, &names, reply::BAD_USER, |u, n| u.user == n)
            }
            OpCode::OpenJobInfo => {
                let filter: JobFilter = from_bytes(body)?;
                let cluster = self.cluster.lock().await;
                let matching: VecDeque<JobInfoEnt> = cluster
                    .jobs
                    .iter()
                    .filter(|j| filter.matches(j))
                    .cloned()
                    .collect();
                let count = matching.len();
                self.cursor = Some(matching);
                if count == 0 {
                    Packet::error(reply::NO_JOB)
                } else {
                    let mut enc = XdrEncoder::new();
                    enc.put_count(count);
                    Packet::reply(reply::NO_ERROR, enc.into_bytes())
                }
            }
            OpCode::ReadJobInfo => match self.cursor.as_mut() {
                None => Packet::error(reply::BAD_ARG),
                Some(jobs) => match jobs.pop_front() {
                    Some(job) => Packet::ok_with(&job),
                    None => Packet::error(reply::EOF),
                },
            },
            OpCode::CloseJobInfo => {
                self.cursor = None;
                Packet::reply(reply::NO_ERROR, Vec::new())
            }
            OpCode::Submit => {
                let request: Submit = from_bytes(body)?;
                let asked_queue = request.queue.clone();
                let mut cluster = self.cluster.lock().await;
                match cluster.admit(&self.user, request) {
                    Ok((job_id, queue)) => {
                        let mut enc = XdrEncoder::new();
                        enc.put_i64(job_id);
                        enc.put_str(&queue);
                        Packet::reply(reply::NO_ERROR, enc.into_bytes())
                    }
                    Err(refusal) => {
                        let mut enc = XdrEncoder::new();
                        enc.put_i32(refusal.index);
                        enc.put_str(&asked_queue);
                        Packet::reply(refusal.code, enc.into_bytes())
                    }
                }
            }
            OpCode::PeekJob => {
                let mut dec = XdrDecoder::new(body);
                let job_id = dec.i64("peekJob.jobId")?;
                dec.finish()?;
                let cluster = self.cluster.lock().await;
                peek(cluster.job(job_id))
            }
        };
        Ok(packet)
    }
}

fn name_reply(name: &str) -> Packet {
    let mut enc = XdrEncoder::new();
    enc.put_str(name);
    Packet::reply(reply::NO_ERROR, enc.into_bytes())
}

/// Every item when `names` is empty, otherwise the named items in request
/// order. An unknown name fails the whole request with `missing`.
fn select<T: Clone + XdrEncode>(
    items: &[T],
    names: &[String],
    missing: i32,
    is_named: impl Fn(&T, &str) -> bool,
) -> Packet {
    if names.is_empty() {
        return Packet::ok_with(&List(items));
    }
    let mut picked = Vec::with_capacity(names.len());
    for name in names {
        match items.iter().find(|item| is_named(item, name.as_str())) {
            Some(item) => picked.push(item.clone()),
            None => return Packet::error(missing),
        }
    }
    Packet::ok_with(&List(&picked))
}

fn peek(job: Option<&JobInfoEnt>) -> Packet {
    let Some(job) = job else {
        return Packet::error(reply::NO_JOB);
    };
    match job.state() {
        JobState::Run | JobState::Ssusp | JobState::Ususp => {
            let path = format!("{}/.lsbatch/{}.out", job.exec_home, job.job_id);
            name_reply(&path)
        }
        JobState::Done | JobState::Exit => Packet::error(reply::JOB_FINISH),
        _ => Packet::error(reply::NOT_STARTED),
    }
}

#[async_trait]
impl Transport for SimMaster {
    async fn exchange(&mut self, request: Packet) -> LavaResult<Packet> {
        if self.faults.offline {
            return Err(LavaError::Connection("simulated master is offline".to_string()));
        }
        if let Some(delay) = self.faults.latency {
            tokio::time::sleep(delay).await;
        }
        Ok(self.handle(request).await)
    }

    async fn reset(&mut self) {
        self.cursor = None;
    }

    fn endpoint(&self) -> String {
        format!("sim://{}", self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_client::protocol::{Names, decode_list};
    use lava_client::records::{HostInfo, QueueInfoEnt};
    use lava_client::xdr::to_bytes;

    fn names(list: &[&str]) -> Vec<u8> {
        let owned: Vec<String> = list.iter().map(|s| (*s).to_string()).collect();
        to_bytes(&Names(&owned))
    }

    #[tokio::test]
    async fn test_unknown_op_is_protocol_error() {
        let mut master = SimMaster::seeded();
        let reply = master.handle(Packet::reply(999, Vec::new())).await;
        assert_eq!(reply.op_code, reply::PROTOCOL);
    }

    #[tokio::test]
    async fn test_wrong_version_is_protocol_error() {
        let mut master = SimMaster::seeded();
        let mut request = Packet::request(OpCode::ClusterName, Vec::new());
        request.version = 1;
        assert_eq!(master.handle(request).await.op_code, reply::PROTOCOL);
    }

    #[tokio::test]
    async fn test_host_filter() {
        let mut master = SimMaster::seeded();
        let reply = master
            .handle(Packet::request(OpCode::HostInfo, names(&["node02", "master01"])))
            .await;
        let hosts: Vec<HostInfo> = decode_list(&reply.body, "hosts").unwrap();
        let got: Vec<_> = hosts.iter().map(|h| h.host_name.as_str()).collect();
        assert_eq!(got, vec!["node02", "master01"]);

        let reply = master
            .handle(Packet::request(OpCode::HostInfo, names(&["node01", "nosuch"])))
            .await;
        assert_eq!(reply.op_code, reply::BAD_HOST);
    }

    #[tokio::test]
    async fn test_all_queues() {
        let mut master = SimMaster::seeded();
        let reply = master
            .handle(Packet::request(OpCode::QueueInfo, names(&[])))
            .await;
        let queues: Vec<QueueInfoEnt> = decode_list(&reply.body, "queues").unwrap();
        assert_eq!(queues.len(), 5);
    }

    #[tokio::test]
    async fn test_read_without_cursor() {
        let mut master = SimMaster::seeded();
        let reply = master
            .handle(Packet::request(OpCode::ReadJobInfo, Vec::new()))
            .await;
        assert_eq!(reply.op_code, reply::BAD_ARG);
    }

    #[tokio::test]
    async fn test_peek_states() {
        let cluster = SimCluster::seeded();
        assert_eq!(peek(cluster.job(1)).op_code, reply::NO_ERROR);
        assert_eq!(peek(cluster.job(2)).op_code, reply::NOT_STARTED);
        assert_eq!(peek(cluster.job(3)).op_code, reply::JOB_FINISH);
        assert_eq!(peek(cluster.job(77)).op_code, reply::NO_JOB);
    }

    #[tokio::test]
    async fn test_offline_fault() {
        let mut master = SimMaster::seeded().with_faults(Faults::offline());
        let err = master
            .exchange(Packet::request(OpCode::ClusterName, Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, LavaError::Connection(_)));
    }
}
