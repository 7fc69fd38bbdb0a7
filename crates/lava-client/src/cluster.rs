//! Cluster, host, queue and user queries.
//!
//! All of these are stateless request/reply calls. List queries take a
//! name filter; an empty filter selects everything. An empty result is a
//! success and leaves the register at `NoError`.

use tracing::debug;

use crate::error::{LavaError, LavaResult};
use crate::protocol::{Names, OpCode, decode_list, query_kind};
use crate::records::{HostInfo, HostInfoEnt, LsInfo, QueueInfoEnt, UserInfoEnt};
use crate::session::{Session, expect_ok};
use crate::transport::Transport;
use crate::xdr::{XdrDecode, XdrDecoder, to_bytes};

impl<T: Transport> Session<T> {
    /// Name of the cluster the master serves.
    pub async fn cluster_name(&mut self) -> LavaResult<String> {
        let result = self.fetch_name(OpCode::ClusterName).await;
        self.last.record(result)
    }

    /// Host name of the current master.
    pub async fn master_name(&mut self) -> LavaResult<String> {
        let result = self.fetch_name(OpCode::MasterName).await;
        self.last.record(result)
    }

    /// Cluster-wide resource, host type and host model tables.
    pub async fn static_info(&mut self) -> LavaResult<LsInfo> {
        let result = self.fetch_record(OpCode::LsInfo).await;
        self.last.record(result)
    }

    /// Static capability records for `hosts`, or for every host.
    pub async fn host_info(&mut self, hosts: &[String]) -> LavaResult<Vec<HostInfo>> {
        let result = self.fetch_list(OpCode::HostInfo, hosts, "hostInfo.count").await;
        self.last.record(result)
    }

    /// Host type of `host`.
    pub async fn host_type(&mut self, host: &str) -> LavaResult<String> {
        let result = self.lookup_host(host).await.map(|h| h.host_type);
        self.last.record(result)
    }

    /// Host model of `host`.
    pub async fn host_model(&mut self, host: &str) -> LavaResult<String> {
        let result = self.lookup_host(host).await.map(|h| h.host_model);
        self.last.record(result)
    }

    /// CPU factor of `host`.
    pub async fn host_factor(&mut self, host: &str) -> LavaResult<f32> {
        let result = self.lookup_host(host).await.map(|h| h.cpu_factor);
        self.last.record(result)
    }

    /// Batch state of `queues`, or of every queue.
    pub async fn queue_info(&mut self, queues: &[String]) -> LavaResult<Vec<QueueInfoEnt>> {
        let result = self
            .fetch_list(OpCode::QueueInfo, queues, "queueInfo.count")
            .await;
        self.last.record(result)
    }

    /// Batch state of `hosts`, or of every host.
    pub async fn host_runtime_info(&mut self, hosts: &[String]) -> LavaResult<Vec<HostInfoEnt>> {
        let result = self
            .fetch_list(OpCode::HostRuntimeInfo, hosts, "hostInfoEnt.count")
            .await;
        self.last.record(result)
    }

    /// Job counts and limits for `users`, or for every user.
    pub async fn user_info(&mut self, users: &[String]) -> LavaResult<Vec<UserInfoEnt>> {
        let result = self
            .fetch_list(OpCode::UserInfo, users, "userInfo.count")
            .await;
        self.last.record(result)
    }

    async fn fetch_name(&mut self, op: OpCode) -> LavaResult<String> {
        let reply = self.call(op, Vec::new()).await?;
        expect_ok(op, &reply, query_kind)?;
        let mut dec = XdrDecoder::new(&reply.body);
        let name = dec.name("name")?;
        dec.finish()?;
        Ok(name)
    }

    async fn fetch_record<R: XdrDecode>(&mut self, op: OpCode) -> LavaResult<R> {
        let reply = self.call(op, Vec::new()).await?;
        expect_ok(op, &reply, query_kind)?;
        Ok(reply.decode_body()?)
    }

    async fn fetch_list<R: XdrDecode>(
        &mut self,
        op: OpCode,
        names: &[String],
        field: &'static str,
    ) -> LavaResult<Vec<R>> {
        let reply = self.call(op, to_bytes(&Names(names))).await?;
        expect_ok(op, &reply, query_kind)?;
        let items: Vec<R> = decode_list(&reply.body, field)?;
        debug!(op = op.name(), count = items.len(), "Decoded list reply");
        Ok(items)
    }

    async fn lookup_host(&mut self, host: &str) -> LavaResult<HostInfo> {
        let filter = [host.to_string()];
        let hosts: Vec<HostInfo> = self
            .fetch_list(OpCode::HostInfo, &filter, "hostInfo.count")
            .await?;
        hosts
            .into_iter()
            .find(|h| h.host_name == host)
            .ok_or_else(|| LavaError::NotFound(format!("host {host}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::protocol::{List, Packet, reply};
    use crate::records::{OrderType, ResItem, ValueType};
    use crate::session::testing::ScriptedTransport;
    use crate::xdr::XdrEncoder;
    use crate::{ClientConfig, LavaError, Session};

    use super::*;

    fn name_reply(name: &str) -> Packet {
        let mut enc = XdrEncoder::new();
        enc.put_str(name);
        Packet::reply(0, enc.into_bytes())
    }

    fn host(name: &str) -> HostInfo {
        HostInfo {
            host_name: name.into(),
            host_type: "linux".into(),
            host_model: "x86_64".into(),
            cpu_factor: 2.5,
            max_cpus: 8,
            max_mem: 1024,
            max_swap: 0,
            max_tmp: 0,
            n_disks: 0,
            resources: vec![ResItem::new("cs", ValueType::Boolean, OrderType::NotApplicable)],
            windows: "-".into(),
            busy_threshold: vec![],
            is_server: true,
            rex_priority: 0,
        }
    }

    async fn session_with(replies: Vec<Packet>) -> Session<ScriptedTransport> {
        let mut transport = ScriptedTransport::ready();
        for r in replies {
            transport.push(r);
        }
        Session::init(transport, ClientConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_names() {
        let mut session = session_with(vec![name_reply("lava"), name_reply("master01")]).await;
        assert_eq!(session.cluster_name().await.unwrap(), "lava");
        assert_eq!(session.master_name().await.unwrap(), "master01");
        assert_eq!(session.last_result(), ErrorKind::NoError);
    }

    #[tokio::test]
    async fn test_empty_name_is_format_error() {
        let mut session = session_with(vec![name_reply("")]).await;
        let err = session.cluster_name().await.unwrap_err();
        assert!(matches!(err, LavaError::Format(_)));
        assert_eq!(session.last_result(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_empty_host_list_is_success() {
        let hosts: Vec<HostInfo> = Vec::new();
        let mut session = session_with(vec![Packet::ok_with(&List(&hosts))]).await;
        assert!(session.host_info(&[]).await.unwrap().is_empty());
        assert_eq!(session.last_result(), ErrorKind::NoError);
    }

    #[tokio::test]
    async fn test_host_lookups() {
        let mut session = session_with(vec![
            Packet::ok_with(&List(&[host("node01")])),
            Packet::ok_with(&List(&[host("node01")])),
            Packet::error(reply::BAD_HOST),
        ])
        .await;
        assert_eq!(session.host_type("node01").await.unwrap(), "linux");
        assert_eq!(session.host_factor("node01").await.unwrap(), 2.5);

        let err = session.host_model("ghost").await.unwrap_err();
        assert!(matches!(err, LavaError::NotFound(_)));
        assert_eq!(session.last_result(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_reply_code_does_not_panic() {
        let mut session = session_with(vec![Packet::error(777)]).await;
        let err = session.queue_info(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(session.last_result(), ErrorKind::Unknown);
    }
}
