//! Job cursor: open a filtered enumeration, read records one at a time,
//! close it.
//!
//! ```text
//!   Closed ──open()──→ Open ──read()*──→ Open ──close()──→ Closed
//!     ↑                  │
//!     └──── timeout / connection loss
//! ```
//!
//! Opening while a cursor is open closes the previous one first. A filter
//! that matches nothing opens successfully with a count of zero and leaves
//! the register at `NotFound`; the next read reports end of data.

use serde::Serialize;
use tracing::debug;

use crate::error::{ErrorKind, LavaError, LavaResult};
use crate::protocol::{OpCode, query_kind, reply};
use crate::records::{JobFilter, JobInfoEnt};
use crate::session::{Session, expect_ok, master_error};
use crate::transport::Transport;
use crate::xdr::{XdrDecoder, XdrEncoder, to_bytes};

/// State of a session's job cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CursorState {
    #[default]
    Closed,
    Open {
        /// Records the master reported on open.
        total: usize,
        /// Records handed out so far.
        read: usize,
    },
}

impl CursorState {
    pub fn is_open(&self) -> bool {
        matches!(self, CursorState::Open { .. })
    }

    /// Records still to be read, zero when closed.
    pub fn remaining(&self) -> usize {
        match *self {
            CursorState::Open { total, read } => total.saturating_sub(read),
            CursorState::Closed => 0,
        }
    }
}

impl<T: Transport> Session<T> {
    pub fn cursor_state(&self) -> CursorState {
        self.cursor
    }

    /// Open a job cursor and return the number of matching records.
    pub async fn open_jobs(&mut self, filter: &JobFilter) -> LavaResult<usize> {
        match self.open_jobs_inner(filter).await {
            Ok(0) => {
                self.last.set(ErrorKind::NotFound);
                Ok(0)
            }
            other => self.last.record(other),
        }
    }

    /// Next record in server order, `None` once every record was read.
    pub async fn read_job(&mut self) -> LavaResult<Option<JobInfoEnt>> {
        match self.read_job_inner().await {
            Ok(None) => {
                self.last.set(ErrorKind::Eof);
                Ok(None)
            }
            other => self.last.record(other),
        }
    }

    /// Close the cursor. Closing a closed cursor does nothing.
    pub async fn close_jobs(&mut self) -> LavaResult<()> {
        let result = self.close_jobs_inner().await;
        self.last.record(result)
    }

    /// Open, drain and close in one go.
    pub async fn jobs(&mut self, filter: &JobFilter) -> LavaResult<Vec<JobInfoEnt>> {
        let count = self.open_jobs(filter).await?;
        let mut jobs = Vec::with_capacity(count);
        while let Some(job) = self.read_job().await? {
            jobs.push(job);
        }
        self.close_jobs().await?;
        if jobs.is_empty() {
            self.last.set(ErrorKind::NotFound);
        }
        Ok(jobs)
    }

    /// Path of the buffered output file of a running job.
    pub async fn peek_job(&mut self, job_id: i64) -> LavaResult<String> {
        let result = self.peek_job_inner(job_id).await;
        self.last.record(result)
    }

    async fn open_jobs_inner(&mut self, filter: &JobFilter) -> LavaResult<usize> {
        if self.cursor.is_open() {
            debug!("Discarding open job cursor");
            self.close_jobs_inner().await?;
        }
        let reply = self.call(OpCode::OpenJobInfo, to_bytes(filter)).await?;
        let total = match reply.op_code {
            reply::NO_ERROR => {
                let mut dec = XdrDecoder::new(&reply.body);
                let total = dec.count("openJobInfo.count")?;
                dec.finish()?;
                total
            }
            reply::NO_JOB => 0,
            code => return Err(master_error(OpCode::OpenJobInfo, code, query_kind(code))),
        };
        self.cursor = CursorState::Open { total, read: 0 };
        debug!(total, ?filter, "Opened job cursor");
        Ok(total)
    }

    async fn read_job_inner(&mut self) -> LavaResult<Option<JobInfoEnt>> {
        let CursorState::Open { total, read } = self.cursor else {
            return Err(LavaError::BadRequest("no job cursor is open".to_string()));
        };
        if read >= total {
            return Ok(None);
        }
        let reply = self.call(OpCode::ReadJobInfo, Vec::new()).await?;
        match reply.op_code {
            reply::NO_ERROR => {
                // The master has moved on even if this record fails to decode.
                self.cursor = CursorState::Open {
                    total,
                    read: read + 1,
                };
                Ok(Some(reply.decode_body()?))
            }
            reply::EOF | reply::NO_JOB => {
                self.cursor = CursorState::Open { total, read: total };
                Ok(None)
            }
            code => Err(master_error(OpCode::ReadJobInfo, code, query_kind(code))),
        }
    }

    async fn close_jobs_inner(&mut self) -> LavaResult<()> {
        if !self.cursor.is_open() {
            return Ok(());
        }
        self.cursor = CursorState::Closed;
        let reply = self.call(OpCode::CloseJobInfo, Vec::new()).await?;
        expect_ok(OpCode::CloseJobInfo, &reply, query_kind)
    }

    async fn peek_job_inner(&mut self, job_id: i64) -> LavaResult<String> {
        let mut enc = XdrEncoder::new();
        enc.put_i64(job_id);
        let reply = self.call(OpCode::PeekJob, enc.into_bytes()).await?;
        expect_ok(OpCode::PeekJob, &reply, query_kind)?;
        let mut dec = XdrDecoder::new(&reply.body);
        let path = dec.name("peekJob.outFile")?;
        dec.finish()?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientConfig;
    use crate::protocol::Packet;
    use crate::records::JobState;
    use crate::records::job::tests::sample_job;
    use crate::session::testing::ScriptedTransport;

    fn count_reply(n: i32) -> Packet {
        let mut enc = XdrEncoder::new();
        enc.put_i32(n);
        Packet::reply(0, enc.into_bytes())
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
    async fn test_read_exactly_count_then_eof() {
        let mut session = session_with(vec![
            count_reply(2),
            Packet::ok_with(&sample_job(1, JobState::Run)),
            Packet::ok_with(&sample_job(2, JobState::Pend)),
            Packet::reply(0, Vec::new()),
        ])
        .await;

        assert_eq!(session.open_jobs(&JobFilter::all()).await.unwrap(), 2);
        assert_eq!(session.cursor_state().remaining(), 2);
        assert_eq!(session.read_job().await.unwrap().unwrap().job_id, 1);
        assert_eq!(session.read_job().await.unwrap().unwrap().job_id, 2);
        assert!(session.read_job().await.unwrap().is_none());
        assert_eq!(session.last_result(), ErrorKind::Eof);

        session.close_jobs().await.unwrap();
        assert_eq!(session.cursor_state(), CursorState::Closed);
        // open, 2 reads, close; the exhausted read never reached the master
        assert_eq!(session.transport().sent.len(), 5);
    }

    #[tokio::test]
    async fn test_nonexistent_job_opens_empty() {
        let mut session = session_with(vec![Packet::error(reply::NO_JOB)]).await;
        assert_eq!(session.open_jobs(&JobFilter::by_id(999_999)).await.unwrap(), 0);
        assert_eq!(session.last_result(), ErrorKind::NotFound);
        assert!(session.cursor_state().is_open());
        assert!(session.read_job().await.unwrap().is_none());
        assert_eq!(session.last_result(), ErrorKind::Eof);
    }

    #[tokio::test]
    async fn test_job_with_newer_status_bits_is_read() {
        let mut job = sample_job(5, JobState::Run);
        job.status = crate::records::JobStatus(crate::records::job_status::RUN | 0x4_0000);
        let mut session = session_with(vec![count_reply(1), Packet::ok_with(&job)]).await;

        assert_eq!(session.open_jobs(&JobFilter::all()).await.unwrap(), 1);
        let read = session.read_job().await.unwrap().unwrap();
        assert_eq!(read.job_id, 5);
        assert_eq!(read.state(), JobState::Unknown);
        assert_eq!(session.last_result(), ErrorKind::NoError);
    }

    #[tokio::test]
    async fn test_read_when_closed_is_bad_request() {
        let mut session = session_with(vec![]).await;
        let err = session.read_job().await.unwrap_err();
        assert!(matches!(err, LavaError::BadRequest(_)));
        assert_eq!(session.last_result(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut session = session_with(vec![count_reply(1), Packet::reply(0, Vec::new())]).await;
        session.open_jobs(&JobFilter::all()).await.unwrap();
        session.close_jobs().await.unwrap();
        session.close_jobs().await.unwrap();
        assert_eq!(session.last_result(), ErrorKind::NoError);
        assert!(session.read_job().await.is_err());
    }

    #[tokio::test]
    async fn test_reopen_discards_previous_cursor() {
        let mut session = session_with(vec![
            count_reply(3),
            Packet::reply(0, Vec::new()),
            count_reply(1),
        ])
        .await;
        session.open_jobs(&JobFilter::all()).await.unwrap();
        assert_eq!(
            session.open_jobs(&JobFilter::by_user("alice")).await.unwrap(),
            1
        );
        let ops = session.transport().sent_ops();
        assert_eq!(
            &ops[1..],
            &[
                Some(OpCode::OpenJobInfo),
                Some(OpCode::CloseJobInfo),
                Some(OpCode::OpenJobInfo)
            ]
        );
    }

    #[tokio::test]
    async fn test_connection_loss_closes_cursor() {
        let mut transport = ScriptedTransport::ready();
        transport.push(count_reply(2));
        transport.push_err(LavaError::Connection("reset".into()));
        let mut session = Session::init(transport, ClientConfig::default())
            .await
            .unwrap();
        session.open_jobs(&JobFilter::all()).await.unwrap();
        assert!(session.read_job().await.is_err());
        assert_eq!(session.cursor_state(), CursorState::Closed);
        assert_eq!(session.last_result(), ErrorKind::ConnectionError);
    }

    #[tokio::test]
    async fn test_peek_not_started() {
        let mut session = session_with(vec![Packet::error(reply::NOT_STARTED)]).await;
        let err = session.peek_job(12).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }
}
