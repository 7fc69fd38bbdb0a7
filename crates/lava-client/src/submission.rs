//! Job submission.
//!
//! Two phases: the template is checked locally and refused with
//! `BadRequest` before anything is sent; otherwise it goes to the master,
//! whose answer comes back as a [`SubmitReply`]. A refusal by the master
//! is not an `Err`: the reply carries the reason and the offending field,
//! and the register holds the refusal's kind.

use tracing::{info, warn};

use crate::error::{ErrorKind, LavaError, LavaResult};
use crate::protocol::{OpCode, reply_message, submit_field, submit_kind};
use crate::records::{Submit, SubmitRejection, SubmitReply};
use crate::session::Session;
use crate::transport::Transport;
use crate::xdr::{MarshalError, XdrDecoder, to_bytes};

impl<T: Transport> Session<T> {
    /// Submit a job.
    pub async fn submit(&mut self, request: &Submit) -> LavaResult<SubmitReply> {
        match self.submit_inner(request).await {
            Ok(reply) => {
                let kind = reply
                    .rejection
                    .as_ref()
                    .map_or(ErrorKind::NoError, |r| r.kind);
                self.last.set(kind);
                Ok(reply)
            }
            Err(e) => self.last.record(Err(e)),
        }
    }

    async fn submit_inner(&mut self, request: &Submit) -> LavaResult<SubmitReply> {
        request
            .validate()
            .map_err(|e| LavaError::BadRequest(e.to_string()))?;

        let reply = self.call(OpCode::Submit, to_bytes(request)).await?;
        let mut dec = XdrDecoder::new(&reply.body);

        if reply.is_ok() {
            let job_id = dec.i64("submitReply.jobId")?;
            if job_id < 0 {
                return Err(MarshalError::OutOfRange {
                    field: "submitReply.jobId",
                    value: job_id.to_string(),
                }
                .into());
            }
            let queue = dec.string("submitReply.queue")?;
            dec.finish()?;
            info!(job_id, queue = %queue, "Job submitted");
            return Ok(SubmitReply::accepted(job_id, queue));
        }

        let code = reply.op_code;
        let (index, queue) = if dec.remaining() == 0 {
            (None, String::new())
        } else {
            let index = dec.i32("submitReply.badReqIndx")?;
            let queue = dec.string("submitReply.queue")?;
            dec.finish()?;
            (usize::try_from(index).ok(), queue)
        };
        let rejection = SubmitRejection {
            code,
            kind: submit_kind(code),
            field: submit_field(code),
            index,
            message: reply_message(code).to_string(),
        };
        warn!(
            code,
            field = ?rejection.field,
            index = ?rejection.index,
            "Submission rejected: {}",
            rejection.message
        );
        Ok(SubmitReply::rejected(rejection, queue))
    }
}
