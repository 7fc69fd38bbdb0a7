//! Client session: one connection, one register, one job cursor.
//!
//! Every public operation on [`Session`] is an `async fn` taking
//! `&mut self`, awaited to completion before the next one starts. Each
//! call overwrites the session's last-result register, readable through
//! [`Session::last_result`].
//!
//! Operations are spread over several modules (`cluster`, `cursor`,
//! `submission`); this module holds construction and the request path
//! they share.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::cursor::CursorState;
use crate::error::{ErrorKind, LavaError, LavaResult};
use crate::protocol::{OpCode, Packet, reply_message};
use crate::registry::LastResult;
use crate::transport::{TcpTransport, Transport};
use crate::xdr::XdrEncoder;

/// A connection to a scheduler master.
pub struct Session<T: Transport = TcpTransport> {
    pub(crate) transport: T,
    pub(crate) config: ClientConfig,
    pub(crate) last: LastResult,
    pub(crate) cursor: CursorState,
    broken: bool,
}

impl<T: Transport> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.transport.endpoint())
            .field("app_name", &self.config.app_name)
            .field("last", &self.last.get())
            .field("cursor", &self.cursor)
            .field("broken", &self.broken)
            .finish()
    }
}

impl Session<TcpTransport> {
    /// Connect to the master named in `config` over TCP.
    pub async fn connect(config: ClientConfig) -> LavaResult<Self> {
        config.validate()?;
        let transport = TcpTransport::new(
            config.master_addr(),
            config.max_packet_bytes,
            config.timeout(),
        );
        Self::init(transport, config).await
    }
}

impl<T: Transport> Session<T> {
    /// Initialise a session over `transport`, announcing the application
    /// name to the master.
    pub async fn init(transport: T, config: ClientConfig) -> LavaResult<Self> {
        let mut session = Self {
            transport,
            config,
            last: LastResult::new(),
            cursor: CursorState::Closed,
            broken: false,
        };
        let result = session.handshake().await;
        session.last.record(result)?;
        Ok(session)
    }

    /// Drop the connection and initialise again. Clears the broken state
    /// and closes any open cursor.
    pub async fn reinit(&mut self) -> LavaResult<()> {
        self.transport.reset().await;
        self.broken = false;
        self.cursor = CursorState::Closed;
        let result = self.handshake().await;
        self.last.record(result)
    }

    /// Outcome of the most recent call on this session.
    pub fn last_result(&self) -> ErrorKind {
        self.last.get()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a transport failure has disabled the session until
    /// [`reinit`](Self::reinit).
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    async fn handshake(&mut self) -> LavaResult<()> {
        let mut enc = XdrEncoder::new();
        enc.put_str(&self.config.app_name);
        enc.put_str(env!("CARGO_PKG_VERSION"));
        let reply = self.call(OpCode::Init, enc.into_bytes()).await?;
        expect_ok(OpCode::Init, &reply, crate::protocol::query_kind)?;
        info!(
            endpoint = %self.transport.endpoint(),
            app = %self.config.app_name,
            "Session initialised"
        );
        Ok(())
    }

    /// Send one request and wait for its reply, bounded by the configured
    /// timeout.
    pub(crate) async fn call(&mut self, op: OpCode, body: Vec<u8>) -> LavaResult<Packet> {
        if self.broken {
            return Err(LavaError::ConnectionBroken);
        }
        let after = self.config.timeout();
        let request = Packet::request(op, body);
        debug!(op = op.name(), bytes = request.body.len(), "Sending request");

        match tokio::time::timeout(after, self.transport.exchange(request)).await {
            Ok(Ok(reply)) => {
                debug!(
                    op = op.name(),
                    code = reply.op_code,
                    bytes = reply.body.len(),
                    "Received reply"
                );
                Ok(reply)
            }
            Ok(Err(e)) => {
                if e.kind() == ErrorKind::ConnectionError {
                    warn!(op = op.name(), error = %e, "Connection lost, session needs reinit");
                    self.broken = true;
                    self.cursor = CursorState::Closed;
                }
                Err(e)
            }
            Err(_) => {
                warn!(op = op.name(), ?after, "Request timed out");
                self.transport.reset().await;
                self.cursor = CursorState::Closed;
                Err(LavaError::Timeout {
                    operation: op.name(),
                    after,
                })
            }
        }
    }
}

/// Turn a failure reply into an error, classified by `classify`.
pub(crate) fn expect_ok(
    op: OpCode,
    reply: &Packet,
    classify: fn(i32) -> ErrorKind,
) -> LavaResult<()> {
    if reply.is_ok() {
        return Ok(());
    }
    Err(master_error(op, reply.op_code, classify(reply.op_code)))
}

pub(crate) fn master_error(op: OpCode, code: i32, kind: ErrorKind) -> LavaError {
    let message = reply_message(code).to_string();
    match kind {
        ErrorKind::NotFound => LavaError::NotFound(format!("{}: {message}", op.name())),
        ErrorKind::PermissionDenied => {
            LavaError::PermissionDenied(format!("{}: {message}", op.name()))
        }
        kind => LavaError::Master {
            operation: op.name(),
            code,
            kind,
            message,
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for unit tests.

    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{LavaError, LavaResult};
    use crate::protocol::{OpCode, Packet};
    use crate::transport::Transport;

    /// Answers requests from a queue of canned replies.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        pub replies: VecDeque<LavaResult<Packet>>,
        pub sent: Vec<Packet>,
        pub delay: Option<Duration>,
        pub resets: usize,
    }

    impl ScriptedTransport {
        /// A transport whose first reply acknowledges INIT.
        pub fn ready() -> Self {
            let mut t = Self::default();
            t.push(Packet::reply(0, Vec::new()));
            t
        }

        pub fn push(&mut self, reply: Packet) {
            self.replies.push_back(Ok(reply));
        }

        pub fn push_err(&mut self, err: LavaError) {
            self.replies.push_back(Err(err));
        }

        pub fn sent_ops(&self) -> Vec<Option<OpCode>> {
            self.sent.iter().map(Packet::op).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn exchange(&mut self, request: Packet) -> LavaResult<Packet> {
            self.sent.push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(LavaError::Connection("script exhausted".into())))
        }

        async fn reset(&mut self) {
            self.resets += 1;
        }

        fn endpoint(&self) -> String {
            "scripted".to_string()
        }
    }
}
