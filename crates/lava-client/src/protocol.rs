//! Request/reply framing and operation codes.
//!
//! Every exchange is one request packet answered by one reply packet. A
//! packet is a 12-byte header (`op_code`, `version`, body `length`)
//! followed by the XDR body. Replies reuse `op_code` for the reply code;
//! zero means success.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ErrorKind;
use crate::records::SubmitField;
use crate::xdr::{MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder, from_bytes};

/// Protocol version carried in every header.
pub const PROTOCOL_VERSION: i32 = 2;

/// Size of the fixed packet header.
pub const HEADER_LEN: usize = 12;

/// Default ceiling on a packet body.
pub const DEFAULT_MAX_PACKET: u32 = 16 * 1024 * 1024;

/// Request operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Init,
    ClusterName,
    MasterName,
    LsInfo,
    HostInfo,
    QueueInfo,
    HostRuntimeInfo,
    UserInfo,
    OpenJobInfo,
    ReadJobInfo,
    CloseJobInfo,
    Submit,
    PeekJob,
}

impl OpCode {
    pub const ALL: [OpCode; 13] = [
        OpCode::Init,
        OpCode::ClusterName,
        OpCode::MasterName,
        OpCode::LsInfo,
        OpCode::HostInfo,
        OpCode::QueueInfo,
        OpCode::HostRuntimeInfo,
        OpCode::UserInfo,
        OpCode::OpenJobInfo,
        OpCode::ReadJobInfo,
        OpCode::CloseJobInfo,
        OpCode::Submit,
        OpCode::PeekJob,
    ];

    pub fn code(self) -> i32 {
        match self {
            OpCode::Init => 1,
            OpCode::ClusterName => 2,
            OpCode::MasterName => 3,
            OpCode::LsInfo => 4,
            OpCode::HostInfo => 5,
            OpCode::QueueInfo => 10,
            OpCode::HostRuntimeInfo => 11,
            OpCode::UserInfo => 12,
            OpCode::OpenJobInfo => 20,
            OpCode::ReadJobInfo => 21,
            OpCode::CloseJobInfo => 22,
            OpCode::Submit => 30,
            OpCode::PeekJob => 31,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    /// Name used in logs and timeout errors.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Init => "INIT",
            OpCode::ClusterName => "CLUSTER_NAME",
            OpCode::MasterName => "MASTER_NAME",
            OpCode::LsInfo => "LS_INFO",
            OpCode::HostInfo => "HOST_INFO",
            OpCode::QueueInfo => "QUEUE_INFO",
            OpCode::HostRuntimeInfo => "HOST_RUNTIME_INFO",
            OpCode::UserInfo => "USER_INFO",
            OpCode::OpenJobInfo => "OPEN_JOB_INFO",
            OpCode::ReadJobInfo => "READ_JOB_INFO",
            OpCode::CloseJobInfo => "CLOSE_JOB_INFO",
            OpCode::Submit => "SUBMIT",
            OpCode::PeekJob => "PEEK_JOB",
        }
    }
}

/// Reply codes sent by the master.
pub mod reply {
    pub const NO_ERROR: i32 = 0;
    pub const NO_JOB: i32 = 1;
    pub const NOT_STARTED: i32 = 2;
    pub const JOB_FINISH: i32 = 3;
    pub const DEPEND_SYNTAX: i32 = 6;
    pub const NO_USER: i32 = 15;
    pub const BAD_USER: i32 = 16;
    pub const PERMISSION: i32 = 17;
    pub const BAD_QUEUE: i32 = 18;
    pub const QUEUE_NAME: i32 = 19;
    pub const QUEUE_CLOSED: i32 = 20;
    pub const BAD_HOST: i32 = 23;
    pub const PROC_NUM: i32 = 24;
    pub const BAD_ARG: i32 = 35;
    pub const BAD_TIME: i32 = 36;
    pub const BAD_LIMIT: i32 = 38;
    pub const BAD_CMD: i32 = 40;
    pub const BAD_SIGNAL: i32 = 41;
    pub const EVENT_FORMAT: i32 = 45;
    pub const EOF: i32 = 46;
    pub const BAD_RESREQ: i32 = 50;
    pub const BAD_PROJECT: i32 = 51;
    pub const BAD_HOST_SPEC: i32 = 52;
    pub const PROTOCOL: i32 = 60;
}

/// Human readable text for a reply code.
pub fn reply_message(code: i32) -> &'static str {
    match code {
        reply::NO_ERROR => "No error",
        reply::NO_JOB => "No matching job found",
        reply::NOT_STARTED => "Job has not started yet",
        reply::JOB_FINISH => "Job has already finished",
        reply::DEPEND_SYNTAX => "Dependency condition syntax error",
        reply::NO_USER => "No user is defined in the lsb.users file",
        reply::BAD_USER => "User name is not found",
        reply::PERMISSION => "User permission denied",
        reply::BAD_QUEUE => "No such queue",
        reply::QUEUE_NAME => "Queue name must be specified",
        reply::QUEUE_CLOSED => "Queue does not accept jobs",
        reply::BAD_HOST => "Bad host name, host group name or cluster name",
        reply::PROC_NUM => "Too many processors requested",
        reply::BAD_ARG => "Bad argument",
        reply::BAD_TIME => "Bad time specification",
        reply::BAD_LIMIT => "Bad resource limit",
        reply::BAD_CMD => "Bad command",
        reply::BAD_SIGNAL => "Bad signal value",
        reply::EVENT_FORMAT => "Bad event format",
        reply::EOF => "End of file",
        reply::BAD_RESREQ => "Bad resource requirement syntax",
        reply::BAD_PROJECT => "Bad project name",
        reply::BAD_HOST_SPEC => "Bad host specification",
        reply::PROTOCOL => "Protocol error",
        _ => "Unknown error",
    }
}

/// Classify a reply code for a query (info, cursor, peek) call.
pub fn query_kind(code: i32) -> ErrorKind {
    match code {
        reply::NO_ERROR => ErrorKind::NoError,
        reply::NO_JOB | reply::NO_USER | reply::BAD_USER | reply::BAD_QUEUE | reply::BAD_HOST => {
            ErrorKind::NotFound
        }
        reply::EOF => ErrorKind::Eof,
        reply::EVENT_FORMAT => ErrorKind::EventFormat,
        reply::PERMISSION => ErrorKind::PermissionDenied,
        reply::NOT_STARTED
        | reply::JOB_FINISH
        | reply::DEPEND_SYNTAX
        | reply::QUEUE_NAME
        | reply::QUEUE_CLOSED
        | reply::PROC_NUM
        | reply::BAD_ARG
        | reply::BAD_TIME
        | reply::BAD_LIMIT
        | reply::BAD_CMD
        | reply::BAD_SIGNAL
        | reply::BAD_RESREQ
        | reply::BAD_PROJECT
        | reply::BAD_HOST_SPEC
        | reply::PROTOCOL => ErrorKind::BadRequest,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a reply code for a submission. Anything the master refuses
/// other than on permission grounds is a bad request.
pub fn submit_kind(code: i32) -> ErrorKind {
    match query_kind(code) {
        ErrorKind::NotFound => ErrorKind::BadRequest,
        kind => kind,
    }
}

/// The submission field a rejection code points at.
pub fn submit_field(code: i32) -> Option<SubmitField> {
    match code {
        reply::BAD_QUEUE | reply::QUEUE_NAME | reply::QUEUE_CLOSED => Some(SubmitField::Queue),
        reply::BAD_HOST => Some(SubmitField::AskedHosts),
        reply::PROC_NUM => Some(SubmitField::NumProcessors),
        reply::BAD_TIME => Some(SubmitField::BeginTime),
        reply::BAD_LIMIT => Some(SubmitField::RLimits),
        reply::BAD_CMD => Some(SubmitField::Command),
        reply::BAD_SIGNAL => Some(SubmitField::SigValue),
        reply::DEPEND_SYNTAX => Some(SubmitField::DependCond),
        reply::BAD_RESREQ => Some(SubmitField::ResReq),
        reply::BAD_PROJECT => Some(SubmitField::ProjectName),
        reply::BAD_HOST_SPEC => Some(SubmitField::HostSpec),
        reply::NO_USER | reply::BAD_USER | reply::PERMISSION => Some(SubmitField::User),
        _ => None,
    }
}

/// One request or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Operation code on requests, reply code on replies.
    pub op_code: i32,
    pub version: i32,
    pub body: Vec<u8>,
}

impl Packet {
    pub fn request(op: OpCode, body: Vec<u8>) -> Self {
        Self {
            op_code: op.code(),
            version: PROTOCOL_VERSION,
            body,
        }
    }

    pub fn request_with<T: XdrEncode + ?Sized>(op: OpCode, payload: &T) -> Self {
        let mut enc = XdrEncoder::new();
        payload.encode(&mut enc);
        Self::request(op, enc.into_bytes())
    }

    pub fn reply(code: i32, body: Vec<u8>) -> Self {
        Self {
            op_code: code,
            version: PROTOCOL_VERSION,
            body,
        }
    }

    pub fn ok_with<T: XdrEncode + ?Sized>(payload: &T) -> Self {
        let mut enc = XdrEncoder::new();
        payload.encode(&mut enc);
        Self::reply(reply::NO_ERROR, enc.into_bytes())
    }

    pub fn error(code: i32) -> Self {
        Self::reply(code, Vec::new())
    }

    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_code(self.op_code)
    }

    pub fn is_ok(&self) -> bool {
        self.op_code == reply::NO_ERROR
    }

    pub fn decode_body<T: XdrDecode>(&self) -> MarshalResult<T> {
        from_bytes(&self.body)
    }

    pub fn body_decoder(&self) -> XdrDecoder<'_> {
        XdrDecoder::new(&self.body)
    }

    /// Header and body as sent on the wire.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut enc = XdrEncoder::new();
        enc.put_i32(self.op_code);
        enc.put_i32(self.version);
        enc.put_u32(u32::try_from(self.body.len()).unwrap_or(u32::MAX));
        let mut frame = enc.into_bytes();
        frame.extend_from_slice(&self.body);
        frame
    }
}

/// List payload: `i32` count followed by the records.
pub struct List<'a, T>(pub &'a [T]);

impl<T: XdrEncode> XdrEncode for List<'_, T> {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_count(self.0.len());
        for item in self.0 {
            item.encode(enc);
        }
    }
}

/// Decode a list payload.
pub fn decode_list<T: XdrDecode>(bytes: &[u8], field: &'static str) -> MarshalResult<Vec<T>> {
    let mut dec = XdrDecoder::new(bytes);
    let count = dec.count(field)?;
    let mut items = Vec::with_capacity(count.min(dec.remaining() / 4));
    for _ in 0..count {
        items.push(T::decode(&mut dec)?);
    }
    dec.finish()?;
    Ok(items)
}

/// A list of names used as a request filter. Empty selects everything.
pub struct Names<'a>(pub &'a [String]);

impl XdrEncode for Names<'_> {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_count(self.0.len());
        enc.put_strs(self.0);
    }
}

/// Decode a name filter.
pub fn decode_names(bytes: &[u8]) -> MarshalResult<Vec<String>> {
    let mut dec = XdrDecoder::new(bytes);
    let count = dec.count("names.count")?;
    let names = dec.names("names", count)?;
    dec.finish()?;
    Ok(names)
}

/// Read one packet. Returns `None` on a clean end of stream before a
/// header starts.
pub async fn read_packet<R>(reader: &mut R, max_body: u32) -> io::Result<Option<Packet>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let word = |i: usize| [header[i], header[i + 1], header[i + 2], header[i + 3]];
    let op_code = i32::from_be_bytes(word(0));
    let version = i32::from_be_bytes(word(4));
    let length = u32::from_be_bytes(word(8));
    if length > max_body {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("packet body of {length} bytes exceeds limit of {max_body}"),
        ));
    }
    let mut body = vec![0u8; length as usize];
    reader.read_exact(&mut body).await?;
    Ok(Some(Packet {
        op_code,
        version,
        body,
    }))
}

/// Write one packet and flush.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&packet.to_frame()).await?;
    writer.flush().await
}
