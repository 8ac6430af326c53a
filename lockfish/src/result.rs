//! Error and result types shared by every layer of the crate.
//!
//! Failures are grouped by the layer that produced them (see [`Layer`]).
//! Application status codes (NFS3ERR_*, NLM4 denials) are *not* errors:
//! they are decoded and handed back as values, unless an operation receives
//! a status outside of its allow-list, which is reported as
//! [`Error::UnexpectedStatus`].
use thiserror::Error;

/// The layer a failure originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Socket errors, closed connections, datagram timeouts.
    Transport,
    /// The reply does not belong to the call (wrong xid or message type).
    Framing,
    /// The server refused or could not execute the call.
    Acceptance,
    /// The reply could not be decoded.
    Decode,
    /// A protocol status the caller did not allow for.
    Application,
}

/// Failures while decoding XDR data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data")]
    NotEnoughData,

    #[error("invalid boolean value {0}")]
    InvalidBool(u32),

    #[error("unknown {type_name} value {value}")]
    UnknownVariant { type_name: &'static str, value: u32 },

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("value {0} is out of range")]
    OutOfRange(u64),
}

/// RFC 5531 `auth_stat`, reported when the server denies a call for
/// authentication reasons.
pub use crate::rpc::AuthStat;

/// Accepted-but-unsuccessful replies (`accept_stat` other than SUCCESS).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcceptError {
    #[error("program unavailable")]
    ProgUnavail,

    #[error("program version mismatch (supported {low}..={high})")]
    ProgMismatch { low: u32, high: u32 },

    #[error("procedure unavailable")]
    ProcUnavail,

    #[error("server could not decode the arguments")]
    GarbageArgs,

    #[error("server system error")]
    SystemErr,
}

/// Denied replies (`reject_stat`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DenyError {
    #[error("RPC version mismatch (supported {low}..={high})")]
    RpcMismatch { low: u32, high: u32 },

    #[error("authentication error: {0:?}")]
    AuthError(AuthStat),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed in the middle of a record")]
    EndOfStream,

    #[error("no reply after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("record of at least {size} bytes exceeds the limit of {limit}")]
    RecordTooLarge { size: usize, limit: usize },

    #[error("no reserved port available")]
    NoReservedPort,

    #[error("reply xid {got} does not match call xid {expected}")]
    XidMismatch { expected: u32, got: u32 },

    #[error("expected a REPLY message, got message type {0}")]
    NotAReply(u32),

    #[error("call failed: {0}")]
    Accepted(#[from] AcceptError),

    #[error("call denied: {0}")]
    Denied(#[from] DenyError),

    #[error("program {program} version {version} is not registered")]
    ProgramNotRegistered { program: u32, version: u32 },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("unexpected status {name} ({value})")]
    UnexpectedStatus { name: String, value: u32 },

    #[error("{0} cannot be found and no file handle was given")]
    FileNotFound(String),
}

impl Error {
    /// Returns the layer this error originates from
    pub fn layer(&self) -> Layer {
        match self {
            Error::Io(_)
            | Error::EndOfStream
            | Error::Timeout { .. }
            | Error::RecordTooLarge { .. }
            | Error::NoReservedPort => Layer::Transport,
            Error::XidMismatch { .. } | Error::NotAReply(_) => Layer::Framing,
            Error::Accepted(_) | Error::Denied(_) | Error::ProgramNotRegistered { .. } => {
                Layer::Acceptance
            }
            Error::Decode(_) => Layer::Decode,
            Error::UnexpectedStatus { .. } | Error::FileNotFound(_) => Layer::Application,
        }
    }

    /// Builds an [`Error::UnexpectedStatus`] from a decoded status enum
    pub(crate) fn unexpected_status<S: std::fmt::Debug + Copy + Into<u32>>(status: S) -> Error {
        Error::UnexpectedStatus {
            name: format!("{:?}", status),
            value: status.into(),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_err: std::string::FromUtf8Error) -> Error {
        DecodeError::InvalidUtf8.into()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
