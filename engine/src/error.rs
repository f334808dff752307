use nix::libc;
use std::io;

/// Returned by the device when its protocol version is outside the
/// supported envelope. Kept outside the errno range.
pub const ERROR_INCOMPATIBLE_VERSION: i32 = 500_000;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("out of memory")]
    NoMemory,

    #[error("device or resource busy")]
    Busy,

    #[error("incompatible protocol version {found:#08x} (supported up to {supported:#08x})")]
    IncompatibleVersion { found: i32, supported: i32 },

    #[error("malformed record: expected {expected} bytes, got {got}")]
    ShortRecord { expected: usize, got: usize },

    #[error("invalid argument: {0}")]
    Invalid(String),

    #[error("{op} is not valid in state {state}")]
    BadState { op: &'static str, state: String },

    #[error("no such entity: {0}")]
    NoEntity(String),

    #[error("no such operation: {0}")]
    NoOperation(String),

    #[error("buffer xrun")]
    Xrun,

    #[error("operation would block")]
    WouldBlock,

    #[error(transparent)]
    Os(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::Invalid(msg.into())
    }

    pub fn last_os_error() -> Self {
        io::Error::last_os_error().into()
    }

    /// Negative result code for callers speaking the C convention.
    pub fn errno(&self) -> i32 {
        match self {
            Error::NoMemory => -libc::ENOMEM,
            Error::Busy => -libc::EBUSY,
            Error::IncompatibleVersion { .. } => -ERROR_INCOMPATIBLE_VERSION,
            Error::ShortRecord { .. } => -libc::EIO,
            Error::Invalid(_) | Error::BadState { .. } => -libc::EINVAL,
            Error::NoEntity(_) => -libc::ENOENT,
            Error::NoOperation(_) => -libc::ENXIO,
            Error::Xrun => -libc::EPIPE,
            Error::WouldBlock => -libc::EAGAIN,
            Error::Os(e) => -e.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    pub fn is_xrun(&self) -> bool {
        matches!(self, Error::Xrun)
            || matches!(self, Error::Os(e) if e.raw_os_error() == Some(libc::EPIPE))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::WouldBlock {
            return Error::WouldBlock;
        }
        match e.raw_os_error() {
            Some(libc::ENOMEM) => Error::NoMemory,
            Some(libc::EBUSY) => Error::Busy,
            _ => Error::Os(e),
        }
    }
}

impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        io::Error::from(e).into()
    }
}
