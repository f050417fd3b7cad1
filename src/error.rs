//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns [Result], built around a
//! single [Error] enum. Variants carry a `(location, message)` pair so that
//! log output can point back at the call site without a backtrace.

use std::{fmt, io, num, sync::mpsc};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Syntactically invalid or unrecognised command.
    Protocol(String, String),
    /// Well-formed command rejected by store state (key not found, key
    /// already exists, invalid version, ...).
    Semantic(String, String),
    /// Image file missing, unreadable, or malformed.
    Codec(String, String),
    /// Underlying I/O failure.
    IoError(String, String),
    /// A value could not be converted between integer widths.
    FailConvert(String, String),
    /// Background thread panicked or its channel disconnected.
    ThreadFail(String, String),
    /// Internal invariant violation; always a bug, never a user error.
    UnReachable(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            Protocol(p, msg) => write!(f, "{} protocol-error: {}", p, msg),
            Semantic(p, msg) => write!(f, "{} semantic-error: {}", p, msg),
            Codec(p, msg) => write!(f, "{} codec-error: {}", p, msg),
            IoError(p, msg) => write!(f, "{} io-error: {}", p, msg),
            FailConvert(p, msg) => write!(f, "{} convert-error: {}", p, msg),
            ThreadFail(p, msg) => write!(f, "{} thread-error: {}", p, msg),
            UnReachable(p, msg) => write!(f, "{} unreachable: {}", p, msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError("<io>".to_string(), err.to_string())
    }
}

impl From<num::ParseIntError> for Error {
    fn from(err: num::ParseIntError) -> Error {
        Error::Protocol("<parse>".to_string(), err.to_string())
    }
}

impl<T> From<mpsc::SendError<T>> for Error {
    fn from(err: mpsc::SendError<T>) -> Error {
        Error::ThreadFail("<mpsc>".to_string(), err.to_string())
    }
}

impl From<mpsc::RecvError> for Error {
    fn from(err: mpsc::RecvError) -> Error {
        Error::ThreadFail("<mpsc>".to_string(), err.to_string())
    }
}

/// Construct an [Error] tagged with `file!():line!()`, either by wrapping
/// a `Result`'s `Err` arm or by formatting a message directly.
///
/// ```ignore
/// err_at!(IoError, fs::File::open(path))?;
/// err_at!(Semantic, msg: "key {:?} already exists", key)?;
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::error::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::error::Error::$v(prefix, err.to_string()))
            }
        }
    }};
}
