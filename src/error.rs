use std::{self, fmt, result};

use crate::ConnectionState;

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// err!(InvalidPayloadSize, desc: "for payload {}", len);
/// ```
///
/// ```ignore
/// err!(InvalidTopic, detail: ErrorDetail::Topic(topic.to_string()), "{:?}", topic);
/// ```
///
/// ```ignore
/// err!(IOError, cause: err, "from addr:{}", ip_addr);
/// ```
///
/// ```ignore
/// err!(FailConvert, try: toml::from_str(s), "config not toml {:?}", ploc);
/// ```
macro_rules! err {
    ($v:ident, detail: $detail:expr, $($args:expr),+) => {{
        let e = Error {
            kind: ErrorKind::$v,
            description: format!($($args),+),
            detail: Some($detail),
            ..Error::default()
        };

        log_error!(e);
        Err(e)
    }};
    ($v:ident, try: $res:expr, $($args:expr),+) => {{
        match $res {
            Ok(val) => Ok(val),
            Err(err) => {
                let e = Error {
                    kind: ErrorKind::$v,
                    description: format!($($args),+),
                    cause: Some(Box::new(err)),
                    ..Error::default()
                };
                log_error!(e);
                Err(e)
            }
        }
    }};
    ($v:ident, try: $res:expr) => {{
        match $res {
            Ok(val) => Ok(val),
            Err(err) => {
                let e = Error {
                    kind: ErrorKind::$v,
                    description: err.to_string(),
                    cause: Some(Box::new(err)),
                    ..Error::default()
                };
                log_error!(e);
                Err(e)
            }
        }
    }};
    ($v:ident, cause: $cause:expr, $($args:expr),+) => {{
        let e = Error {
            kind: ErrorKind::$v,
            description: format!($($args),+),
            cause: Some(Box::new($cause)),
            ..Error::default()
        };

        log_error!(e);
        Err(e)
    }};
    ($v:ident, desc: $($args:expr),+) => {{
        let e = Error {
            kind: ErrorKind::$v,
            description: format!($($args),+),
            ..Error::default()
        };

        log_error!(e);
        Err(e)
    }};
}

macro_rules! log_error {
    ($e:ident) => {{
        use log::error;

        error!("{}: {}", $e.kind, $e.description);
        match &$e.cause {
            Some(cause) => error!("cause:{}", cause.to_string()),
            None => (),
        }

        #[cfg(feature = "backtrace")]
        {
            use std::backtrace::BacktraceStatus;

            if let BacktraceStatus::Captured = $e.backtrace.status() {
                error!("{}", $e.backtrace)
            }
        }
    }};
}

/// Error that is part of [Result] type.
pub struct Error {
    pub(crate) kind: ErrorKind,
    pub(crate) description: String,
    pub(crate) detail: Option<ErrorDetail>,
    pub(crate) cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    #[cfg(feature = "backtrace")]
    pub(crate) backtrace: std::backtrace::Backtrace,
}

impl Default for Error {
    fn default() -> Error {
        Error {
            kind: ErrorKind::InvalidInput,
            description: String::default(),
            detail: None,
            cause: None,
            #[cfg(feature = "backtrace")]
            backtrace: std::backtrace::Backtrace::force_capture(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{}:{}", self.kind, self.description)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        match &self.detail {
            Some(detail) => write!(f, "<{},{:?},{}>", self.kind, detail, self.description),
            None => write!(f, "<{},-,{}>", self.kind, self.description),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(val: std::num::TryFromIntError) -> Self {
        let err: result::Result<(), Error> = err!(TryFromIntError, cause: val, "{}", val);
        err.unwrap_err()
    }
}

impl From<std::io::Error> for Error {
    fn from(val: std::io::Error) -> Self {
        let description = val.to_string();
        let err: result::Result<(), Error> = err!(IOError, cause: val, "{}", description);
        err.unwrap_err()
    }
}

impl Error {
    /// Return the error kind, caller should know how to handle it.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return error kinds from this error and all of the root causes.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        let mut kinds = vec![self.kind];
        if let Some(err) = self.cause.as_ref().and_then(|c| c.downcast_ref::<Error>()) {
            kinds.extend_from_slice(&err.kinds());
        }
        kinds
    }

    /// Return whether `kind` is this error's kind or the kind of one of its causes.
    pub fn has(&self, kind: ErrorKind) -> bool {
        self.kinds().contains(&kind)
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        self.detail.as_ref()
    }

    /// Offending client identifier, for [ErrorKind::ClientIdentifierTooLong].
    pub fn client_id(&self) -> Option<&str> {
        match &self.detail {
            Some(ErrorDetail::ClientId { client_id, .. }) => Some(client_id.as_str()),
            _ => None,
        }
    }

    /// Configured maximum length, for [ErrorKind::ClientIdentifierTooLong].
    pub fn max_len(&self) -> Option<usize> {
        match &self.detail {
            Some(ErrorDetail::ClientId { max_len, .. }) => Some(*max_len),
            _ => None,
        }
    }

    /// Offending topic string, for [ErrorKind::InvalidTopic].
    pub fn topic(&self) -> Option<&str> {
        match &self.detail {
            Some(ErrorDetail::Topic(topic)) => Some(topic.as_str()),
            _ => None,
        }
    }

    /// Connection state at the time of failure, for [ErrorKind::ConnectionError].
    pub fn state(&self) -> Option<ConnectionState> {
        match &self.detail {
            Some(ErrorDetail::State(state)) => Some(*state),
            _ => None,
        }
    }
}

/// Structured context attached to some of the error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetail {
    ClientId { client_id: String, max_len: usize },
    Topic(String),
    State(ConnectionState),
}

/// Error kind expected to be handled by calling functions.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    // general error
    InvalidInput,
    // codec errors, the stream position is no more trustworthy.
    InvalidHeader,
    InvalidPayloadSize,
    MalformedPacket,
    // caller correctable
    ClientIdentifierTooLong,
    InvalidTopic,
    // handshake and correlation errors
    ProtocolError,
    // connection/transport error
    ConnectionError,
    // chain of error
    TryFromIntError,
    IOError,
    FailConvert,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use ErrorKind::*;

        match self {
            // general error
            InvalidInput => write!(f, "InvalidInput"),
            // codec errors
            InvalidHeader => write!(f, "InvalidHeader"),
            InvalidPayloadSize => write!(f, "InvalidPayloadSize"),
            MalformedPacket => write!(f, "MalformedPacket"),
            // caller correctable
            ClientIdentifierTooLong => write!(f, "ClientIdentifierTooLong"),
            InvalidTopic => write!(f, "InvalidTopic"),
            // handshake and correlation errors
            ProtocolError => write!(f, "ProtocolError"),
            // connection/transport error
            ConnectionError => write!(f, "ConnectionError"),
            // chain of error
            TryFromIntError => write!(f, "TryFromIntError"),
            IOError => write!(f, "IOError"),
            FailConvert => write!(f, "FailConvert"),
        }
    }
}
