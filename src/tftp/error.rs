use std::fmt;
use std::io;

use thiserror::Error;

use crate::tftp::core::{EncodingError, MalformedPacket};

/// Type alias to [`Result<T, Error>`](std::result::Result).
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can end a transfer early.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to resolve '{host}': {source}")]
    AddressResolution {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("Socket error: {0}")]
    Socket(#[source] io::Error),

    #[error("Failed to send datagram: {0}")]
    Send(#[source] io::Error),

    #[error("Failed to receive datagram: {0}")]
    Receive(#[source] io::Error),

    #[error("Timed out waiting for the server")]
    Timeout,

    #[error("Server error {code}: {message}")]
    Server { code: u16, message: String },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Local I/O error: {0}")]
    LocalIo(#[source] io::Error),
}

impl From<MalformedPacket> for Error {
    fn from(error: MalformedPacket) -> Error {
        Error::ProtocolViolation(error.to_string())
    }
}

impl From<EncodingError> for Error {
    fn from(error: EncodingError) -> Error {
        Error::ProtocolViolation(format!("cannot encode packet: {}", error))
    }
}

impl Error {
    /// Outcome reported to the caller for this failure.
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::AddressResolution { .. } => Outcome::AddressResolutionFailed,
            Error::Socket(_) | Error::Send(_) | Error::Receive(_) => Outcome::SocketFailure,
            Error::Timeout => Outcome::Timeout,
            Error::Server { code, message } => Outcome::ServerError {
                code: *code,
                message: message.clone(),
            },
            Error::ProtocolViolation(detail) => Outcome::ProtocolViolation {
                detail: detail.clone(),
            },
            Error::LocalIo(_) => Outcome::LocalIoError,
        }
    }
}

/// Final result of a transfer as surfaced to the caller.
///
/// Every transfer ends in exactly one outcome. The CLI turns it into the
/// process exit status with [`Outcome::exit_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    AddressResolutionFailed,
    SocketFailure,
    Timeout,
    ServerError { code: u16, message: String },
    ProtocolViolation { detail: String },
    LocalIoError,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }

    /// Process exit status: 0 for success, a distinct non-zero value otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Ok => 0,
            Outcome::AddressResolutionFailed => 2,
            Outcome::SocketFailure => 3,
            Outcome::Timeout => 4,
            Outcome::ServerError { .. } => 5,
            Outcome::ProtocolViolation { .. } => 6,
            Outcome::LocalIoError => 7,
        }
    }
}

impl<T> From<&Result<T>> for Outcome {
    fn from(result: &Result<T>) -> Outcome {
        match result {
            Ok(_) => Outcome::Ok,
            Err(e) => e.outcome(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok => write!(f, "ok"),
            Outcome::AddressResolutionFailed => write!(f, "address resolution failed"),
            Outcome::SocketFailure => write!(f, "socket failure"),
            Outcome::Timeout => write!(f, "timeout"),
            Outcome::ServerError { code, message } => {
                write!(f, "server error {}: {}", code, message)
            }
            Outcome::ProtocolViolation { detail } => write!(f, "protocol violation: {}", detail),
            Outcome::LocalIoError => write!(f, "local I/O error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tftp::core::Opcode;

    #[test]
    fn every_error_maps_to_one_outcome() {
        let cases = vec![
            (
                Error::AddressResolution {
                    host: "nowhere.invalid".to_string(),
                    source: io::ErrorKind::NotFound.into(),
                },
                Outcome::AddressResolutionFailed,
            ),
            (Error::Socket(io::ErrorKind::AddrInUse.into()), Outcome::SocketFailure),
            (Error::Send(io::ErrorKind::WriteZero.into()), Outcome::SocketFailure),
            (Error::Receive(io::ErrorKind::ConnectionReset.into()), Outcome::SocketFailure),
            (Error::Timeout, Outcome::Timeout),
            (
                Error::Server {
                    code: 1,
                    message: "File not found".to_string(),
                },
                Outcome::ServerError {
                    code: 1,
                    message: "File not found".to_string(),
                },
            ),
            (
                Error::ProtocolViolation("bad block".to_string()),
                Outcome::ProtocolViolation {
                    detail: "bad block".to_string(),
                },
            ),
            (Error::LocalIo(io::ErrorKind::PermissionDenied.into()), Outcome::LocalIoError),
        ];

        for (error, outcome) in cases {
            assert_eq!(error.outcome(), outcome, "{}", error);
        }
    }

    #[test]
    fn exit_codes_are_distinct() {
        let outcomes = [
            Outcome::Ok,
            Outcome::AddressResolutionFailed,
            Outcome::SocketFailure,
            Outcome::Timeout,
            Outcome::ServerError {
                code: 0,
                message: String::new(),
            },
            Outcome::ProtocolViolation {
                detail: String::new(),
            },
            Outcome::LocalIoError,
        ];

        let mut codes: Vec<u8> = outcomes.iter().map(Outcome::exit_code).collect();
        assert_eq!(codes[0], 0);
        assert!(codes[1..].iter().all(|c| *c != 0));

        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), outcomes.len());
    }

    #[test]
    fn codec_errors_are_protocol_violations() {
        let error: Error = MalformedPacket::UnknownOpcode(9).into();
        assert!(matches!(error.outcome(), Outcome::ProtocolViolation { .. }));

        let error: Error = MalformedPacket::Invalid(Opcode::Ack).into();
        assert_eq!(error.to_string(), "Protocol violation: malformed ACK packet");

        let error: Error = EncodingError::EmbeddedNul { field: "filename" }.into();
        assert!(matches!(error.outcome(), Outcome::ProtocolViolation { .. }));
    }

    #[test]
    fn outcome_from_result() {
        let ok: Result<u64> = Ok(3);
        assert!(Outcome::from(&ok).is_ok());

        let failed: Result<u64> = Err(Error::Timeout);
        assert_eq!(Outcome::from(&failed), Outcome::Timeout);
        assert_eq!(Outcome::from(&failed).to_string(), "timeout");
    }
}
