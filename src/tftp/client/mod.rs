//! TFTP client
//!
//! - `client`: Entry points for downloads and uploads
//! - `read`: Download state machine (RRQ)
//! - `write`: Upload state machine (WRQ)
//! - `config`: Client configuration and settings file

#[allow(clippy::module_inception)]
mod client;
mod config;
mod read;
mod write;

use std::io;

use crate::tftp::core::{ErrorCode, Packet, Session};
use crate::tftp::error::Error;

pub use client::{Client, TransferSummary};
pub use config::{ClientConfig, DEFAULT_PORT, Settings};
pub use read::{ReadState, ReadTransfer};
pub use write::{WriteState, WriteTransfer};

/// Tell the server why we are giving up, so it stops retransmitting.
///
/// Only failures on our side are reported, and only once the server's
/// transfer port is known. Server errors are never answered.
fn abort(session: &Session, error: &Error) {
    if session.peer_addr().is_none() {
        return;
    }

    let packet = match error {
        Error::ProtocolViolation(detail) => Packet::error(ErrorCode::IllegalOperation, detail.as_str()),
        Error::LocalIo(e) if e.kind() == io::ErrorKind::StorageFull => {
            Packet::error(ErrorCode::DiskFull, ErrorCode::DiskFull.description())
        }
        Error::LocalIo(e) => Packet::error(ErrorCode::NotDefined, e.to_string()),
        _ => return,
    };

    if let Err(e) = session.send(&packet) {
        log::debug!("Could not send {}: {}", packet, e);
    }
}
