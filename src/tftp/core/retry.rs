use std::time::{Duration, Instant};

use super::packet::Packet;
use super::socket::Session;
use crate::tftp::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRIES: u32 = 5;

/// How long to wait for each reply and how often to retransmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

/// What a transfer makes of a received packet
pub(crate) enum Reply<T> {
    /// The packet the transfer was waiting for
    Accept(T),
    /// Duplicate or stale; keep waiting
    Ignore,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_RETRIES,
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }

    /// Send `packet`, then wait until `handle` accepts a reply.
    ///
    /// `packet` is sent again each time `timeout` passes without an accepted
    /// reply, at most `max_retries` times. Ignored packets do not restart the
    /// clock. Every retransmission is counted in `retransmissions`.
    pub(crate) fn exchange<T, F>(
        &self,
        session: &mut Session,
        packet: &[u8],
        retransmissions: &mut u32,
        mut handle: F,
    ) -> Result<T>
    where
        F: FnMut(Packet) -> Result<Reply<T>>,
    {
        let mut retries = 0;
        session.send_bytes(packet)?;
        let mut deadline = Instant::now() + self.timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());

            match session.receive(remaining) {
                Ok((bytes, _)) => match handle(Packet::decode(&bytes)?)? {
                    Reply::Accept(value) => return Ok(value),
                    Reply::Ignore => continue,
                },
                Err(Error::Timeout) if retries < self.max_retries => {
                    retries += 1;
                    *retransmissions += 1;
                    log::warn!(
                        "No reply after {:?}, retransmitting ({}/{})",
                        self.timeout,
                        retries,
                        self.max_retries
                    );
                    session.send_bytes(packet)?;
                    deadline = Instant::now() + self.timeout;
                }
                Err(Error::Timeout) => {
                    log::error!("Giving up after {} retransmissions", retries);
                    return Err(Error::Timeout);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
