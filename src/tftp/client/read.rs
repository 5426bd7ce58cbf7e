use std::io::Write;
use std::time::Instant;

use super::client::TransferSummary;
use crate::tftp::core::{BLOCK_SIZE, Block, Packet, Reply, RetryPolicy, Session};
use crate::tftp::error::{Error, Result};

/// Progress of a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Init,
    AwaitingFirstData,
    ReceivingData,
    Done,
    Failed,
}

/// Download of one file (RRQ)
///
/// Writes every in-order DATA payload to `output` and acknowledges it.
/// Blocks with any other number are dropped without an ACK. Output written
/// before a failure is left in place.
pub struct ReadTransfer<'a, W: Write> {
    session: Session,
    filename: &'a str,
    output: &'a mut W,
    policy: RetryPolicy,
    state: ReadState,
    expected: Block,
    summary: TransferSummary,
}

impl<'a, W: Write> ReadTransfer<'a, W> {
    pub fn new(session: Session, filename: &'a str, output: &'a mut W, policy: RetryPolicy) -> Self {
        Self {
            session,
            filename,
            output,
            policy,
            state: ReadState::Init,
            expected: Block::FIRST,
            summary: TransferSummary::default(),
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Drive the transfer to completion; the session is closed on return
    pub fn run(&mut self) -> Result<TransferSummary> {
        let started = Instant::now();
        let result = self.try_run();
        self.summary.elapsed = started.elapsed();

        if let Err(e) = &result {
            self.state = ReadState::Failed;
            super::abort(&self.session, e);
            log::debug!(
                "RRQ '{}' failed after {} bytes: {}",
                self.filename,
                self.summary.bytes,
                e
            );
        }

        self.session.close();
        result.map(|_| self.summary)
    }

    fn try_run(&mut self) -> Result<()> {
        let mut outgoing = Packet::rrq(self.filename).encode()?;
        self.state = ReadState::AwaitingFirstData;

        loop {
            let expected = self.expected;
            let payload = self.policy.exchange(
                &mut self.session,
                &outgoing,
                &mut self.summary.retransmissions,
                |packet| match packet {
                    Packet::Data { block, payload } if block == expected => Ok(Reply::Accept(payload)),
                    Packet::Data { block, .. } => {
                        log::debug!("Ignoring DATA block {} (expecting {})", block, expected);
                        Ok(Reply::Ignore)
                    }
                    Packet::Error { code, message } => Err(Error::Server { code, message }),
                    other => Err(Error::ProtocolViolation(format!(
                        "expected DATA block {}, received {}",
                        expected,
                        other.opcode()
                    ))),
                },
            )?;

            self.output.write_all(&payload).map_err(Error::LocalIo)?;
            self.summary.bytes += payload.len() as u64;
            self.summary.blocks += 1;
            log::debug!("Received block {} ({} bytes)", expected, payload.len());

            outgoing = Packet::Ack(expected).encode()?;
            self.expected = expected.next();
            self.state = ReadState::ReceivingData;

            if payload.len() < BLOCK_SIZE {
                self.session.send_bytes(&outgoing)?;
                self.output.flush().map_err(Error::LocalIo)?;
                self.state = ReadState::Done;
                log::debug!("Transfer complete. Total bytes: {}", self.summary.bytes);
                return Ok(());
            }
        }
    }
}
