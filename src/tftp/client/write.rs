use std::io::{self, Read};
use std::time::Instant;

use bytes::{Bytes, BytesMut};

use super::client::TransferSummary;
use crate::tftp::core::{BLOCK_SIZE, Block, Packet, Reply, RetryPolicy, Session};
use crate::tftp::error::{Error, Result};

/// Progress of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    Init,
    AwaitingAck0,
    SendingData,
    AwaitingAck,
    Done,
    Failed,
}

/// Upload of one file (WRQ)
///
/// Sends `input` in 512-byte DATA blocks, one at a time, each only after the
/// previous one was acknowledged. An empty input still sends one empty block.
pub struct WriteTransfer<'a, R: Read> {
    session: Session,
    filename: &'a str,
    input: &'a mut R,
    policy: RetryPolicy,
    state: WriteState,
    summary: TransferSummary,
}

impl<'a, R: Read> WriteTransfer<'a, R> {
    pub fn new(session: Session, filename: &'a str, input: &'a mut R, policy: RetryPolicy) -> Self {
        Self {
            session,
            filename,
            input,
            policy,
            state: WriteState::Init,
            summary: TransferSummary::default(),
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    /// Drive the transfer to completion; the session is closed on return
    pub fn run(&mut self) -> Result<TransferSummary> {
        let started = Instant::now();
        let result = self.try_run();
        self.summary.elapsed = started.elapsed();

        if let Err(e) = &result {
            self.state = WriteState::Failed;
            super::abort(&self.session, e);
            log::debug!(
                "WRQ '{}' failed after {} bytes: {}",
                self.filename,
                self.summary.bytes,
                e
            );
        }

        self.session.close();
        result.map(|_| self.summary)
    }

    fn try_run(&mut self) -> Result<()> {
        let request = Packet::wrq(self.filename).encode()?;
        self.state = WriteState::AwaitingAck0;
        self.policy.exchange(
            &mut self.session,
            &request,
            &mut self.summary.retransmissions,
            |packet| expect_ack(packet, Block::ZERO, false),
        )?;

        let mut block = Block::FIRST;

        loop {
            self.state = WriteState::SendingData;
            let payload = self.read_block()?;
            let len = payload.len();
            let data = Packet::Data { block, payload }.encode()?;

            self.state = WriteState::AwaitingAck;
            self.policy.exchange(
                &mut self.session,
                &data,
                &mut self.summary.retransmissions,
                |packet| expect_ack(packet, block, true),
            )?;

            self.summary.bytes += len as u64;
            self.summary.blocks += 1;
            log::debug!("Received ACK for block {} ({} bytes)", block, len);

            if len < BLOCK_SIZE {
                self.state = WriteState::Done;
                log::debug!("Transfer complete. Total bytes: {}", self.summary.bytes);
                return Ok(());
            }

            block = block.next();
        }
    }

    /// Fill one block, short only at end of input
    fn read_block(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(BLOCK_SIZE);
        let mut len = 0;

        while len < BLOCK_SIZE {
            match self.input.read(&mut buf[len..]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::LocalIo(e)),
            }
        }

        buf.truncate(len);
        Ok(buf.freeze())
    }
}

// A duplicate ACK for the previous block (left over from a retransmission)
// is skipped, never answered.
fn expect_ack(packet: Packet, block: Block, skip_stale: bool) -> Result<Reply<()>> {
    match packet {
        Packet::Ack(acked) if acked == block => Ok(Reply::Accept(())),
        Packet::Ack(acked) if skip_stale && acked == block.prev() => {
            log::debug!("Ignoring duplicate ACK {} (waiting for {})", acked, block);
            Ok(Reply::Ignore)
        }
        Packet::Ack(acked) => Err(Error::ProtocolViolation(format!(
            "expected ACK {}, received ACK {}",
            block, acked
        ))),
        Packet::Error { code, message } => Err(Error::Server { code, message }),
        other => Err(Error::ProtocolViolation(format!(
            "expected ACK {}, received {}",
            block,
            other.opcode()
        ))),
    }
}
