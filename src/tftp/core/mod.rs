//! TFTP core protocol implementation
//!
//! This module contains the core components of the TFTP protocol:
//! - `packet`: Packet serialization and deserialization
//! - `block`: Wrapping block numbers
//! - `socket`: Transfer session over a UDP socket
//! - `retry`: Reply timeout and retransmission

mod block;
mod packet;
mod retry;
mod socket;

// Public core types
pub use block::Block;
pub use packet::{
    BLOCK_SIZE, EncodingError, ErrorCode, MAX_PACKET_LEN, MalformedPacket, Mode, Opcode, Packet,
    UnknownMode,
};
pub(crate) use retry::Reply;
pub use retry::{DEFAULT_RETRIES, DEFAULT_TIMEOUT, RetryPolicy};
pub use socket::{Session, resolve};
