use std::fmt;
use std::str::{self, FromStr};

use bytes::{BufMut, Bytes, BytesMut};
use nom::IResult;
use nom::bytes::complete::{tag, take_till};
use nom::combinator::{map, map_res, rest};
use nom::number::complete::be_u16;
use nom::sequence::{terminated, tuple};
use thiserror::Error;

use super::Block;

/// Payload size of a full DATA packet. A shorter payload ends the transfer.
pub const BLOCK_SIZE: usize = 512;
/// Opcode plus block number in front of every DATA payload
const DATA_HEADER_LEN: usize = 4;
/// Largest datagram TFTP without options ever exchanges
pub const MAX_PACKET_LEN: usize = DATA_HEADER_LEN + BLOCK_SIZE;

/// TFTP opcodes (RFC 1350)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Rrq = 1,
    Wrq = 2,
    Data = 3,
    Ack = 4,
    Error = 5,
}

impl Opcode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Opcode::Rrq),
            2 => Some(Opcode::Wrq),
            3 => Some(Opcode::Data),
            4 => Some(Opcode::Ack),
            5 => Some(Opcode::Error),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Rrq => "RRQ",
            Opcode::Wrq => "WRQ",
            Opcode::Data => "DATA",
            Opcode::Ack => "ACK",
            Opcode::Error => "ERROR",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transfer mode named in a request.
///
/// Only `octet` is ever requested by the client; the other RFC 1350 names are
/// understood so that any well-formed request decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Netascii,
    #[default]
    Octet,
    Mail,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Netascii => "netascii",
            Mode::Octet => "octet",
            Mode::Mail => "mail",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transfer mode '{0}'")]
pub struct UnknownMode(String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netascii" => Ok(Mode::Netascii),
            "octet" => Ok(Mode::Octet),
            "mail" => Ok(Mode::Mail),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes defined by RFC 1350
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotDefined = 0,
    FileNotFound = 1,
    AccessViolation = 2,
    DiskFull = 3,
    IllegalOperation = 4,
    UnknownTid = 5,
    FileExists = 6,
    NoSuchUser = 7,
}

impl ErrorCode {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(ErrorCode::NotDefined),
            1 => Some(ErrorCode::FileNotFound),
            2 => Some(ErrorCode::AccessViolation),
            3 => Some(ErrorCode::DiskFull),
            4 => Some(ErrorCode::IllegalOperation),
            5 => Some(ErrorCode::UnknownTid),
            6 => Some(ErrorCode::FileExists),
            7 => Some(ErrorCode::NoSuchUser),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::NotDefined => "Not defined",
            ErrorCode::FileNotFound => "File not found",
            ErrorCode::AccessViolation => "Access violation",
            ErrorCode::DiskFull => "Disk full or allocation exceeded",
            ErrorCode::IllegalOperation => "Illegal TFTP operation",
            ErrorCode::UnknownTid => "Unknown transfer ID",
            ErrorCode::FileExists => "File already exists",
            ErrorCode::NoSuchUser => "No such user",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A decoded TFTP packet.
///
/// Packets only live for one send or receive; [`Packet::encode`] and
/// [`Packet::decode`] convert them to and from datagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq { filename: String, mode: Mode },
    Wrq { filename: String, mode: Mode },
    Data { block: Block, payload: Bytes },
    Ack(Block),
    Error { code: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("{field} contains a NUL byte")]
    EmbeddedNul { field: &'static str },

    #[error("DATA payload of {0} bytes exceeds 512 bytes")]
    PayloadTooLarge(usize),

    #[error("packet of {0} bytes exceeds 516 bytes")]
    PacketTooLarge(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedPacket {
    #[error("datagram too short to carry an opcode")]
    MissingOpcode,

    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),

    #[error("malformed {0} packet")]
    Invalid(Opcode),

    #[error("{0} packet has trailing bytes")]
    TrailingBytes(Opcode),

    #[error("datagram of {0} bytes exceeds 516 bytes")]
    Oversized(usize),
}

impl Packet {
    /// Read request for `filename` in octet mode
    pub fn rrq(filename: impl Into<String>) -> Packet {
        Packet::Rrq {
            filename: filename.into(),
            mode: Mode::Octet,
        }
    }

    /// Write request for `filename` in octet mode
    pub fn wrq(filename: impl Into<String>) -> Packet {
        Packet::Wrq {
            filename: filename.into(),
            mode: Mode::Octet,
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Packet {
        Packet::Error {
            code: code.as_u16(),
            message: message.into(),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Packet::Rrq { .. } => Opcode::Rrq,
            Packet::Wrq { .. } => Opcode::Wrq,
            Packet::Data { .. } => Opcode::Data,
            Packet::Ack(_) => Opcode::Ack,
            Packet::Error { .. } => Opcode::Error,
        }
    }

    pub fn encode(&self) -> Result<Bytes, EncodingError> {
        let mut buf = BytesMut::with_capacity(MAX_PACKET_LEN);

        match self {
            Packet::Rrq { filename, mode } => put_request(&mut buf, Opcode::Rrq, filename, *mode)?,
            Packet::Wrq { filename, mode } => put_request(&mut buf, Opcode::Wrq, filename, *mode)?,
            Packet::Data { block, payload } => {
                if payload.len() > BLOCK_SIZE {
                    return Err(EncodingError::PayloadTooLarge(payload.len()));
                }
                buf.put_u16(Opcode::Data.as_u16());
                buf.put_u16(block.get());
                buf.put_slice(payload);
            }
            Packet::Ack(block) => {
                buf.put_u16(Opcode::Ack.as_u16());
                buf.put_u16(block.get());
            }
            Packet::Error { code, message } => {
                check_nul("error message", message)?;
                buf.put_u16(Opcode::Error.as_u16());
                buf.put_u16(*code);
                buf.put_slice(message.as_bytes());
                buf.put_u8(0);
            }
        }

        if buf.len() > MAX_PACKET_LEN {
            return Err(EncodingError::PacketTooLarge(buf.len()));
        }

        Ok(buf.freeze())
    }

    pub fn decode(input: &[u8]) -> Result<Packet, MalformedPacket> {
        if input.len() > MAX_PACKET_LEN {
            return Err(MalformedPacket::Oversized(input.len()));
        }

        let (body, code) = parse_opcode(input).map_err(|_| MalformedPacket::MissingOpcode)?;
        let opcode = Opcode::from_u16(code).ok_or(MalformedPacket::UnknownOpcode(code))?;

        let parsed = match opcode {
            Opcode::Rrq => parse_rrq(body),
            Opcode::Wrq => parse_wrq(body),
            Opcode::Data => parse_data(body),
            Opcode::Ack => parse_ack(body),
            Opcode::Error => parse_error(body),
        };
        let (rest, packet) = parsed.map_err(|_| MalformedPacket::Invalid(opcode))?;

        if rest.is_empty() {
            Ok(packet)
        } else {
            Err(MalformedPacket::TrailingBytes(opcode))
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Packet::Rrq { filename, mode } | Packet::Wrq { filename, mode } => {
                write!(f, "{} '{}' ({})", self.opcode(), filename, mode)
            }
            Packet::Data { block, payload } => {
                write!(f, "DATA {} ({} bytes)", block, payload.len())
            }
            Packet::Ack(block) => write!(f, "ACK {}", block),
            Packet::Error { code, message } => write!(f, "ERROR {}: {}", code, message),
        }
    }
}

fn check_nul(field: &'static str, value: &str) -> Result<(), EncodingError> {
    if value.as_bytes().contains(&0) {
        Err(EncodingError::EmbeddedNul { field })
    } else {
        Ok(())
    }
}

fn put_request(
    buf: &mut BytesMut,
    opcode: Opcode,
    filename: &str,
    mode: Mode,
) -> Result<(), EncodingError> {
    check_nul("filename", filename)?;

    buf.put_u16(opcode.as_u16());
    buf.put_slice(filename.as_bytes());
    buf.put_u8(0);
    buf.put_slice(mode.as_str().as_bytes());
    buf.put_u8(0);

    Ok(())
}

fn parse_opcode(input: &[u8]) -> IResult<&[u8], u16> {
    be_u16(input)
}

fn nul_str(input: &[u8]) -> IResult<&[u8], &str> {
    map_res(
        terminated(take_till(|c| c == b'\0'), tag(&b"\0"[..])),
        str::from_utf8,
    )(input)
}

fn parse_mode(input: &[u8]) -> IResult<&[u8], Mode> {
    map_res(nul_str, Mode::from_str)(input)
}

fn parse_rrq(input: &[u8]) -> IResult<&[u8], Packet> {
    map(tuple((nul_str, parse_mode)), |(filename, mode)| Packet::Rrq {
        filename: filename.to_owned(),
        mode,
    })(input)
}

fn parse_wrq(input: &[u8]) -> IResult<&[u8], Packet> {
    map(tuple((nul_str, parse_mode)), |(filename, mode)| Packet::Wrq {
        filename: filename.to_owned(),
        mode,
    })(input)
}

fn parse_data(input: &[u8]) -> IResult<&[u8], Packet> {
    map(tuple((be_u16, rest)), |(block, payload): (u16, &[u8])| {
        Packet::Data {
            block: Block::new(block),
            payload: Bytes::copy_from_slice(payload),
        }
    })(input)
}

fn parse_ack(input: &[u8]) -> IResult<&[u8], Packet> {
    map(be_u16, |block| Packet::Ack(Block::new(block)))(input)
}

// Servers do not always terminate the message; it then runs to the end of
// the datagram. Anything after the terminator is ignored.
fn parse_error(input: &[u8]) -> IResult<&[u8], Packet> {
    map(
        tuple((be_u16, take_till(|c| c == b'\0'), rest)),
        |(code, message, _): (u16, &[u8], &[u8])| Packet::Error {
            code,
            message: String::from_utf8_lossy(message).into_owned(),
        },
    )(input)
}
