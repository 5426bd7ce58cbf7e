use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

use bytes::Bytes;

use super::packet::{ErrorCode, MAX_PACKET_LEN, Packet};
use crate::tftp::error::{Error, Result};

/// UDP endpoint of one transfer
///
/// The socket is bound to an ephemeral local port and is never connected:
/// the server answers from a transaction-specific port that is only known
/// once its first reply arrives. That first source address becomes the
/// pinned peer; datagrams from anywhere else are dropped.
#[derive(Debug)]
pub struct Session {
    socket: Option<UdpSocket>,
    server: SocketAddr,
    peer: Option<SocketAddr>,
    // one byte over the limit so oversized datagrams are seen, not truncated
    buffer: Vec<u8>,
}

impl Session {
    /// Bind a socket for talking to `server`
    pub fn open(server: SocketAddr) -> Result<Self> {
        let local = match server.ip() {
            IpAddr::V4(_) => SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0),
            IpAddr::V6(_) => SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpSocket::bind(local).map_err(Error::Socket)?;

        log::debug!(
            "Opened session on {} for server {}",
            socket.local_addr().map_err(Error::Socket)?,
            server
        );

        Ok(Self {
            socket: Some(socket),
            server,
            peer: None,
            buffer: vec![0u8; MAX_PACKET_LEN + 1],
        })
    }

    /// Address the request was sent to
    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Transfer address of the server, once it has replied
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket()?.local_addr().map_err(Error::Socket)
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Send one datagram to `addr`
    pub fn send_to(&self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
        let sent = self.socket()?.send_to(bytes, addr).map_err(Error::Send)?;

        if sent != bytes.len() {
            return Err(Error::Send(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {} of {} bytes", sent, bytes.len()),
            )));
        }

        Ok(())
    }

    /// Send an encoded packet to the peer, or to the server until the peer is known
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.send_to(bytes, self.target())
    }

    pub fn send(&self, packet: &Packet) -> Result<()> {
        log::trace!("Send {} to {}", packet, self.target());
        self.send_bytes(&packet.encode()?)
    }

    /// Wait up to `timeout` for a datagram from the peer
    ///
    /// The first datagram received pins the peer address. Later datagrams from
    /// other addresses are answered with an "Unknown transfer ID" error and
    /// skipped; they do not extend the deadline.
    pub fn receive(&mut self, timeout: Duration) -> Result<(Bytes, SocketAddr)> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }

            let socket = self.socket.as_ref().ok_or_else(closed)?;
            socket.set_read_timeout(Some(remaining)).map_err(Error::Socket)?;

            let (len, from) = match socket.recv_from(&mut self.buffer) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    return Err(Error::Timeout);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Receive(e)),
            };

            match self.peer {
                None => {
                    log::debug!("Server transfer ID is {}", from);
                    self.peer = Some(from);
                }
                Some(peer) if peer != from => {
                    log::warn!("Ignoring {} bytes from unexpected source {}", len, from);
                    self.reject(from);
                    continue;
                }
                Some(_) => {}
            }

            return Ok((Bytes::copy_from_slice(&self.buffer[..len]), from));
        }
    }

    /// Release the socket. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            log::trace!("Session for {} closed", self.server);
        }
    }

    fn target(&self) -> SocketAddr {
        self.peer.unwrap_or(self.server)
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or_else(closed)
    }

    // RFC 1350 section 4: tell the stray sender, but keep the transfer going.
    fn reject(&self, stray: SocketAddr) {
        let reply = Packet::error(ErrorCode::UnknownTid, ErrorCode::UnknownTid.description());

        if let Ok(bytes) = reply.encode() {
            if let Err(e) = self.send_to(&bytes, stray) {
                log::debug!("Could not notify {}: {}", stray, e);
            }
        }
    }
}

fn closed() -> Error {
    Error::Socket(io::Error::new(io::ErrorKind::NotConnected, "session is closed"))
}

/// Resolve a server name to an endpoint.
///
/// `host` may carry its own port (`10.0.0.1:1069`, `[::1]:69`,
/// `tftp.local:1069`), otherwise `port` is used.
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(addr) = host.parse::<SocketAddr>() {
        return Ok(addr);
    }

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let lookup = match host.rsplit_once(':') {
        Some((name, p)) if !name.contains(':') && p.parse::<u16>().is_ok() => host.to_socket_addrs(),
        _ => (host, port).to_socket_addrs(),
    };

    lookup
        .and_then(|mut addrs| {
            addrs
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses found"))
        })
        .map_err(|source| Error::AddressResolution {
            host: host.to_string(),
            source,
        })
}
