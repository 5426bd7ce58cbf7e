//! Scripted TFTP server for driving the client over loopback.
//!
//! The request arrives on a listening socket; every reply comes from a
//! second, freshly bound socket, the way a real server answers from a
//! transfer-specific port.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use tinytftp::tftp::client::{Client, ClientConfig};
use tinytftp::tftp::core::{BLOCK_SIZE, Block, MAX_PACKET_LEN, Packet};

/// How long the script waits for the client before failing the test
pub const PATIENCE: Duration = Duration::from_secs(3);

pub struct Listener {
    socket: UdpSocket,
}

impl Listener {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(PATIENCE)).unwrap();
        Self { socket }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().unwrap()
    }

    /// Next request datagram and where it came from
    pub fn request(&self) -> (Packet, SocketAddr) {
        let mut buf = [0u8; MAX_PACKET_LEN + 1];
        let (len, from) = self.socket.recv_from(&mut buf).expect("no request from the client");
        (Packet::decode(&buf[..len]).unwrap(), from)
    }

    /// Wait for a request and answer it from a new transfer port
    pub fn accept(&self) -> (Packet, Peer) {
        let (request, client) = self.request();
        (request, Peer::new(client))
    }

    pub fn expect_silence(&self, wait: Duration) {
        expect_silence(&self.socket, wait);
    }
}

/// Server side of one transfer
pub struct Peer {
    socket: UdpSocket,
    client: SocketAddr,
}

impl Peer {
    pub fn new(client: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.set_read_timeout(Some(PATIENCE)).unwrap();
        Self { socket, client }
    }

    pub fn client(&self) -> SocketAddr {
        self.client
    }

    pub fn send(&self, packet: &Packet) {
        self.send_raw(&packet.encode().unwrap());
    }

    pub fn send_raw(&self, bytes: &[u8]) {
        self.socket.send_to(bytes, self.client).unwrap();
    }

    pub fn send_data(&self, block: u16, payload: &[u8]) {
        self.send(&data(block, payload));
    }

    pub fn send_ack(&self, block: u16) {
        self.send(&Packet::Ack(Block::new(block)));
    }

    /// Next packet from the client, which must come from its request port
    pub fn recv(&self) -> Packet {
        let mut buf = [0u8; MAX_PACKET_LEN + 1];
        let (len, from) = self.socket.recv_from(&mut buf).expect("client went quiet");
        assert_eq!(from.port(), self.client.port(), "reply from a different client port");
        Packet::decode(&buf[..len]).unwrap()
    }

    pub fn expect_ack(&self, block: u16) {
        assert_eq!(self.recv(), Packet::Ack(Block::new(block)));
    }

    pub fn expect_silence(&self, wait: Duration) {
        expect_silence(&self.socket, wait);
    }

    /// Send `content` as DATA blocks, waiting for each ACK
    pub fn serve(&self, content: &[u8]) {
        let mut block = Block::FIRST;
        for chunk in blocks(content) {
            self.send(&Packet::Data {
                block,
                payload: Bytes::copy_from_slice(chunk),
            });
            assert_eq!(self.recv(), Packet::Ack(block));
            block = block.next();
        }
    }

    /// Acknowledge DATA blocks until the final one; returns the upload
    pub fn collect(&self) -> Vec<u8> {
        let mut received = Vec::new();
        let mut expected = Block::FIRST;

        loop {
            match self.recv() {
                Packet::Data { block, payload } => {
                    assert_eq!(block, expected);
                    received.extend_from_slice(&payload);
                    self.send(&Packet::Ack(block));
                    if payload.len() < BLOCK_SIZE {
                        return received;
                    }
                    expected = expected.next();
                }
                other => panic!("expected DATA {}, got {}", expected, other),
            }
        }
    }
}

/// Server script running on its own thread
pub struct Script {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Script {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the script, re-raising its assertion failures
    pub fn finish(self) {
        if let Err(panic) = self.handle.join() {
            std::panic::resume_unwind(panic);
        }
    }
}

/// Run `script` against the first request that arrives
pub fn serve<F>(script: F) -> Script
where
    F: FnOnce(Packet, Peer) + Send + 'static,
{
    let listener = Listener::bind();
    let addr = listener.addr();
    let handle = thread::spawn(move || {
        let (request, peer) = listener.accept();
        script(request, peer);
    });

    Script { addr, handle }
}

pub fn client(server: SocketAddr) -> Client {
    Client::new(ClientConfig::new(server).with_timeout(Duration::from_secs(1)).with_retries(2))
}

/// Client that gives up quickly, for scripts that drop packets
pub fn impatient_client(server: SocketAddr, retries: u32) -> Client {
    Client::new(
        ClientConfig::new(server)
            .with_timeout(Duration::from_millis(200))
            .with_retries(retries),
    )
}

pub fn data(block: u16, payload: &[u8]) -> Packet {
    Packet::Data {
        block: Block::new(block),
        payload: Bytes::copy_from_slice(payload),
    }
}

/// Split `content` the way the protocol does: full blocks, then one short
/// (possibly empty) block
pub fn blocks(content: &[u8]) -> Vec<&[u8]> {
    let mut chunks: Vec<&[u8]> = content.chunks(BLOCK_SIZE).collect();
    if content.len() % BLOCK_SIZE == 0 {
        chunks.push(&[]);
    }
    chunks
}

pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    bytes
}

fn expect_silence(socket: &UdpSocket, wait: Duration) {
    let mut buf = [0u8; MAX_PACKET_LEN + 1];
    socket.set_read_timeout(Some(wait)).unwrap();
    if let Ok((len, _)) = socket.recv_from(&mut buf) {
        panic!("unexpected datagram: {:?}", Packet::decode(&buf[..len]));
    }
    socket.set_read_timeout(Some(PATIENCE)).unwrap();
}
