//! TFTP (Trivial File Transfer Protocol) client
//!
//! This module implements the client side of
//! [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350) TFTP Protocol version 2:
//! one download (RRQ) or upload (WRQ) at a time, octet mode, 512-byte blocks,
//! stop-and-wait with a bounded reply timeout and retransmission.
//!
//! ## Module Structure
//!
//! ```text
//! tftp/
//! ├── core/           # Core protocol implementation
//! │   ├── packet      # Packet serialization/deserialization
//! │   ├── block       # Wrapping block numbers
//! │   ├── socket      # Transfer session over UDP
//! │   └── retry       # Reply timeout and retransmission
//! │
//! ├── client/         # TFTP client
//! │   ├── client      # Download/upload entry points
//! │   ├── read        # RRQ state machine
//! │   ├── write       # WRQ state machine
//! │   └── config      # Client configuration
//! │
//! └── error           # Error and outcome taxonomy
//! ```
//!
//! ## Usage Examples
//!
//! ### Download a file
//!
//! ```rust,no_run
//! use tinytftp::tftp::client::{Client, ClientConfig};
//! use tinytftp::tftp::core::resolve;
//!
//! let server = resolve("tftp.example.com", 69).unwrap();
//! let client = Client::new(ClientConfig::new(server));
//!
//! let mut contents = Vec::new();
//! client.get("pxelinux.0", &mut contents).unwrap();
//! ```

// Submodules
pub mod client;
pub mod core;
mod error;

// Re-export commonly used types for convenience
pub use error::{Error, Outcome, Result};
