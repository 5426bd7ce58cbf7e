//! Minimal TFTP client.
//!
//! The [`tftp`] module holds the protocol and the client; [`cli`] holds the
//! command-line front end shared by the `gettftp` and `puttftp` binaries.

pub mod cli;
pub mod tftp;

pub use tftp::{Error, Outcome, Result};
