use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use super::config::ClientConfig;
use super::read::ReadTransfer;
use super::write::WriteTransfer;
use crate::tftp::core::Session;
use crate::tftp::error::{Error, Result};

/// Statistics of a finished transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Payload bytes written (download) or acknowledged (upload)
    pub bytes: u64,
    /// DATA blocks exchanged, including a final empty one
    pub blocks: u64,
    /// Packets sent again after a reply timeout
    pub retransmissions: u32,
    pub elapsed: Duration,
}

impl TransferSummary {
    /// Throughput in bytes per second
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.bytes as f64 / secs } else { 0.0 }
    }
}

/// TFTP client
///
/// Supports file upload (PUT) and download (GET) operations, one file at a
/// time, in octet mode.
///
/// # Example
///
/// ```rust,no_run
/// use tinytftp::tftp::client::{Client, ClientConfig};
/// use std::path::Path;
///
/// let config = ClientConfig::new("192.168.1.100:69".parse().unwrap());
/// let client = Client::new(config);
///
/// // Download file
/// client.get_file("remote.txt", Path::new("local.txt")).unwrap();
///
/// // Upload file
/// client.put_file(Path::new("local.txt"), "remote.txt").unwrap();
/// ```
pub struct Client {
    config: ClientConfig,
}

impl Client {
    /// Create a new TFTP client
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Download a file from the server into `output` (RRQ - Read Request)
    ///
    /// # Arguments
    ///
    /// * `remote_file` - File name on the server
    /// * `output` - Receives the file contents
    pub fn get<W: Write>(&self, remote_file: &str, output: &mut W) -> Result<TransferSummary> {
        log::info!("Downloading {} from {}", remote_file, self.config.server);

        let session = Session::open(self.config.server)?;
        let summary = ReadTransfer::new(session, remote_file, output, self.config.retry).run()?;

        log::info!(
            "Download complete: {} bytes in {:.2}s",
            summary.bytes,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Upload the contents of `input` to the server (WRQ - Write Request)
    ///
    /// # Arguments
    ///
    /// * `input` - Source of the file contents
    /// * `remote_file` - File name on the server
    pub fn put<R: Read>(&self, input: &mut R, remote_file: &str) -> Result<TransferSummary> {
        log::info!("Uploading {} to {}", remote_file, self.config.server);

        let session = Session::open(self.config.server)?;
        let summary = WriteTransfer::new(session, remote_file, input, self.config.retry).run()?;

        log::info!(
            "Upload complete: {} bytes in {:.2}s",
            summary.bytes,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Download `remote_file` into a local file, created or truncated first
    ///
    /// A failed download leaves whatever was received in `local_file`.
    pub fn get_file(&self, remote_file: &str, local_file: &Path) -> Result<TransferSummary> {
        let file = File::create(local_file).map_err(Error::LocalIo)?;
        let mut output = BufWriter::new(file);
        self.get(remote_file, &mut output)
    }

    /// Upload a local file as `remote_file`
    pub fn put_file(&self, local_file: &Path, remote_file: &str) -> Result<TransferSummary> {
        let mut input = File::open(local_file).map_err(Error::LocalIo)?;
        self.put(&mut input, remote_file)
    }
}
