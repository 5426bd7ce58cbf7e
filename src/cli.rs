//! Command-line front end of `gettftp` and `puttftp`
//!
//! ```text
//! gettftp [OPTIONS] <HOST> <FILE>     download FILE into ./FILE
//! puttftp [OPTIONS] <HOST> <FILE>     upload ./FILE as FILE
//! ```
//!
//! Settings come from an optional TOML file (`--config`), overridden by
//! the command-line flags. The exit status is the transfer [`Outcome`].

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser};
use humantime_serde::re::humantime;

use crate::tftp::client::{Client, Settings, TransferSummary};
use crate::tftp::core::resolve;
use crate::tftp::{Error, Outcome};

/// Exit status for failures that happen before any transfer starts
pub const USAGE_EXIT_CODE: u8 = 1;

/// Options shared by both commands
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Server port [default: 69, or the config file value]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Reply timeout, e.g. "500ms" or "3s" [default: 5s]
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Retransmissions before giving up [default: 5]
    #[arg(short = 'R', long)]
    pub retries: Option<u32>,

    /// TOML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Download a file from a TFTP server
#[derive(Parser, Debug)]
#[command(name = "gettftp", version)]
pub struct GetCli {
    /// Server host name or address, optionally with a port (host:port)
    pub host: String,

    /// Name of the file on the server
    pub file: String,

    /// Local destination [default: the remote file name]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing local file without asking
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Upload a file to a TFTP server
#[derive(Parser, Debug)]
#[command(name = "puttftp", version)]
pub struct PutCli {
    /// Server host name or address, optionally with a port (host:port)
    pub host: String,

    /// Local file to send
    pub file: PathBuf,

    /// Name to store the file under [default: the local file name]
    #[arg(short, long)]
    pub remote_name: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Initialize logging; `RUST_LOG` takes precedence over `verbose`
pub fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

pub fn download(cli: &GetCli) -> anyhow::Result<TransferSummary> {
    let client = connect(&cli.host, &cli.common)?;
    let local = match &cli.output {
        Some(path) => path.clone(),
        None => local_name(&cli.file)?,
    };

    if local.exists() && !cli.force && !confirm_overwrite(&local)? {
        anyhow::bail!("Not overwriting {}", local.display());
    }

    client.get_file(&cli.file, &local).map_err(|e| {
        if local.exists() {
            log::warn!("Partial download left in {}", local.display());
        }
        anyhow::Error::new(e).context(format!("Download of {} failed", cli.file))
    })
}

pub fn upload(cli: &PutCli) -> anyhow::Result<TransferSummary> {
    let client = connect(&cli.host, &cli.common)?;
    let remote = match &cli.remote_name {
        Some(name) => name.clone(),
        None => cli
            .file
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .with_context(|| format!("Cannot derive a remote name from {}", cli.file.display()))?,
    };

    client
        .put_file(&cli.file, &remote)
        .with_context(|| format!("Upload of {} failed", cli.file.display()))
}

/// Log the result and turn it into the process exit status
pub fn finish(result: anyhow::Result<TransferSummary>) -> ExitCode {
    match result {
        Ok(summary) => {
            log::info!(
                "{} bytes in {} blocks, {:.1} KiB/s, {} retransmissions",
                summary.bytes,
                summary.blocks,
                summary.rate() / 1024.0,
                summary.retransmissions
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(outcome_of(&e).map_or(USAGE_EXIT_CODE, |o| o.exit_code()))
        }
    }
}

/// Transfer outcome behind an error, if the error came from a transfer
pub fn outcome_of(error: &anyhow::Error) -> Option<Outcome> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::outcome)
}

fn connect(host: &str, args: &CommonArgs) -> anyhow::Result<Client> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let settings = settings.merge_cli(args.port, args.timeout, args.retries)?;
    let server = resolve(host, settings.port)?;

    log::debug!(
        "Server {} (timeout {:?}, {} retries)",
        server,
        settings.timeout,
        settings.retries
    );
    Ok(Client::new(settings.client_config(server)))
}

fn local_name(remote: &str) -> anyhow::Result<PathBuf> {
    Path::new(remote)
        .file_name()
        .map(PathBuf::from)
        .with_context(|| format!("Cannot derive a local file name from '{}'", remote))
}

// Without a terminal there is nobody to ask; the file is overwritten.
fn confirm_overwrite(path: &Path) -> anyhow::Result<bool> {
    if !io::stdin().is_terminal() {
        log::info!("Overwriting {}", path.display());
        return Ok(true);
    }

    dialoguer::Confirm::new()
        .with_prompt(format!("{} already exists. Overwrite?", path.display()))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}
