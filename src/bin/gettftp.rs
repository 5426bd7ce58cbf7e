use std::process::ExitCode;

use clap::Parser;
use tinytftp::cli::{self, GetCli};

fn main() -> ExitCode {
    let args = GetCli::parse();
    cli::init_logger(args.common.verbose);

    cli::finish(cli::download(&args))
}
