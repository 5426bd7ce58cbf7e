use std::process::ExitCode;

use clap::Parser;
use tinytftp::cli::{self, PutCli};

fn main() -> ExitCode {
    let args = PutCli::parse();
    cli::init_logger(args.common.verbose);

    cli::finish(cli::upload(&args))
}
