//! sightline: client-sighting telemetry ingestion service.

use clap::Parser;
use sl_core::cli::{self, Cli};
use sl_core::logging;

fn main() {
    let cli = Cli::parse();
    logging::init_subscriber(cli.verbosity(), cli.log_format);

    let code = cli::run(cli);
    std::process::exit(code.as_i32());
}
