use clap::Parser;
use termset::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();
    let options = cli.runtime_options();

    // Initialize unified logging. Routes all log::info!() etc. to the debug log file.
    // When RUST_LOG is set, also mirrors to stderr for terminal debugging.
    // CLI --log-level flag takes highest precedence, then RUST_LOG, then DEBUG_LEVEL.
    termset::debug::init_log_bridge(options.log_level);

    log::info!("Starting termset {}", termset::VERSION);

    let code = cli::run(cli, &options);
    if code != 0 {
        std::process::exit(code);
    }
}
