use clap::Parser;
use stuntman::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    stuntman::cli::init_tracing(cli.verbose);
    run(cli)
}
