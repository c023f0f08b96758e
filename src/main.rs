use bf_tree::commands::run::{self, RunArgs};
use clap::Parser;
use std::env;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true)]
struct Cli {
    #[command(flatten)]
    args: RunArgs,
}

fn init_logging() {
    // BF_LOG controls the log level; default to WARN if not set
    let filter = EnvFilter::try_from_env("BF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            tracing::debug!(error = %e, "rejected command line");
            let message = e.to_string();
            eprintln!("{program}: {}", message.lines().next().unwrap_or_default());
            run::usage_and_exit(&program, 2);
        }
    };

    std::process::exit(run::run(&program, cli.args));
}
