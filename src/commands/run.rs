use std::fs;
use std::io::{self, Write};

use clap::Args;

use crate::cli_util::{print_parse_error, print_runtime_error};
use crate::config::{parse_tape_len, Config};
use crate::parser::parse_file;
use crate::runtime::{Runtime, MAX_TAPE_LEN};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a line per executed node to stderr before it runs
    #[arg(short = 't', long = "trace")]
    pub trace: bool,

    /// Report a `[` left open at end of file as a syntax error
    #[arg(long = "strict")]
    pub strict: bool,

    /// Number of tape cells (fallback BF_TAPE_SIZE, then bf.toml; default 30_000)
    #[arg(long = "tape-size", value_name = "CELLS", value_parser = tape_size)]
    pub tape_size: Option<usize>,

    /// The program file. Exactly one is required.
    #[arg(value_name = "PROGRAM")]
    pub files: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

fn tape_size(value: &str) -> Result<usize, String> {
    parse_tape_len(value)
        .ok_or_else(|| format!("`{value}` is not a number of cells between 1 and {MAX_TAPE_LEN}"))
}

/// Parse and run one program file. Returns the process exit code.
pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        trace,
        strict,
        tape_size,
        files,
        ..
    } = args;

    let [file] = files.as_slice() else {
        usage_and_exit(program, 2);
    };

    // Resolve settings: flags -> env -> config file -> defaults
    let mut config = Config::load();
    if trace {
        config.trace = true;
    }
    if strict {
        config.strict_brackets = true;
    }
    if let Some(cells) = tape_size {
        config.tape_len = cells;
    }
    tracing::debug!(?config, file = %file, "resolved settings");

    let ast = match parse_file(file, config.parse_options()) {
        Ok(ast) => ast,
        Err(err) => {
            tracing::debug!(error = ?err, "parse failed");
            print_parse_error(file, fs::read(file).ok().as_deref(), &err);
            return 1;
        }
    };

    let mut rt = Runtime::from_config(&config, io::stdin().lock(), io::stdout().lock());
    let result = rt.run(&ast);

    match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::debug!(error = ?err, "run failed");
            print_runtime_error(fs::read(file).ok().as_deref(), &err);
            1
        }
    }
}

/// Print the usage block to stdout and exit with `code`.
pub fn usage_and_exit(program: &str, code: i32) -> ! {
    println!(
        r#"Usage:
  {0} [--trace|-t] [--strict] [--tape-size <CELLS>] <PROGRAM>

Options:
  --trace,     -t   Print a line per executed node to stderr before it runs
  --strict          Report a `[` left open at end of file as a syntax error
  --tape-size <N>   Number of tape cells (default 30_000, at most 16_777_216)
  --help,      -h   Show this help

Notes:
- Any byte outside of ><+-.,[] is a comment.
- Input (`,`) reads a single byte from stdin; on EOF the current cell is set to 255.
- Moving the pointer off either end of the tape stops the program with an error.

Environment:
  BF_TAPE_SIZE, BF_TRACE, BF_STRICT   Same as the flags above
  BF_CONFIG                           Config file (default: <config dir>/bf.toml)
  BF_LOG                              Log filter (default: warn)
"#,
        program
    );
    let _ = io::stdout().flush();
    std::process::exit(code);
}
