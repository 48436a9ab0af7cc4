use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

pub mod check;
pub mod config;
mod lsp;

use check::Format;

const LOG_ENV: &str = "LG_LOG";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Start the LG language server on stdin/stdout
    #[clap(name = "lsp", bin_name = "lsp")]
    Lsp(StartServer),
    /// Analyze LG files and report diagnostics
    #[clap(name = "check", bin_name = "check")]
    Check(CheckFiles),
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct StartServer {
    /// Settings file applied before the workspace's own lgtools.yml
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
    /// Delay between the last edit and re-analysis
    #[arg(long = "debounce-ms")]
    pub debounce_ms: Option<u64>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct CheckFiles {
    /// Files to analyze
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Output format
    #[arg(long = "format", short = 'f', value_enum, default_value_t = Format::Stylish)]
    pub format: Format,
    /// Settings file with rule overrides
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
}

fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => e.exit(),
    };
    setup_logging();

    let code = match opts.command {
        Command::Lsp(cmd) => handle_lsp_command(&cmd),
        Command::Check(cmd) => handle_check_command(&cmd),
    };
    process::exit(code);
}

fn handle_lsp_command(cmd: &StartServer) -> i32 {
    let mut config = match check::load_config(cmd.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return 1;
        }
    };
    if let Some(debounce_ms) = cmd.debounce_ms {
        config.debounce_ms = debounce_ms;
    }
    match lsp::run_lsp(config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("language server failed: {e}");
            1
        }
    }
}

fn handle_check_command(cmd: &CheckFiles) -> i32 {
    let reports = check::load_config(cmd.config.as_deref())
        .and_then(|config| check::check_files(&cmd.files, &config));
    match reports {
        Ok(reports) => {
            print!("{}", check::get_formatter(cmd.format).format(&reports));
            if check::has_errors(&reports) {
                1
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}
