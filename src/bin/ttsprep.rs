//! ttsprep CLI - rewrite text files with substitution directives before text-to-speech
//!
//! Directives are registry names or rule files. Without `--directive`, the
//! default directive for the first input's extension is used.

use clap::{ArgAction, Parser};
use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use tracing_subscriber::EnvFilter;
use tts_preprocessor::files::DEFAULT_OUTPUT_FORMAT;
use tts_preprocessor::{
    default_directives_for, process_file, register_builtins, DirectiveRegistry, OutputNameFormat,
    Pipeline, Resolver,
};

/// Environment variable naming the directive data directory
const DATA_DIR_ENV: &str = "TTSPREP_DATA_DIR";

#[derive(Parser)]
#[command(name = "ttsprep")]
#[command(version, about = "Strip markup and normalize text for text-to-speech", long_about = None)]
struct Cli {
    /// Input files to process
    #[arg(required = true)]
    inputfiles: Vec<PathBuf>,

    /// A named directive or rule file (treated as a file if one exists at that path)
    #[arg(short = 'd', long = "directive", num_args = 1.., action = ArgAction::Append)]
    directives: Vec<String>,

    /// Directory of rule files to register at startup (default: $TTSPREP_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output file name template
    #[arg(long, default_value = DEFAULT_OUTPUT_FORMAT)]
    outputfnfmt: String,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> tts_preprocessor::Result<()> {
    let mut registry = DirectiveRegistry::new();
    // Data-dir files with the same name replace the built-ins
    register_builtins(&mut registry);

    let data_dir = cli
        .data_dir
        .or_else(|| env::var_os(DATA_DIR_ENV).map(PathBuf::from));
    if let Some(dir) = data_dir {
        registry.discover(&dir)?;
    }

    let mut resolver = Resolver::new(registry).with_verbose(cli.verbose > 0);

    let directives = if cli.directives.is_empty() {
        default_directives_for(&cli.inputfiles[0])
    } else {
        tracing::info!(directives = ?cli.directives, "Using directives");
        cli.directives
    };

    let pipeline = Pipeline::build(&mut resolver, directives)?;
    let output_format = OutputNameFormat::new(cli.outputfnfmt);

    for input in &cli.inputfiles {
        let output = process_file(input, &pipeline, &output_format)?;
        println!("{} -> {}", input.display(), output.display());
    }

    Ok(())
}
