//! mathmark CLI: renders Markdown with `$` math to HTML.

mod error;

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use mathmark_core::{MathOptions, markdown_with_math};
use tracing_subscriber::EnvFilter;

use error::CliError;

#[derive(Parser)]
#[command(name = "mathmark", version, about)]
struct Cli {
    /// Markdown file to render; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Sanitize the HTML against a safe allow-list.
    #[arg(long)]
    sanitized: bool,

    /// JSON file with math options (`throwOnError`, `katexOptions`).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not log math that fails to render.
    #[arg(long)]
    no_throw_on_error: bool,

    /// Print the token stream as JSON instead of HTML.
    #[arg(long)]
    tokens: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // --verbose enables DEBUG, otherwise RUST_LOG or WARN
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut options = match &cli.config {
        Some(path) => MathOptions::load(path).map_err(|source| CliError::Config {
            path: path.clone(),
            source,
        })?,
        None => MathOptions::default(),
    };
    if cli.no_throw_on_error {
        options.throw_on_error = false;
    }

    let source = read_source(cli.input.as_ref())?;
    let md = markdown_with_math(options)?;

    let output = if cli.tokens {
        let tokens = md.parse(&source, &Default::default());
        let mut json = serde_json::to_string_pretty(&tokens)?;
        json.push('\n');
        json
    } else if cli.sanitized {
        md.render_sanitized(&source)
    } else {
        md.render(&source)
    };

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(CliError::Write)
}

fn read_source(input: Option<&PathBuf>) -> Result<String, CliError> {
    match input {
        Some(path) => fs::read_to_string(path).map_err(|source| CliError::Read {
            input: path.display().to_string(),
            source,
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|source| CliError::Read {
                    input: "stdin".to_string(),
                    source,
                })?;
            Ok(buffer)
        }
    }
}
