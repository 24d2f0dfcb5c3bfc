//! Mailpress - Deterministic Email HTML Normalizer
//!
//! CLI entry point: reads an exported HTML file, runs the normalization
//! pipeline and writes the processed document next to the input.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mailpress::dom::HtmlParser;
use mailpress::{audit, MailpressError, Pipeline, NAME, VERSION};

struct CliArgs {
    input: PathBuf,
    output: PathBuf,
    audit: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("error: {msg}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> mailpress::Result<()> {
    let html = fs::read_to_string(&args.input)
        .map_err(|e| MailpressError::io(&args.input, e))?;

    let processed = Pipeline::new().process(&html)?;

    fs::write(&args.output, &processed)
        .map_err(|e| MailpressError::io(&args.output, e))?;
    println!("wrote {}", args.output.display());

    if args.audit {
        let document = HtmlParser::new().parse(&processed)?;
        print!("{}", audit::evaluate(&document).render());
    }
    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<CliArgs>, String> {
    let mut audit = false;
    let mut paths = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--audit" => audit = true,
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') => {
                return Err(format!("unknown flag `{other}`"));
            }
            _ => paths.push(PathBuf::from(arg)),
        }
    }
    let mut paths = paths.into_iter();
    let Some(input) = paths.next() else {
        return Err("missing input file".to_string());
    };
    let output = match paths.next() {
        Some(path) => path,
        None => default_output(&input),
    };
    if paths.next().is_some() {
        return Err("too many arguments".to_string());
    }
    Ok(Some(CliArgs {
        input,
        output,
        audit,
    }))
}

/// `processed_<basename>` next to the input
fn default_output(input: &Path) -> PathBuf {
    let basename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.html".to_string());
    input.with_file_name(format!("processed_{basename}"))
}

fn print_usage() {
    println!("{NAME} v{VERSION} - deterministic email HTML normalizer");
    println!();
    println!("usage: mailpress [--audit] <input.html> [output.html]");
    println!();
    println!("  output defaults to processed_<input-basename> next to the input");
    println!("  --audit  print a mail-client compatibility report for the result");
}
