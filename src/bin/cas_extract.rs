//! Command line CAS extractor.
//!
//! Usage: cas_extract <path_to_pdf> [--password <PAN>] [--config <file>] [--pretty] [--verbose]
//! Output: statement JSON on stdout, errors on stderr as `KIND:message`
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments or configuration
//!   2 - PDF read error
//!   3 - Parse error
//!   4 - PDF validation failed
//!   5 - Missing or wrong password

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cas_parser::{CasError, CasInput, CasParser, ParsedStatement, ParserConfig};

#[derive(Parser, Debug)]
#[command(name = "cas_extract")]
#[command(about = "Extract holdings from a CDSL Consolidated Account Statement PDF")]
#[command(version)]
struct Args {
    /// Path to the CAS PDF
    path: PathBuf,

    /// PDF password (usually the PAN in capitals)
    #[arg(short, long)]
    password: Option<String>,

    /// JSON parser configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<ParserConfig> {
    let config = match path {
        Some(path) => ParserConfig::from_json_file(path)?,
        None => ParserConfig::default(),
    };
    config.with_env_overrides()
}

fn validate_size(bytes: &[u8], max_file_size: usize) -> Result<(), String> {
    if bytes.len() > max_file_size {
        return Err(format!(
            "PDF file too large ({} MB). Maximum: {} MB",
            bytes.len() / (1024 * 1024),
            max_file_size / (1024 * 1024)
        ));
    }
    Ok(())
}

/// Unreadable files count as failed validation, like a missing PDF header
fn exit_code_for(error: &CasError) -> u8 {
    match error {
        CasError::WrongPassword => 5,
        CasError::UnreadableDocument(_) => 4,
        _ => 3,
    }
}

fn write_json(statement: &ParsedStatement, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(statement)
    } else {
        serde_json::to_string(statement)
    }
    .context("Failed to serialize statement")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(json.as_bytes())?;
    handle.write_all(b"\n")?;
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("CONFIG_ERROR:{:#}", e);
            return ExitCode::from(1);
        }
    };

    let bytes = match fs::read(&args.path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("READ_ERROR:{}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = validate_size(&bytes, config.max_file_size) {
        eprintln!("VALIDATE_ERROR:{}", e);
        return ExitCode::from(4);
    }

    let file_name = args.path.file_name().and_then(|n| n.to_str());
    let mut input = CasInput::new(&bytes);
    if let Some(name) = file_name {
        input = input.with_file_name(name);
    }
    if let Some(password) = args.password.as_deref() {
        input = input.with_password(password);
    }

    let parser = CasParser::new().with_config(config);
    let statement = match parser.parse(&input) {
        Ok(statement) => statement,
        Err(e) => {
            eprintln!("{}:{}", e.kind().as_str(), e);
            eprintln!("{}", e.user_message());
            return ExitCode::from(exit_code_for(&e));
        }
    };

    if let Err(e) = write_json(&statement, args.pretty) {
        eprintln!("WRITE_ERROR:{:#}", e);
        return ExitCode::from(3);
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_size() {
        assert!(validate_size(&[0u8; 16], 16).is_ok());
        assert!(validate_size(&[0u8; 17], 16).is_err());
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(exit_code_for(&CasError::WrongPassword), 5);
        assert_eq!(exit_code_for(&CasError::UnreadableDocument("x".into())), 4);
        assert_eq!(exit_code_for(&CasError::UnrecognizedFormat), 3);
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["cas_extract", "cas.pdf", "-p", "ABCDE1234F", "--pretty"]).unwrap();
        assert_eq!(args.path, PathBuf::from("cas.pdf"));
        assert_eq!(args.password.as_deref(), Some("ABCDE1234F"));
        assert!(args.pretty);
        assert!(!args.verbose);
    }
}
