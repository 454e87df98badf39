//! Command-line entry point.
//!
//! `veridoc analyze <file>` prints the analysis result as JSON and exits
//! with the risk level: 0 LOW, 1 MEDIUM, 2 HIGH, 3 CRITICAL. Input errors
//! exit 64, internal errors 70.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::time::Duration;
use veridoc::{Analyzer, AnalyzerOptions, RiskLevel};

const EX_USAGE: u8 = 64;
const EX_SOFTWARE: u8 = 70;

#[derive(Parser)]
#[command(
    name = "veridoc",
    version,
    about = "Document fraud detection for PDF invoices"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a document and print the JSON report
    Analyze {
        /// Path to the PDF file
        file: String,
        /// Skip the external registry verification module
        #[arg(long)]
        no_external: bool,
        /// Skip QR code scanning
        #[arg(long)]
        no_qr: bool,
        /// Per-query timeout for external lookups, in milliseconds
        #[arg(long, value_name = "N", default_value_t = 10_000)]
        timeout_ms: u64,
        /// Expected sender domain for QR validation (repeatable)
        #[arg(long = "expected-domain", value_name = "DOMAIN")]
        expected_domains: Vec<String>,
        /// Also print a human-readable summary to stderr
        #[arg(long)]
        summary: bool,
    },
}

fn exit_code_for(risk: RiskLevel) -> u8 {
    match risk {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 2,
        RiskLevel::Critical => 3,
    }
}

fn run() -> Result<u8, (u8, String)> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze {
            file,
            no_external,
            no_qr,
            timeout_ms,
            expected_domains,
            summary,
        } => {
            let options = AnalyzerOptions {
                enable_external: !no_external,
                enable_qr: !no_qr,
                expected_domains: if expected_domains.is_empty() {
                    None
                } else {
                    Some(expected_domains)
                },
                external_timeout: Duration::from_millis(timeout_ms),
                ..Default::default()
            };
            let analyzer = Analyzer::new(options);
            let result = analyzer.analyze(&file).map_err(|e| {
                let code = if e.is_input_error() { EX_USAGE } else { EX_SOFTWARE };
                (code, e.to_string())
            })?;
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| (EX_SOFTWARE, e.to_string()))?;
            println!("{}", json);
            if summary {
                eprint!("{}", veridoc::generate_summary(&result));
            }
            Ok(exit_code_for(result.risk_level))
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(code) => ExitCode::from(code),
        Err((code, message)) => {
            eprintln!("veridoc: {}", message);
            ExitCode::from(code)
        }
    }
}
