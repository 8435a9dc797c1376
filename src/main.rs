//! DupeHunter - Duplicate File Finder
//!
//! Entry point for the DupeHunter CLI application.

use clap::Parser;
use dupehunter::{
    cli::Cli,
    duplicates::{ConfigError, FinderError},
    error::{ExitCode, StructuredError},
};

fn main() {
    let cli = Cli::parse();
    let json_errors = cli.json_errors;

    match dupehunter::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;

            if json_errors {
                let structured = StructuredError::new(&err, exit_code);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{}", json);
                } else {
                    eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
                if err.downcast_ref::<ConfigError>().is_some()
                    || err.downcast_ref::<FinderError>().is_some()
                {
                    eprintln!("Run 'dupehunter config' to see the effective configuration.");
                }
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
