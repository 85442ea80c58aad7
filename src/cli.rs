//! CLI argument parsing for the upkeep-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "upkeep-worker", about = "Upkeep facilities-management import worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Write the upload template spreadsheet and exit
    Template {
        /// Output path
        #[arg(long, default_value = "import_template.csv")]
        output: PathBuf,
    },
    /// Parse a spreadsheet and print the preview without submitting
    Preview {
        /// CSV or XLSX file to parse
        file: PathBuf,
    },
    /// Parse a spreadsheet and submit the valid rows to the backend
    Import {
        /// CSV or XLSX file to import
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_no_command_defaults_to_none() {
        let cli = Cli::parse_from(["upkeep-worker"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_serve_command_parses() {
        let cli = Cli::parse_from(["upkeep-worker", "serve"]);
        assert!(matches!(cli.command, Some(Command::Serve)));
    }

    #[test]
    fn test_cli_preview_takes_a_file() {
        let cli = Cli::parse_from(["upkeep-worker", "preview", "rows.xlsx"]);
        match cli.command {
            Some(Command::Preview { file }) => {
                assert_eq!(file, PathBuf::from("rows.xlsx"));
            }
            _ => panic!("expected preview command"),
        }
    }

    #[test]
    fn test_cli_template_has_default_output() {
        let cli = Cli::parse_from(["upkeep-worker", "template"]);
        match cli.command {
            Some(Command::Template { output }) => {
                assert_eq!(output, PathBuf::from("import_template.csv"));
            }
            _ => panic!("expected template command"),
        }
    }
}
