// Episodic CLI - headless episode reconciliation runs

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::EXIT_SUCCESS;

#[derive(Parser)]
#[command(name = "episodic")]
#[command(about = "Hospital billing episode aggregation and reconciliation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline from a TOML config file
    #[command(after_help = "\
Examples:
  episodic run pipeline.toml
  episodic run pipeline.toml --out-dir results
  episodic run pipeline.toml --json
  episodic run pipeline.toml --output report.json")]
    Run {
        /// Path to the pipeline config file
        config: PathBuf,

        /// Directory for the output tables
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,

        /// Print the JSON run report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON run report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a pipeline config without running
    #[command(after_help = "\
Examples:
  episodic validate pipeline.toml")]
    Validate {
        /// Path to the pipeline config file
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            out_dir,
            json,
            output,
        } => run::cmd_run(config, out_dir, json, output),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            eprintln!("error: {message}");
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
