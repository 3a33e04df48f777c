use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

mod commands;
mod files;

#[derive(Parser)]
#[command(name = "schgen")]
#[command(about = "Hierarchical schematic generator and checker", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every sheet of a design description, annotate and write them
    Generate {
        /// Design description (TOML)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        design: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Annotation strategy
        #[arg(short, long, default_value = "reset")]
        strategy: Strategy,

        /// Designator counters carried between runs (JSON)
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        state: Option<PathBuf>,
    },

    /// Annotate reference designators across sheet files, in argument order
    Annotate {
        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "fill")]
        strategy: Strategy,

        /// Designator counters carried between runs (JSON)
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        state: Option<PathBuf>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check hierarchical labels and designators across sheet files
    Verify {
        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Exit with an error when any finding is reported
        #[arg(long)]
        deny_findings: bool,
    },

    /// Merge a fragment of wires and labels into a sheet file
    Merge {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        document: PathBuf,

        #[arg(value_hint = clap::ValueHint::FilePath)]
        fragment: PathBuf,

        /// Write the result here instead of over the document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Move instances to the positions of a placement plan
    Place {
        /// Placement plan (.json or .toml)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        plan: PathBuf,

        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },

    /// Run an external conversion tool once per catalog part
    Convert {
        /// Design description (TOML) holding the parts catalog
        #[arg(value_hint = clap::ValueHint::FilePath)]
        design: PathBuf,

        /// Conversion program
        #[arg(long)]
        program: String,

        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,

        #[arg(long, default_value_t = 0)]
        retries: u32,

        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Program arguments; `{part}` and `{mpn}` are substituted per part
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Renumber everything from 1
    Reset,
    /// Keep existing designators, number placeholders only
    Fill,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    let level = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Generate {
            design,
            output,
            strategy,
            state,
        } => commands::generate::execute(&design, &output, strategy, state.as_deref()),

        Commands::Annotate {
            files,
            strategy,
            state,
            format,
        } => commands::annotate::execute(&files, strategy, state.as_deref(), format),

        Commands::Verify {
            files,
            format,
            deny_findings,
        } => commands::verify::execute(&files, format, deny_findings),

        Commands::Merge {
            document,
            fragment,
            output,
        } => commands::merge::execute(&document, &fragment, output.as_deref()),

        Commands::Place { plan, files } => commands::place::execute(&plan, &files),

        Commands::Convert {
            design,
            program,
            timeout_secs,
            retries,
            format,
            args,
        } => commands::convert::execute(
            &design,
            &program,
            args,
            timeout_secs,
            retries,
            format,
        ),
    }
}
