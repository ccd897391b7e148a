// termgrid - keyboard-driven terminal spreadsheet

mod commands;
mod demo;
mod settings;
mod tui;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use settings::Settings;
use termgrid_engine::sheet::Sheet;
use termgrid_io::CsvMode;

const EXIT_RUNTIME_ERROR: u8 = 1;
const EXIT_IO_ERROR: u8 = 3;

#[derive(Parser)]
#[command(name = "termgrid")]
#[command(about = "Interactive terminal spreadsheet with formulas, formatting, and charts")]
#[command(version)]
struct Cli {
    /// CSV file to open
    file: Option<PathBuf>,

    /// How to read formula-looking fields from the file
    #[arg(long, short = 'm', value_enum, default_value = "flatten")]
    mode: ModeArg,

    /// Start with an empty sheet instead of the feature tour
    #[arg(long)]
    blank: bool,

    /// Settings file (default: ~/.config/termgrid.json)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Fields are plain values
    Flatten,
    /// Fields with a leading = become formulas
    Preserve,
}

impl From<ModeArg> for CsvMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Flatten => CsvMode::Flatten,
            ModeArg::Preserve => CsvMode::Preserve,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref());

    let mut sheet = Sheet::new(settings.rows, settings.cols);
    if let Some(path) = &cli.file {
        if let Err(message) = termgrid_io::load(&mut sheet, path, cli.mode.into()) {
            eprintln!("error: {}", message);
            return ExitCode::from(EXIT_IO_ERROR);
        }
    } else if !cli.blank {
        demo::seed(&mut sheet);
    }

    match tui::run(sheet, settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}
