//! User settings: a small JSON file with serde defaults. Missing or
//! malformed files silently fall back to the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use termgrid_chart::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use termgrid_engine::sheet::{DEFAULT_COLS, DEFAULT_ROWS};
use termgrid_io::CsvMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Grid dimensions for new sheets
    pub rows: usize,
    pub cols: usize,
    /// Preselected answer for the save/load flatten-or-preserve prompt
    pub csv_mode: CsvMode,
    /// Chart overlay dimensions
    pub chart_width: usize,
    pub chart_height: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            csv_mode: CsvMode::default(),
            chart_width: DEFAULT_WIDTH,
            chart_height: DEFAULT_HEIGHT,
        }
    }
}

impl Settings {
    /// Load from an explicit path, or the default location.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_path(),
        };
        path.and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default()
    }
}

fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("termgrid.json"))
}
