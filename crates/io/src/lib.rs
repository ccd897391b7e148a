//! termgrid I/O: the CSV contract over the engine surface.

pub mod csv;

pub use self::csv::{load, save, CsvMode};
