//! termgrid engine: the spreadsheet core.
//!
//! Everything the presenter, CSV, and chart collaborators need lives behind
//! [`sheet::Sheet`]: the cell store, formula evaluation and recalculation,
//! range selection, clipboards, and the undo log.

pub mod cell;
pub mod clipboard;
pub mod color;
pub mod formula;
pub mod reference;
pub mod selection;
pub mod sheet;
pub mod undo;
