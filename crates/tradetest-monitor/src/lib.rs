//! Logging and console reporting.

mod logging;
mod table;

pub use logging::setup_logging;
pub use table::{batch_table, SummaryRow};
