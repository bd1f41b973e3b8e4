//! mcqbench-report: result file generation.

pub mod csv_report;

pub use csv_report::{default_report_path, write_csv_report};
