//! Read-only analytics over the current snapshot.
//!
//! Everything here is a pure function of its inputs and is recomputed in full
//! on every read.

pub mod aggregation;
pub mod export;
pub mod filters;
pub mod temporal;
pub mod time;

pub use aggregation::Dashboard;
pub use export::{ExportRow, export_rows};
pub use filters::{FilterOptions, Filters, filter_options, filtered_tags};
pub use temporal::{Pairing, PairingConfig, ScatterPoint};
