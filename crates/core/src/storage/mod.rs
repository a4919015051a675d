pub mod baseline;
pub mod lock;

pub use baseline::{CsvBaselineStore, SnapshotStore};
