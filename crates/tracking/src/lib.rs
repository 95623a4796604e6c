//! Tracking store for deity.
//!
//! Every encoded file leaves a row behind recording its identifier, both
//! digests, and the path before and after the rename. Rows are append-only;
//! decoding reads them back to restore original names.

pub mod export;
pub mod models;
pub mod store;

pub use export::{export_path, write_csv};
pub use models::TrackingRow;
pub use store::TrackingStore;
