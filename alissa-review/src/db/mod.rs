//! Persistence for manual review results

pub mod review_store;

pub use review_store::{partial_path, recovered_path, ReviewStore, StoreWriter, STORE_COLUMNS};
