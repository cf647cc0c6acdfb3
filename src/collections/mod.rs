//! Container types used by ingestion.

pub mod record_list;

pub use record_list::*;
