//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the dense measurement table (`Table`) and its column convention
//! - fit inputs and outputs (`FitRequest`, `FitResult`, `Coefficient`)
//! - run configuration (`FitConfig`, `ParseFailurePolicy`)

pub mod types;

pub use types::*;
