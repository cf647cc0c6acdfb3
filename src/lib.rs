//! `surfit` library crate.
//!
//! The binary (`surfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the solver and renderer stay swappable behind traits
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod collections;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod models;
pub mod plot;
pub mod report;
pub mod solver;
