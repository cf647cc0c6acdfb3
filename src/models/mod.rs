//! Surface model implementation.
//!
//! The model is a small set of pure functions so that the driver and the
//! solver adapter can stay generic.

pub mod surface;

pub use surface::*;
