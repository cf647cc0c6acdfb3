//! Surface fitting orchestration.
//!
//! Responsibilities:
//!
//! - validate the request (shape, finiteness, tolerances)
//! - run the injected least-squares solver on the surface residuals
//! - derive coefficient covariance and scaled standard errors

pub mod driver;

pub use driver::*;
