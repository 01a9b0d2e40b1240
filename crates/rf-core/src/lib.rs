//! rf-core: stable foundation for resflow.
//!
//! Contains:
//! - units (uom time types + day/second conversion)
//! - numeric (Real + tolerances + float helpers)
//! - timing (stopwatches for solver/output wall time)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{RfError, RfResult};
pub use numeric::*;
pub use units::*;
