//! Damped Newton solver for small dense nonlinear systems.
//!
//! The demonstration reservoir model assembles its implicit residual on top of
//! this crate; the stepping core never calls it directly.

pub mod error;
pub mod jacobian;
pub mod newton;

pub use error::{SolverError, SolverResult};
pub use jacobian::finite_difference_jacobian;
pub use newton::{NewtonConfig, NewtonResult, newton_solve};
