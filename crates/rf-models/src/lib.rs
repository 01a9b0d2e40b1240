//! Demonstration reservoir model for the stepping core.
//!
//! A single cell with one producer and an optional Fetkovich aquifer, advanced
//! fully implicitly with the damped Newton solver from `rf-solver`.

pub mod coordinators;
pub mod error;
pub mod params;
pub mod reservoir;
pub mod state;

pub use coordinators::{AquiferCoordinator, WellCoordinator};
pub use error::{ModelError, ModelResult};
pub use params::{AquiferParams, ReservoirParams, WellParams};
pub use reservoir::ReservoirModel;
pub use state::{ReservoirState, WellControl};
