//! Error types for model construction.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Invalid parameter: {what}")]
    InvalidParam { what: &'static str },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<rf_core::RfError> for ModelError {
    fn from(e: rf_core::RfError) -> Self {
        match e {
            rf_core::RfError::NonFinite { what, .. } => ModelError::NonPhysical { what },
            rf_core::RfError::InvalidArg { what } | rf_core::RfError::Invariant { what } => {
                ModelError::InvalidParam { what }
            }
        }
    }
}

impl From<ModelError> for rf_sim::SimError {
    fn from(e: ModelError) -> Self {
        rf_sim::SimError::Backend {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ModelError::InvalidParam {
            what: "pore_volume_m3",
        };
        assert!(err.to_string().contains("pore_volume_m3"));
    }

    #[test]
    fn core_errors_convert() {
        let e: ModelError = rf_core::RfError::InvalidArg { what: "x" }.into();
        assert!(matches!(e, ModelError::InvalidParam { what: "x" }));
    }
}
