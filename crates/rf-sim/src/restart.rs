//! Initial step-size suggestion from a checkpoint.

use std::fmt;

/// Extra key under which the suggested step is persisted.
pub const SUGGESTED_STEP_KEY: &str = "suggested_step";

/// Read access to the auxiliary values stored with a checkpoint.
pub trait RestartValues {
    fn extra(&self, key: &str) -> Option<&[f64]>;
}

/// Why a checkpoint could not supply a step suggestion.
#[derive(Clone, Debug, PartialEq)]
pub enum RestartDiagnostic {
    MissingField,
    Malformed { values: Vec<f64> },
}

impl fmt::Display for RestartDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartDiagnostic::MissingField => {
                write!(f, "checkpoint has no '{SUGGESTED_STEP_KEY}' field")
            }
            RestartDiagnostic::Malformed { values } => write!(
                f,
                "checkpoint field '{SUGGESTED_STEP_KEY}' is malformed: {values:?}"
            ),
        }
    }
}

/// Where the controller's first suggestion comes from.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RestartHint {
    /// Use the configured initial step
    #[default]
    Default,
    /// Resume with the step suggested before the checkpoint was written
    Resume(f64),
    /// Checkpoint was unusable; behaves as `Default`
    Degraded(RestartDiagnostic),
}

impl RestartHint {
    /// Persisted stand-in for "no suggestion".
    pub const SENTINEL: f64 = -1.0;

    pub fn step(&self) -> Option<f64> {
        match self {
            RestartHint::Resume(dt) => Some(*dt),
            RestartHint::Default | RestartHint::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RestartHint::Degraded(_))
    }
}

pub fn resolve_initial_suggestion(checkpoint: Option<&dyn RestartValues>) -> RestartHint {
    let Some(checkpoint) = checkpoint else {
        return RestartHint::Default;
    };

    let diagnostic = match checkpoint.extra(SUGGESTED_STEP_KEY) {
        None => RestartDiagnostic::MissingField,
        Some([value]) if value.is_finite() => {
            return if *value > 0.0 {
                RestartHint::Resume(*value)
            } else {
                RestartHint::Default
            };
        }
        Some(values) => RestartDiagnostic::Malformed {
            values: values.to_vec(),
        },
    };

    RestartHint::Degraded(diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Extras(HashMap<String, Vec<f64>>);

    impl RestartValues for Extras {
        fn extra(&self, key: &str) -> Option<&[f64]> {
            self.0.get(key).map(Vec::as_slice)
        }
    }

    fn with_value(values: Vec<f64>) -> Extras {
        Extras(HashMap::from([(SUGGESTED_STEP_KEY.to_string(), values)]))
    }

    #[test]
    fn no_checkpoint_is_default() {
        assert_eq!(resolve_initial_suggestion(None), RestartHint::Default);
    }

    #[test]
    fn positive_value_resumes() {
        let cp = with_value(vec![43_200.0]);
        let hint = resolve_initial_suggestion(Some(&cp));
        assert_eq!(hint, RestartHint::Resume(43_200.0));
        assert_eq!(hint.step(), Some(43_200.0));
    }

    #[test]
    fn sentinel_maps_to_default() {
        let cp = with_value(vec![RestartHint::SENTINEL]);
        assert_eq!(resolve_initial_suggestion(Some(&cp)), RestartHint::Default);
        let cp = with_value(vec![0.0]);
        assert_eq!(resolve_initial_suggestion(Some(&cp)), RestartHint::Default);
    }

    #[test]
    fn missing_field_degrades() {
        let cp = Extras(HashMap::new());
        let hint = resolve_initial_suggestion(Some(&cp));
        assert_eq!(hint, RestartHint::Degraded(RestartDiagnostic::MissingField));
        assert_eq!(hint.step(), None);
    }

    #[test]
    fn malformed_values_degrade() {
        for values in [vec![], vec![1.0, 2.0], vec![f64::INFINITY]] {
            let hint = resolve_initial_suggestion(Some(&with_value(values)));
            assert!(hint.is_degraded(), "{hint:?}");
        }
    }
}
