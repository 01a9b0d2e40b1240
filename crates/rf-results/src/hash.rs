//! Content-based hashing for run IDs.

use rf_project::schema::Case;
use sha2::{Digest, Sha256};

use crate::types::RunKind;

pub fn compute_run_id(case: &Case, run_kind: &RunKind, solver_version: &str) -> String {
    let mut hasher = Sha256::new();

    let case_json = serde_json::to_string(case).unwrap_or_default();
    hasher.update(case_json.as_bytes());

    let kind_json = serde_json::to_string(run_kind).unwrap_or_default();
    hasher.update(kind_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(name: &str) -> Case {
        serde_json::from_value(serde_json::json!({
            "version": 2,
            "name": name,
            "reservoir": {
                "pore_volume_m3": 1.0e6,
                "compressibility_per_bar": 1.0e-4,
                "initial_pressure_bar": 200.0
            },
            "well": { "name": "P1", "productivity_index": 86.4, "bhp_min_bar": 100.0 },
            "schedule": { "steps": [ { "length_days": 30.0 } ] }
        }))
        .unwrap()
    }

    #[test]
    fn hash_stability() {
        let c = case("a");
        assert_eq!(
            compute_run_id(&c, &RunKind::Fresh, "v1"),
            compute_run_id(&c, &RunKind::Fresh, "v1")
        );
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let fresh = compute_run_id(&case("a"), &RunKind::Fresh, "v1");
        assert_ne!(fresh, compute_run_id(&case("b"), &RunKind::Fresh, "v1"));
        assert_ne!(fresh, compute_run_id(&case("a"), &RunKind::Fresh, "v2"));
        let restart = RunKind::Restart {
            report_step: 2,
            suggested_step_s: None,
        };
        assert_ne!(fresh, compute_run_id(&case("a"), &restart, "v1"));
    }
}
