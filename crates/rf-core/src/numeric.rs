use crate::RfError;

/// Floating point type used throughout the workspace.
pub type Real = f64;

/// Absolute and relative tolerance pair.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Tolerance pair with only a relative component.
    pub const fn relative(rel: Real) -> Self {
        Self { abs: 0.0, rel }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, RfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(RfError::NonFinite { what, value: v })
    }
}

/// Accept only finite, strictly positive values.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, RfError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(RfError::InvalidArg { what })
    }
}

/// Clamp into `[lo, hi]`. Callers guarantee `lo <= hi`.
#[inline]
pub fn clamp_to(v: Real, lo: Real, hi: Real) -> Real {
    v.max(lo).min(hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn relative_only_scales_with_magnitude() {
        let tol = Tolerances::relative(1e-6);
        assert!(nearly_equal(86_400.0, 86_400.01, tol));
        assert!(!nearly_equal(1.0, 1.01, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero_and_negative() {
        assert!(ensure_positive(1.0, "dt").is_ok());
        assert!(ensure_positive(0.0, "dt").is_err());
        assert!(ensure_positive(-3.0, "dt").is_err());
        assert!(ensure_positive(Real::INFINITY, "dt").is_err());
    }

    #[test]
    fn clamp_to_bounds() {
        assert_eq!(clamp_to(5.0, 1.0, 3.0), 3.0);
        assert_eq!(clamp_to(0.5, 1.0, 3.0), 1.0);
        assert_eq!(clamp_to(2.0, 1.0, 3.0), 2.0);
    }
}
