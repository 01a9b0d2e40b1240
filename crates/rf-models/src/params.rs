//! Physical parameters of the demonstration model, in SI units.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use rf_core::ensure_positive;

/// Single-cell, slightly compressible reservoir.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservoirParams {
    /// Pore volume at the reference pressure (m³)
    pub pore_volume_m3: f64,
    /// Total (rock + fluid) compressibility (1/Pa)
    pub total_compressibility_per_pa: f64,
    pub reference_pressure_pa: f64,
    pub initial_pressure_pa: f64,
    /// Pressures below this are non-physical for the solver
    pub min_pressure_pa: f64,
}

impl Default for ReservoirParams {
    fn default() -> Self {
        Self {
            pore_volume_m3: 1.0e6,
            total_compressibility_per_pa: 1.0e-9,
            reference_pressure_pa: 2.0e7,
            initial_pressure_pa: 2.0e7,
            min_pressure_pa: 1.0e5,
        }
    }
}

impl ReservoirParams {
    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive(self.pore_volume_m3, "pore_volume_m3")?;
        ensure_positive(
            self.total_compressibility_per_pa,
            "total_compressibility_per_pa",
        )?;
        ensure_positive(self.reference_pressure_pa, "reference_pressure_pa")?;
        ensure_positive(self.min_pressure_pa, "min_pressure_pa")?;
        ensure_positive(self.initial_pressure_pa, "initial_pressure_pa")?;
        if self.initial_pressure_pa <= self.min_pressure_pa {
            return Err(ModelError::InvalidParam {
                what: "initial_pressure_pa must exceed min_pressure_pa",
            });
        }
        Ok(())
    }

    /// Pore volume relative to the reference state, `exp(ct (p - pref))`.
    pub fn expansion(&self, p: f64) -> f64 {
        (self.total_compressibility_per_pa * (p - self.reference_pressure_pa)).exp()
    }
}

/// Producer well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WellParams {
    /// Productivity index (m³/s per Pa of drawdown)
    pub productivity_index: f64,
    /// Bottom-hole pressure limit (Pa)
    pub bhp_min_pa: f64,
}

impl Default for WellParams {
    fn default() -> Self {
        Self {
            productivity_index: 1.0e-8,
            bhp_min_pa: 1.0e7,
        }
    }
}

impl WellParams {
    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive(self.productivity_index, "productivity_index")?;
        ensure_positive(self.bhp_min_pa, "bhp_min_pa")?;
        Ok(())
    }
}

/// Fetkovich aquifer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AquiferParams {
    /// Aquifer productivity index (m³/s per Pa)
    pub productivity_index: f64,
    pub initial_pressure_pa: f64,
    /// Maximum encroachable water volume (m³)
    pub max_influx_m3: f64,
}

impl Default for AquiferParams {
    fn default() -> Self {
        Self {
            productivity_index: 5.0e-9,
            initial_pressure_pa: 2.0e7,
            max_influx_m3: 5.0e5,
        }
    }
}

impl AquiferParams {
    pub fn validate(&self) -> ModelResult<()> {
        ensure_positive(self.productivity_index, "aquifer productivity_index")?;
        ensure_positive(self.initial_pressure_pa, "aquifer initial_pressure_pa")?;
        ensure_positive(self.max_influx_m3, "max_influx_m3")?;
        Ok(())
    }

    /// Fetkovich material balance: `p_i (1 - W_e / W_ei)`, never below zero.
    pub fn pressure_after(&self, cumulative_influx_m3: f64) -> f64 {
        (self.initial_pressure_pa * (1.0 - cumulative_influx_m3 / self.max_influx_m3)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        ReservoirParams::default().validate().unwrap();
        WellParams::default().validate().unwrap();
        AquiferParams::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        let res = ReservoirParams {
            pore_volume_m3: 0.0,
            ..ReservoirParams::default()
        };
        assert!(res.validate().is_err());

        let res = ReservoirParams {
            initial_pressure_pa: 5.0e4,
            ..ReservoirParams::default()
        };
        assert!(res.validate().is_err());

        let well = WellParams {
            productivity_index: f64::NAN,
            ..WellParams::default()
        };
        assert!(matches!(
            well.validate(),
            Err(ModelError::NonPhysical { .. })
        ));
    }

    #[test]
    fn aquifer_depletes_linearly() {
        let aq = AquiferParams::default();
        assert_eq!(aq.pressure_after(0.0), aq.initial_pressure_pa);
        assert_eq!(aq.pressure_after(aq.max_influx_m3 / 2.0), aq.initial_pressure_pa / 2.0);
        assert_eq!(aq.pressure_after(2.0 * aq.max_influx_m3), 0.0);
    }

    #[test]
    fn expansion_is_one_at_reference() {
        let res = ReservoirParams::default();
        assert_eq!(res.expansion(res.reference_pressure_pa), 1.0);
        assert!(res.expansion(res.reference_pressure_pa - 1.0e6) < 1.0);
    }
}
