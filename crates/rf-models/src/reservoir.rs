//! Fully implicit single-cell reservoir with one producer and an optional aquifer.
//!
//! Unknowns are `[p, p_wf]`. Backward Euler mass balance:
//!
//! ```text
//! V0 (e(p) - e(p_old)) / dt = J_aq (p_aq - p) - PI (p - p_wf)
//! ```
//!
//! with `e(p) = exp(ct (p - pref))`. The well equation is either the rate
//! constraint `PI (p - p_wf) = q` or the pressure limit `p_wf = bhp_min`.

use nalgebra::DVector;
use rf_sim::{NewtonReport, NonlinearModel, SolveFailure};
use rf_solver::{NewtonConfig, SolverResult, finite_difference_jacobian, newton_solve};

use crate::error::ModelResult;
use crate::params::{AquiferParams, ReservoirParams, WellParams};
use crate::state::{ReservoirState, WellControl};

/// Drawdown used to scale residuals to a dimensionless size.
const REFERENCE_DRAWDOWN_PA: f64 = 1.0e5;
const JACOBIAN_EPSILON: f64 = 1.0e-7;

#[derive(Clone, Debug)]
pub struct ReservoirModel {
    reservoir: ReservoirParams,
    well: WellParams,
    aquifer: Option<AquiferParams>,
    newton: NewtonConfig,
}

impl ReservoirModel {
    pub fn new(
        reservoir: ReservoirParams,
        well: WellParams,
        aquifer: Option<AquiferParams>,
    ) -> ModelResult<Self> {
        reservoir.validate()?;
        well.validate()?;
        if let Some(aq) = &aquifer {
            aq.validate()?;
        }
        let newton = NewtonConfig {
            min_value: reservoir.min_pressure_pa,
            ..NewtonConfig::default()
        };
        Ok(Self {
            reservoir,
            well,
            aquifer,
            newton,
        })
    }

    pub fn with_newton(mut self, newton: NewtonConfig) -> Self {
        self.newton = newton;
        self
    }

    pub fn initial_state(&self) -> ReservoirState {
        ReservoirState::initial(&self.reservoir, self.aquifer.as_ref())
    }

    pub fn reservoir(&self) -> &ReservoirParams {
        &self.reservoir
    }

    pub fn well(&self) -> &WellParams {
        &self.well
    }

    pub fn aquifer(&self) -> Option<&AquiferParams> {
        self.aquifer.as_ref()
    }

    fn rate_scale(&self) -> f64 {
        self.well.productivity_index * REFERENCE_DRAWDOWN_PA
    }

    fn aquifer_index(&self) -> f64 {
        self.aquifer.as_ref().map_or(0.0, |a| a.productivity_index)
    }

    /// Control that can be honoured at the start of the step.
    fn preferred_control(&self, state: &ReservoirState) -> WellControl {
        let q = state.rate_target_m3_per_s;
        let p_wf = state.pressure_pa - q / self.well.productivity_index;
        if p_wf < self.well.bhp_min_pa {
            WellControl::Bhp
        } else {
            WellControl::Rate
        }
    }

    fn residual(
        &self,
        x: &DVector<f64>,
        state: &ReservoirState,
        dt: f64,
        control: WellControl,
    ) -> SolverResult<DVector<f64>> {
        let (p, p_wf) = (x[0], x[1]);
        let pi = self.well.productivity_index;
        let scale = self.rate_scale();

        // e(p) - e(p_old) without cancellation for small pressure changes
        let ct = self.reservoir.total_compressibility_per_pa;
        let accumulation = self.reservoir.pore_volume_m3
            * self.reservoir.expansion(state.pressure_pa)
            * (ct * (p - state.pressure_pa)).exp_m1()
            / dt;
        let influx = self.aquifer_index() * (state.aquifer_pressure_pa - p);
        let production = pi * (p - p_wf);

        let well = match control {
            WellControl::Rate => production - state.rate_target_m3_per_s,
            WellControl::Bhp => pi * (p_wf - self.well.bhp_min_pa),
        };

        Ok(DVector::from_vec(vec![
            (accumulation - influx + production) / scale,
            well / scale,
        ]))
    }

    fn solve_with(
        &self,
        state: &ReservoirState,
        dt: f64,
        control: WellControl,
    ) -> SolverResult<rf_solver::NewtonResult> {
        let p_wf_guess = match control {
            WellControl::Rate => {
                state.pressure_pa - state.rate_target_m3_per_s / self.well.productivity_index
            }
            WellControl::Bhp => self.well.bhp_min_pa,
        }
        .max(self.reservoir.min_pressure_pa);
        let x0 = DVector::from_vec(vec![state.pressure_pa, p_wf_guess]);

        let residual = |x: &DVector<f64>| self.residual(x, state, dt, control);
        let jacobian =
            |x: &DVector<f64>| finite_difference_jacobian(x, &residual, JACOBIAN_EPSILON);
        newton_solve(x0, &residual, jacobian, &self.newton)
    }
}

impl NonlinearModel for ReservoirModel {
    type State = ReservoirState;

    fn nonlinear_step(
        &mut self,
        state: &mut ReservoirState,
        time: f64,
        dt: f64,
    ) -> Result<NewtonReport, SolveFailure> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SolveFailure::NumericalBreakdown {
                iterations: 0,
                linear_iterations: 0,
                message: format!("invalid time step {dt}"),
            });
        }

        let mut control = self.preferred_control(state);
        let mut iterations = 0;
        let mut linear_iterations = 0;

        let mut result = self.solve_with(state, dt, control);
        if control == WellControl::Rate {
            let violates_limit = match &result {
                Ok(sol) => sol.x[1] < self.well.bhp_min_pa,
                Err(e) => !e.is_non_convergence(),
            };
            if violates_limit {
                if let Ok(sol) = &result {
                    iterations += sol.iterations;
                    linear_iterations += sol.linear_solves;
                }
                tracing::debug!(time, dt, "rate target violates BHP limit, switching control");
                control = WellControl::Bhp;
                result = self.solve_with(state, dt, control);
            }
        }

        let sol = result.map_err(|e| {
            let mut failure = SolveFailure::from(e);
            failure.add_work(iterations, linear_iterations);
            failure
        })?;

        let (p, p_wf) = (sol.x[0], sol.x[1]);
        let production = self.well.productivity_index * (p - p_wf);
        let influx = self.aquifer_index() * (state.aquifer_pressure_pa - p);

        state.pressure_pa = p;
        state.bhp_pa = p_wf;
        state.control = control;
        state.cumulative_production_m3 += production * dt;
        state.cumulative_influx_m3 += influx * dt;
        state.time_s = time + dt;

        Ok(NewtonReport {
            iterations: iterations + sol.iterations,
            linear_iterations: linear_iterations + sol.linear_solves,
        })
    }
}
