use crate::solver::linear_solver::LinearSolverSettings;
use crate::solver::scheme::{ConvectionScheme, GradientScheme};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How an exactly zero pressure residual is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroResidualPolicy {
    /// Numerical breakdown: stop and report divergence.
    #[default]
    Diverged,
    /// Exact solve: stop and report convergence.
    Converged,
}

/// Physical properties, relaxation and stopping criteria of a SIMPLE run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub density: f64,
    /// Dynamic viscosity.
    pub viscosity: f64,

    pub velocity_relaxation: f64,
    pub pressure_relaxation: f64,

    pub velocity_tolerance: f64,
    pub pressure_tolerance: f64,
    pub max_iterations: usize,

    pub gradient_scheme: GradientScheme,
    pub convection_scheme: ConvectionScheme,

    pub time_step: f64,
    pub time_begin: f64,
    pub time_end: f64,

    pub zero_residual: ZeroResidualPolicy,
    /// Progress is logged every this many iterations (0 disables).
    pub log_interval: usize,

    pub momentum_solver: LinearSolverSettings,
    pub pressure_solver: LinearSolverSettings,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            density: 1e3,
            viscosity: 1e-3,
            velocity_relaxation: 0.7,
            pressure_relaxation: 0.3,
            velocity_tolerance: 1e-5,
            pressure_tolerance: 1e-5,
            max_iterations: 10_000,
            gradient_scheme: GradientScheme::GreenGauss,
            convection_scheme: ConvectionScheme::SecondOrderUpwind,
            time_step: 0.0,
            time_begin: 0.0,
            time_end: 0.0,
            zero_residual: ZeroResidualPolicy::Diverged,
            log_interval: 50,
            momentum_solver: LinearSolverSettings::default(),
            pressure_solver: LinearSolverSettings::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|err| format!("invalid solver config: {err}"))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read config '{}': {err}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|err| format!("failed to serialize config: {err}"))
    }

    pub fn validate(&self, transient: bool) -> Result<(), String> {
        if !(self.density > 0.0) {
            return Err(format!("density must be positive, got {}", self.density));
        }
        if !(self.viscosity > 0.0) {
            return Err(format!("viscosity must be positive, got {}", self.viscosity));
        }
        for (name, value) in [
            ("velocity_relaxation", self.velocity_relaxation),
            ("pressure_relaxation", self.pressure_relaxation),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!("{name} must be in (0, 1], got {value}"));
            }
        }
        for (name, value) in [
            ("velocity_tolerance", self.velocity_tolerance),
            ("pressure_tolerance", self.pressure_tolerance),
            ("momentum_solver.tolerance", self.momentum_solver.tolerance),
            ("pressure_solver.tolerance", self.pressure_solver.tolerance),
        ] {
            if !(value > 0.0) {
                return Err(format!("{name} must be positive, got {value}"));
            }
        }
        if transient {
            if !(self.time_step > 0.0) {
                return Err(format!(
                    "transient runs need a positive time_step, got {}",
                    self.time_step
                ));
            }
            if self.time_end < self.time_begin {
                return Err(format!(
                    "time_end {} is before time_begin {}",
                    self.time_end, self.time_begin
                ));
            }
        }
        Ok(())
    }
}
