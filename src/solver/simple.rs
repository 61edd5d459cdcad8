//! SIMPLE pressure-velocity coupling on a collocated grid.

use crate::solver::assembly::assemble_system;
use crate::solver::boundary::{
    pressure_boundaries, pressure_correction_boundaries, velocity_boundaries,
    zero_gradient_boundaries, BoundaryConditionType,
};
use crate::solver::fvm::{
    cell_gradient, convection_flux_over_cell, diffusion_flux_over_cell, face_normal_gradient,
    rhie_chow_velocity_on_face, value_on_face, RhieChowFields,
};
use crate::solver::linear_combination::LinearCombination;
use crate::solver::linear_solver::{relax_system, solve_system, LinearSolveError, SparseMatrix};
use crate::solver::mesh::Mesh;
use crate::solver::options::{SolverConfig, ZeroResidualPolicy};
use crate::solver::types::{field_max_abs, CellId, Linear, Scalar, Vector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("{system} system: {source}")]
    LinearSolve {
        system: &'static str,
        source: LinearSolveError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Terminal state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Converged,
    Diverged,
    MaxIterationsReached,
}

impl SolveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Converged => "converged",
            SolveStatus::Diverged => "diverged",
            SolveStatus::MaxIterationsReached => "max_iterations_reached",
        }
    }

    fn severity(self) -> u8 {
        match self {
            SolveStatus::Converged => 0,
            SolveStatus::MaxIterationsReached => 1,
            SolveStatus::Diverged => 2,
        }
    }
}

/// Residuals of one outer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero in steady runs, otherwise the 1-based time step.
    pub time_step: usize,
    /// 1-based within the time step.
    pub iteration: usize,
    pub pressure_residual: Scalar,
    pub velocity_residual: Scalar,
    pub max_mass_imbalance: Scalar,
}

/// `max|correction| / max|field|`. A zero correction gives exactly zero even on a
/// zero field.
pub fn relative_residual<T: Linear>(field: &[T], correction: &[T]) -> Scalar {
    let correction = field_max_abs(correction);
    if correction == 0.0 {
        return 0.0;
    }
    correction / field_max_abs(field)
}

pub struct SimpleSolver {
    mesh: Mesh,
    config: SolverConfig,
    transient: bool,

    velocity: Vec<Vector>,
    pressure: Vec<Scalar>,
    pressure_gradient: Vec<Vector>,
    vbya: Vec<Scalar>,
    /// Per face, in the owner's orientation.
    mass_fluxes: Vec<Scalar>,
    /// Velocity at the end of the previous time step (transient runs only).
    old_velocity: Option<Vec<Vector>>,

    pressure_residual: Scalar,
    velocity_residual: Scalar,
    time_step: usize,
    iteration: usize,
    history: Vec<IterationRecord>,

    velocity_snapshots: Vec<Vec<Vector>>,
    pressure_snapshots: Vec<Vec<Scalar>>,
    times: Vec<Scalar>,
    converged: bool,
}

impl SimpleSolver {
    pub fn new(mesh: Mesh, config: SolverConfig) -> Self {
        let mut solver = Self {
            mesh,
            config,
            transient: false,
            velocity: Vec::new(),
            pressure: Vec::new(),
            pressure_gradient: Vec::new(),
            vbya: Vec::new(),
            mass_fluxes: Vec::new(),
            old_velocity: None,
            pressure_residual: 1.0,
            velocity_residual: 1.0,
            time_step: 0,
            iteration: 0,
            history: Vec::new(),
            velocity_snapshots: Vec::new(),
            pressure_snapshots: Vec::new(),
            times: Vec::new(),
            converged: false,
        };
        solver.init_fields();
        solver
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Boundary edits take effect at the next `solve()` or `init_fields()`.
    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn set_transient(&mut self, transient: bool) {
        self.transient = transient;
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Velocity snapshot `time_point`, in recording order.
    pub fn velocity(&self, time_point: usize) -> Option<&[Vector]> {
        self.velocity_snapshots.get(time_point).map(Vec::as_slice)
    }

    pub fn pressure(&self, time_point: usize) -> Option<&[Scalar]> {
        self.pressure_snapshots.get(time_point).map(Vec::as_slice)
    }

    pub fn time_point_count(&self) -> usize {
        self.velocity_snapshots.len()
    }

    pub fn time_points(&self) -> &[Scalar] {
        &self.times
    }

    pub fn current_velocity(&self) -> &[Vector] {
        &self.velocity
    }

    pub fn current_pressure(&self) -> &[Scalar] {
        &self.pressure
    }

    pub fn pressure_gradient(&self) -> &[Vector] {
        &self.pressure_gradient
    }

    pub fn vbya(&self) -> &[Scalar] {
        &self.vbya
    }

    pub fn mass_fluxes(&self) -> &[Scalar] {
        &self.mass_fluxes
    }

    pub fn pressure_residual(&self) -> Scalar {
        self.pressure_residual
    }

    pub fn velocity_residual(&self) -> Scalar {
        self.velocity_residual
    }

    pub fn residual_history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Runs the outer loop to a terminal state and records the snapshots.
    ///
    /// Steady runs record one snapshot at `time_begin`; transient runs record one per
    /// time step and stop at the first diverged step.
    pub fn solve(&mut self) -> Result<SolveStatus, SolverError> {
        self.config
            .validate(self.transient)
            .map_err(SolverError::InvalidConfig)?;

        self.init_fields();
        self.history.clear();
        self.velocity_snapshots.clear();
        self.pressure_snapshots.clear();
        self.times.clear();

        let status = if self.transient {
            self.solve_transient()?
        } else {
            self.old_velocity = None;
            let status = self.run_iterations()?;
            self.record_snapshot(self.config.time_begin);
            status
        };

        self.converged = status == SolveStatus::Converged;
        log::info!(
            "SIMPLE finished: {} after {} iterations",
            status.as_str(),
            self.history.len()
        );
        Ok(status)
    }

    fn solve_transient(&mut self) -> Result<SolveStatus, SolverError> {
        let dt = self.config.time_step;
        let span = self.config.time_end - self.config.time_begin;
        let mut steps = (span / dt).round() as usize;
        if steps == 0 && span > 0.0 {
            steps = 1;
        }

        let mut overall = SolveStatus::Converged;
        for step in 1..=steps {
            self.time_step = step;
            self.old_velocity = Some(self.velocity.clone());
            let status = self.run_iterations()?;

            let time = self.config.time_begin + step as Scalar * dt;
            self.record_snapshot(time);
            log::debug!("time step {} (t = {:.6}): {}", step, time, status.as_str());

            if status.severity() > overall.severity() {
                overall = status;
            }
            if status == SolveStatus::Diverged {
                break;
            }
        }
        Ok(overall)
    }

    /// Inner SIMPLE loop from the current fields.
    fn run_iterations(&mut self) -> Result<SolveStatus, SolverError> {
        self.pressure_residual = 1.0;
        self.velocity_residual = 1.0;
        self.iteration = 0;

        while self.iteration < self.config.max_iterations {
            if let Some(status) = self.terminal_status() {
                return Ok(status);
            }
            self.iterate()?;
        }
        Ok(self
            .terminal_status()
            .unwrap_or(SolveStatus::MaxIterationsReached))
    }

    fn terminal_status(&self) -> Option<SolveStatus> {
        let residual = self.pressure_residual;
        if residual.is_nan() {
            log::warn!("pressure residual is NaN at iteration {}", self.iteration);
            return Some(SolveStatus::Diverged);
        }
        if residual == 0.0 {
            log::warn!(
                "pressure residual is exactly zero at iteration {}; treated as {}",
                self.iteration,
                match self.config.zero_residual {
                    ZeroResidualPolicy::Diverged => "divergence",
                    ZeroResidualPolicy::Converged => "convergence",
                }
            );
            return Some(match self.config.zero_residual {
                ZeroResidualPolicy::Diverged => SolveStatus::Diverged,
                ZeroResidualPolicy::Converged => SolveStatus::Converged,
            });
        }
        if residual.is_finite() && residual < self.config.pressure_tolerance {
            return Some(SolveStatus::Converged);
        }
        None
    }

    fn record_snapshot(&mut self, time: Scalar) {
        self.velocity_snapshots.push(self.velocity.clone());
        self.pressure_snapshots.push(self.pressure.clone());
        self.times.push(time);
    }

    /// Zero pressure and velocity; boundary mass fluxes from fixed-value velocities.
    pub fn init_fields(&mut self) {
        let n_cells = self.mesh.num_cells();
        let density = self.config.density;
        let mesh = &self.mesh;

        self.velocity = vec![Vector::zeros(); n_cells];
        self.pressure = vec![0.0; n_cells];
        self.pressure_gradient = vec![Vector::zeros(); n_cells];
        self.vbya = vec![0.0; n_cells];
        self.mass_fluxes = (0..mesh.num_faces())
            .map(|face| {
                if !mesh.is_boundary_face(face) {
                    return 0.0;
                }
                let bc = mesh.face_boundaries(face).velocity;
                match bc.kind {
                    BoundaryConditionType::FixedValue => {
                        density * bc.value.dot(&mesh.face_area_vector(face))
                    }
                    BoundaryConditionType::FixedGradient => 0.0,
                }
            })
            .collect();

        let has_reference = mesh
            .boundary_faces()
            .any(|face| mesh.face_boundaries(face).pressure.is_fixed_value());
        if !has_reference && n_cells > 0 {
            log::warn!("no fixed-value pressure boundary: pressure is only defined up to a constant");
        }

        self.pressure_residual = 1.0;
        self.velocity_residual = 1.0;
        self.time_step = 0;
        self.iteration = 0;
        self.old_velocity = None;
    }

    /// One outer iteration: pressure gradient, momentum, mass fluxes, correction.
    pub fn iterate(&mut self) -> Result<(), SolverError> {
        self.compute_pressure_gradient();
        self.solve_momentum()?;
        self.compute_mass_fluxes();
        self.correct_pressure()?;
        self.iteration += 1;

        let record = IterationRecord {
            time_step: self.time_step,
            iteration: self.iteration,
            pressure_residual: self.pressure_residual,
            velocity_residual: self.velocity_residual,
            max_mass_imbalance: self.max_mass_imbalance(),
        };
        self.history.push(record);

        let interval = self.config.log_interval;
        if interval > 0 && (self.iteration % interval == 0 || self.iteration == 1) {
            log::info!(
                "iteration {:>6}: p residual {:.3e}, u residual {:.3e}, mass imbalance {:.3e}",
                record.iteration,
                record.pressure_residual,
                record.velocity_residual,
                record.max_mass_imbalance
            );
        }
        Ok(())
    }

    pub fn compute_pressure_gradient(&mut self) {
        let mesh = &self.mesh;
        let pressure = &self.pressure;
        let scheme = self.config.gradient_scheme;
        let boundaries = pressure_boundaries(mesh);

        self.pressure_gradient = (0..mesh.num_cells())
            .into_par_iter()
            .map(|cell| cell_gradient(mesh, cell, &boundaries, scheme).evaluate(pressure))
            .collect();
    }

    /// `convection - viscosity * diffusion + grad(p) * V`, plus `rho V/dt (u - u_old)`
    /// in transient runs. Unrelaxed.
    pub fn generate_momentum_system(&self) -> (SparseMatrix, Vec<Vector>) {
        let mesh = &self.mesh;
        let boundaries = velocity_boundaries(mesh);
        let mass_fluxes = &self.mass_fluxes;
        let pressure_gradient = &self.pressure_gradient;
        let scheme = self.config.convection_scheme;
        let viscosity = self.config.viscosity;
        let unsteady = self
            .old_velocity
            .as_deref()
            .map(|old| (old, self.config.density / self.config.time_step));

        assemble_system(mesh.num_cells(), |cell| {
            let convection: LinearCombination<Vector> =
                convection_flux_over_cell(mesh, cell, &boundaries, mass_fluxes, scheme);
            let diffusion: LinearCombination<Vector> =
                diffusion_flux_over_cell(mesh, cell, &boundaries);

            let mut eqn = convection - diffusion * viscosity;
            eqn.add_bias(pressure_gradient[cell] * mesh.cell_volume(cell));
            if let Some((old, rho_by_dt)) = unsteady {
                let coeff = rho_by_dt * mesh.cell_volume(cell);
                eqn.add_term(coeff, cell);
                eqn.sub_bias(old[cell] * coeff);
            }
            eqn
        })
    }

    pub fn solve_momentum(&mut self) -> Result<(), SolverError> {
        let (mut matrix, mut rhs) = self.generate_momentum_system();
        relax_system(
            &mut matrix,
            &mut rhs,
            &self.velocity,
            self.config.velocity_relaxation,
        );

        // After relaxation, so the correction sees the relaxed diagonal.
        let mesh = &self.mesh;
        self.vbya = matrix
            .diagonal()
            .into_par_iter()
            .enumerate()
            .map(|(cell, diagonal)| mesh.cell_volume(cell) / diagonal)
            .collect();

        let columns = vec![
            rhs.iter().map(|b| b.x).collect::<Vec<_>>(),
            rhs.iter().map(|b| b.y).collect::<Vec<_>>(),
        ];
        let guess = vec![
            self.velocity.iter().map(|u| u.x).collect::<Vec<_>>(),
            self.velocity.iter().map(|u| u.y).collect::<Vec<_>>(),
        ];
        let solution = solve_system(
            &matrix,
            &columns,
            Some(guess.as_slice()),
            &self.config.momentum_solver,
        )
        .map_err(|source| SolverError::LinearSolve {
            system: "momentum",
            source,
        })?;

        self.velocity = solution[0]
            .iter()
            .zip(&solution[1])
            .map(|(&x, &y)| Vector::new(x, y))
            .collect();
        Ok(())
    }

    /// Face mass fluxes from the Rhie-Chow face velocity.
    pub fn compute_mass_fluxes(&mut self) {
        let mesh = &self.mesh;
        let density = self.config.density;
        let velocity_bc = velocity_boundaries(mesh);
        let pressure_bc = pressure_boundaries(mesh);
        let fields = RhieChowFields {
            velocity: &self.velocity,
            pressure: &self.pressure,
            pressure_gradient: &self.pressure_gradient,
            vbya: &self.vbya,
        };

        self.mass_fluxes = (0..mesh.num_faces())
            .into_par_iter()
            .map(|face| {
                let u_face =
                    rhie_chow_velocity_on_face(mesh, face, fields, &velocity_bc, &pressure_bc);
                density * u_face.dot(&mesh.face_area_vector(face))
            })
            .collect();
    }

    /// `-net_outflow + sum(rho * VbyA_f * |S_f| * dp'/dn) = 0` per cell.
    pub fn generate_pressure_correction_system(&self) -> (SparseMatrix, Vec<Scalar>) {
        let mesh = &self.mesh;
        let density = self.config.density;
        let boundaries = pressure_correction_boundaries(mesh);
        let vbya = &self.vbya;
        let mass_fluxes = &self.mass_fluxes;

        assemble_system(mesh.num_cells(), |cell| {
            let mut eqn = LinearCombination::<Scalar>::from_bias(-net_outflow(mesh, mass_fluxes, cell));
            for &face in mesh.cell_faces(cell) {
                let vbya_face =
                    value_on_face(mesh, face, &zero_gradient_boundaries::<Scalar>).evaluate(vbya);
                eqn += face_normal_gradient(mesh, cell, face, &boundaries)
                    * (density * vbya_face * mesh.face_area(face));
            }
            eqn
        })
    }

    /// Solves for the pressure correction, relaxes it explicitly and corrects
    /// pressure, velocity and mass fluxes. Residuals use the uncorrected fields.
    pub fn correct_pressure(&mut self) -> Result<(), SolverError> {
        let (matrix, rhs) = self.generate_pressure_correction_system();
        let solution = solve_system(&matrix, &[rhs], None, &self.config.pressure_solver)
            .map_err(|source| SolverError::LinearSolve {
                system: "pressure correction",
                source,
            })?;
        let relaxation = self.config.pressure_relaxation;
        let p_correction: Vec<Scalar> = solution
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|p| p * relaxation)
            .collect();

        let u_correction = self.velocity_correction(&p_correction);
        let flux_correction = self.mass_flux_correction(&p_correction);

        self.pressure_residual = relative_residual(&self.pressure, &p_correction);
        self.velocity_residual = relative_residual(&self.velocity, &u_correction);
        log::debug!(
            "pressure correction: max |p'| {:.3e}, max |u'| {:.3e}",
            field_max_abs(&p_correction),
            field_max_abs(&u_correction)
        );

        self.pressure
            .par_iter_mut()
            .zip(&p_correction)
            .for_each(|(p, dp)| *p += dp);
        self.velocity
            .par_iter_mut()
            .zip(&u_correction)
            .for_each(|(u, du)| *u += du);
        self.mass_fluxes
            .par_iter_mut()
            .zip(&flux_correction)
            .for_each(|(f, df)| *f += df);
        Ok(())
    }

    /// `-VbyA_c * grad(p')` per cell.
    pub fn velocity_correction(&self, p_correction: &[Scalar]) -> Vec<Vector> {
        let mesh = &self.mesh;
        let boundaries = pressure_correction_boundaries(mesh);
        let scheme = self.config.gradient_scheme;
        (0..mesh.num_cells())
            .into_par_iter()
            .map(|cell| {
                -cell_gradient(mesh, cell, &boundaries, scheme).evaluate(p_correction)
                    * self.vbya[cell]
            })
            .collect()
    }

    /// `-rho * VbyA_f * |S_f| * dp'/dn` per face, in the owner's orientation.
    pub fn mass_flux_correction(&self, p_correction: &[Scalar]) -> Vec<Scalar> {
        let mesh = &self.mesh;
        let boundaries = pressure_correction_boundaries(mesh);
        let density = self.config.density;
        (0..mesh.num_faces())
            .into_par_iter()
            .map(|face| {
                let vbya_face = value_on_face(mesh, face, &zero_gradient_boundaries::<Scalar>)
                    .evaluate(&self.vbya);
                let gradient = face_normal_gradient(mesh, mesh.face_owner(face), face, &boundaries)
                    .evaluate(p_correction);
                -density * vbya_face * mesh.face_area(face) * gradient
            })
            .collect()
    }

    /// Net mass outflow of `cell` under the current fluxes.
    pub fn mass_imbalance(&self, cell: CellId) -> Scalar {
        net_outflow(&self.mesh, &self.mass_fluxes, cell)
    }

    pub fn max_mass_imbalance(&self) -> Scalar {
        (0..self.mesh.num_cells())
            .into_par_iter()
            .map(|cell| self.mass_imbalance(cell).abs())
            .reduce(|| 0.0, f64::max)
    }
}

fn net_outflow(mesh: &Mesh, mass_fluxes: &[Scalar], cell: CellId) -> Scalar {
    mesh.cell_faces(cell)
        .iter()
        .map(|&face| {
            if mesh.face_owner(face) == cell {
                mass_fluxes[face]
            } else {
                -mass_fluxes[face]
            }
        })
        .sum()
}
