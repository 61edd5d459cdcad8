pub mod assembly;
pub mod boundary;
pub mod fvm;
pub mod linear_combination;
pub mod linear_solver;
pub mod mesh;
pub mod options;
pub mod scheme;
pub mod simple;
pub mod types;

pub use boundary::{Boundaries, BoundaryCondition, BoundaryConditionType};
pub use linear_combination::{LinearCombination, Term};
pub use linear_solver::{LinearSolveError, LinearSolverKind, LinearSolverSettings};
pub use mesh::{Mesh, MeshParseError, Patch};
pub use options::{SolverConfig, ZeroResidualPolicy};
pub use scheme::{ConvectionScheme, GradientScheme};
pub use simple::{IterationRecord, SimpleSolver, SolveStatus, SolverError};
pub use types::{CellId, FaceId, Scalar, Tensor, Vector};
