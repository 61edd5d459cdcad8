pub mod cases;
pub mod solver;
pub mod trace;
