pub mod geometry;
pub mod parse;
pub mod structs;
pub mod structured;


pub use geometry::*;
pub use parse::*;
pub use structs::*;
pub use structured::*;
