pub mod degree;

pub use degree::{Degree, DegreeInput};
