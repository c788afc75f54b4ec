pub mod curve_fitting;
pub use curve_fitting::{get_lower_index, linear_interpolation};
