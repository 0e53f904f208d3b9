mod format;
mod problem;
mod simplex;
mod solution;
mod tableau;

pub use format::format_decimal;
pub use num_rational::BigRational;
pub use problem::{Coefficient, Problem, ProblemError};
pub use simplex::{DEFAULT_MAX_PIVOTS, Simplex, SimplexError};
pub use solution::{Solution, State};
pub use tableau::Tableau;
