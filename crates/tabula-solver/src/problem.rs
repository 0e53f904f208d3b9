use num_bigint::BigInt;
use num_rational::{BigRational, Ratio};
use num_traits::Signed;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProblemError {
    #[error("Problem needs at least one variable and one constraint (got {variables} variables, {constraints} constraints)")]
    Empty { variables: usize, constraints: usize },
    #[error("Dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },
    #[error("Coefficient at {0} is not a finite number")]
    NonFiniteCoefficient(String),
    #[error("Negative right-hand side {value} in constraint {row}: the slack basis would start infeasible")]
    NegativeRhs { row: usize, value: BigRational },
}

/// Numeric input accepted by [`Problem::new`].
///
/// Every value is converted to an exact [`BigRational`]. Floats convert to the exact binary value
/// they hold, so `0.5` becomes `1/2` but `0.1` does not become `1/10`.
pub trait Coefficient {
    /// Exact value, or `None` for NaN and infinities.
    fn to_rational(self) -> Option<BigRational>;
}

macro_rules! integer_coefficient {
    ($($t:ty),*) => {
        $(
            impl Coefficient for $t {
                fn to_rational(self) -> Option<BigRational> {
                    Some(BigRational::from_integer(BigInt::from(self)))
                }
            }
        )*
    };
}

integer_coefficient!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Coefficient for f64 {
    fn to_rational(self) -> Option<BigRational> {
        BigRational::from_float(self)
    }
}

impl Coefficient for f32 {
    fn to_rational(self) -> Option<BigRational> {
        BigRational::from_float(self)
    }
}

impl Coefficient for BigInt {
    fn to_rational(self) -> Option<BigRational> {
        Some(BigRational::from_integer(self))
    }
}

impl Coefficient for BigRational {
    fn to_rational(self) -> Option<BigRational> {
        Some(self)
    }
}

impl Coefficient for &BigRational {
    fn to_rational(self) -> Option<BigRational> {
        Some(self.clone())
    }
}

impl Coefficient for Ratio<i64> {
    fn to_rational(self) -> Option<BigRational> {
        Some(BigRational::new(
            BigInt::from(*self.numer()),
            BigInt::from(*self.denom()),
        ))
    }
}

/// A validated linear program: maximize `c·x` subject to `A·x <= b`, `x >= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Objective coefficients, one per decision variable
    objective: Vec<BigRational>,
    /// Constraint matrix, one row per constraint
    constraints: Vec<Vec<BigRational>>,
    /// Right-hand side bounds, never negative
    rhs: Vec<BigRational>,
}

impl Problem {
    /// Validate shapes and signs of `(c, a, b)` and convert every entry to an exact rational.
    ///
    /// Shapes are checked before any value is converted.
    pub fn new<C: Coefficient>(c: Vec<C>, a: Vec<Vec<C>>, b: Vec<C>) -> Result<Self, ProblemError> {
        if a.len() != b.len() {
            return Err(ProblemError::DimensionMismatch {
                context: "constraint rows vs right-hand side values".to_string(),
                expected: b.len(),
                found: a.len(),
            });
        }
        if c.is_empty() || b.is_empty() {
            return Err(ProblemError::Empty {
                variables: c.len(),
                constraints: b.len(),
            });
        }
        for (i, row) in a.iter().enumerate() {
            if row.len() != c.len() {
                return Err(ProblemError::DimensionMismatch {
                    context: format!("width of constraint row {}", i),
                    expected: c.len(),
                    found: row.len(),
                });
            }
        }

        let objective = c
            .into_iter()
            .enumerate()
            .map(|(j, value)| convert(value, || format!("objective[{}]", j)))
            .collect::<Result<Vec<_>, _>>()?;

        let constraints = a
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                row.into_iter()
                    .enumerate()
                    .map(|(j, value)| convert(value, || format!("constraint[{}][{}]", i, j)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rhs = b
            .into_iter()
            .enumerate()
            .map(|(i, value)| convert(value, || format!("rhs[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some((row, value)) = rhs.iter().enumerate().find(|(_, v)| v.is_negative()) {
            return Err(ProblemError::NegativeRhs {
                row,
                value: value.clone(),
            });
        }

        Ok(Self {
            objective,
            constraints,
            rhs,
        })
    }

    pub fn objective(&self) -> &[BigRational] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Vec<BigRational>] {
        &self.constraints
    }

    pub fn rhs(&self) -> &[BigRational] {
        &self.rhs
    }

    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.rhs.len()
    }
}

fn convert<C: Coefficient>(value: C, position: impl FnOnce() -> String) -> Result<BigRational, ProblemError> {
    value
        .to_rational()
        .ok_or_else(|| ProblemError::NonFiniteCoefficient(position()))
}
