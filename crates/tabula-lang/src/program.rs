use num_rational::BigRational;
use tabula_solver::{Problem, ProblemError, Simplex, SimplexError};
use thiserror::Error;

use crate::ast::{Expression, Inequality};
use crate::parser::{ParseError, Parser};

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("Parse error in {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Simplex(#[from] SimplexError),
}

/// A parsed maximization problem laid out as dense `c`, `A` and `b`.
///
/// Column `j` of every vector belongs to `variables()[j]`. Variables are numbered in the order
/// they first appear, reading the objective before the constraints.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    variables: Vec<String>,
    objective: Vec<BigRational>,
    constraints: Vec<Vec<BigRational>>,
    rhs: Vec<BigRational>,
}

impl Program {
    pub fn parse<S: AsRef<str>>(maximize: &str, constraints: &[S]) -> Result<Self, ProgramError> {
        let objective = Parser::parse_expression(maximize).map_err(|source| ProgramError::Parse {
            context: "objective".to_string(),
            source,
        })?;
        let inequalities = constraints
            .iter()
            .enumerate()
            .map(|(i, source)| {
                Parser::parse_inequality(source.as_ref()).map_err(|err| ProgramError::Parse {
                    context: format!("constraint {}", i),
                    source: err,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::assemble(&objective, &inequalities))
    }

    pub fn assemble(objective: &Expression, inequalities: &[Inequality]) -> Self {
        let mut variables: Vec<String> = Vec::new();
        let names = objective
            .variables()
            .chain(inequalities.iter().flat_map(|inequality| inequality.lhs.variables()));
        for name in names {
            if !variables.iter().any(|known| known == name) {
                variables.push(name.to_string());
            }
        }

        let dense = |expression: &Expression| -> Vec<BigRational> {
            variables.iter().map(|name| expression.coefficient(name)).collect()
        };
        let objective = dense(objective);
        let constraints = inequalities.iter().map(|inequality| dense(&inequality.lhs)).collect();
        let rhs = inequalities.iter().map(|inequality| inequality.rhs.clone()).collect();

        log::debug!(
            "Assembled program: {} variables ({}), {} constraints",
            variables.len(),
            variables.join(", "),
            inequalities.len()
        );

        Self {
            variables,
            objective,
            constraints,
            rhs,
        }
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
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

    pub fn problem(&self) -> Result<Problem, ProblemError> {
        Problem::new(self.objective.clone(), self.constraints.clone(), self.rhs.clone())
    }

    pub fn simplex(&self) -> Result<Simplex, ProblemError> {
        Ok(Simplex::from(self.problem()?))
    }

    /// Pair each variable name with its entry in `values`.
    pub fn assignments<'p, 'v>(&'p self, values: &'v [BigRational]) -> Vec<(&'p str, &'v BigRational)> {
        self.variables.iter().map(String::as_str).zip(values).collect()
    }
}

/// Parse, solve and return the optimal value of every variable in [`Program::variables`] order.
pub fn maximize<S: AsRef<str>>(objective: &str, constraints: &[S]) -> Result<Vec<BigRational>, ProgramError> {
    let program = Program::parse(objective, constraints)?;
    let mut simplex = program.simplex()?;
    Ok(simplex.solution()?)
}
