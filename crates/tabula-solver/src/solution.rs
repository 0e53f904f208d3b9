use num_rational::BigRational;

/// Where the engine stands between pivots
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// An entering variable exists
    Improvable,
    /// No objective coefficient is negative
    Optimal,
    /// A pivot found no bounding row
    Unbounded,
    /// Still improvable but out of pivots
    PivotLimitExceeded,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Optimal | State::Unbounded)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Improvable => write!(f, "IMPROVABLE"),
            State::Optimal => write!(f, "OPTIMAL"),
            State::Unbounded => write!(f, "UNBOUNDED"),
            State::PivotLimitExceeded => write!(f, "PIVOT LIMIT EXCEEDED"),
        }
    }
}

/// Snapshot of the engine at its current basis
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Engine state when the snapshot was taken
    pub state: State,
    /// Decision variable values
    pub values: Vec<BigRational>,
    /// Slack variable values, one per constraint
    pub slack: Vec<BigRational>,
    /// Objective value `c·x` at `values`
    pub objective_value: BigRational,
    /// Pivots performed so far
    pub pivots: usize,
    /// Basic variables, ascending
    pub basic_variables: Vec<usize>,
}

impl Solution {
    pub fn is_optimal(&self) -> bool {
        self.state == State::Optimal
    }

    /// Constraints whose slack is zero.
    pub fn binding_constraints(&self) -> Vec<usize> {
        self.slack
            .iter()
            .enumerate()
            .filter(|(_, s)| num_traits::Zero::is_zero(*s))
            .map(|(i, _)| i)
            .collect()
    }
}
