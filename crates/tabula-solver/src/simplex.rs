use num_rational::BigRational;
use num_traits::{Signed, Zero};
use thiserror::Error;

use crate::problem::{Coefficient, Problem, ProblemError};
use crate::solution::{Solution, State};
use crate::tableau::Tableau;

/// Pivot budget for [`Simplex::solve`] unless configured otherwise
pub const DEFAULT_MAX_PIVOTS: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimplexError {
    #[error("Problem is unbounded: variable {column} can grow without limit")]
    Unbounded { column: usize },
    #[error("Exceeded the limit of {limit} pivots, the tableau may be cycling")]
    PivotLimitExceeded { limit: usize },
    #[error("No entering variable: the tableau is already optimal")]
    NoEnteringVariable,
}

/// Tableau simplex engine maximizing `c·x` subject to `A·x <= b`, `x >= 0`.
///
/// Pivoting uses the most negative objective coefficient to choose the entering variable (lowest
/// column on ties) and the minimum ratio test to choose the pivot row. Among rows tied at the
/// minimum ratio the last one is taken.
#[derive(Debug, Clone)]
pub struct Simplex {
    /// Objective as given, used to evaluate `c·x`
    objective: Vec<BigRational>,
    tableau: Tableau,
    max_pivots: usize,
    pivot_count: usize,
    /// Pivots made by `solve`, the only ones charged against `max_pivots`
    solve_pivots: usize,
    /// Set once a pivot proves the problem unbounded
    unbounded_column: Option<usize>,
}

impl From<Problem> for Simplex {
    fn from(problem: Problem) -> Self {
        let tableau = Tableau::new(&problem);
        log::debug!(
            "Built tableau with {} variables and {} constraints",
            tableau.num_variables(),
            tableau.num_constraints()
        );
        Self {
            objective: problem.objective().to_vec(),
            tableau,
            max_pivots: DEFAULT_MAX_PIVOTS,
            pivot_count: 0,
            solve_pivots: 0,
            unbounded_column: None,
        }
    }
}

impl Simplex {
    pub fn new<C: Coefficient>(c: Vec<C>, a: Vec<Vec<C>>, b: Vec<C>) -> Result<Self, ProblemError> {
        Ok(Problem::new(c, a, b)?.into())
    }

    /// Limit the pivots [`Simplex::solve`] may perform. Pivots made directly through
    /// [`Simplex::pivot`] are not charged against it.
    pub fn with_max_pivots(mut self, max: usize) -> Self {
        self.max_pivots = max;
        self
    }

    pub fn set_max_pivots(&mut self, max: usize) {
        self.max_pivots = max;
    }

    pub fn max_pivots(&self) -> usize {
        self.max_pivots
    }

    pub fn pivot_count(&self) -> usize {
        self.pivot_count
    }

    pub fn num_variables(&self) -> usize {
        self.tableau.num_variables()
    }

    pub fn num_constraints(&self) -> usize {
        self.tableau.num_constraints()
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    pub fn basic_variables(&self) -> &[usize] {
        self.tableau.basic_variables()
    }

    pub fn state(&self) -> State {
        if self.unbounded_column.is_some() {
            State::Unbounded
        } else if !self.can_improve() {
            State::Optimal
        } else if self.solve_pivots >= self.max_pivots {
            State::PivotLimitExceeded
        } else {
            State::Improvable
        }
    }

    pub fn can_improve(&self) -> bool {
        self.tableau.objective_row().iter().any(|c| c.is_negative())
    }

    /// Column with the most negative objective coefficient, lowest index on ties.
    pub fn entering_variable(&self) -> Option<usize> {
        let mut best: Option<(usize, &BigRational)> = None;
        for (column, coefficient) in self.tableau.objective_row().iter().enumerate() {
            if !coefficient.is_negative() {
                continue;
            }
            if best.is_none_or(|(_, current)| coefficient < current) {
                best = Some((column, coefficient));
            }
        }
        best.map(|(column, _)| column)
    }

    /// Row bounding the step along `column`, or `None` if nothing bounds it.
    ///
    /// Rows with a zero coefficient, or where exactly one of the coefficient and the right-hand
    /// side is negative, are skipped. The remaining rows are ranked by `rhs / coefficient` and
    /// the last row reaching the minimum wins.
    pub fn pivot_row(&self, column: usize) -> Option<usize> {
        if column >= self.tableau.num_total_variables() {
            return None;
        }
        let candidates = self
            .tableau
            .constraint_rows()
            .iter()
            .zip(self.tableau.rhs())
            .enumerate()
            .filter(|(_, (row, _))| !row[column].is_zero())
            .filter(|(_, (row, rhs))| row[column].is_negative() == rhs.is_negative())
            .map(|(i, (row, rhs))| (i, rhs / &row[column]));

        last_min_by_key(candidates, |(_, ratio)| ratio.clone()).map(|(i, _)| i)
    }

    /// Perform a single pivot.
    ///
    /// Fails with [`SimplexError::Unbounded`] when the entering column has no bounding row. That
    /// verdict is final and every later pivot or solve reports it again.
    pub fn pivot(&mut self) -> Result<(), SimplexError> {
        if let Some(column) = self.unbounded_column {
            return Err(SimplexError::Unbounded { column });
        }
        let column = self.entering_variable().ok_or(SimplexError::NoEnteringVariable)?;

        let Some(row) = self.pivot_row(column) else {
            log::warn!("Variable {} enters but no row bounds it, problem is unbounded", column);
            self.unbounded_column = Some(column);
            return Err(SimplexError::Unbounded { column });
        };

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Tableau before pivot {}:\n{}", self.pivot_count + 1, self.formatted_tableau());
        }

        let leaving = self.tableau.pivot(row, column);
        self.pivot_count += 1;
        log::debug!(
            "Pivot {}: variable {} enters at row {}, variable {} leaves",
            self.pivot_count,
            column,
            row,
            leaving
        );
        Ok(())
    }

    /// Pivot until no entering variable remains.
    ///
    /// Calling this again once optimal does nothing.
    pub fn solve(&mut self) -> Result<(), SimplexError> {
        self.solve_with(|_| {})
    }

    /// Like [`Simplex::solve`], calling `observe` before each pivot and once more when optimal.
    pub fn solve_with<F: FnMut(&Simplex)>(&mut self, mut observe: F) -> Result<(), SimplexError> {
        if let Some(column) = self.unbounded_column {
            return Err(SimplexError::Unbounded { column });
        }
        while self.can_improve() {
            observe(&*self);
            if self.solve_pivots >= self.max_pivots {
                log::warn!("Giving up after {} pivots", self.solve_pivots);
                return Err(SimplexError::PivotLimitExceeded {
                    limit: self.max_pivots,
                });
            }
            self.pivot()?;
            self.solve_pivots += 1;
        }
        observe(&*self);
        log::info!("Optimal after {} pivots", self.pivot_count);
        Ok(())
    }

    /// Solve, then return the decision variable values.
    pub fn solution(&mut self) -> Result<Vec<BigRational>, SimplexError> {
        self.solve()?;
        Ok(self.current_solution())
    }

    /// Decision variable values at the current basis, optimal or not.
    pub fn current_solution(&self) -> Vec<BigRational> {
        self.tableau.solution()[..self.num_variables()].to_vec()
    }

    pub fn slack_values(&self) -> Vec<BigRational> {
        self.tableau.solution()[self.num_variables()..].to_vec()
    }

    /// `c·x` at the current basis.
    pub fn objective_value(&self) -> BigRational {
        self.objective
            .iter()
            .zip(self.tableau.solution())
            .map(|(c, x)| c * x)
            .sum()
    }

    pub fn report(&self) -> Solution {
        Solution {
            state: self.state(),
            values: self.current_solution(),
            slack: self.slack_values(),
            objective_value: self.objective_value(),
            pivots: self.pivot_count,
            basic_variables: self.basic_variables().to_vec(),
        }
    }
}

/// Like `Iterator::min_by_key`, except that ties resolve to the last element.
fn last_min_by_key<I, K, F>(iter: I, mut key: F) -> Option<I::Item>
where
    I: IntoIterator,
    K: Ord,
    F: FnMut(&I::Item) -> K,
{
    let mut best: Option<(I::Item, K)> = None;
    for item in iter {
        let value = key(&item);
        let replace = match &best {
            Some((_, best_value)) => value <= *best_value,
            None => true,
        };
        if replace {
            best = Some((item, value));
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ratio(numer: i64, denom: i64) -> BigRational {
        BigRational::new(numer.into(), denom.into())
    }

    fn ints(values: &[i64]) -> Vec<BigRational> {
        values.iter().map(|&v| ratio(v, 1)).collect()
    }

    fn solve(c: Vec<i64>, a: Vec<Vec<i64>>, b: Vec<i64>) -> Vec<BigRational> {
        Simplex::new(c, a, b).unwrap().solution().unwrap()
    }

    #[test]
    fn test_2x2() {
        let result = solve(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3]);
        assert_eq!(result, vec![ratio(5, 3), ratio(2, 3)]);
    }

    #[test]
    fn test_2x2_b() {
        let result = solve(vec![3, 4], vec![vec![1, 1], vec![2, 1]], vec![4, 5]);
        assert_eq!(result, ints(&[0, 4]));
    }

    #[test]
    fn test_2x2_c() {
        let result = solve(vec![2, -1], vec![vec![1, 2], vec![3, 2]], vec![6, 12]);
        assert_eq!(result, ints(&[4, 0]));
    }

    #[test]
    fn test_3x3_a() {
        let result = solve(
            vec![60, 90, 300],
            vec![vec![1, 1, 1], vec![1, 3, 0], vec![2, 0, 1]],
            vec![600, 600, 900],
        );
        assert_eq!(result, ints(&[0, 0, 600]));
    }

    #[test]
    fn test_3x3_b() {
        let result = solve(
            vec![70, 210, 140],
            vec![vec![1, 1, 1], vec![5, 4, 4], vec![40, 20, 30]],
            vec![100, 480, 3200],
        );
        assert_eq!(result, ints(&[0, 100, 0]));
    }

    #[test]
    fn test_3x3_c() {
        let result = solve(
            vec![2, -1, 2],
            vec![vec![2, 1, 0], vec![1, 2, -2], vec![0, 1, 2]],
            vec![10, 20, 5],
        );
        assert_eq!(result, vec![ratio(5, 1), ratio(0, 1), ratio(5, 2)]);
    }

    #[test]
    fn test_3x3_rational_coefficients() {
        let mut simplex = Simplex::new(
            ints(&[11, 16, 15]),
            vec![
                vec![ratio(1, 1), ratio(2, 1), ratio(3, 2)],
                vec![ratio(2, 3), ratio(2, 3), ratio(1, 1)],
                vec![ratio(1, 2), ratio(1, 3), ratio(1, 2)],
            ],
            ints(&[12_000, 4_600, 2_400]),
        )
        .unwrap();

        assert_eq!(simplex.solution().unwrap(), ints(&[600, 5_100, 800]));
        assert_eq!(simplex.pivot_count(), 3);
        assert_eq!(simplex.objective_value(), ratio(100_200, 1));
    }

    #[test]
    fn test_3x4_degenerate_rows() {
        let result = solve(
            vec![100_000, 40_000, 18_000],
            vec![vec![20, 6, 3], vec![0, 1, 0], vec![-1, -1, 1], vec![-9, 1, 1]],
            vec![182, 10, 0, 0],
        );
        assert_eq!(result, ints(&[4, 10, 14]));
    }

    #[test]
    fn test_4x4() {
        let result = solve(
            vec![1, 2, 1, 2],
            vec![vec![1, 0, 1, 0], vec![0, 1, 0, 1], vec![1, 1, 0, 0], vec![0, 0, 1, 1]],
            vec![1, 4, 2, 2],
        );
        assert_eq!(result, ints(&[0, 2, 0, 2]));
    }

    #[test]
    fn test_degenerate_problem_terminates() {
        // With a first-minimum row choice this problem cycles through six bases forever
        let mut simplex = Simplex::new(
            vec![10.0, -57.0, -9.0, -24.0],
            vec![
                vec![0.5, -5.5, -2.5, 9.0],
                vec![0.5, -1.5, -0.5, 1.0],
                vec![1.0, 0.0, 0.0, 0.0],
            ],
            vec![0.0, 0.0, 1.0],
        )
        .unwrap();

        simplex.pivot().unwrap();
        assert_eq!(simplex.basic_variables(), &[0, 4, 6]);
        simplex.pivot().unwrap();
        assert_eq!(simplex.basic_variables(), &[0, 2, 4]);

        assert_eq!(simplex.state(), State::Optimal);
        assert_eq!(simplex.solution().unwrap(), ints(&[1, 0, 1, 0]));
        assert_eq!(simplex.pivot_count(), 2);
        assert_eq!(simplex.objective_value(), ratio(1, 1));
    }

    #[test]
    fn test_unbounded() {
        let mut simplex = Simplex::new(vec![1, 1, 1], vec![vec![3, 1, -2], vec![4, 3, 0]], vec![5, 7]).unwrap();

        let err = simplex.solve().unwrap_err();

        assert_eq!(err, SimplexError::Unbounded { column: 3 });
        assert_eq!(simplex.state(), State::Unbounded);
        assert_eq!(simplex.pivot_count(), 2);
        assert_eq!(simplex.current_solution(), vec![ratio(7, 4), ratio(0, 1), ratio(1, 8)]);
    }

    #[test]
    fn test_unbounded_is_terminal() {
        let mut simplex = Simplex::new(vec![1, 1, 1], vec![vec![3, 1, -2], vec![4, 3, 0]], vec![5, 7]).unwrap();
        assert!(simplex.solution().is_err());

        let before = simplex.tableau().clone();
        assert_eq!(simplex.pivot(), Err(SimplexError::Unbounded { column: 3 }));
        assert_eq!(simplex.solve(), Err(SimplexError::Unbounded { column: 3 }));
        assert_eq!(simplex.tableau(), &before);
        assert!(simplex.state().is_terminal());
    }

    #[test]
    fn test_unbounded_single_variable() {
        let mut simplex = Simplex::new(vec![1, 0], vec![vec![0, 1]], vec![3]).unwrap();
        assert_eq!(simplex.pivot(), Err(SimplexError::Unbounded { column: 0 }));
        assert_eq!(simplex.pivot_count(), 0);
    }

    #[test]
    fn test_construction_errors() {
        let err = Simplex::new(vec![1, 1], vec![vec![2, 1, 0], vec![1, 2, 0]], vec![4, 3]).unwrap_err();
        assert!(matches!(err, ProblemError::DimensionMismatch { expected: 2, found: 3, .. }));

        let err = Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3, 1]).unwrap_err();
        assert!(matches!(err, ProblemError::DimensionMismatch { expected: 3, found: 2, .. }));
    }

    #[test]
    fn test_starting_vertex_is_origin() {
        let simplex = Simplex::new(vec![3, 4], vec![vec![1, 1], vec![2, 1]], vec![4, 5]).unwrap();

        assert_eq!(simplex.current_solution(), ints(&[0, 0]));
        assert_eq!(simplex.slack_values(), ints(&[4, 5]));
        assert_eq!(simplex.objective_value(), ratio(0, 1));
        assert_eq!(simplex.state(), State::Improvable);
        assert!(simplex.can_improve());
    }

    #[test]
    fn test_entering_variable_prefers_lowest_column_on_ties() {
        let simplex = Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3]).unwrap();
        assert_eq!(simplex.entering_variable(), Some(0));

        let simplex = Simplex::new(vec![3, 4], vec![vec![1, 1], vec![2, 1]], vec![4, 5]).unwrap();
        assert_eq!(simplex.entering_variable(), Some(1));
    }

    #[test]
    fn test_pivot_row_prefers_last_minimum() {
        let simplex = Simplex::new(vec![1], vec![vec![1], vec![2], vec![1]], vec![2, 4, 2]).unwrap();
        assert_eq!(simplex.pivot_row(0), Some(2));
    }

    #[test]
    fn test_pivot_row_skips_mixed_signs() {
        // Row 0 has a negative coefficient with zero rhs, row 1 has a zero coefficient
        let simplex = Simplex::new(vec![1, 1], vec![vec![-1, 1], vec![0, 1], vec![3, 1]], vec![0, 5, 6]).unwrap();
        assert_eq!(simplex.pivot_row(0), Some(2));
        assert_eq!(simplex.pivot_row(7), None);
    }

    #[test]
    fn test_pivot_on_optimal_tableau() {
        let mut simplex = Simplex::new(vec![-1, -2], vec![vec![1, 1]], vec![1]).unwrap();
        assert_eq!(simplex.state(), State::Optimal);
        assert_eq!(simplex.pivot(), Err(SimplexError::NoEnteringVariable));
    }

    #[test]
    fn test_solve_is_idempotent() {
        let mut simplex = Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3]).unwrap();
        simplex.solve().unwrap();
        let tableau = simplex.tableau().clone();

        simplex.solve().unwrap();

        assert_eq!(simplex.tableau(), &tableau);
        assert_eq!(simplex.pivot_count(), 2);
    }

    #[test]
    fn test_pivot_limit() {
        let mut simplex = Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3])
            .unwrap()
            .with_max_pivots(1);

        assert_eq!(simplex.solve(), Err(SimplexError::PivotLimitExceeded { limit: 1 }));
        assert_eq!(simplex.state(), State::PivotLimitExceeded);
        assert_eq!(simplex.current_solution(), ints(&[2, 0]));

        simplex.set_max_pivots(DEFAULT_MAX_PIVOTS);
        assert_eq!(simplex.solution().unwrap(), vec![ratio(5, 3), ratio(2, 3)]);
    }

    #[test]
    fn test_manual_pivots_do_not_spend_solve_budget() {
        let mut simplex = Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3])
            .unwrap()
            .with_max_pivots(1);

        simplex.pivot().unwrap();
        assert_eq!(simplex.state(), State::Improvable);

        assert_eq!(simplex.solution().unwrap(), vec![ratio(5, 3), ratio(2, 3)]);
        assert_eq!(simplex.pivot_count(), 2);
    }

    #[test]
    fn test_solve_with_observes_every_tableau() {
        let mut simplex = Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4, 3]).unwrap();
        let mut seen = Vec::new();

        simplex.solve_with(|s| seen.push(s.pivot_count())).unwrap();

        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_report() {
        let mut simplex = Simplex::new(vec![3, 4], vec![vec![1, 1], vec![2, 1]], vec![4, 5]).unwrap();
        simplex.solve().unwrap();

        let report = simplex.report();

        assert!(report.is_optimal());
        assert_eq!(report.values, ints(&[0, 4]));
        assert_eq!(report.slack, ints(&[0, 1]));
        assert_eq!(report.objective_value, ratio(16, 1));
        assert_eq!(report.pivots, 1);
        assert_eq!(report.basic_variables, vec![1, 3]);
        assert_eq!(report.binding_constraints(), vec![0]);
    }

    #[test]
    fn test_solvers_run_on_separate_threads() {
        let handles: Vec<_> = (1..=4)
            .map(|k| {
                std::thread::spawn(move || {
                    Simplex::new(vec![1, 1], vec![vec![2, 1], vec![1, 2]], vec![4 * k, 3 * k])
                        .unwrap()
                        .solution()
                        .unwrap()
                })
            })
            .collect();

        for (k, handle) in (1..=4).zip(handles) {
            assert_eq!(handle.join().unwrap(), vec![ratio(5 * k, 3), ratio(2 * k, 3)]);
        }
    }

    #[test]
    fn test_last_min_by_key() {
        let items = [(0, 3), (1, 1), (2, 4), (3, 1)];
        assert_eq!(last_min_by_key(items, |(_, v)| *v), Some((3, 1)));
        assert_eq!(last_min_by_key(Vec::<(i32, i32)>::new(), |(_, v)| *v), None);
    }

    /// Problems whose first constraint has strictly positive coefficients, so every one is bounded.
    fn bounded_problem() -> impl Strategy<Value = (Vec<i64>, Vec<Vec<i64>>, Vec<i64>)> {
        (1usize..=4, 1usize..=4)
            .prop_flat_map(|(n, m)| {
                (
                    prop::collection::vec(-4i64..=6, n),
                    prop::collection::vec(1i64..=4, n),
                    prop::collection::vec(prop::collection::vec(-3i64..=4, n), m - 1),
                    // Small bounds make ties in the ratio test, and so degenerate pivots, common
                    prop::collection::vec(0i64..=2, m),
                )
            })
            .prop_map(|(c, first, rest, b)| {
                let mut a = vec![first];
                a.extend(rest);
                (c, a, b)
            })
    }

    proptest! {
        #[test]
        fn pivots_keep_tableau_feasible_and_canonical((c, a, b) in bounded_problem()) {
            let mut simplex = Simplex::new(c, a, b).unwrap();
            prop_assert!(simplex.tableau().is_feasible());
            prop_assert!(simplex.tableau().is_canonical());

            for _ in 0..50 {
                if !simplex.can_improve() {
                    break;
                }
                prop_assert!(simplex.pivot().is_ok());
                prop_assert!(simplex.tableau().is_feasible());
                prop_assert!(simplex.tableau().is_canonical());
                prop_assert_eq!(simplex.basic_variables().len(), simplex.num_constraints());
            }
        }

        #[test]
        fn optimum_is_feasible_and_certified((c, a, b) in bounded_problem()) {
            let mut simplex = Simplex::new(c, a.clone(), b.clone()).unwrap().with_max_pivots(500);

            let outcome = simplex.solve();
            prop_assert!(outcome.is_ok(), "bounded problem did not reach an optimum: {:?}", outcome);
            prop_assert_eq!(simplex.state(), State::Optimal);
            prop_assert!(simplex.tableau().objective_row().iter().all(|v| !v.is_negative()));

            let x = simplex.current_solution();
            prop_assert!(x.iter().all(|v| !v.is_negative()));
            for (row, bound) in a.iter().zip(&b) {
                let lhs: BigRational = row.iter().zip(&x).map(|(&coef, v)| ratio(coef, 1) * v).sum();
                prop_assert!(lhs <= ratio(*bound, 1));
            }
            // The origin is feasible with value zero
            prop_assert!(!simplex.objective_value().is_negative());
        }

        #[test]
        fn solving_is_deterministic((c, a, b) in bounded_problem()) {
            let mut first = Simplex::new(c.clone(), a.clone(), b.clone()).unwrap();
            let mut second = Simplex::new(c, a, b).unwrap();

            for _ in 0..50 {
                if !first.can_improve() {
                    break;
                }
                prop_assert_eq!(first.pivot(), second.pivot());
                prop_assert_eq!(first.basic_variables(), second.basic_variables());
            }
            prop_assert_eq!(first.current_solution(), second.current_solution());
            prop_assert_eq!(first.tableau(), second.tableau());
        }
    }
}
