use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::problem::Problem;

/// Dense simplex tableau in canonical form.
///
/// Columns `0..n` are the decision variables and columns `n..n + m` are the slack variables,
/// slack `n + i` belonging to constraint `i`. The objective row holds the negated objective, so
/// the tableau is optimal once no entry of it is negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    num_variables: usize,
    objective_row: Vec<BigRational>,
    constraint_rows: Vec<Vec<BigRational>>,
    rhs: Vec<BigRational>,
    /// Basic variables in ascending order
    basic_variables: Vec<usize>,
    /// Basic variable owning each constraint row
    basis_by_row: Vec<usize>,
    /// Value of every variable at the current basis
    solution: Vec<BigRational>,
}

impl Tableau {
    /// Augment a validated problem with one slack column per constraint.
    ///
    /// The slack variables form the starting basis, which places the initial vertex at the origin.
    pub fn new(problem: &Problem) -> Self {
        let n = problem.num_variables();
        let m = problem.num_constraints();

        let objective_row = problem
            .objective()
            .iter()
            .map(|c| -c)
            .chain(std::iter::repeat(BigRational::zero()).take(m))
            .collect();

        let constraint_rows = problem
            .constraints()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .cloned()
                    .chain((0..m).map(|k| if k == i { BigRational::one() } else { BigRational::zero() }))
                    .collect()
            })
            .collect();

        let basis: Vec<usize> = (n..n + m).collect();

        let mut tableau = Self {
            num_variables: n,
            objective_row,
            constraint_rows,
            rhs: problem.rhs().to_vec(),
            basic_variables: basis.clone(),
            basis_by_row: basis,
            solution: Vec::new(),
        };
        tableau.update_solution();
        tableau
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_constraints(&self) -> usize {
        self.rhs.len()
    }

    pub fn num_total_variables(&self) -> usize {
        self.objective_row.len()
    }

    pub fn objective_row(&self) -> &[BigRational] {
        &self.objective_row
    }

    pub fn constraint_rows(&self) -> &[Vec<BigRational>] {
        &self.constraint_rows
    }

    pub fn rhs(&self) -> &[BigRational] {
        &self.rhs
    }

    pub fn basic_variables(&self) -> &[usize] {
        &self.basic_variables
    }

    /// Values of all variables, decision and slack.
    pub fn solution(&self) -> &[BigRational] {
        &self.solution
    }

    pub fn is_basic(&self, variable: usize) -> bool {
        self.basic_variables.binary_search(&variable).is_ok()
    }

    /// Basic variable whose defining equation is `row`.
    pub fn basic_variable_in_row(&self, row: usize) -> Option<usize> {
        self.basis_by_row.get(row).copied()
    }

    /// Every right-hand side is non-negative.
    pub fn is_feasible(&self) -> bool {
        self.rhs.iter().all(|b| !b.is_negative())
    }

    /// Every basic variable's column is a unit vector over the constraint rows and is zero in the
    /// objective row.
    pub fn is_canonical(&self) -> bool {
        if self.basic_variables.len() != self.num_constraints()
            || !self.basic_variables.windows(2).all(|w| w[0] < w[1])
        {
            return false;
        }
        self.basis_by_row.iter().enumerate().all(|(row, &variable)| {
            self.objective_row[variable].is_zero()
                && self.constraint_rows.iter().enumerate().all(|(i, r)| {
                    if i == row {
                        r[variable].is_one()
                    } else {
                        r[variable].is_zero()
                    }
                })
        })
    }

    /// Swap the basic variable of `row` for `column` by row reduction.
    ///
    /// The element at `(row, column)` must be non-zero. Returns the variable that left the basis.
    pub(crate) fn pivot(&mut self, row: usize, column: usize) -> usize {
        let leaving = self.basis_by_row[row];

        if let Ok(pos) = self.basic_variables.binary_search(&leaving) {
            self.basic_variables.remove(pos);
        }
        if let Err(pos) = self.basic_variables.binary_search(&column) {
            self.basic_variables.insert(pos, column);
        }
        self.basis_by_row[row] = column;

        // Normalize the pivot row so the pivot element becomes 1
        let mut pivot_row = std::mem::take(&mut self.constraint_rows[row]);
        let inverse = pivot_row[column].recip();
        for value in pivot_row.iter_mut() {
            *value *= &inverse;
        }
        self.rhs[row] *= &inverse;
        let pivot_rhs = self.rhs[row].clone();

        let factor = self.objective_row[column].clone();
        if !factor.is_zero() {
            for (value, pivot_value) in self.objective_row.iter_mut().zip(&pivot_row) {
                *value -= &factor * pivot_value;
            }
        }

        for (i, current) in self.constraint_rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = current[column].clone();
            if factor.is_zero() {
                continue;
            }
            for (value, pivot_value) in current.iter_mut().zip(&pivot_row) {
                *value -= &factor * pivot_value;
            }
            self.rhs[i] -= &factor * &pivot_rhs;
        }

        self.constraint_rows[row] = pivot_row;
        self.update_solution();
        leaving
    }

    fn update_solution(&mut self) {
        self.solution = vec![BigRational::zero(); self.num_total_variables()];
        for (row, &variable) in self.basis_by_row.iter().enumerate() {
            self.solution[variable] = self.rhs[row].clone();
        }
    }
}
