use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Signed;

use crate::simplex::Simplex;

const DECIMAL_PLACES: usize = 3;
const MIN_CELL_WIDTH: usize = 7;

/// Render `value` with exactly `places` decimals, rounding half away from zero.
///
/// The sign follows `value` itself, so a small negative number renders as `-0.000`.
pub fn format_decimal(value: &BigRational, places: usize) -> String {
    let scale = BigRational::from_integer(num_traits::pow(BigInt::from(10), places));
    let scaled = (value * scale).round().to_integer();
    let sign = if value.is_negative() { "-" } else { "" };
    let digits = format!("{:0>width$}", scaled.abs().to_string(), width = places + 1);
    if places == 0 {
        return format!("{}{}", sign, digits);
    }
    let (whole, fraction) = digits.split_at(digits.len() - places);
    format!("{}{}.{}", sign, whole, fraction)
}

impl Simplex {
    /// Render the tableau for inspection.
    ///
    /// The first line is the objective row, followed by a rule and one line per constraint with
    /// its right-hand side after `|`. The cell the next pivot would use is prefixed with `*`.
    pub fn formatted_tableau(&self) -> String {
        let tableau = self.tableau();
        let pivot = self
            .entering_variable()
            .and_then(|column| self.pivot_row(column).map(|row| (row, column)));

        let cells = |values: &[BigRational]| -> Vec<String> {
            values.iter().map(|v| format_decimal(v, DECIMAL_PLACES)).collect()
        };
        let objective = cells(tableau.objective_row());
        let rhs = cells(tableau.rhs());
        let mut rows: Vec<Vec<String>> = tableau.constraint_rows().iter().map(|row| cells(row.as_slice())).collect();
        if let Some((row, column)) = pivot {
            rows[row][column].insert(0, '*');
        }

        let width = objective
            .iter()
            .chain(&rhs)
            .chain(rows.iter().flatten())
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(MIN_CELL_WIDTH);
        let pad = |cell: &String| format!("{:>width$}", cell, width = width);

        let mut lines = vec![objective.iter().map(pad).collect::<Vec<_>>().join("  ")];
        for (row, rhs) in rows.iter().zip(&rhs) {
            let mut line: Vec<String> = row.iter().map(pad).collect();
            line.push("|".to_string());
            line.push(pad(rhs));
            lines.push(line.join("  "));
        }

        let rule = "-".repeat(lines.iter().map(String::len).max().unwrap_or(0));
        lines.insert(1, rule);
        lines.join("\n")
    }
}

impl fmt::Display for Simplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted_tableau())
    }
}
