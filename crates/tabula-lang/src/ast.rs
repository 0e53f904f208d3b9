use num_rational::BigRational;
use num_traits::Zero;

use crate::lexer::Span;

/// A coefficient attached to a single-letter variable, e.g. `-1.2A`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub span: Span,
    pub coefficient: BigRational,
    pub variable: String,
}

impl Term {
    pub fn negate(self) -> Self {
        Self {
            coefficient: -self.coefficient,
            ..self
        }
    }
}

/// A linear sum of terms, with repeated variables folded together.
///
/// Variables keep the order in which they first appeared.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    pub terms: Vec<(String, BigRational)>,
}

impl Expression {
    pub fn add_term(&mut self, term: Term) {
        match self.terms.iter_mut().find(|(name, _)| *name == term.variable) {
            Some((_, coefficient)) => *coefficient += term.coefficient,
            None => self.terms.push((term.variable, term.coefficient)),
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(name, _)| name.as_str())
    }

    /// Coefficient of `variable`, zero when it does not appear.
    pub fn coefficient(&self, variable: &str) -> BigRational {
        self.terms
            .iter()
            .find(|(name, _)| name == variable)
            .map(|(_, coefficient)| coefficient.clone())
            .unwrap_or_else(BigRational::zero)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// `lhs <= rhs`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Inequality {
    pub span: Span,
    pub lhs: Expression,
    pub rhs: BigRational,
}
