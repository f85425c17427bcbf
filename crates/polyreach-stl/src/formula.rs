//! The STL formula tree

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::atomic::{AtomicUsize, Ordering};

use polyreach_algebra::Polynomial;

use crate::error::StlError;

/// Source of atom identifiers
///
/// Every atom gets a process-unique id; the synthesis engine keys cached
/// control points on it, so a rewritten (negated) atom never aliases the
/// original.
static NEXT_ATOM_ID: AtomicUsize = AtomicUsize::new(0);

/// A time-bounded interval `[begin, end]` of discrete steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    begin: u32,
    end: u32,
}

impl TimeInterval {
    /// Create an interval; fails when `begin > end`
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_stl::TimeInterval;
    ///
    /// assert!(TimeInterval::new(1, 3).is_ok());
    /// assert!(TimeInterval::new(3, 1).is_err());
    /// ```
    pub fn new(begin: u32, end: u32) -> Result<Self, StlError> {
        if begin > end {
            return Err(StlError::InvalidInterval { begin, end });
        }
        Ok(TimeInterval { begin, end })
    }

    /// First step of the interval
    pub fn begin(&self) -> u32 {
        self.begin
    }

    /// Last step of the interval
    pub fn end(&self) -> u32 {
        self.end
    }

    /// The smallest interval containing both operands
    pub fn envelope(&self, other: &TimeInterval) -> TimeInterval {
        TimeInterval {
            begin: self.begin.min(other.begin),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.begin, self.end)
    }
}

/// An atomic predicate `e(x) ≤ 0`
#[derive(Debug, Clone)]
pub struct Atom {
    id: usize,
    predicate: Polynomial,
}

impl Atom {
    /// Create an atom for the predicate `e ≤ 0`
    pub fn new(predicate: Polynomial) -> Self {
        Atom {
            id: NEXT_ATOM_ID.fetch_add(1, Ordering::Relaxed),
            predicate,
        }
    }

    /// The process-unique identifier of the atom
    pub fn id(&self) -> usize {
        self.id
    }

    /// The polynomial `e` of the predicate `e ≤ 0`
    pub fn predicate(&self) -> &Polynomial {
        &self.predicate
    }

    /// The atom denoting the complement `-e ≤ 0`
    ///
    /// This over-approximates the true complement (`e > 0`), which is the
    /// standard treatment when no strict inequalities exist.
    pub fn complement(&self) -> Atom {
        Atom::new(-self.predicate.clone())
    }
}

impl PartialEq for Atom {
    /// Atoms compare by predicate; the id is an implementation detail
    fn eq(&self, other: &Self) -> bool {
        self.predicate == other.predicate
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <= 0", self.predicate)
    }
}

/// A Signal Temporal Logic formula
///
/// # Example
///
/// ```
/// use polyreach_algebra::Polynomial;
/// use polyreach_stl::{StlFormula, TimeInterval};
///
/// // G[0,5](i - 0.5 <= 0)
/// let safe = StlFormula::atom(Polynomial::variable("i") - 0.5);
/// let formula = StlFormula::always(TimeInterval::new(0, 5).unwrap(), safe);
/// assert_eq!(formula.time_bounds().end(), 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StlFormula {
    /// Atomic predicate `e ≤ 0`
    Atom(Atom),
    /// Conjunction of two formulas
    Conjunction(Box<StlFormula>, Box<StlFormula>),
    /// Disjunction of two formulas
    Disjunction(Box<StlFormula>, Box<StlFormula>),
    /// Negation of a formula
    Negation(Box<StlFormula>),
    /// `φ` holds at every step of the interval
    Always(TimeInterval, Box<StlFormula>),
    /// `φ` holds at some step of the interval
    Eventually(TimeInterval, Box<StlFormula>),
    /// `φ₁` holds until `φ₂` holds within the interval
    Until(TimeInterval, Box<StlFormula>, Box<StlFormula>),
}

impl StlFormula {
    /// An atomic formula `predicate ≤ 0`
    pub fn atom(predicate: Polynomial) -> StlFormula {
        StlFormula::Atom(Atom::new(predicate))
    }

    /// `G[interval] φ`
    pub fn always(interval: TimeInterval, formula: StlFormula) -> StlFormula {
        StlFormula::Always(interval, Box::new(formula))
    }

    /// `F[interval] φ`
    pub fn eventually(interval: TimeInterval, formula: StlFormula) -> StlFormula {
        StlFormula::Eventually(interval, Box::new(formula))
    }

    /// `φ₁ U[interval] φ₂`
    pub fn until(interval: TimeInterval, left: StlFormula, right: StlFormula) -> StlFormula {
        StlFormula::Until(interval, Box::new(left), Box::new(right))
    }

    /// The envelope `[min begin, max end]` over every temporal operator of
    /// the tree
    ///
    /// A formula without temporal operators has bounds `[0, 0]`.
    pub fn time_bounds(&self) -> TimeInterval {
        match self {
            StlFormula::Atom(_) => TimeInterval { begin: 0, end: 0 },
            StlFormula::Negation(inner) => inner.time_bounds(),
            StlFormula::Conjunction(lhs, rhs) | StlFormula::Disjunction(lhs, rhs) => {
                lhs.time_bounds().envelope(&rhs.time_bounds())
            }
            StlFormula::Always(interval, inner) | StlFormula::Eventually(interval, inner) => {
                interval.envelope(&inner.time_bounds())
            }
            StlFormula::Until(interval, lhs, rhs) => interval
                .envelope(&lhs.time_bounds())
                .envelope(&rhs.time_bounds()),
        }
    }

    /// Whether the tree contains a temporal operator
    pub fn is_temporal(&self) -> bool {
        match self {
            StlFormula::Atom(_) => false,
            StlFormula::Negation(inner) => inner.is_temporal(),
            StlFormula::Conjunction(lhs, rhs) | StlFormula::Disjunction(lhs, rhs) => {
                lhs.is_temporal() || rhs.is_temporal()
            }
            StlFormula::Always(..) | StlFormula::Eventually(..) | StlFormula::Until(..) => true,
        }
    }

    /// Rewrite the formula to positive normal form
    ///
    /// Negations are pushed down to the atoms: De Morgan over the boolean
    /// combinators, duality between *always* and *eventually*, inequality
    /// flip at the atoms. The result is semantically equivalent and
    /// contains no [`StlFormula::Negation`] node.
    ///
    /// # Example
    ///
    /// ```
    /// use polyreach_algebra::Polynomial;
    /// use polyreach_stl::{StlFormula, TimeInterval};
    ///
    /// let x = Polynomial::variable("x");
    /// let phi = !StlFormula::always(
    ///     TimeInterval::new(0, 3).unwrap(),
    ///     StlFormula::atom(x),
    /// );
    /// let pnf = phi.to_pnf().unwrap();
    /// assert!(matches!(pnf, StlFormula::Eventually(..)));
    /// ```
    pub fn to_pnf(&self) -> Result<StlFormula, StlError> {
        match self {
            StlFormula::Atom(atom) => Ok(StlFormula::Atom(atom.clone())),
            StlFormula::Conjunction(lhs, rhs) => Ok(StlFormula::Conjunction(
                Box::new(lhs.to_pnf()?),
                Box::new(rhs.to_pnf()?),
            )),
            StlFormula::Disjunction(lhs, rhs) => Ok(StlFormula::Disjunction(
                Box::new(lhs.to_pnf()?),
                Box::new(rhs.to_pnf()?),
            )),
            StlFormula::Always(interval, inner) => Ok(StlFormula::Always(
                *interval,
                Box::new(inner.to_pnf()?),
            )),
            StlFormula::Eventually(interval, inner) => Ok(StlFormula::Eventually(
                *interval,
                Box::new(inner.to_pnf()?),
            )),
            StlFormula::Until(interval, lhs, rhs) => Ok(StlFormula::Until(
                *interval,
                Box::new(lhs.to_pnf()?),
                Box::new(rhs.to_pnf()?),
            )),
            StlFormula::Negation(inner) => inner.negated_pnf(),
        }
    }

    /// PNF of the negation of this formula
    fn negated_pnf(&self) -> Result<StlFormula, StlError> {
        match self {
            StlFormula::Atom(atom) => Ok(StlFormula::Atom(atom.complement())),
            StlFormula::Negation(inner) => inner.to_pnf(),
            StlFormula::Conjunction(lhs, rhs) => Ok(StlFormula::Disjunction(
                Box::new(lhs.negated_pnf()?),
                Box::new(rhs.negated_pnf()?),
            )),
            StlFormula::Disjunction(lhs, rhs) => Ok(StlFormula::Conjunction(
                Box::new(lhs.negated_pnf()?),
                Box::new(rhs.negated_pnf()?),
            )),
            StlFormula::Always(interval, inner) => Ok(StlFormula::Eventually(
                *interval,
                Box::new(inner.negated_pnf()?),
            )),
            StlFormula::Eventually(interval, inner) => Ok(StlFormula::Always(
                *interval,
                Box::new(inner.negated_pnf()?),
            )),
            StlFormula::Until(..) => Err(StlError::UnsupportedNegation),
        }
    }
}

impl Not for StlFormula {
    type Output = StlFormula;

    fn not(self) -> StlFormula {
        StlFormula::Negation(Box::new(self))
    }
}

impl BitAnd for StlFormula {
    type Output = StlFormula;

    fn bitand(self, rhs: StlFormula) -> StlFormula {
        StlFormula::Conjunction(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for StlFormula {
    type Output = StlFormula;

    fn bitor(self, rhs: StlFormula) -> StlFormula {
        StlFormula::Disjunction(Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for StlFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StlFormula::Atom(atom) => write!(f, "{atom}"),
            StlFormula::Conjunction(lhs, rhs) => write!(f, "({lhs}) && ({rhs})"),
            StlFormula::Disjunction(lhs, rhs) => write!(f, "({lhs}) || ({rhs})"),
            StlFormula::Negation(inner) => write!(f, "!({inner})"),
            StlFormula::Always(interval, inner) => write!(f, "G{interval}({inner})"),
            StlFormula::Eventually(interval, inner) => write!(f, "F{interval}({inner})"),
            StlFormula::Until(interval, lhs, rhs) => {
                write!(f, "({lhs}) U{interval} ({rhs})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str) -> StlFormula {
        StlFormula::atom(Polynomial::variable(name))
    }

    fn interval(a: u32, b: u32) -> TimeInterval {
        TimeInterval::new(a, b).unwrap()
    }

    #[test]
    fn test_interval_validation() {
        assert_eq!(
            TimeInterval::new(2, 1),
            Err(StlError::InvalidInterval { begin: 2, end: 1 })
        );
    }

    #[test]
    fn test_atom_ids_are_unique() {
        let a = Atom::new(Polynomial::variable("x"));
        let b = Atom::new(Polynomial::variable("x"));
        assert_ne!(a.id(), b.id());
        // but the atoms compare equal by predicate
        assert_eq!(a, b);
    }

    #[test]
    fn test_time_bounds_envelope() {
        let phi = StlFormula::always(interval(2, 5), atom("x"))
            & StlFormula::eventually(interval(1, 7), atom("y"));
        assert_eq!(phi.time_bounds(), interval(1, 7));
    }

    #[test]
    fn test_time_bounds_atom() {
        assert_eq!(atom("x").time_bounds(), interval(0, 0));
    }

    #[test]
    fn test_pnf_pushes_negation_to_atom() {
        let x = Polynomial::variable("x");
        let phi = !StlFormula::atom(x.clone());
        let pnf = phi.to_pnf().unwrap();
        match pnf {
            StlFormula::Atom(atom) => assert_eq!(atom.predicate(), &-x),
            other => panic!("expected an atom, got {other}"),
        }
    }

    #[test]
    fn test_pnf_de_morgan() {
        let phi = !(atom("x") & atom("y"));
        let pnf = phi.to_pnf().unwrap();
        assert!(matches!(pnf, StlFormula::Disjunction(..)));
    }

    #[test]
    fn test_pnf_temporal_duality() {
        let phi = !StlFormula::eventually(interval(0, 4), atom("x"));
        let pnf = phi.to_pnf().unwrap();
        match &pnf {
            StlFormula::Always(i, inner) => {
                assert_eq!(*i, interval(0, 4));
                assert!(matches!(**inner, StlFormula::Atom(_)));
            }
            other => panic!("expected always, got {other}"),
        }
    }

    #[test]
    fn test_pnf_double_negation() {
        let phi = !!atom("x");
        assert_eq!(phi.to_pnf().unwrap(), atom("x"));
    }

    #[test]
    fn test_pnf_idempotent() {
        let phi = !(StlFormula::always(interval(0, 2), atom("x")) | atom("y"));
        let pnf = phi.to_pnf().unwrap();
        assert_eq!(pnf.to_pnf().unwrap(), pnf);
    }

    #[test]
    fn test_negated_until_is_rejected() {
        let phi = !StlFormula::until(interval(0, 3), atom("x"), atom("y"));
        assert_eq!(phi.to_pnf(), Err(StlError::UnsupportedNegation));
    }

    #[test]
    fn test_display() {
        let phi = StlFormula::always(interval(0, 3), atom("x"));
        assert_eq!(phi.to_string(), "G[0, 3](x <= 0)");
    }
}
