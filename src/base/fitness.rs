use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A fitness scalar assigned to an entity by the evaluate operator.
///
/// Fitness values are unconstrained reals; higher is better. The sentinel
/// [`Fitness::MIN`] marks an entity that has never been scored, so unscored
/// entities sort behind every scored one.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fitness(f64);

impl Fitness {
    /// Sentinel for "never evaluated". Sorts behind all real scores.
    pub const MIN: Fitness = Fitness(f64::NEG_INFINITY);

    /// Creates a fitness value from a raw score.
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Returns the inner f64 value.
    pub fn get(self) -> f64 {
        self.0
    }

    /// Whether this entity still carries the "never evaluated" sentinel.
    pub fn is_unscored(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }

    /// Total ordering over fitness values (ascending).
    ///
    /// Uses `f64::total_cmp`, so NaN scores order deterministically instead
    /// of poisoning a sort.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Default for Fitness {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<f64> for Fitness {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<Fitness> for f64 {
    fn from(fitness: Fitness) -> Self {
        fitness.0
    }
}

impl fmt::Display for Fitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_sentinel_is_unscored() {
        assert!(Fitness::MIN.is_unscored());
        assert!(!Fitness::new(0.0).is_unscored());
        assert!(!Fitness::new(-1e300).is_unscored());
    }

    #[test]
    fn test_default_is_unscored() {
        assert!(Fitness::default().is_unscored());
    }

    #[test]
    fn test_min_sorts_behind_everything() {
        assert!(Fitness::MIN < Fitness::new(f64::MIN));
        assert!(Fitness::MIN.total_cmp(&Fitness::new(-1e308)) == Ordering::Less);
    }

    #[test]
    fn test_total_cmp_orders_scores() {
        let mut scores = vec![Fitness::new(3.0), Fitness::MIN, Fitness::new(-2.0), Fitness::new(7.5)];
        scores.sort_by(|a, b| b.total_cmp(a));
        let raw: Vec<f64> = scores.iter().map(|f| f.get()).collect();
        assert_eq!(raw, vec![7.5, 3.0, -2.0, f64::NEG_INFINITY]);
    }

    #[test]
    fn test_total_cmp_handles_nan() {
        let nan = Fitness::new(f64::NAN);
        // NaN orders above +inf under total_cmp; the point is it is stable.
        assert_eq!(nan.total_cmp(&nan), Ordering::Equal);
        assert_eq!(nan.total_cmp(&Fitness::new(1.0)), Ordering::Greater);
    }

    #[test]
    fn test_conversions_roundtrip() {
        let f: Fitness = 0.25.into();
        let v: f64 = f.into();
        assert_eq!(v, 0.25);
    }

    #[test]
    fn test_display_parsable() {
        let parsed: f64 = Fitness::new(1.5).to_string().parse().unwrap();
        assert_eq!(parsed, 1.5);
    }
}
