//! Evolutionary scheme, elitism policy, and the grouped parameter struct.

use serde::{Deserialize, Serialize};

/// How adaptation (local search) interacts with the genome.
///
/// Lamarckian variants write the adapted genome back; Baldwinian variants
/// keep only the adapted fitness. The `Parents`/`Children`/`All` suffix
/// selects which side of the generation boundary is adapted.
///
/// Wire values (snapshots) are the discriminants in declaration order,
/// `Darwin = 0` through `BaldwinAll = 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    /// No adaptation; selection operates on raw genomes.
    Darwin,
    LamarckParents,
    LamarckChildren,
    LamarckAll,
    BaldwinParents,
    BaldwinChildren,
    BaldwinAll,
}

impl Scheme {
    /// Whether the scheme adapts the parent set before breeding.
    pub fn adapts_parents(self) -> bool {
        matches!(
            self,
            Self::LamarckParents | Self::LamarckAll | Self::BaldwinParents | Self::BaldwinAll
        )
    }

    /// Whether the scheme adapts the children after scoring.
    pub fn adapts_children(self) -> bool {
        matches!(
            self,
            Self::LamarckChildren | Self::LamarckAll | Self::BaldwinChildren | Self::BaldwinAll
        )
    }

    /// Whether adaptation writes the genome back (Lamarckian).
    pub fn writes_back_genome(self) -> bool {
        matches!(self, Self::LamarckParents | Self::LamarckChildren | Self::LamarckAll)
    }

    /// Stable wire value.
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Darwin => 0,
            Self::LamarckParents => 1,
            Self::LamarckChildren => 2,
            Self::LamarckAll => 3,
            Self::BaldwinParents => 4,
            Self::BaldwinChildren => 5,
            Self::BaldwinAll => 6,
        }
    }

    /// Parses a stable wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Darwin,
            1 => Self::LamarckParents,
            2 => Self::LamarckChildren,
            3 => Self::LamarckAll,
            4 => Self::BaldwinParents,
            5 => Self::BaldwinChildren,
            6 => Self::BaldwinAll,
            _ => return None,
        })
    }
}

/// Which individuals are guaranteed to carry over a generation boundary.
///
/// Wire values are the discriminants in declaration order,
/// `Unknown = 0` through `PurebredOnly = 5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Elitism {
    /// Not configured; behaves as [`Elitism::None`] and logs a warning.
    Unknown,
    /// Survivors are simply the best `stable_size` of parents and children.
    None,
    /// As `None`, with fitness ties broken in favour of parents.
    ParentsSurvive,
    /// The pre-step rank-0 parent always appears in the survivor set.
    OneParentSurvives,
    /// Parents are re-evaluated before the final ranking.
    RescoreParents,
    /// Crossbred children are discarded before the final ranking.
    PurebredOnly,
}

impl Elitism {
    /// Stable wire value.
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::None => 1,
            Self::ParentsSurvive => 2,
            Self::OneParentSurvives => 3,
            Self::RescoreParents => 4,
            Self::PurebredOnly => 5,
        }
    }

    /// Parses a stable wire value.
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Unknown,
            1 => Self::None,
            2 => Self::ParentsSurvive,
            3 => Self::OneParentSurvives,
            4 => Self::RescoreParents,
            5 => Self::PurebredOnly,
            _ => return None,
        })
    }
}

/// Grouped evolutionary parameters, applied in one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvolutionParams {
    pub scheme: Scheme,
    pub elitism: Elitism,
    /// Probability that a selected pair is crossed over, in `[0, 1]`.
    pub crossover_ratio: f64,
    /// Probability that a selected parent spawns a mutant, in `[0, 1]`.
    pub mutation_ratio: f64,
    /// Fraction of `stable_size` emigrating per archipelago round, in `[0, 1]`.
    pub migration_ratio: f64,
}

impl Default for EvolutionParams {
    fn default() -> Self {
        Self {
            scheme: Scheme::Darwin,
            elitism: Elitism::Unknown,
            crossover_ratio: 1.0,
            mutation_ratio: 1.0,
            migration_ratio: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_wire_roundtrip() {
        for v in 0..=6 {
            let scheme = Scheme::from_i32(v).unwrap();
            assert_eq!(scheme.to_i32(), v);
        }
        assert!(Scheme::from_i32(7).is_none());
        assert!(Scheme::from_i32(-1).is_none());
    }

    #[test]
    fn test_elitism_wire_roundtrip() {
        for v in 0..=5 {
            let elitism = Elitism::from_i32(v).unwrap();
            assert_eq!(elitism.to_i32(), v);
        }
        assert!(Elitism::from_i32(6).is_none());
    }

    #[test]
    fn test_scheme_adaptation_flags() {
        assert!(!Scheme::Darwin.adapts_parents());
        assert!(!Scheme::Darwin.adapts_children());
        assert!(Scheme::LamarckAll.adapts_parents());
        assert!(Scheme::LamarckAll.adapts_children());
        assert!(Scheme::BaldwinChildren.adapts_children());
        assert!(!Scheme::BaldwinChildren.adapts_parents());
        assert!(Scheme::LamarckChildren.writes_back_genome());
        assert!(!Scheme::BaldwinAll.writes_back_genome());
    }

    #[test]
    fn test_params_default_matches_new_population() {
        let params = EvolutionParams::default();
        assert_eq!(params.scheme, Scheme::Darwin);
        assert_eq!(params.elitism, Elitism::Unknown);
        assert_eq!(params.crossover_ratio, 1.0);
        assert_eq!(params.mutation_ratio, 1.0);
        assert_eq!(params.migration_ratio, 1.0);
    }
}
