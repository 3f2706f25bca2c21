//! # Archevo
//!
//! Evolutionary optimisation over user-defined solution spaces.
//!
//! A caller supplies a fitness function and type-specific operators
//! (seeding, mutation, crossover, selection, replacement) bound onto a
//! [`Population`], then drives it with one of the evolution loops:
//! generational, steady-state, or an archipelago of semi-isolated demes
//! exchanging individuals through migration.
//!
//! Chromosomes are opaque to the engine: any type implementing
//! [`genome::Chromosome`] can live in a population, and the engine only
//! manipulates genomes through the bound operators. Two ready-made
//! chromosome types (integer and printable-character) ship with built-in
//! operators for them.
//!
//! A single population is **not** thread-safe; concurrency happens at the
//! deme level in the archipelago driver. All randomness flows through an
//! explicitly passed RNG, so a fixed seed reproduces a run exactly.

pub mod base;
pub mod errors;
pub mod evolution;
pub mod genome;
pub mod migration;
pub mod ops;
pub mod population;
pub mod prelude;
pub mod registry;
pub mod storage;

pub use base::Fitness;
pub use population::{Elitism, Entity, EntityId, EvolutionParams, Population, Scheme};
