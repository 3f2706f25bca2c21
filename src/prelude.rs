//! Commonly used types and functions, re-exported for glob import.

pub use crate::base::Fitness;
pub use crate::errors::{CodecError, SnapshotError, TransportError};
pub use crate::evolution::{
    allele_search, evolve_archipelago, evolve_archipelago_parallel, evolve_generational,
    evolve_steady_state, EvolutionReport, StopReason,
};
pub use crate::genome::{
    AlleleAccess, Chromosome, IntegerChromosome, PrintableChromosome,
};
pub use crate::ops::{builtin, selectors, BoundOp, OperatorCatalog, Operators};
pub use crate::population::{
    Elitism, Entity, EntityId, EvolutionParams, Phenome, Population, Scheme,
};
pub use crate::storage::{
    read_entity_file, read_population_file, write_entity_file, write_population_file,
};
