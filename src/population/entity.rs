use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::base::Fitness;
use crate::genome::Chromosome;

/// Opaque, reference-counted per-chromosome decoded data.
///
/// Cloning an entity retains shared phenome entries; dropping releases them.
pub type Phenome = Arc<dyn Any + Send + Sync>;

/// Stable identifier of a live entity within its population.
///
/// An id is a slot index in `[0, max_size)`; it stays valid until the entity
/// is dereferenced, after which the slot may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) usize);

impl EntityId {
    /// Raw slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate solution: a fitness scalar, an opaque genome, and optional
/// cached phenome data.
#[derive(Clone)]
pub struct Entity<C> {
    fitness: Fitness,
    chromosomes: Vec<C>,
    phenome: Vec<Option<Phenome>>,
}

impl<C: Chromosome> Entity<C> {
    /// Allocates an entity with `num_chromosomes` fresh chromosomes of
    /// `len_chromosomes` loci each. Fitness starts at the unscored sentinel.
    pub(crate) fn fresh(num_chromosomes: usize, len_chromosomes: usize) -> Self {
        Self {
            fitness: Fitness::MIN,
            chromosomes: (0..num_chromosomes).map(|_| C::alloc(len_chromosomes)).collect(),
            phenome: Vec::new(),
        }
    }

    /// Builds an entity around explicit chromosome values.
    pub fn from_chromosomes(chromosomes: Vec<C>) -> Self {
        Self { fitness: Fitness::MIN, chromosomes, phenome: Vec::new() }
    }

    /// Current fitness (the unscored sentinel until evaluated).
    pub fn fitness(&self) -> Fitness {
        self.fitness
    }

    /// Stores a fitness value.
    pub fn set_fitness(&mut self, fitness: impl Into<Fitness>) {
        self.fitness = fitness.into();
    }

    /// Borrow chromosome `index`. Panics on an invalid index.
    pub fn chromosome(&self, index: usize) -> &C {
        &self.chromosomes[index]
    }

    /// Borrow chromosome `index` mutably. Panics on an invalid index.
    pub fn chromosome_mut(&mut self, index: usize) -> &mut C {
        &mut self.chromosomes[index]
    }

    /// All chromosomes in slot order.
    pub fn chromosomes(&self) -> &[C] {
        &self.chromosomes
    }

    /// All chromosomes, mutably.
    pub fn chromosomes_mut(&mut self) -> &mut [C] {
        &mut self.chromosomes
    }

    /// Cached phenome entry for chromosome `index`, if set.
    pub fn phenome(&self, index: usize) -> Option<&Phenome> {
        self.phenome.get(index).and_then(|slot| slot.as_ref())
    }

    /// Attaches phenome data to chromosome `index`, retaining it.
    ///
    /// The phenome vector is sized to the chromosome count on first use, so
    /// a non-empty phenome always has one slot per chromosome.
    pub fn set_phenome(&mut self, index: usize, data: Phenome) {
        assert!(index < self.chromosomes.len(), "phenome index {index} out of range");
        if self.phenome.is_empty() {
            self.phenome.resize_with(self.chromosomes.len(), || None);
        }
        self.phenome[index] = Some(data);
    }

    /// Releases the phenome entry for chromosome `index`, if any.
    pub fn clear_phenome(&mut self, index: usize) {
        if let Some(slot) = self.phenome.get_mut(index) {
            *slot = None;
        }
    }

    /// Releases all phenome data and resets fitness to the unscored
    /// sentinel, leaving the chromosomes intact.
    pub fn blank(&mut self) {
        self.phenome.clear();
        self.fitness = Fitness::MIN;
    }

    /// Overwrites this entity's genome with a replica of `src`'s, dropping
    /// any cached phenome and resetting fitness. Used by operators that
    /// produce modified copies.
    pub fn copy_genome_from(&mut self, src: &Entity<C>) {
        self.chromosomes.clone_from(&src.chromosomes);
        self.blank();
    }
}

impl<C: Chromosome> fmt::Debug for Entity<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("fitness", &self.fitness)
            .field("chromosomes", &self.chromosomes)
            .field("phenome_set", &self.phenome.iter().filter(|p| p.is_some()).count())
            .finish()
    }
}
