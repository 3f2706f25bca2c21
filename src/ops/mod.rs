//! The operator contract a population is parametrised over.
//!
//! Each slot is a callback the drivers invoke at a well-defined point in the
//! evolutionary loop. Slots are stored as [`BoundOp`] values: the callback
//! itself plus a stable integer tag identifying built-in operators for
//! snapshot purposes (`-1` marks an external, user-supplied operator).
//!
//! Selection is deliberately not a bare callback: a selector is a factory
//! whose [`SelectOne::begin`]/[`SelectTwo::begin`] produce an explicit,
//! single-phase iterator state, so a generation's selection pass has no
//! hidden state and stays deterministic under a seeded RNG.

pub mod builtin;
pub mod catalog;
pub mod selectors;

pub use catalog::{OperatorCatalog, OP_EXTERNAL, OP_NULL};

use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use crate::genome::Chromosome;
use crate::population::{Entity, EntityId, Population};

/// Scores an entity, storing the result via [`Entity::set_fitness`].
/// Returning `false` marks the entity unviable; the engine forces its
/// fitness to the unscored sentinel so it is culled at the next sort.
pub type EvaluateDyn<C> = dyn Fn(&Population<C>, &mut Entity<C>) -> bool + Send + Sync;

/// Fills a fresh entity's chromosomes with initial content.
pub type SeedDyn<C> = dyn Fn(&Population<C>, &mut Entity<C>, &mut dyn RngCore) -> bool + Send + Sync;

/// Performs a local-search step on a clone of an entity, in place. The engine
/// scores the clone afterwards and writes genome and/or fitness back to the
/// original according to the population's evolutionary scheme.
pub type AdaptDyn<C> = dyn Fn(&Population<C>, &mut Entity<C>, &mut dyn RngCore) + Send + Sync;

/// Produces a mutated copy of `src` in `dest`. `dest` holds freshly
/// allocated chromosomes whose contents must be fully overwritten.
pub type MutateDyn<C> =
    dyn Fn(&Population<C>, &Entity<C>, &mut Entity<C>, &mut dyn RngCore) + Send + Sync;

/// Produces two children from two parents. Like mutation, the children's
/// chromosomes must be fully overwritten.
pub type CrossoverDyn<C> = dyn Fn(&Population<C>, &Entity<C>, &Entity<C>, &mut Entity<C>, &mut Entity<C>, &mut dyn RngCore)
    + Send
    + Sync;

/// Inserts a scored candidate into the population under a user policy,
/// possibly displacing an existing member. Used by the steady-state driver.
pub type ReplaceDyn<C> = dyn Fn(&mut Population<C>, Entity<C>) + Send + Sync;

/// Called once per generation with the generation number; returning `false`
/// stops the driver cleanly.
pub type GenerationHookDyn<C> = dyn Fn(usize, &mut Population<C>) -> bool + Send + Sync;

/// Called once per steady-state iteration with the iteration's first child;
/// returning `false` stops the driver cleanly.
pub type IterationHookDyn<C> = dyn Fn(usize, &Entity<C>) -> bool + Send + Sync;

/// A single-parent selector: a factory for one selection pass.
pub trait SelectOne<C: Chromosome>: Send + Sync {
    /// Starts a selection pass over the first `orig_size` ranks.
    fn begin(&self, pop: &Population<C>, rng: &mut dyn RngCore) -> Box<dyn SelectOneState<C>>;
}

/// Iterator state of one single-parent selection pass.
pub trait SelectOneState<C: Chromosome> {
    /// Yields the next parent, or `None` when the pass is exhausted.
    fn next(&mut self, pop: &Population<C>, rng: &mut dyn RngCore) -> Option<EntityId>;
}

/// A parent-pair selector: a factory for one selection pass.
pub trait SelectTwo<C: Chromosome>: Send + Sync {
    /// Starts a selection pass over the first `orig_size` ranks.
    fn begin(&self, pop: &Population<C>, rng: &mut dyn RngCore) -> Box<dyn SelectTwoState<C>>;
}

/// Iterator state of one parent-pair selection pass.
pub trait SelectTwoState<C: Chromosome> {
    /// Yields the next parent pair, or `None` when the pass is exhausted.
    fn next(&mut self, pop: &Population<C>, rng: &mut dyn RngCore)
        -> Option<(EntityId, EntityId)>;
}

/// A callback bound into an operator slot, tagged with its catalog id.
///
/// `id > 0` names a registered built-in, [`OP_EXTERNAL`] a user-supplied
/// operator that snapshots cannot restore.
pub struct BoundOp<F: ?Sized> {
    /// Stable catalog id, or [`OP_EXTERNAL`].
    pub id: i32,
    /// The callback itself.
    pub f: Arc<F>,
}

impl<F: ?Sized> BoundOp<F> {
    /// Wraps a user-supplied operator.
    pub fn external(f: Arc<F>) -> Self {
        Self { id: OP_EXTERNAL, f }
    }

    /// Wraps a built-in operator under its stable id.
    pub fn builtin(id: i32, f: Arc<F>) -> Self {
        debug_assert!(id > 0, "built-in operator ids are positive");
        Self { id, f }
    }
}

impl<F: ?Sized> Clone for BoundOp<F> {
    fn clone(&self) -> Self {
        Self { id: self.id, f: Arc::clone(&self.f) }
    }
}

impl<F: ?Sized> fmt::Debug for BoundOp<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundOp").field("id", &self.id).finish()
    }
}

/// The full operator binding of a population.
///
/// Structural chromosome operations (construct, release, replicate, byte
/// codec, printable form) are provided by the [`Chromosome`] impl and are
/// not stored here.
#[derive(Clone, Debug)]
pub struct Operators<C: Chromosome> {
    pub evaluate: Option<BoundOp<EvaluateDyn<C>>>,
    pub seed: Option<BoundOp<SeedDyn<C>>>,
    pub adapt: Option<BoundOp<AdaptDyn<C>>>,
    pub select_one: Option<BoundOp<dyn SelectOne<C>>>,
    pub select_two: Option<BoundOp<dyn SelectTwo<C>>>,
    pub mutate: Option<BoundOp<MutateDyn<C>>>,
    pub crossover: Option<BoundOp<CrossoverDyn<C>>>,
    pub replace: Option<BoundOp<ReplaceDyn<C>>>,
    pub generation_hook: Option<BoundOp<GenerationHookDyn<C>>>,
    pub iteration_hook: Option<BoundOp<IterationHookDyn<C>>>,
}

impl<C: Chromosome> Default for Operators<C> {
    fn default() -> Self {
        Self {
            evaluate: None,
            seed: None,
            adapt: None,
            select_one: None,
            select_two: None,
            mutate: None,
            crossover: None,
            replace: None,
            generation_hook: None,
            iteration_hook: None,
        }
    }
}

impl<C: Chromosome> Operators<C> {
    /// Snapshot ids of all eighteen callback slots, in the fixed snapshot
    /// slot order. The two phenome-management slots are always null here
    /// (phenome sharing is reference-counted); the six structural slots are
    /// derived from the chromosome type's id family.
    pub fn slot_ids(&self) -> [i32; 18] {
        fn tag<F: ?Sized>(slot: &Option<BoundOp<F>>) -> i32 {
            slot.as_ref().map_or(OP_NULL, |op| op.id)
        }
        let base = C::SLOT_ID_BASE;
        let structural = |offset: i32| if base > 0 { base + offset } else { OP_EXTERNAL };
        [
            tag(&self.generation_hook),
            tag(&self.iteration_hook),
            OP_NULL,
            OP_NULL,
            structural(0),
            structural(1),
            structural(2),
            structural(3),
            structural(4),
            structural(5),
            tag(&self.evaluate),
            tag(&self.seed),
            tag(&self.adapt),
            tag(&self.select_one),
            tag(&self.select_two),
            tag(&self.mutate),
            tag(&self.crossover),
            tag(&self.replace),
        ]
    }
}
