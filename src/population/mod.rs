//! Population management: the entity pool, its dual id/rank indices, and
//! lifecycle operations.
//!
//! A population is **not** thread-safe; callers must serialise access to any
//! one population. Concurrency in this crate happens at the deme level in
//! the archipelago driver, never inside a population.
//!
//! The two indices are the heart of the data model: an entity's *id* is its
//! slot index and stays stable for the entity's lifetime, while its *rank*
//! is its position in the rank index and only reflects fitness order
//! directly after [`Population::sort_by_fitness`].

pub mod entity;
pub mod params;

pub use entity::{Entity, EntityId, Phenome};
pub use params::{Elitism, EvolutionParams, Scheme};

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use rand::RngCore;

use crate::base::Fitness;
use crate::errors::CodecError;
use crate::genome::Chromosome;
use crate::ops::{
    AdaptDyn, BoundOp, CrossoverDyn, EvaluateDyn, GenerationHookDyn, IterationHookDyn, MutateDyn,
    Operators, ReplaceDyn, SeedDyn, SelectOne, SelectTwo,
};

/// Pool growth factor numerator/denominator (×1.5).
const GROWTH_NUM: usize = 3;
const GROWTH_DEN: usize = 2;

/// A container of entities plus the configuration the drivers evolve it
/// under.
pub struct Population<C: Chromosome> {
    stable_size: usize,
    num_chromosomes: usize,
    len_chromosomes: usize,
    /// Id index: slot per id, `None` when the id is unassigned.
    slots: Vec<Option<Entity<C>>>,
    /// Rank index: one entry per live entity, no gaps.
    rank: Vec<EntityId>,
    /// Backward-scanning cursor into the id index.
    free_index: usize,
    /// Size of the parent window recorded at the start of a driver phase.
    orig_size: usize,
    crossover_ratio: f64,
    mutation_ratio: f64,
    migration_ratio: f64,
    scheme: Scheme,
    elitism: Elitism,
    generation: usize,
    island: i32,
    ops: Operators<C>,
    user_data: Option<Phenome>,
}

impl<C: Chromosome> Population<C> {
    /// Creates an empty population.
    ///
    /// The pool is sized at `4 * stable_size`; rates default to 1.0, the
    /// scheme to Darwin, and elitism to Unknown. No operators are bound.
    pub fn new(stable_size: usize, num_chromosomes: usize, len_chromosomes: usize) -> Self {
        assert!(stable_size > 0, "stable_size must be positive");
        assert!(num_chromosomes > 0, "num_chromosomes must be positive");
        let max_size = stable_size * 4;
        let mut slots = Vec::new();
        slots.resize_with(max_size, || None);
        Self {
            stable_size,
            num_chromosomes,
            len_chromosomes,
            slots,
            rank: Vec::new(),
            free_index: max_size - 1,
            orig_size: 0,
            crossover_ratio: 1.0,
            mutation_ratio: 1.0,
            migration_ratio: 1.0,
            scheme: Scheme::Darwin,
            elitism: Elitism::Unknown,
            generation: 0,
            island: -1,
            ops: Operators::default(),
            user_data: None,
        }
    }

    // Configuration accessors.

    /// Number of live entities.
    pub fn size(&self) -> usize {
        self.rank.len()
    }

    /// Whether the population holds no entities.
    pub fn is_empty(&self) -> bool {
        self.rank.is_empty()
    }

    /// Current pool capacity.
    pub fn max_size(&self) -> usize {
        self.slots.len()
    }

    /// Target number of survivors per generation.
    pub fn stable_size(&self) -> usize {
        self.stable_size
    }

    /// Adjusts the survivor target.
    pub fn set_stable_size(&mut self, stable_size: usize) {
        assert!(stable_size > 0, "stable_size must be positive");
        self.stable_size = stable_size;
    }

    /// Chromosome slots per entity.
    pub fn num_chromosomes(&self) -> usize {
        self.num_chromosomes
    }

    /// Advisory locus count per chromosome.
    pub fn len_chromosomes(&self) -> usize {
        self.len_chromosomes
    }

    /// Generation counter, readable from fitness callbacks.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Increments the generation counter.
    pub(crate) fn advance_generation(&mut self) {
        self.generation += 1;
    }

    /// Deme label within an archipelago; `-1` means stand-alone.
    pub fn island(&self) -> i32 {
        self.island
    }

    pub fn set_island(&mut self, island: i32) {
        self.island = island;
    }

    /// Parent-window size recorded at the start of the current phase.
    pub fn orig_size(&self) -> usize {
        self.orig_size
    }

    pub(crate) fn set_orig_size(&mut self, orig_size: usize) {
        self.orig_size = orig_size;
    }

    pub fn crossover_ratio(&self) -> f64 {
        self.crossover_ratio
    }

    pub fn mutation_ratio(&self) -> f64 {
        self.mutation_ratio
    }

    pub fn migration_ratio(&self) -> f64 {
        self.migration_ratio
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    pub fn elitism(&self) -> Elitism {
        self.elitism
    }

    pub fn set_elitism(&mut self, elitism: Elitism) {
        self.elitism = elitism;
    }

    fn assert_ratio(name: &str, value: f64) {
        assert!((0.0..=1.0).contains(&value), "{name} {value} outside [0, 1]");
    }

    pub fn set_crossover_ratio(&mut self, ratio: f64) {
        Self::assert_ratio("crossover_ratio", ratio);
        self.crossover_ratio = ratio;
    }

    pub fn set_mutation_ratio(&mut self, ratio: f64) {
        Self::assert_ratio("mutation_ratio", ratio);
        self.mutation_ratio = ratio;
    }

    pub fn set_migration_ratio(&mut self, ratio: f64) {
        Self::assert_ratio("migration_ratio", ratio);
        self.migration_ratio = ratio;
    }

    /// Applies a grouped parameter set in one call.
    pub fn set_parameters(&mut self, params: EvolutionParams) {
        self.set_scheme(params.scheme);
        self.set_elitism(params.elitism);
        self.set_crossover_ratio(params.crossover_ratio);
        self.set_mutation_ratio(params.mutation_ratio);
        self.set_migration_ratio(params.migration_ratio);
    }

    /// Current grouped parameter set.
    pub fn parameters(&self) -> EvolutionParams {
        EvolutionParams {
            scheme: self.scheme,
            elitism: self.elitism,
            crossover_ratio: self.crossover_ratio,
            mutation_ratio: self.mutation_ratio,
            migration_ratio: self.migration_ratio,
        }
    }

    /// Opaque data handed to callbacks through the population reference.
    pub fn user_data(&self) -> Option<&Phenome> {
        self.user_data.as_ref()
    }

    /// Typed view of the user data.
    pub fn user_data_as<T: 'static>(&self) -> Option<&T> {
        self.user_data.as_ref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn set_user_data(&mut self, data: Phenome) {
        self.user_data = Some(data);
    }

    /// The operator bindings.
    pub fn ops(&self) -> &Operators<C> {
        &self.ops
    }

    /// Mutable access to the operator bindings, e.g. for catalog-sourced
    /// operators.
    pub fn ops_mut(&mut self) -> &mut Operators<C> {
        &mut self.ops
    }

    // Operator binding conveniences for user-supplied closures.

    pub fn set_evaluate<F>(&mut self, f: F)
    where
        F: Fn(&Population<C>, &mut Entity<C>) -> bool + Send + Sync + 'static,
    {
        let f: Arc<EvaluateDyn<C>> = Arc::new(f);
        self.ops.evaluate = Some(BoundOp::external(f));
    }

    pub fn set_seed<F>(&mut self, f: F)
    where
        F: Fn(&Population<C>, &mut Entity<C>, &mut dyn RngCore) -> bool + Send + Sync + 'static,
    {
        let f: Arc<SeedDyn<C>> = Arc::new(f);
        self.ops.seed = Some(BoundOp::external(f));
    }

    pub fn set_adapt<F>(&mut self, f: F)
    where
        F: Fn(&Population<C>, &mut Entity<C>, &mut dyn RngCore) + Send + Sync + 'static,
    {
        let f: Arc<AdaptDyn<C>> = Arc::new(f);
        self.ops.adapt = Some(BoundOp::external(f));
    }

    pub fn set_mutate<F>(&mut self, f: F)
    where
        F: Fn(&Population<C>, &Entity<C>, &mut Entity<C>, &mut dyn RngCore) + Send + Sync + 'static,
    {
        let f: Arc<MutateDyn<C>> = Arc::new(f);
        self.ops.mutate = Some(BoundOp::external(f));
    }

    pub fn set_crossover<F>(&mut self, f: F)
    where
        F: Fn(&Population<C>, &Entity<C>, &Entity<C>, &mut Entity<C>, &mut Entity<C>, &mut dyn RngCore)
            + Send
            + Sync
            + 'static,
    {
        let f: Arc<CrossoverDyn<C>> = Arc::new(f);
        self.ops.crossover = Some(BoundOp::external(f));
    }

    pub fn set_replace<F>(&mut self, f: F)
    where
        F: Fn(&mut Population<C>, Entity<C>) + Send + Sync + 'static,
    {
        let f: Arc<ReplaceDyn<C>> = Arc::new(f);
        self.ops.replace = Some(BoundOp::external(f));
    }

    pub fn set_select_one(&mut self, selector: impl SelectOne<C> + 'static) {
        let s: Arc<dyn SelectOne<C>> = Arc::new(selector);
        self.ops.select_one = Some(BoundOp::external(s));
    }

    pub fn set_select_two(&mut self, selector: impl SelectTwo<C> + 'static) {
        let s: Arc<dyn SelectTwo<C>> = Arc::new(selector);
        self.ops.select_two = Some(BoundOp::external(s));
    }

    pub fn set_generation_hook<F>(&mut self, f: F)
    where
        F: Fn(usize, &mut Population<C>) -> bool + Send + Sync + 'static,
    {
        let f: Arc<GenerationHookDyn<C>> = Arc::new(f);
        self.ops.generation_hook = Some(BoundOp::external(f));
    }

    pub fn set_iteration_hook<F>(&mut self, f: F)
    where
        F: Fn(usize, &Entity<C>) -> bool + Send + Sync + 'static,
    {
        let f: Arc<IterationHookDyn<C>> = Arc::new(f);
        self.ops.iteration_hook = Some(BoundOp::external(f));
    }

    // Entity pool operations.

    fn grow(&mut self) {
        let new_max = self.slots.len() * GROWTH_NUM / GROWTH_DEN;
        debug!("growing entity pool from {} to {new_max}", self.slots.len());
        self.slots.resize_with(new_max, || None);
        self.free_index = new_max - 1;
    }

    fn claim_slot(&mut self) -> EntityId {
        if self.max_size() == self.size() + 1 {
            self.grow();
        }
        while self.slots[self.free_index].is_some() {
            if self.free_index == 0 {
                self.free_index = self.slots.len();
            }
            self.free_index -= 1;
        }
        EntityId(self.free_index)
    }

    /// Draws a fresh entity from the pool: chromosomes are allocated, the
    /// fitness carries the unscored sentinel, and the entity is appended to
    /// the rank index. Amortised O(1).
    pub fn get_free_entity(&mut self) -> EntityId {
        let id = self.claim_slot();
        self.slots[id.0] = Some(Entity::fresh(self.num_chromosomes, self.len_chromosomes));
        self.rank.push(id);
        id
    }

    /// Inserts an existing entity (e.g. an immigrant or a clone) into the
    /// pool, appending it to the rank index.
    pub fn adopt(&mut self, entity: Entity<C>) -> EntityId {
        assert_eq!(
            entity.chromosomes().len(),
            self.num_chromosomes,
            "adopted entity has the wrong chromosome count"
        );
        let id = self.claim_slot();
        self.slots[id.0] = Some(entity);
        self.rank.push(id);
        id
    }

    /// Borrow a live entity by id. Panics if the id is not live.
    pub fn entity(&self, id: EntityId) -> &Entity<C> {
        self.slots[id.0].as_ref().expect("entity id addresses an empty slot")
    }

    /// Borrow a live entity mutably by id. Panics if the id is not live.
    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity<C> {
        self.slots[id.0].as_mut().expect("entity id addresses an empty slot")
    }

    /// Id of the entity at `rank`. Panics if the rank is out of range.
    pub fn id_at_rank(&self, rank: usize) -> EntityId {
        self.rank[rank]
    }

    /// Borrow the entity at `rank`.
    pub fn entity_at_rank(&self, rank: usize) -> &Entity<C> {
        self.entity(self.rank[rank])
    }

    /// Rank of a live entity, or `None` if the id is not in the rank index.
    pub fn rank_of(&self, id: EntityId) -> Option<usize> {
        self.rank.iter().position(|&r| r == id)
    }

    /// Detaches an entity from its slot for the duration of a callback.
    pub(crate) fn detach(&mut self, id: EntityId) -> Entity<C> {
        self.slots[id.0].take().expect("entity id addresses an empty slot")
    }

    /// Re-attaches a previously detached entity.
    pub(crate) fn attach(&mut self, id: EntityId, entity: Entity<C>) {
        debug_assert!(self.slots[id.0].is_none(), "attach over a live slot");
        self.slots[id.0] = Some(entity);
    }

    /// Removes the entity at `rank`: phenome and chromosomes are released,
    /// the rank index is compacted, and the id slot returns to the pool.
    pub fn dereference_by_rank(&mut self, rank: usize) {
        assert!(rank < self.rank.len(), "rank {rank} out of range");
        let id = self.rank.remove(rank);
        let dying = self.slots[id.0].take();
        debug_assert!(dying.is_some(), "rank index entry addressed an empty slot");
        drop(dying);
    }

    /// Removes a live entity by id. Panics if the id is not live.
    pub fn dereference_by_id(&mut self, id: EntityId) {
        let rank = self.rank_of(id).expect("entity id is not live");
        self.dereference_by_rank(rank);
    }

    /// Dereferences entities from the tail of the rank index until the
    /// population is down to `target` survivors. Kills the worst entities
    /// when the population is sorted.
    pub fn genocide(&mut self, target: usize) {
        if self.size() > target {
            debug!("culling population from {} to {target}", self.size());
        }
        while self.size() > target {
            self.dereference_by_rank(self.size() - 1);
        }
    }

    /// Clones a live entity within this population, returning the copy's id.
    /// Shared phenome entries are retained, not duplicated.
    pub fn entity_clone(&mut self, id: EntityId) -> EntityId {
        let copy = self.entity(id).clone();
        self.adopt(copy)
    }

    // Ordering and scoring.

    /// Sorts the rank index by descending fitness. The sort is stable, so
    /// entities at equal fitness keep their relative order; in a
    /// generational step that means parents outrank children on ties.
    pub fn sort_by_fitness(&mut self) {
        let slots = &self.slots;
        self.rank.sort_by(|a, b| {
            let fa = slots[a.0].as_ref().expect("rank index entry addresses an empty slot").fitness();
            let fb = slots[b.0].as_ref().expect("rank index entry addresses an empty slot").fitness();
            fb.total_cmp(&fa)
        });
    }

    /// Scores one entity through the evaluate operator. Returns the
    /// operator's verdict; unviable entities get the unscored sentinel so
    /// they sort behind everything.
    pub fn evaluate_entity(&mut self, id: EntityId) -> bool {
        let op = self.ops.evaluate.clone().expect("evaluate operator is not bound");
        let mut entity = self.detach(id);
        let viable = (op.f)(self, &mut entity);
        if !viable {
            entity.set_fitness(Fitness::MIN);
        }
        self.attach(id, entity);
        viable
    }

    /// Scores every live entity. Returns `false` if any evaluation reported
    /// failure.
    pub fn score_all(&mut self) -> bool {
        let mut all_viable = true;
        for rank in 0..self.size() {
            let id = self.id_at_rank(rank);
            all_viable &= self.evaluate_entity(id);
        }
        all_viable
    }

    /// Re-scores and sorts the whole population. Useful after changing the
    /// fitness function.
    pub fn score_and_sort(&mut self) -> bool {
        let ok = self.score_all();
        self.sort_by_fitness();
        ok
    }

    /// Mean and standard deviation of the live fitness values.
    pub fn fitness_stats(&self) -> Option<(f64, f64)> {
        if self.rank.is_empty() {
            return None;
        }
        let n = self.rank.len() as f64;
        let mean =
            self.rank.iter().map(|&id| self.entity(id).fitness().get()).sum::<f64>() / n;
        let variance = self
            .rank
            .iter()
            .map(|&id| {
                let d = self.entity(id).fitness().get() - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Some((mean, variance.sqrt()))
    }

    /// Seeds `stable_size` fresh entities through the seed operator.
    /// Returns `false` as soon as the operator reports failure.
    pub fn seed_population(&mut self, rng: &mut dyn RngCore) -> bool {
        let op = self.ops.seed.clone().expect("seed operator is not bound");
        debug!("seeding {} entities", self.stable_size);
        for _ in 0..self.stable_size {
            let id = self.get_free_entity();
            let mut entity = self.detach(id);
            let ok = (op.f)(self, &mut entity, rng);
            self.attach(id, entity);
            if !ok {
                warn!("seed operator reported failure");
                return false;
            }
        }
        true
    }

    /// Moves the rank-index entry at `from` to position `to`, shifting the
    /// entries in between.
    pub(crate) fn relocate_rank(&mut self, from: usize, to: usize) {
        let id = self.rank.remove(from);
        self.rank.insert(to, id);
    }

    // Cloning.

    /// Copies configuration and operator bindings into a fresh, empty
    /// population. User data is referenced, not duplicated.
    pub fn clone_empty(&self) -> Population<C> {
        let max_size = self.slots.len();
        let mut slots = Vec::new();
        slots.resize_with(max_size, || None);
        Population {
            stable_size: self.stable_size,
            num_chromosomes: self.num_chromosomes,
            len_chromosomes: self.len_chromosomes,
            slots,
            rank: Vec::new(),
            free_index: max_size - 1,
            orig_size: 0,
            crossover_ratio: self.crossover_ratio,
            mutation_ratio: self.mutation_ratio,
            migration_ratio: self.migration_ratio,
            scheme: self.scheme,
            elitism: self.elitism,
            generation: 0,
            island: self.island,
            ops: self.ops.clone(),
            user_data: self.user_data.clone(),
        }
    }

    /// Full copy: configuration plus an entity-by-entity clone in rank
    /// order. Entity ids are **not** preserved.
    pub fn clone_deep(&self) -> Population<C> {
        let mut copy = self.clone_empty();
        for rank in 0..self.size() {
            let entity = self.entity_at_rank(rank).clone();
            copy.adopt(entity);
        }
        copy
    }

    // Genome byte codec used by migration and snapshots.

    /// Serialises an entity's genome as u32-length-prefixed per-chromosome
    /// frames.
    pub fn encode_genome(&self, id: EntityId) -> Vec<u8> {
        let entity = self.entity(id);
        let mut buf = Vec::new();
        let mut frame = Vec::new();
        for chrom in entity.chromosomes() {
            frame.clear();
            chrom.write_bytes(&mut frame);
            buf.extend_from_slice(&(frame.len() as u32).to_ne_bytes());
            buf.extend_from_slice(&frame);
        }
        buf
    }

    /// Reconstructs a chromosome vector from `encode_genome` output.
    pub fn decode_genome(&self, bytes: &[u8]) -> Result<Vec<C>, CodecError> {
        let mut chromosomes = Vec::with_capacity(self.num_chromosomes);
        let mut rest = bytes;
        for _ in 0..self.num_chromosomes {
            if rest.len() < 4 {
                return Err(CodecError::Truncated { needed: 4, available: rest.len() });
            }
            let (len_bytes, tail) = rest.split_at(4);
            let len = u32::from_ne_bytes(len_bytes.try_into().expect("split at 4")) as usize;
            if tail.len() < len {
                return Err(CodecError::Truncated { needed: len, available: tail.len() });
            }
            let (frame, tail) = tail.split_at(len);
            chromosomes.push(C::read_bytes(frame)?);
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes { extra: rest.len() });
        }
        Ok(chromosomes)
    }
}

impl<C: Chromosome> fmt::Debug for Population<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("size", &self.size())
            .field("max_size", &self.max_size())
            .field("stable_size", &self.stable_size)
            .field("num_chromosomes", &self.num_chromosomes)
            .field("len_chromosomes", &self.len_chromosomes)
            .field("generation", &self.generation)
            .field("island", &self.island)
            .field("scheme", &self.scheme)
            .field("elitism", &self.elitism)
            .finish()
    }
}
