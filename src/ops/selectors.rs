//! Built-in parent selectors.
//!
//! All selectors operate over the parent window (ranks `0..orig_size` as
//! recorded at the start of the phase). Single-parent passes yield
//! `orig_size` parents; pair passes yield `orig_size / 2` pairs.
//! Fitness-proportionate selectors fall back to uniform sampling when the
//! weight mass is zero.

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::genome::Chromosome;
use crate::ops::{SelectOne, SelectOneState, SelectTwo, SelectTwoState};
use crate::population::{EntityId, Population};

fn parent_ids<C: Chromosome>(pop: &Population<C>) -> Vec<EntityId> {
    let window = pop.orig_size().min(pop.size());
    (0..window).map(|r| pop.id_at_rank(r)).collect()
}

/// Uniformly random parents.
pub struct RandomSelection;

struct RandomState {
    ids: Vec<EntityId>,
    remaining: usize,
}

impl RandomState {
    fn pick(&self, rng: &mut dyn RngCore) -> EntityId {
        self.ids[rng.random_range(0..self.ids.len())]
    }

    fn pick_pair(&self, rng: &mut dyn RngCore) -> (EntityId, EntityId) {
        let a = self.pick(rng);
        let mut b = self.pick(rng);
        let mut tries = 0;
        while b == a && self.ids.len() > 1 && tries < 8 {
            b = self.pick(rng);
            tries += 1;
        }
        (a, b)
    }
}

impl<C: Chromosome> SelectOne<C> for RandomSelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectOneState<C>> {
        let ids = parent_ids(pop);
        let remaining = ids.len();
        Box::new(RandomState { ids, remaining })
    }
}

impl<C: Chromosome> SelectOneState<C> for RandomState {
    fn next(&mut self, _pop: &Population<C>, rng: &mut dyn RngCore) -> Option<EntityId> {
        if self.remaining == 0 || self.ids.is_empty() {
            return None;
        }
        self.remaining -= 1;
        Some(self.pick(rng))
    }
}

impl<C: Chromosome> SelectTwo<C> for RandomSelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectTwoState<C>> {
        let ids = parent_ids(pop);
        let remaining = ids.len() / 2;
        Box::new(RandomState { ids, remaining })
    }
}

impl<C: Chromosome> SelectTwoState<C> for RandomState {
    fn next(
        &mut self,
        _pop: &Population<C>,
        rng: &mut dyn RngCore,
    ) -> Option<(EntityId, EntityId)> {
        if self.remaining == 0 || self.ids.is_empty() {
            return None;
        }
        self.remaining -= 1;
        Some(self.pick_pair(rng))
    }
}

/// Every parent exactly once, in rank order; pairs are consecutive ranks.
pub struct EverySelection;

struct EveryState {
    ids: Vec<EntityId>,
    cursor: usize,
}

impl<C: Chromosome> SelectOne<C> for EverySelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectOneState<C>> {
        Box::new(EveryState { ids: parent_ids(pop), cursor: 0 })
    }
}

impl<C: Chromosome> SelectOneState<C> for EveryState {
    fn next(&mut self, _pop: &Population<C>, _rng: &mut dyn RngCore) -> Option<EntityId> {
        let id = self.ids.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(id)
    }
}

impl<C: Chromosome> SelectTwo<C> for EverySelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectTwoState<C>> {
        Box::new(EveryState { ids: parent_ids(pop), cursor: 0 })
    }
}

impl<C: Chromosome> SelectTwoState<C> for EveryState {
    fn next(
        &mut self,
        _pop: &Population<C>,
        _rng: &mut dyn RngCore,
    ) -> Option<(EntityId, EntityId)> {
        if self.cursor + 1 >= self.ids.len() {
            return None;
        }
        let pair = (self.ids[self.cursor], self.ids[self.cursor + 1]);
        self.cursor += 2;
        Some(pair)
    }
}

/// Fitness-proportionate (roulette-wheel) selection.
///
/// The plain variant treats negative fitness as zero weight; the rebased
/// variant shifts all weights by the minimum fitness so populations with
/// negative scores stay proportionate.
pub struct RouletteSelection {
    rebase: bool,
}

impl RouletteSelection {
    pub fn new() -> Self {
        Self { rebase: false }
    }

    pub fn rebased() -> Self {
        Self { rebase: true }
    }
}

impl Default for RouletteSelection {
    fn default() -> Self {
        Self::new()
    }
}

struct WheelState {
    ids: Vec<EntityId>,
    cumulative: Vec<f64>,
    total: f64,
    remaining: usize,
}

impl WheelState {
    fn build<C: Chromosome>(pop: &Population<C>, rebase: bool, remaining_pairs: bool) -> Self {
        let ids = parent_ids(pop);
        let raw: Vec<f64> = ids.iter().map(|&id| pop.entity(id).fitness().get()).collect();
        let floor = if rebase {
            raw.iter().copied().fold(f64::INFINITY, f64::min).min(0.0)
        } else {
            0.0
        };
        let mut total = 0.0;
        let cumulative: Vec<f64> = raw
            .iter()
            .map(|&f| {
                let w = (f - floor).max(0.0);
                let w = if w.is_finite() { w } else { 0.0 };
                total += w;
                total
            })
            .collect();
        let remaining = if remaining_pairs { ids.len() / 2 } else { ids.len() };
        Self { ids, cumulative, total, remaining }
    }

    fn spin(&self, rng: &mut dyn RngCore) -> EntityId {
        if self.total <= 0.0 {
            return self.ids[rng.random_range(0..self.ids.len())];
        }
        let r = rng.random_range(0.0..self.total);
        let idx = self
            .cumulative
            .iter()
            .position(|&c| c >= r)
            .unwrap_or(self.ids.len() - 1);
        self.ids[idx]
    }
}

impl<C: Chromosome> SelectOne<C> for RouletteSelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectOneState<C>> {
        Box::new(WheelState::build(pop, self.rebase, false))
    }
}

impl<C: Chromosome> SelectOneState<C> for WheelState {
    fn next(&mut self, _pop: &Population<C>, rng: &mut dyn RngCore) -> Option<EntityId> {
        if self.remaining == 0 || self.ids.is_empty() {
            return None;
        }
        self.remaining -= 1;
        Some(self.spin(rng))
    }
}

impl<C: Chromosome> SelectTwo<C> for RouletteSelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectTwoState<C>> {
        Box::new(WheelState::build(pop, self.rebase, true))
    }
}

impl<C: Chromosome> SelectTwoState<C> for WheelState {
    fn next(
        &mut self,
        _pop: &Population<C>,
        rng: &mut dyn RngCore,
    ) -> Option<(EntityId, EntityId)> {
        if self.remaining == 0 || self.ids.is_empty() {
            return None;
        }
        self.remaining -= 1;
        let a = self.spin(rng);
        let mut b = self.spin(rng);
        let mut tries = 0;
        while b == a && self.ids.len() > 1 && tries < 8 {
            b = self.spin(rng);
            tries += 1;
        }
        Some((a, b))
    }
}

/// Stochastic universal sampling.
///
/// One spin of `orig_size` equally spaced pointers picks the whole parent
/// pool up front, which bounds spread; the picks are then shuffled so pair
/// composition is not rank-correlated.
pub struct SusSelection;

struct DrainState {
    picks: Vec<EntityId>,
}

fn sus_picks<C: Chromosome>(pop: &Population<C>, rng: &mut dyn RngCore) -> Vec<EntityId> {
    let ids = parent_ids(pop);
    if ids.is_empty() {
        return Vec::new();
    }
    let raw: Vec<f64> = ids.iter().map(|&id| pop.entity(id).fitness().get()).collect();
    let floor = raw.iter().copied().fold(f64::INFINITY, f64::min).min(0.0);
    let weights: Vec<f64> = raw
        .iter()
        .map(|&f| {
            let w = f - floor;
            if w.is_finite() {
                w
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let n = ids.len();
    let mut picks = Vec::with_capacity(n);
    if total <= 0.0 {
        for i in 0..n {
            picks.push(ids[i]);
        }
    } else {
        let step = total / n as f64;
        let mut pointer = rng.random_range(0.0..step);
        let mut accumulated = weights[0];
        let mut idx = 0;
        for _ in 0..n {
            while accumulated < pointer && idx + 1 < n {
                idx += 1;
                accumulated += weights[idx];
            }
            picks.push(ids[idx]);
            pointer += step;
        }
    }
    picks.shuffle(rng);
    picks
}

impl<C: Chromosome> SelectOne<C> for SusSelection {
    fn begin(&self, pop: &Population<C>, rng: &mut dyn RngCore) -> Box<dyn SelectOneState<C>> {
        Box::new(DrainState { picks: sus_picks(pop, rng) })
    }
}

impl<C: Chromosome> SelectOneState<C> for DrainState {
    fn next(&mut self, _pop: &Population<C>, _rng: &mut dyn RngCore) -> Option<EntityId> {
        self.picks.pop()
    }
}

impl<C: Chromosome> SelectTwo<C> for SusSelection {
    fn begin(&self, pop: &Population<C>, rng: &mut dyn RngCore) -> Box<dyn SelectTwoState<C>> {
        Box::new(DrainState { picks: sus_picks(pop, rng) })
    }
}

impl<C: Chromosome> SelectTwoState<C> for DrainState {
    fn next(
        &mut self,
        _pop: &Population<C>,
        _rng: &mut dyn RngCore,
    ) -> Option<(EntityId, EntityId)> {
        if self.picks.len() < 2 {
            return None;
        }
        let a = self.picks.pop().expect("checked above");
        let b = self.picks.pop().expect("checked above");
        Some((a, b))
    }
}

/// Size-two tournament: each yield is the fitter of two uniform picks.
pub struct BestOfTwoSelection;

struct TournamentState {
    ids: Vec<EntityId>,
    remaining: usize,
}

impl TournamentState {
    fn duel<C: Chromosome>(&self, pop: &Population<C>, rng: &mut dyn RngCore) -> EntityId {
        let a = self.ids[rng.random_range(0..self.ids.len())];
        let b = self.ids[rng.random_range(0..self.ids.len())];
        if pop.entity(a).fitness() >= pop.entity(b).fitness() {
            a
        } else {
            b
        }
    }
}

impl<C: Chromosome> SelectOne<C> for BestOfTwoSelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectOneState<C>> {
        let ids = parent_ids(pop);
        let remaining = ids.len();
        Box::new(TournamentState { ids, remaining })
    }
}

impl<C: Chromosome> SelectOneState<C> for TournamentState {
    fn next(&mut self, pop: &Population<C>, rng: &mut dyn RngCore) -> Option<EntityId> {
        if self.remaining == 0 || self.ids.is_empty() {
            return None;
        }
        self.remaining -= 1;
        Some(self.duel(pop, rng))
    }
}

impl<C: Chromosome> SelectTwo<C> for BestOfTwoSelection {
    fn begin(&self, pop: &Population<C>, _rng: &mut dyn RngCore) -> Box<dyn SelectTwoState<C>> {
        let ids = parent_ids(pop);
        let remaining = ids.len() / 2;
        Box::new(TournamentState { ids, remaining })
    }
}

impl<C: Chromosome> SelectTwoState<C> for TournamentState {
    fn next(
        &mut self,
        pop: &Population<C>,
        rng: &mut dyn RngCore,
    ) -> Option<(EntityId, EntityId)> {
        if self.remaining == 0 || self.ids.is_empty() {
            return None;
        }
        self.remaining -= 1;
        Some((self.duel(pop, rng), self.duel(pop, rng)))
    }
}
