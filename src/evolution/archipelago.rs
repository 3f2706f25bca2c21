//! The archipelago driver: semi-isolated demes exchanging individuals on a
//! directed ring.
//!
//! Per generation every deme runs one generational step, then a migration
//! round moves each deme's best entities to its ring neighbour, each deme
//! culls back down to its stable size, and the generation hooks run. The
//! parallel variant fans the per-deme work out on a worker pool and runs
//! the migration round over in-process channel links; the migration round
//! is a barrier in both variants.

use log::debug;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::errors::TransportError;
use crate::evolution::generational::generation_step;
use crate::evolution::{EvolutionReport, StopReason};
use crate::genome::Chromosome;
use crate::migration;
use crate::population::Population;

/// Number of emigrants a deme contributes per migration round.
fn emigrant_count<C: Chromosome>(pop: &Population<C>) -> usize {
    (pop.migration_ratio() * pop.stable_size() as f64).round() as usize
}

fn assert_compatible<C: Chromosome>(pops: &[Population<C>]) {
    assert!(!pops.is_empty(), "archipelago needs at least one deme");
    let (num, len) = (pops[0].num_chromosomes(), pops[0].len_chromosomes());
    for pop in pops {
        assert!(
            pop.num_chromosomes() == num && pop.len_chromosomes() == len,
            "demes disagree on chromosome layout"
        );
    }
}

/// Assigns island labels and derives one deme RNG per population from the
/// master RNG.
fn label_and_derive_rngs<C: Chromosome>(
    pops: &mut [Population<C>],
    rng: &mut dyn RngCore,
) -> Vec<Xoshiro256PlusPlus> {
    pops.iter_mut()
        .enumerate()
        .map(|(island, pop)| {
            pop.set_island(island as i32);
            Xoshiro256PlusPlus::seed_from_u64(rng.random())
        })
        .collect()
}

/// One ring migration round over in-memory batches. Emigrants are removed
/// from the sender before any deme receives, so a migrant crosses exactly
/// one edge per round.
fn migration_round<C: Chromosome>(pops: &mut [Population<C>]) {
    let n = pops.len();
    if n < 2 {
        return;
    }
    let mut batches = Vec::with_capacity(n);
    for pop in pops.iter_mut() {
        let count = emigrant_count(pop);
        batches.push(migration::pack_emigrants(pop, count));
    }
    for (island, batch) in batches.into_iter().enumerate() {
        let dest = (island + 1) % n;
        migration::append_immigrants(&mut pops[dest], batch);
    }
}

/// As [`migration_round`], but every batch crosses a typed channel link.
fn migration_round_channelled<C: Chromosome>(
    pops: &mut [Population<C>],
) -> Result<(), TransportError> {
    let n = pops.len();
    if n < 2 {
        return Ok(());
    }
    let mut links = Vec::with_capacity(n);
    for pop in pops.iter_mut() {
        let (mut tx, rx) = migration::channel_link();
        let count = emigrant_count(pop);
        migration::send_emigrants(pop, count, &mut tx)?;
        links.push(rx);
    }
    for (island, mut rx) in links.into_iter().enumerate() {
        let dest = (island + 1) % n;
        migration::receive_immigrants(&mut pops[dest], &mut rx)?;
    }
    Ok(())
}

/// Post-migration bookkeeping shared by both variants: cull to stable
/// size, advance counters, run hooks. Returns `false` when any hook asked
/// to stop.
fn finish_generation<C: Chromosome>(pops: &mut [Population<C>], generation: usize) -> bool {
    for pop in pops.iter_mut() {
        pop.sort_by_fitness();
        pop.genocide(pop.stable_size());
    }
    let mut keep_going = true;
    for pop in pops.iter_mut() {
        pop.advance_generation();
        if let Some(hook) = pop.ops().generation_hook.clone() {
            if !(hook.f)(generation, pop) {
                keep_going = false;
            }
        }
    }
    keep_going
}

/// Evolves `pops` as a ring archipelago for up to `max_generations`
/// generations, cooperatively on the calling thread.
pub fn evolve_archipelago<C: Chromosome>(
    pops: &mut [Population<C>],
    max_generations: usize,
    rng: &mut dyn RngCore,
) -> EvolutionReport {
    assert_compatible(pops);
    let mut rngs = label_and_derive_rngs(pops, rng);

    for g in 1..=max_generations {
        for (pop, deme_rng) in pops.iter_mut().zip(rngs.iter_mut()) {
            generation_step(pop, deme_rng);
        }
        migration_round(pops);
        if !finish_generation(pops, g) {
            return EvolutionReport { completed: g, reason: StopReason::HookRequested };
        }
    }
    EvolutionReport { completed: max_generations, reason: StopReason::BudgetExhausted }
}

/// Worker count requested through the `NUM_THREADS` environment variable.
fn configured_workers() -> Option<usize> {
    std::env::var("NUM_THREADS").ok()?.parse().ok().filter(|&n| n > 0)
}

/// Evolves `pops` as a ring archipelago with each deme's per-generation
/// work on its own worker.
///
/// Workers never share a population; the migration round is a barrier and
/// moves serialised bytes over channel links. `NUM_THREADS` sets the
/// worker-pool size when present, otherwise the default pool is used.
/// Determinism matches the cooperative variant: deme RNGs are derived from
/// the master RNG up front, so scheduling cannot perturb the outcome.
pub fn evolve_archipelago_parallel<C: Chromosome>(
    pops: &mut [Population<C>],
    max_generations: usize,
    rng: &mut dyn RngCore,
) -> Result<EvolutionReport, TransportError> {
    assert_compatible(pops);
    let mut rngs = label_and_derive_rngs(pops, rng);

    let pool = configured_workers().map(|workers| {
        debug!("archipelago worker pool: {workers} threads");
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .expect("failed to build archipelago worker pool")
    });

    for g in 1..=max_generations {
        let step = |pops: &mut [Population<C>], rngs: &mut [Xoshiro256PlusPlus]| {
            pops.par_iter_mut()
                .zip(rngs.par_iter_mut())
                .for_each(|(pop, deme_rng)| generation_step(pop, deme_rng));
        };
        match &pool {
            Some(pool) => pool.install(|| step(pops, &mut rngs)),
            None => step(pops, &mut rngs),
        }

        migration_round_channelled(pops)?;
        if !finish_generation(pops, g) {
            return Ok(EvolutionReport { completed: g, reason: StopReason::HookRequested });
        }
    }
    Ok(EvolutionReport { completed: max_generations, reason: StopReason::BudgetExhausted })
}
