//! The generational driver: breed a full cohort of children, then keep the
//! best `stable_size` survivors.

use log::warn;
use rand::{Rng, RngCore};

use crate::base::Fitness;
use crate::evolution::{EvolutionReport, StopReason};
use crate::genome::Chromosome;
use crate::population::{Elitism, EntityId, Population};

/// How a child of the current generation came to be.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Origin {
    Crossover { a: EntityId, b: EntityId },
    Mutation,
}

/// Evolves `pop` for up to `max_generations` generations.
///
/// The population must be seeded and scored. Each generation runs:
/// sort, pre-adaptation, crossover, mutation, scoring, post-adaptation,
/// sort, elitism, cull, then the generation hook. Returns how many
/// generations completed and why the loop stopped.
pub fn evolve_generational<C: Chromosome>(
    pop: &mut Population<C>,
    max_generations: usize,
    rng: &mut dyn RngCore,
) -> EvolutionReport {
    for g in 1..=max_generations {
        generation_step(pop, rng);
        pop.advance_generation();
        if let Some(hook) = pop.ops().generation_hook.clone() {
            if !(hook.f)(g, pop) {
                return EvolutionReport { completed: g, reason: StopReason::HookRequested };
            }
        }
    }
    EvolutionReport { completed: max_generations, reason: StopReason::BudgetExhausted }
}

/// One generation's work, without the counter increment or the hook
/// (the archipelago driver interleaves those with migration).
pub(crate) fn generation_step<C: Chromosome>(pop: &mut Population<C>, rng: &mut dyn RngCore) {
    // 1. Sort and record the parent window.
    pop.sort_by_fitness();
    let orig_size = pop.size();
    pop.set_orig_size(orig_size);
    let parents: Vec<EntityId> = (0..orig_size).map(|r| pop.id_at_rank(r)).collect();
    let best_parent = parents.first().copied();

    // 2. Pre-adaptation of the parent set.
    let scheme = pop.scheme();
    if scheme.adapts_parents() {
        adapt_entities(pop, &parents, scheme.writes_back_genome(), rng);
    }

    let mut offspring: Vec<(EntityId, Origin)> = Vec::new();

    // 3. Crossover: each selected pair breeds with probability
    //    crossover_ratio; a failed draw skips the pair.
    {
        let selector = pop.ops().select_two.clone().expect("select_two operator is not bound");
        let crossover = pop.ops().crossover.clone().expect("crossover operator is not bound");
        let ratio = pop.crossover_ratio();
        let mut state = selector.f.begin(pop, rng);
        while let Some((a, b)) = state.next(pop, rng) {
            if !rng.random_bool(ratio) {
                continue;
            }
            let cid = pop.get_free_entity();
            let did = pop.get_free_entity();
            let mut c = pop.detach(cid);
            let mut d = pop.detach(did);
            (crossover.f)(pop, pop.entity(a), pop.entity(b), &mut c, &mut d, rng);
            pop.attach(cid, c);
            pop.attach(did, d);
            offspring.push((cid, Origin::Crossover { a, b }));
            offspring.push((did, Origin::Crossover { a, b }));
        }
    }

    // 4. Mutation: each selected parent spawns a mutant with probability
    //    mutation_ratio.
    {
        let selector = pop.ops().select_one.clone().expect("select_one operator is not bound");
        let mutate = pop.ops().mutate.clone().expect("mutate operator is not bound");
        let ratio = pop.mutation_ratio();
        let mut state = selector.f.begin(pop, rng);
        while let Some(parent) = state.next(pop, rng) {
            if !rng.random_bool(ratio) {
                continue;
            }
            let cid = pop.get_free_entity();
            let mut child = pop.detach(cid);
            (mutate.f)(pop, pop.entity(parent), &mut child, rng);
            pop.attach(cid, child);
            offspring.push((cid, Origin::Mutation));
        }
    }

    // 5. Score the new entities.
    for &(id, _) in &offspring {
        pop.evaluate_entity(id);
    }

    // 6. Post-adaptation of the children.
    if scheme.adapts_children() {
        let children: Vec<EntityId> = offspring.iter().map(|&(id, _)| id).collect();
        adapt_entities(pop, &children, scheme.writes_back_genome(), rng);
    }

    // 7. Elitism qualifiers that act before the final ranking.
    match pop.elitism() {
        Elitism::RescoreParents => {
            for &id in &parents {
                pop.evaluate_entity(id);
            }
        }
        Elitism::PurebredOnly => {
            for &(id, origin) in &offspring {
                if let Origin::Crossover { a, b } = origin {
                    if a != b {
                        pop.dereference_by_id(id);
                    }
                }
            }
        }
        Elitism::Unknown => {
            warn!("elitism mode not configured; defaulting to plain truncation");
        }
        _ => {}
    }

    pop.sort_by_fitness();

    // The guaranteed parent is pulled back into the survivor window if the
    // children pushed it out.
    if pop.elitism() == Elitism::OneParentSurvives {
        if let Some(best) = best_parent {
            if let Some(rank) = pop.rank_of(best) {
                let stable = pop.stable_size();
                if rank >= stable {
                    pop.relocate_rank(rank, stable - 1);
                }
            }
        }
    }

    // 8. Cull the non-survivors.
    pop.genocide(pop.stable_size());
}

/// Runs the adapt operator over `ids`: each entity is cloned, adapted in
/// place, scored, and written back as genome+fitness (Lamarckian) or
/// fitness only (Baldwinian).
fn adapt_entities<C: Chromosome>(
    pop: &mut Population<C>,
    ids: &[EntityId],
    write_back_genome: bool,
    rng: &mut dyn RngCore,
) {
    let adapt = pop
        .ops()
        .adapt
        .clone()
        .expect("adapt operator is required by the configured scheme");
    let evaluate = pop.ops().evaluate.clone().expect("evaluate operator is not bound");
    for &id in ids {
        let mut adapted = pop.entity(id).clone();
        (adapt.f)(pop, &mut adapted, rng);
        if !(evaluate.f)(pop, &mut adapted) {
            adapted.set_fitness(Fitness::MIN);
        }
        if write_back_genome {
            *pop.entity_mut(id) = adapted;
        } else {
            let fitness = adapted.fitness();
            pop.entity_mut(id).set_fitness(fitness);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::IntegerChromosome;
    use crate::ops::builtin;
    use crate::ops::selectors::EverySelection;
    use crate::population::Scheme;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fitness = sum of alleles.
    fn sum_fitness(pop: &mut Population<IntegerChromosome>) {
        pop.set_evaluate(|_, e| {
            let total: i64 = e.chromosome(0).alleles().iter().map(|&a| a as i64).sum();
            e.set_fitness(total as f64);
            true
        });
    }

    fn basic_population(stable: usize, len: usize) -> Population<IntegerChromosome> {
        let mut pop = Population::new(stable, 1, len);
        sum_fitness(&mut pop);
        pop.ops_mut().seed = Some(builtin::seed_integer_random(0, 10));
        pop.ops_mut().mutate = Some(builtin::mutate_integer_singlepoint_randomize(0, 10));
        pop.ops_mut().crossover = Some(builtin::crossover_integer_singlepoints());
        pop.set_select_one(EverySelection);
        pop.set_select_two(EverySelection);
        pop
    }

    fn seeded(stable: usize, len: usize, seed: u64) -> (Population<IntegerChromosome>, Xoshiro256PlusPlus) {
        let mut pop = basic_population(stable, len);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        pop.seed_population(&mut rng);
        pop.score_all();
        (pop, rng)
    }

    #[test]
    fn test_step_restores_stable_size() {
        let (mut pop, mut rng) = seeded(8, 4, 1);
        pop.set_elitism(Elitism::None);
        generation_step(&mut pop, &mut rng);
        assert_eq!(pop.size(), 8);
    }

    #[test]
    fn test_best_fitness_is_monotone_under_truncation() {
        let (mut pop, mut rng) = seeded(8, 4, 2);
        pop.set_elitism(Elitism::None);
        let mut best = pop.entity_at_rank(0).fitness().get();
        for _ in 0..20 {
            generation_step(&mut pop, &mut rng);
            let now = pop.entity_at_rank(0).fitness().get();
            assert!(now >= best, "best fitness regressed from {best} to {now}");
            best = now;
        }
    }

    #[test]
    fn test_parents_survive_breaks_ties_for_parents() {
        // All entities have identical genomes, so every child ties with
        // every parent; with ParentsSurvive the original parents must still
        // occupy the survivor set.
        let mut pop = basic_population(4, 2);
        pop.ops_mut().seed = Some(builtin::seed_integer_zero());
        pop.ops_mut().mutate = None;
        pop.set_mutate(|_, src, dest, _| dest.copy_genome_from(src));
        pop.set_elitism(Elitism::ParentsSurvive);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        pop.seed_population(&mut rng);
        pop.score_all();
        pop.sort_by_fitness();
        let parents: Vec<EntityId> = (0..4).map(|r| pop.id_at_rank(r)).collect();

        generation_step(&mut pop, &mut rng);

        for r in 0..pop.size() {
            assert!(
                parents.contains(&pop.id_at_rank(r)),
                "a tied child displaced a parent"
            );
        }
    }

    #[test]
    fn test_one_parent_survives_guarantee() {
        // Every child strictly outscores every parent, so plain truncation
        // would cull the whole parent set; the pre-step champion must still
        // be re-seated at the last survivor rank.
        let mut pop = basic_population(4, 2);
        pop.set_elitism(Elitism::OneParentSurvives);
        pop.ops_mut().seed = Some(builtin::seed_integer_zero());
        pop.set_mutate(|_, src, dest, _| {
            dest.copy_genome_from(src);
            dest.chromosome_mut(0).alleles_mut().fill(50);
        });
        pop.set_crossover(|_, _a, _b, c, d, _| {
            c.chromosome_mut(0).alleles_mut().fill(40);
            d.chromosome_mut(0).alleles_mut().fill(40);
        });
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        pop.seed_population(&mut rng);
        pop.score_all();
        pop.sort_by_fitness();
        let champion = pop.id_at_rank(0);

        generation_step(&mut pop, &mut rng);

        assert_eq!(
            pop.rank_of(champion),
            Some(3),
            "pre-step champion was culled despite OneParentSurvives"
        );
        for r in 0..3 {
            assert!(pop.entity_at_rank(r).fitness().get() >= 80.0);
        }
    }

    #[test]
    fn test_purebred_only_discards_crossbred_children() {
        let mut pop = basic_population(4, 2);
        pop.set_elitism(Elitism::PurebredOnly);
        // Crossover children would dominate; with PurebredOnly they must
        // all be discarded, so survivors come from parents and mutants only.
        pop.set_crossover(|_, _a, _b, c, d, _| {
            c.chromosome_mut(0).alleles_mut().fill(1000);
            d.chromosome_mut(0).alleles_mut().fill(1000);
        });
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        pop.seed_population(&mut rng);
        pop.score_all();
        generation_step(&mut pop, &mut rng);
        for r in 0..pop.size() {
            let best = pop.entity_at_rank(r).fitness().get();
            assert!(best < 2000.0, "a crossbred child survived PurebredOnly");
        }
    }

    #[test]
    fn test_rescore_parents_reevaluates() {
        let mut pop = basic_population(4, 2);
        pop.set_elitism(Elitism::RescoreParents);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        pop.set_evaluate(move |_, e| {
            counter.fetch_add(1, Ordering::Relaxed);
            e.set_fitness(0.0);
            true
        });
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);
        pop.seed_population(&mut rng);
        pop.score_all();
        let scored_before = calls.load(Ordering::Relaxed);
        generation_step(&mut pop, &mut rng);
        // 4 parents rescored on top of the children's initial scoring.
        assert!(calls.load(Ordering::Relaxed) >= scored_before + 4);
    }

    #[test]
    fn test_lamarck_children_writes_genome_back() {
        let mut pop = basic_population(4, 2);
        pop.set_scheme(Scheme::LamarckChildren);
        pop.set_elitism(Elitism::None);
        pop.set_adapt(|_, e, _| {
            e.chromosome_mut(0).alleles_mut().fill(99);
        });
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        pop.seed_population(&mut rng);
        pop.score_all();
        generation_step(&mut pop, &mut rng);
        // Adapted children carry the rewritten genome and its score.
        let best = pop.entity_at_rank(0);
        assert_eq!(best.chromosome(0).alleles(), &[99, 99]);
        assert_eq!(best.fitness().get(), 198.0);
    }

    #[test]
    fn test_baldwin_children_keeps_genome() {
        let mut pop = basic_population(4, 2);
        pop.set_scheme(Scheme::BaldwinChildren);
        pop.set_elitism(Elitism::None);
        pop.ops_mut().seed = Some(builtin::seed_integer_zero());
        pop.set_adapt(|_, e, _| {
            e.chromosome_mut(0).alleles_mut().fill(99);
        });
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        pop.seed_population(&mut rng);
        pop.score_all();
        generation_step(&mut pop, &mut rng);
        // Children benefit from the adapted fitness, but their genomes stay
        // unadapted (all zeros beget values < 10 after one mutation).
        let best = pop.entity_at_rank(0);
        assert_eq!(best.fitness().get(), 198.0);
        assert!(best.chromosome(0).alleles().iter().all(|&a| a < 99));
    }

    #[test]
    fn test_hook_termination_reports_generation() {
        let (mut pop, mut rng) = seeded(4, 2, 9);
        pop.set_elitism(Elitism::None);
        pop.set_generation_hook(|g, _| g < 10);
        let report = evolve_generational(&mut pop, 100, &mut rng);
        assert_eq!(report.completed, 10);
        assert_eq!(report.reason, StopReason::HookRequested);
        assert!(report.hook_stopped());
    }

    #[test]
    fn test_budget_exhaustion_reported() {
        let (mut pop, mut rng) = seeded(4, 2, 10);
        pop.set_elitism(Elitism::None);
        let report = evolve_generational(&mut pop, 5, &mut rng);
        assert_eq!(report.completed, 5);
        assert_eq!(report.reason, StopReason::BudgetExhausted);
        assert_eq!(pop.generation(), 5);
    }

    #[test]
    fn test_fixed_seed_reproduces_trajectory() {
        let run = |seed: u64| -> Vec<f64> {
            let (mut pop, mut rng) = seeded(6, 4, seed);
            pop.set_elitism(Elitism::None);
            let mut trajectory = Vec::new();
            for _ in 0..10 {
                generation_step(&mut pop, &mut rng);
                trajectory.push(pop.entity_at_rank(0).fitness().get());
            }
            trajectory
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }
}
