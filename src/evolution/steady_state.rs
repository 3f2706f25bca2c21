//! The steady-state driver: one insertion at a time, no generation-level
//! sorting.

use rand::{Rng, RngCore};

use crate::base::Fitness;
use crate::evolution::{EvolutionReport, StopReason};
use crate::genome::Chromosome;
use crate::ops::builtin::replace_by_fitness;
use crate::population::{Entity, Population};

/// Evolves `pop` for up to `max_iterations` steady-state iterations.
///
/// Each iteration draws either the crossover path (a selected pair breeds
/// two children, with probability `crossover_ratio`) or the clone path (a
/// single selected parent is copied). Children are mutated with probability
/// `mutation_ratio`, scored, handed to the iteration hook, then inserted
/// through the replace operator. Without a bound replace operator the
/// default policy displaces the entity at rank `size - 1` iff the child's
/// fitness strictly exceeds it.
pub fn evolve_steady_state<C: Chromosome>(
    pop: &mut Population<C>,
    max_iterations: usize,
    rng: &mut dyn RngCore,
) -> EvolutionReport {
    let evaluate = pop.ops().evaluate.clone().expect("evaluate operator is not bound");
    let mutate = pop.ops().mutate.clone().expect("mutate operator is not bound");

    for i in 1..=max_iterations {
        pop.set_orig_size(pop.size());

        let mut children: Vec<Entity<C>> = Vec::new();
        if rng.random_bool(pop.crossover_ratio()) {
            let selector =
                pop.ops().select_two.clone().expect("select_two operator is not bound");
            let crossover =
                pop.ops().crossover.clone().expect("crossover operator is not bound");
            if let Some((a, b)) = selector.f.begin(pop, rng).next(pop, rng) {
                let mut c = Entity::fresh(pop.num_chromosomes(), pop.len_chromosomes());
                let mut d = Entity::fresh(pop.num_chromosomes(), pop.len_chromosomes());
                (crossover.f)(pop, pop.entity(a), pop.entity(b), &mut c, &mut d, rng);
                children.push(c);
                children.push(d);
            }
        } else {
            let selector =
                pop.ops().select_one.clone().expect("select_one operator is not bound");
            if let Some(a) = selector.f.begin(pop, rng).next(pop, rng) {
                children.push(pop.entity(a).clone());
            }
        }
        if children.is_empty() {
            continue;
        }

        let mutation_ratio = pop.mutation_ratio();
        for child in children.iter_mut() {
            if rng.random_bool(mutation_ratio) {
                let source = child.clone();
                (mutate.f)(pop, &source, child, rng);
            }
        }

        for child in children.iter_mut() {
            if !(evaluate.f)(pop, child) {
                child.set_fitness(Fitness::MIN);
            }
        }

        let mut stop = false;
        if let Some(hook) = pop.ops().iteration_hook.clone() {
            if !(hook.f)(i, &children[0]) {
                stop = true;
            }
        }

        let replace = pop.ops().replace.clone();
        for child in children {
            match &replace {
                Some(op) => (op.f)(pop, child),
                None => replace_by_fitness(pop, child),
            }
        }

        if stop {
            return EvolutionReport { completed: i, reason: StopReason::HookRequested };
        }
    }
    EvolutionReport { completed: max_iterations, reason: StopReason::BudgetExhausted }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::IntegerChromosome;
    use crate::ops::builtin;
    use crate::ops::selectors::BestOfTwoSelection;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn ss_population(stable: usize) -> (Population<IntegerChromosome>, Xoshiro256PlusPlus) {
        let mut pop: Population<IntegerChromosome> = Population::new(stable, 1, 4);
        pop.set_evaluate(|_, e| {
            let total: i64 = e.chromosome(0).alleles().iter().map(|&a| a as i64).sum();
            e.set_fitness(total as f64);
            true
        });
        pop.ops_mut().seed = Some(builtin::seed_integer_random(0, 10));
        pop.ops_mut().mutate = Some(builtin::mutate_integer_singlepoint_randomize(0, 10));
        pop.ops_mut().crossover = Some(builtin::crossover_integer_singlepoints());
        pop.set_select_one(BestOfTwoSelection);
        pop.set_select_two(BestOfTwoSelection);
        pop.set_crossover_ratio(0.5);
        pop.set_mutation_ratio(1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(21);
        pop.seed_population(&mut rng);
        pop.score_all();
        pop.sort_by_fitness();
        (pop, rng)
    }

    #[test]
    fn test_population_size_is_stable() {
        let (mut pop, mut rng) = ss_population(8);
        evolve_steady_state(&mut pop, 200, &mut rng);
        assert_eq!(pop.size(), 8);
    }

    #[test]
    fn test_default_replace_improves_worst() {
        let (mut pop, mut rng) = ss_population(8);
        pop.sort_by_fitness();
        let worst_before = pop.entity_at_rank(pop.size() - 1).fitness().get();
        evolve_steady_state(&mut pop, 300, &mut rng);
        pop.sort_by_fitness();
        let worst_after = pop.entity_at_rank(pop.size() - 1).fitness().get();
        assert!(
            worst_after >= worst_before,
            "worst fitness regressed from {worst_before} to {worst_after}"
        );
    }

    #[test]
    fn test_custom_replace_is_used() {
        let (mut pop, mut rng) = ss_population(4);
        // A replace policy that always appends grows the population by one
        // entity per scored child.
        pop.set_replace(|p, child| {
            p.adopt(child);
        });
        let before = pop.size();
        evolve_steady_state(&mut pop, 10, &mut rng);
        assert!(pop.size() > before);
    }

    #[test]
    fn test_iteration_hook_stops_cleanly() {
        let (mut pop, mut rng) = ss_population(8);
        pop.set_iteration_hook(|i, _| i < 25);
        let report = evolve_steady_state(&mut pop, 1000, &mut rng);
        assert_eq!(report.completed, 25);
        assert_eq!(report.reason, StopReason::HookRequested);
        // The stopping iteration's children were still inserted.
        assert_eq!(pop.size(), 8);
    }

    #[test]
    fn test_budget_exhaustion() {
        let (mut pop, mut rng) = ss_population(8);
        let report = evolve_steady_state(&mut pop, 17, &mut rng);
        assert_eq!(report.completed, 17);
        assert_eq!(report.reason, StopReason::BudgetExhausted);
    }
}
