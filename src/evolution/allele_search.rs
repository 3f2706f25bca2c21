//! Systematic single-locus search, a convenience built directly on the
//! operator contract.

use log::debug;

use crate::base::Fitness;
use crate::genome::AlleleAccess;
use crate::population::{EntityId, Population};

/// Scans every value in `[min, max)` at one locus of one chromosome,
/// scoring each candidate, and returns the id of the best entity found.
///
/// The search starts from a copy of `start`; no other locus is touched and
/// `start` itself is never modified. The returned entity is allocated in
/// `pop`; dereferencing it when done is the caller's responsibility.
pub fn allele_search<C: AlleleAccess>(
    pop: &mut Population<C>,
    chromosome_idx: usize,
    locus: usize,
    min: i64,
    max: i64,
    start: EntityId,
) -> EntityId {
    assert!(chromosome_idx < pop.num_chromosomes(), "chromosome index out of range");
    assert!(min < max, "empty allele range {min}..{max}");
    let evaluate = pop.ops().evaluate.clone().expect("evaluate operator is not bound");

    let best_id = pop.entity_clone(start);
    let mut best = pop.detach(best_id);
    best.set_fitness(Fitness::MIN);
    let mut current = best.clone();

    for value in min..max {
        current.chromosome_mut(chromosome_idx).set_allele(locus, value);
        current.clear_phenome(chromosome_idx);
        if !(evaluate.f)(pop, &mut current) {
            current.set_fitness(Fitness::MIN);
        }
        if best.fitness() < current.fitness() {
            best = current.clone();
        }
    }

    debug!(
        "allele search over [{min}, {max}) at locus {locus} found fitness {}",
        best.fitness()
    );
    pop.attach(best_id, best);
    best_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::IntegerChromosome;
    use crate::ops::builtin;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    /// Fitness peaks when locus 3 holds 37 and rewards the rest linearly.
    fn peaked_population() -> Population<IntegerChromosome> {
        let mut pop = Population::new(4, 1, 8);
        pop.ops_mut().seed = Some(builtin::seed_integer_random(0, 100));
        pop.set_evaluate(|_, e| {
            let alleles = e.chromosome(0).alleles();
            let base: i64 = alleles.iter().map(|&a| a as i64).sum();
            let bonus = if alleles[3] == 37 { 10_000 } else { 0 };
            e.set_fitness((base + bonus) as f64);
            true
        });
        pop
    }

    #[test]
    fn test_search_finds_the_peak() {
        let mut pop = peaked_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(41);
        pop.seed_population(&mut rng);
        pop.score_all();

        let start = pop.id_at_rank(0);
        let start_alleles = pop.entity(start).chromosome(0).alleles().to_vec();
        let best = allele_search(&mut pop, 0, 3, 0, 256, start);

        let found = pop.entity(best).chromosome(0).alleles().to_vec();
        assert_eq!(found[3], 37);
        // Every other locus is untouched.
        for (i, (&s, &f)) in start_alleles.iter().zip(&found).enumerate() {
            if i != 3 {
                assert_eq!(s, f, "locus {i} was modified");
            }
        }
        assert!(pop.entity(best).fitness().get() >= 10_000.0);
    }

    #[test]
    fn test_search_dominates_single_locus_variants() {
        let mut pop = peaked_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(43);
        pop.seed_population(&mut rng);
        pop.score_all();

        let start = pop.id_at_rank(0);
        let best = allele_search(&mut pop, 0, 3, 0, 256, start);
        let best_fitness = pop.entity(best).fitness();

        // No value in the range can beat the found optimum.
        let probe_id = pop.entity_clone(start);
        for value in 0..256 {
            pop.entity_mut(probe_id).chromosome_mut(0).set_allele(3, value);
            pop.evaluate_entity(probe_id);
            assert!(pop.entity(probe_id).fitness() <= best_fitness);
        }
    }

    #[test]
    fn test_start_entity_is_untouched() {
        let mut pop = peaked_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(47);
        pop.seed_population(&mut rng);
        pop.score_all();

        let start = pop.id_at_rank(0);
        let before = pop.entity(start).chromosome(0).alleles().to_vec();
        let fitness_before = pop.entity(start).fitness();
        allele_search(&mut pop, 0, 3, 0, 256, start);
        assert_eq!(pop.entity(start).chromosome(0).alleles(), &before[..]);
        assert_eq!(pop.entity(start).fitness(), fitness_before);
    }
}
