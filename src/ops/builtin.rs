//! Built-in operators for the shipped chromosome types, plus the catalog
//! constructors that register them under stable ids.
//!
//! These cover what the engine's own scenarios and tests exercise; anything
//! beyond that is expected to come from the caller as external operators.

use std::sync::Arc;

use rand::{Rng, RngCore};

use crate::genome::printable::{PRINTABLE_MAX, PRINTABLE_MIN};
use crate::genome::{Chromosome, IntegerChromosome, PrintableChromosome};
use crate::ops::selectors::{
    BestOfTwoSelection, EverySelection, RandomSelection, RouletteSelection, SusSelection,
};
use crate::ops::{BoundOp, CrossoverDyn, MutateDyn, OperatorCatalog, ReplaceDyn, SeedDyn};
use crate::population::{Entity, Population};

/// Stable catalog ids of the built-in operators.
pub mod ids {
    pub const SELECT_ONE_RANDOM: i32 = 1;
    pub const SELECT_TWO_RANDOM: i32 = 2;
    pub const SELECT_ONE_EVERY: i32 = 3;
    pub const SELECT_TWO_EVERY: i32 = 4;
    pub const SELECT_ONE_ROULETTE: i32 = 5;
    pub const SELECT_TWO_ROULETTE: i32 = 6;
    pub const SELECT_ONE_ROULETTE_REBASED: i32 = 7;
    pub const SELECT_TWO_ROULETTE_REBASED: i32 = 8;
    pub const SELECT_ONE_SUS: i32 = 9;
    pub const SELECT_TWO_SUS: i32 = 10;
    pub const SELECT_ONE_BESTOF2: i32 = 11;
    pub const SELECT_TWO_BESTOF2: i32 = 12;

    pub const MUTATE_INTEGER_SINGLEPOINT_DRIFT: i32 = 20;
    pub const MUTATE_INTEGER_SINGLEPOINT_RANDOMIZE: i32 = 21;
    pub const MUTATE_INTEGER_MULTIPOINT: i32 = 22;
    pub const MUTATE_PRINTABLE_SINGLEPOINT_DRIFT: i32 = 25;
    pub const MUTATE_PRINTABLE_SINGLEPOINT_RANDOMIZE: i32 = 26;

    pub const CROSSOVER_INTEGER_SINGLEPOINTS: i32 = 30;
    pub const CROSSOVER_INTEGER_DOUBLEPOINTS: i32 = 31;
    pub const CROSSOVER_INTEGER_ALLELE_MIXING: i32 = 32;
    pub const CROSSOVER_PRINTABLE_SINGLEPOINTS: i32 = 35;
    pub const CROSSOVER_PRINTABLE_ALLELE_MIXING: i32 = 36;

    pub const SEED_INTEGER_RANDOM: i32 = 40;
    pub const SEED_INTEGER_ZERO: i32 = 41;
    pub const SEED_PRINTABLE_RANDOM: i32 = 45;

    pub const REPLACE_BY_FITNESS: i32 = 50;
}

/// Default steady-state replacement: the candidate displaces the entity at
/// rank `size - 1` iff the candidate's fitness strictly exceeds it.
pub fn replace_by_fitness<C: Chromosome>(pop: &mut Population<C>, child: Entity<C>) {
    if pop.size() == 0 {
        pop.adopt(child);
        return;
    }
    let worst_rank = pop.size() - 1;
    if child.fitness() > pop.entity_at_rank(worst_rank).fitness() {
        pop.dereference_by_rank(worst_rank);
        pop.adopt(child);
    }
}

fn replace_op<C: Chromosome>() -> BoundOp<ReplaceDyn<C>> {
    let f: Arc<ReplaceDyn<C>> = Arc::new(replace_by_fitness::<C>);
    BoundOp::builtin(ids::REPLACE_BY_FITNESS, f)
}

// Generic allele helpers shared by the typed operators.

fn mix_loci<T: Copy>(a: &[T], b: &[T], c: &mut [T], d: &mut [T], rng: &mut dyn RngCore) {
    for i in 0..a.len().min(b.len()) {
        if rng.random_bool(0.5) {
            c[i] = a[i];
            d[i] = b[i];
        } else {
            c[i] = b[i];
            d[i] = a[i];
        }
    }
}

fn splice_loci<T: Copy>(a: &[T], b: &[T], c: &mut [T], d: &mut [T], cut: usize) {
    let cut = cut.min(a.len()).min(b.len());
    c[..cut].copy_from_slice(&a[..cut]);
    c[cut..].copy_from_slice(&b[cut..]);
    d[..cut].copy_from_slice(&b[..cut]);
    d[cut..].copy_from_slice(&a[cut..]);
}

// Integer chromosome operators.

/// Seeds every allele uniformly from `[min, max)`.
pub fn seed_integer_random(min: i32, max: i32) -> BoundOp<SeedDyn<IntegerChromosome>> {
    assert!(min < max, "empty allele range {min}..{max}");
    let f: Arc<SeedDyn<IntegerChromosome>> =
        Arc::new(move |_pop, entity: &mut Entity<IntegerChromosome>, rng: &mut dyn RngCore| {
            for chrom in entity.chromosomes_mut() {
                for allele in chrom.alleles_mut() {
                    *allele = rng.random_range(min..max);
                }
            }
            true
        });
    BoundOp::builtin(ids::SEED_INTEGER_RANDOM, f)
}

/// Seeds every allele to zero.
pub fn seed_integer_zero() -> BoundOp<SeedDyn<IntegerChromosome>> {
    let f: Arc<SeedDyn<IntegerChromosome>> =
        Arc::new(|_pop, entity: &mut Entity<IntegerChromosome>, _rng: &mut dyn RngCore| {
            for chrom in entity.chromosomes_mut() {
                chrom.alleles_mut().fill(0);
            }
            true
        });
    BoundOp::builtin(ids::SEED_INTEGER_ZERO, f)
}

fn drift_i32(value: i32, min: i32, max: i32, rng: &mut dyn RngCore) -> i32 {
    let stepped = if rng.random_bool(0.5) { value + 1 } else { value - 1 };
    // Wrap at the range boundaries.
    if stepped >= max {
        min
    } else if stepped < min {
        max - 1
    } else {
        stepped
    }
}

/// Nudges one allele by ±1, wrapping at the range boundaries.
pub fn mutate_integer_singlepoint_drift(min: i32, max: i32) -> BoundOp<MutateDyn<IntegerChromosome>> {
    assert!(min < max, "empty allele range {min}..{max}");
    let f: Arc<MutateDyn<IntegerChromosome>> = Arc::new(
        move |_pop,
              src: &Entity<IntegerChromosome>,
              dest: &mut Entity<IntegerChromosome>,
              rng: &mut dyn RngCore| {
            dest.copy_genome_from(src);
            let chrom = dest.chromosome_mut(rng.random_range(0..src.chromosomes().len()));
            if chrom.is_empty() {
                return;
            }
            let locus = rng.random_range(0..chrom.len());
            let alleles = chrom.alleles_mut();
            alleles[locus] = drift_i32(alleles[locus], min, max, rng);
        },
    );
    BoundOp::builtin(ids::MUTATE_INTEGER_SINGLEPOINT_DRIFT, f)
}

/// Replaces one allele with a fresh uniform draw from `[min, max)`.
pub fn mutate_integer_singlepoint_randomize(
    min: i32,
    max: i32,
) -> BoundOp<MutateDyn<IntegerChromosome>> {
    assert!(min < max, "empty allele range {min}..{max}");
    let f: Arc<MutateDyn<IntegerChromosome>> = Arc::new(
        move |_pop,
              src: &Entity<IntegerChromosome>,
              dest: &mut Entity<IntegerChromosome>,
              rng: &mut dyn RngCore| {
            dest.copy_genome_from(src);
            let chrom = dest.chromosome_mut(rng.random_range(0..src.chromosomes().len()));
            if chrom.is_empty() {
                return;
            }
            let locus = rng.random_range(0..chrom.len());
            chrom.alleles_mut()[locus] = rng.random_range(min..max);
        },
    );
    BoundOp::builtin(ids::MUTATE_INTEGER_SINGLEPOINT_RANDOMIZE, f)
}

/// Re-randomizes each allele independently with probability `per_locus_rate`.
pub fn mutate_integer_multipoint(
    min: i32,
    max: i32,
    per_locus_rate: f64,
) -> BoundOp<MutateDyn<IntegerChromosome>> {
    assert!(min < max, "empty allele range {min}..{max}");
    assert!((0.0..=1.0).contains(&per_locus_rate), "rate {per_locus_rate} outside [0, 1]");
    let f: Arc<MutateDyn<IntegerChromosome>> = Arc::new(
        move |_pop,
              src: &Entity<IntegerChromosome>,
              dest: &mut Entity<IntegerChromosome>,
              rng: &mut dyn RngCore| {
            dest.copy_genome_from(src);
            for chrom in dest.chromosomes_mut() {
                for allele in chrom.alleles_mut() {
                    if rng.random_bool(per_locus_rate) {
                        *allele = rng.random_range(min..max);
                    }
                }
            }
        },
    );
    BoundOp::builtin(ids::MUTATE_INTEGER_MULTIPOINT, f)
}

/// One cut point per chromosome; children swap tails.
pub fn crossover_integer_singlepoints() -> BoundOp<CrossoverDyn<IntegerChromosome>> {
    let f: Arc<CrossoverDyn<IntegerChromosome>> = Arc::new(
        |_pop,
         a: &Entity<IntegerChromosome>,
         b: &Entity<IntegerChromosome>,
         c: &mut Entity<IntegerChromosome>,
         d: &mut Entity<IntegerChromosome>,
         rng: &mut dyn RngCore| {
            c.copy_genome_from(a);
            d.copy_genome_from(b);
            for i in 0..a.chromosomes().len() {
                let len = a.chromosome(i).len();
                if len == 0 {
                    continue;
                }
                let cut = rng.random_range(0..len);
                splice_loci(
                    a.chromosome(i).alleles(),
                    b.chromosome(i).alleles(),
                    c.chromosome_mut(i).alleles_mut(),
                    d.chromosome_mut(i).alleles_mut(),
                    cut,
                );
            }
        },
    );
    BoundOp::builtin(ids::CROSSOVER_INTEGER_SINGLEPOINTS, f)
}

/// Two cut points per chromosome; children swap the middle segment.
pub fn crossover_integer_doublepoints() -> BoundOp<CrossoverDyn<IntegerChromosome>> {
    let f: Arc<CrossoverDyn<IntegerChromosome>> = Arc::new(
        |_pop,
         a: &Entity<IntegerChromosome>,
         b: &Entity<IntegerChromosome>,
         c: &mut Entity<IntegerChromosome>,
         d: &mut Entity<IntegerChromosome>,
         rng: &mut dyn RngCore| {
            c.copy_genome_from(a);
            d.copy_genome_from(b);
            for i in 0..a.chromosomes().len() {
                let len = a.chromosome(i).len();
                if len == 0 {
                    continue;
                }
                let mut lo = rng.random_range(0..len);
                let mut hi = rng.random_range(0..len);
                if lo > hi {
                    std::mem::swap(&mut lo, &mut hi);
                }
                let ca = c.chromosome_mut(i);
                ca.alleles_mut()[lo..hi].copy_from_slice(&b.chromosome(i).alleles()[lo..hi]);
                let da = d.chromosome_mut(i);
                da.alleles_mut()[lo..hi].copy_from_slice(&a.chromosome(i).alleles()[lo..hi]);
            }
        },
    );
    BoundOp::builtin(ids::CROSSOVER_INTEGER_DOUBLEPOINTS, f)
}

/// Each locus is drawn from one parent or the other with equal probability.
pub fn crossover_integer_allele_mixing() -> BoundOp<CrossoverDyn<IntegerChromosome>> {
    let f: Arc<CrossoverDyn<IntegerChromosome>> = Arc::new(
        |_pop,
         a: &Entity<IntegerChromosome>,
         b: &Entity<IntegerChromosome>,
         c: &mut Entity<IntegerChromosome>,
         d: &mut Entity<IntegerChromosome>,
         rng: &mut dyn RngCore| {
            c.copy_genome_from(a);
            d.copy_genome_from(b);
            for i in 0..a.chromosomes().len() {
                let mut cv = a.chromosome(i).alleles().to_vec();
                let mut dv = b.chromosome(i).alleles().to_vec();
                mix_loci(
                    a.chromosome(i).alleles(),
                    b.chromosome(i).alleles(),
                    &mut cv,
                    &mut dv,
                    rng,
                );
                c.chromosome_mut(i).alleles_mut().copy_from_slice(&cv);
                d.chromosome_mut(i).alleles_mut().copy_from_slice(&dv);
            }
        },
    );
    BoundOp::builtin(ids::CROSSOVER_INTEGER_ALLELE_MIXING, f)
}

// Printable chromosome operators.

/// Seeds every character uniformly from the printable ASCII range.
pub fn seed_printable_random() -> BoundOp<SeedDyn<PrintableChromosome>> {
    let f: Arc<SeedDyn<PrintableChromosome>> =
        Arc::new(|_pop, entity: &mut Entity<PrintableChromosome>, rng: &mut dyn RngCore| {
            for chrom in entity.chromosomes_mut() {
                for ch in chrom.bytes_mut() {
                    *ch = rng.random_range(PRINTABLE_MIN..=PRINTABLE_MAX);
                }
            }
            true
        });
    BoundOp::builtin(ids::SEED_PRINTABLE_RANDOM, f)
}

fn drift_printable(value: u8, rng: &mut dyn RngCore) -> u8 {
    if rng.random_bool(0.5) {
        if value >= PRINTABLE_MAX {
            PRINTABLE_MIN
        } else {
            value + 1
        }
    } else if value <= PRINTABLE_MIN {
        PRINTABLE_MAX
    } else {
        value - 1
    }
}

/// Nudges one character by ±1, wrapping inside the printable range.
pub fn mutate_printable_singlepoint_drift() -> BoundOp<MutateDyn<PrintableChromosome>> {
    let f: Arc<MutateDyn<PrintableChromosome>> = Arc::new(
        |_pop,
         src: &Entity<PrintableChromosome>,
         dest: &mut Entity<PrintableChromosome>,
         rng: &mut dyn RngCore| {
            dest.copy_genome_from(src);
            let chrom = dest.chromosome_mut(rng.random_range(0..src.chromosomes().len()));
            if chrom.is_empty() {
                return;
            }
            let locus = rng.random_range(0..chrom.len());
            let bytes = chrom.bytes_mut();
            bytes[locus] = drift_printable(bytes[locus], rng);
        },
    );
    BoundOp::builtin(ids::MUTATE_PRINTABLE_SINGLEPOINT_DRIFT, f)
}

/// Replaces one character with a fresh printable draw.
pub fn mutate_printable_singlepoint_randomize() -> BoundOp<MutateDyn<PrintableChromosome>> {
    let f: Arc<MutateDyn<PrintableChromosome>> = Arc::new(
        |_pop,
         src: &Entity<PrintableChromosome>,
         dest: &mut Entity<PrintableChromosome>,
         rng: &mut dyn RngCore| {
            dest.copy_genome_from(src);
            let chrom = dest.chromosome_mut(rng.random_range(0..src.chromosomes().len()));
            if chrom.is_empty() {
                return;
            }
            let locus = rng.random_range(0..chrom.len());
            chrom.bytes_mut()[locus] = rng.random_range(PRINTABLE_MIN..=PRINTABLE_MAX);
        },
    );
    BoundOp::builtin(ids::MUTATE_PRINTABLE_SINGLEPOINT_RANDOMIZE, f)
}

/// One cut point per chromosome; children swap tails.
pub fn crossover_printable_singlepoints() -> BoundOp<CrossoverDyn<PrintableChromosome>> {
    let f: Arc<CrossoverDyn<PrintableChromosome>> = Arc::new(
        |_pop,
         a: &Entity<PrintableChromosome>,
         b: &Entity<PrintableChromosome>,
         c: &mut Entity<PrintableChromosome>,
         d: &mut Entity<PrintableChromosome>,
         rng: &mut dyn RngCore| {
            c.copy_genome_from(a);
            d.copy_genome_from(b);
            for i in 0..a.chromosomes().len() {
                let len = a.chromosome(i).len();
                if len == 0 {
                    continue;
                }
                let cut = rng.random_range(0..len);
                splice_loci(
                    a.chromosome(i).as_bytes(),
                    b.chromosome(i).as_bytes(),
                    c.chromosome_mut(i).bytes_mut(),
                    d.chromosome_mut(i).bytes_mut(),
                    cut,
                );
            }
        },
    );
    BoundOp::builtin(ids::CROSSOVER_PRINTABLE_SINGLEPOINTS, f)
}

/// Each character is drawn from one parent or the other with equal
/// probability.
pub fn crossover_printable_allele_mixing() -> BoundOp<CrossoverDyn<PrintableChromosome>> {
    let f: Arc<CrossoverDyn<PrintableChromosome>> = Arc::new(
        |_pop,
         a: &Entity<PrintableChromosome>,
         b: &Entity<PrintableChromosome>,
         c: &mut Entity<PrintableChromosome>,
         d: &mut Entity<PrintableChromosome>,
         rng: &mut dyn RngCore| {
            c.copy_genome_from(a);
            d.copy_genome_from(b);
            for i in 0..a.chromosomes().len() {
                let mut cv = a.chromosome(i).as_bytes().to_vec();
                let mut dv = b.chromosome(i).as_bytes().to_vec();
                mix_loci(a.chromosome(i).as_bytes(), b.chromosome(i).as_bytes(), &mut cv, &mut dv, rng);
                c.chromosome_mut(i).bytes_mut().copy_from_slice(&cv);
                d.chromosome_mut(i).bytes_mut().copy_from_slice(&dv);
            }
        },
    );
    BoundOp::builtin(ids::CROSSOVER_PRINTABLE_ALLELE_MIXING, f)
}

fn register_selectors<C: Chromosome>(catalog: &mut OperatorCatalog<C>) {
    catalog.register_select_one(ids::SELECT_ONE_RANDOM, "select_one_random", Arc::new(RandomSelection));
    catalog.register_select_two(ids::SELECT_TWO_RANDOM, "select_two_random", Arc::new(RandomSelection));
    catalog.register_select_one(ids::SELECT_ONE_EVERY, "select_one_every", Arc::new(EverySelection));
    catalog.register_select_two(ids::SELECT_TWO_EVERY, "select_two_every", Arc::new(EverySelection));
    catalog.register_select_one(
        ids::SELECT_ONE_ROULETTE,
        "select_one_roulette",
        Arc::new(RouletteSelection::new()),
    );
    catalog.register_select_two(
        ids::SELECT_TWO_ROULETTE,
        "select_two_roulette",
        Arc::new(RouletteSelection::new()),
    );
    catalog.register_select_one(
        ids::SELECT_ONE_ROULETTE_REBASED,
        "select_one_roulette_rebased",
        Arc::new(RouletteSelection::rebased()),
    );
    catalog.register_select_two(
        ids::SELECT_TWO_ROULETTE_REBASED,
        "select_two_roulette_rebased",
        Arc::new(RouletteSelection::rebased()),
    );
    catalog.register_select_one(ids::SELECT_ONE_SUS, "select_one_sus", Arc::new(SusSelection));
    catalog.register_select_two(ids::SELECT_TWO_SUS, "select_two_sus", Arc::new(SusSelection));
    catalog.register_select_one(ids::SELECT_ONE_BESTOF2, "select_one_bestof2", Arc::new(BestOfTwoSelection));
    catalog.register_select_two(ids::SELECT_TWO_BESTOF2, "select_two_bestof2", Arc::new(BestOfTwoSelection));
}

/// Catalog of built-in operators over integer chromosomes with alleles in
/// `[allele_min, allele_max)`.
pub fn integer_catalog(allele_min: i32, allele_max: i32) -> OperatorCatalog<IntegerChromosome> {
    let mut catalog = OperatorCatalog::new();
    register_selectors(&mut catalog);

    let op = seed_integer_random(allele_min, allele_max);
    catalog.register_seed(op.id, "seed_integer_random", op.f);
    let op = seed_integer_zero();
    catalog.register_seed(op.id, "seed_integer_zero", op.f);

    let op = mutate_integer_singlepoint_drift(allele_min, allele_max);
    catalog.register_mutate(op.id, "mutate_integer_singlepoint_drift", op.f);
    let op = mutate_integer_singlepoint_randomize(allele_min, allele_max);
    catalog.register_mutate(op.id, "mutate_integer_singlepoint_randomize", op.f);
    let op = mutate_integer_multipoint(allele_min, allele_max, 0.05);
    catalog.register_mutate(op.id, "mutate_integer_multipoint", op.f);

    let op = crossover_integer_singlepoints();
    catalog.register_crossover(op.id, "crossover_integer_singlepoints", op.f);
    let op = crossover_integer_doublepoints();
    catalog.register_crossover(op.id, "crossover_integer_doublepoints", op.f);
    let op = crossover_integer_allele_mixing();
    catalog.register_crossover(op.id, "crossover_integer_allele_mixing", op.f);

    let op = replace_op::<IntegerChromosome>();
    catalog.register_replace(op.id, "replace_by_fitness", op.f);

    catalog
}

/// Catalog of built-in operators over printable-character chromosomes.
pub fn printable_catalog() -> OperatorCatalog<PrintableChromosome> {
    let mut catalog = OperatorCatalog::new();
    register_selectors(&mut catalog);

    let op = seed_printable_random();
    catalog.register_seed(op.id, "seed_printable_random", op.f);

    let op = mutate_printable_singlepoint_drift();
    catalog.register_mutate(op.id, "mutate_printable_singlepoint_drift", op.f);
    let op = mutate_printable_singlepoint_randomize();
    catalog.register_mutate(op.id, "mutate_printable_singlepoint_randomize", op.f);

    let op = crossover_printable_singlepoints();
    catalog.register_crossover(op.id, "crossover_printable_singlepoints", op.f);
    let op = crossover_printable_allele_mixing();
    catalog.register_crossover(op.id, "crossover_printable_allele_mixing", op.f);

    let op = replace_op::<PrintableChromosome>();
    catalog.register_replace(op.id, "replace_by_fitness", op.f);

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::Population;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn int_population() -> Population<IntegerChromosome> {
        let mut pop = Population::new(4, 1, 6);
        let seed = seed_integer_random(0, 100);
        pop.ops_mut().seed = Some(seed);
        pop
    }

    #[test]
    fn test_seed_integer_random_respects_range() {
        let mut pop = int_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        assert!(pop.seed_population(&mut rng));
        for r in 0..pop.size() {
            for &a in pop.entity_at_rank(r).chromosome(0).alleles() {
                assert!((0..100).contains(&a));
            }
        }
    }

    #[test]
    fn test_drift_wraps_at_boundaries() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for _ in 0..64 {
            let up = drift_i32(99, 0, 100, &mut rng);
            assert!(up == 0 || up == 98);
            let down = drift_i32(0, 0, 100, &mut rng);
            assert!(down == 1 || down == 99);
        }
    }

    #[test]
    fn test_mutate_singlepoint_changes_exactly_one_locus() {
        let mut pop = int_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        pop.seed_population(&mut rng);
        let src = pop.entity_at_rank(0).clone();
        let mut dest = src.clone();
        let op = mutate_integer_singlepoint_randomize(0, 1000);
        (op.f)(&pop, &src, &mut dest, &mut rng);
        let diffs = src
            .chromosome(0)
            .alleles()
            .iter()
            .zip(dest.chromosome(0).alleles())
            .filter(|(a, b)| a != b)
            .count();
        assert!(diffs <= 1);
    }

    #[test]
    fn test_crossover_mixing_preserves_allele_multiset_per_locus() {
        let pop = int_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let a = Entity::from_chromosomes(vec![IntegerChromosome::new(vec![1; 6])]);
        let b = Entity::from_chromosomes(vec![IntegerChromosome::new(vec![2; 6])]);
        let mut c = Entity::from_chromosomes(vec![IntegerChromosome::alloc(6)]);
        let mut d = Entity::from_chromosomes(vec![IntegerChromosome::alloc(6)]);
        let op = crossover_integer_allele_mixing();
        (op.f)(&pop, &a, &b, &mut c, &mut d, &mut rng);
        for i in 0..6 {
            let (cv, dv) = (c.chromosome(0).alleles()[i], d.chromosome(0).alleles()[i]);
            assert_eq!(cv + dv, 3, "locus {i} lost an allele");
        }
    }

    #[test]
    fn test_crossover_singlepoints_is_a_splice() {
        let pop = int_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let a = Entity::from_chromosomes(vec![IntegerChromosome::new(vec![1; 6])]);
        let b = Entity::from_chromosomes(vec![IntegerChromosome::new(vec![2; 6])]);
        let mut c = Entity::from_chromosomes(vec![IntegerChromosome::alloc(6)]);
        let mut d = Entity::from_chromosomes(vec![IntegerChromosome::alloc(6)]);
        let op = crossover_integer_singlepoints();
        (op.f)(&pop, &a, &b, &mut c, &mut d, &mut rng);
        // c must be a (possibly empty) run of 1s followed by 2s.
        let alleles = c.chromosome(0).alleles();
        let first_two = alleles.iter().position(|&v| v == 2).unwrap_or(6);
        assert!(alleles[..first_two].iter().all(|&v| v == 1));
        assert!(alleles[first_two..].iter().all(|&v| v == 2));
    }

    #[test]
    fn test_replace_by_fitness_displaces_strictly_worse_only() {
        let mut pop = int_population();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(13);
        pop.seed_population(&mut rng);
        for r in 0..pop.size() {
            let id = pop.id_at_rank(r);
            pop.entity_mut(id).set_fitness(10.0);
        }
        pop.sort_by_fitness();

        let mut equal = Entity::from_chromosomes(vec![IntegerChromosome::alloc(6)]);
        equal.set_fitness(10.0);
        replace_by_fitness(&mut pop, equal);
        assert_eq!(pop.size(), 4, "equal fitness must not displace");

        let mut better = Entity::from_chromosomes(vec![IntegerChromosome::alloc(6)]);
        better.set_fitness(11.0);
        replace_by_fitness(&mut pop, better);
        assert_eq!(pop.size(), 4);
        let max = (0..4).map(|r| pop.entity_at_rank(r).fitness().get()).fold(f64::MIN, f64::max);
        assert_eq!(max, 11.0);
    }

    #[test]
    fn test_printable_seed_and_drift_stay_printable() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
        let mut pop: Population<PrintableChromosome> = Population::new(2, 1, 16);
        let seed = seed_printable_random();
        pop.ops_mut().seed = Some(seed);
        pop.seed_population(&mut rng);

        let src = pop.entity_at_rank(0).clone();
        let mut dest = src.clone();
        let op = mutate_printable_singlepoint_drift();
        for _ in 0..100 {
            (op.f)(&pop, &src, &mut dest, &mut rng);
            assert!(dest
                .chromosome(0)
                .as_bytes()
                .iter()
                .all(|&b| (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&b)));
        }
    }

    #[test]
    fn test_catalogs_register_disjoint_slot_kinds() {
        let cat = integer_catalog(0, 10);
        assert!(cat.select_two_op(ids::SELECT_TWO_SUS).is_some());
        assert!(cat.mutate_op(ids::MUTATE_INTEGER_SINGLEPOINT_DRIFT).is_some());
        assert!(cat.mutate_op(ids::MUTATE_PRINTABLE_SINGLEPOINT_DRIFT).is_none());

        let cat = printable_catalog();
        assert!(cat.seed_op(ids::SEED_PRINTABLE_RANDOM).is_some());
        assert!(cat.seed_op(ids::SEED_INTEGER_RANDOM).is_none());
    }
}
