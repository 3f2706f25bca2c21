//! Evolve-write-read snapshot round trip with built-in integer operators.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use archevo::ops::builtin::{self, ids};
use archevo::prelude::*;
use archevo::registry;

fn builtin_population() -> Population<IntegerChromosome> {
    let catalog = builtin::integer_catalog(0, 100);
    let mut pop = Population::new(12, 1, 8);
    pop.ops_mut().seed = catalog.seed_op(ids::SEED_INTEGER_RANDOM);
    pop.ops_mut().mutate = catalog.mutate_op(ids::MUTATE_INTEGER_SINGLEPOINT_RANDOMIZE);
    pop.ops_mut().crossover = catalog.crossover_op(ids::CROSSOVER_INTEGER_ALLELE_MIXING);
    pop.ops_mut().select_one = catalog.select_one_op(ids::SELECT_ONE_BESTOF2);
    pop.ops_mut().select_two = catalog.select_two_op(ids::SELECT_TWO_BESTOF2);
    pop.ops_mut().replace = catalog.replace_op(ids::REPLACE_BY_FITNESS);
    pop.set_evaluate(|_, e| {
        let total: i64 = e.chromosome(0).alleles().iter().map(|&a| a as i64).sum();
        e.set_fitness(total as f64);
        true
    });
    pop.set_parameters(EvolutionParams {
        scheme: Scheme::Darwin,
        elitism: Elitism::None,
        crossover_ratio: 0.7,
        mutation_ratio: 0.3,
        migration_ratio: 0.0,
    });
    pop
}

#[test]
fn evolved_population_roundtrips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evolved.pop");

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    let mut pop = builtin_population();
    pop.seed_population(&mut rng);
    pop.score_all();
    evolve_generational(&mut pop, 5, &mut rng);

    write_population_file(&pop, &path).unwrap();
    let catalog = builtin::integer_catalog(0, 100);
    let restored = read_population_file::<IntegerChromosome, _>(&path, &catalog).unwrap();

    assert_eq!(restored.size(), pop.size());
    assert_eq!(restored.stable_size(), pop.stable_size());
    assert_eq!(restored.parameters(), pop.parameters());
    assert_eq!(restored.island(), pop.island());
    for rank in 0..pop.size() {
        assert_eq!(
            restored.entity_at_rank(rank).fitness(),
            pop.entity_at_rank(rank).fitness(),
            "fitness mismatch at rank {rank}"
        );
        assert_eq!(
            restored.encode_genome(restored.id_at_rank(rank)),
            pop.encode_genome(pop.id_at_rank(rank)),
            "genome bytes mismatch at rank {rank}"
        );
    }

    // Built-in operators were rebound; the external evaluate slot is lossy
    // and must be re-bound by the caller.
    assert!(restored.ops().seed.is_some());
    assert!(restored.ops().mutate.is_some());
    assert!(restored.ops().evaluate.is_none());
}

#[test]
fn restored_population_can_continue_evolving() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.pop");

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
    let mut pop = builtin_population();
    pop.seed_population(&mut rng);
    pop.score_all();
    evolve_generational(&mut pop, 3, &mut rng);
    write_population_file(&pop, &path).unwrap();

    let catalog = builtin::integer_catalog(0, 100);
    let mut restored = read_population_file::<IntegerChromosome, _>(&path, &catalog).unwrap();
    restored.set_evaluate(|_, e| {
        let total: i64 = e.chromosome(0).alleles().iter().map(|&a| a as i64).sum();
        e.set_fitness(total as f64);
        true
    });

    let best_before = restored.entity_at_rank(0).fitness().get();
    evolve_generational(&mut restored, 20, &mut rng);
    let best_after = restored.entity_at_rank(0).fitness().get();
    assert!(best_after >= best_before);
    assert_eq!(restored.size(), 12);
}

#[test]
fn entity_snapshot_moves_between_populations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("champion.ent");

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
    let mut pop = builtin_population();
    pop.seed_population(&mut rng);
    pop.score_all();
    pop.sort_by_fitness();

    let champion = pop.id_at_rank(0);
    write_entity_file(&pop, champion, &path).unwrap();

    let mut other = pop.clone_empty();
    let immigrant = read_entity_file(&mut other, &path).unwrap();
    assert_eq!(other.size(), 1);
    assert_eq!(other.entity(immigrant).fitness(), pop.entity(champion).fitness());
    assert_eq!(other.encode_genome(immigrant), pop.encode_genome(champion));
}

#[test]
fn registry_roundtrip_with_transcend_and_resurrect() {
    // Integration-level pass over the registry: register, look up, pull the
    // population out for analysis, put it back.
    let (id, shared) = registry::register(builtin_population());
    let found = registry::lookup::<IntegerChromosome>(id).expect("registered population");
    assert_eq!(found.lock().unwrap().stable_size(), 12);

    let transcended =
        registry::transcend::<IntegerChromosome>(id).expect("population was registered");
    assert!(registry::lookup::<IntegerChromosome>(id).is_none());

    let new_id = registry::resurrect(&transcended);
    assert!(registry::lookup::<IntegerChromosome>(new_id).is_some());
    assert!(registry::extinguish(new_id));
    drop(shared);
}
