//! Registration of named built-in operators under stable integer ids.
//!
//! Snapshots store one id per callback slot. Writing uses the tag carried by
//! each [`BoundOp`]; reading resolves ids back to callbacks through a
//! caller-supplied catalog. External operators (id `-1`) round-trip as
//! unbound slots that the caller must re-bind.

use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use crate::genome::Chromosome;
use crate::ops::{
    AdaptDyn, BoundOp, CrossoverDyn, EvaluateDyn, MutateDyn, Operators, ReplaceDyn, SeedDyn,
    SelectOne, SelectTwo,
};

/// Id of an unbound callback slot.
pub const OP_NULL: i32 = 0;
/// Id of an external (user-supplied) operator a snapshot cannot restore.
pub const OP_EXTERNAL: i32 = -1;

/// Base id of the integer chromosome's six structural operator slots.
pub const SLOT_BASE_INTEGER: i32 = 60;
/// Base id of the printable chromosome's six structural operator slots.
pub const SLOT_BASE_PRINTABLE: i32 = 72;

/// A keyed map from stable ids to named built-in operators for one
/// chromosome type. Populations written to disk record ids; reading a
/// snapshot resolves them through a catalog.
pub struct OperatorCatalog<C: Chromosome> {
    names: HashMap<i32, &'static str>,
    evaluate: HashMap<i32, Arc<EvaluateDyn<C>>>,
    seed: HashMap<i32, Arc<SeedDyn<C>>>,
    adapt: HashMap<i32, Arc<AdaptDyn<C>>>,
    select_one: HashMap<i32, Arc<dyn SelectOne<C>>>,
    select_two: HashMap<i32, Arc<dyn SelectTwo<C>>>,
    mutate: HashMap<i32, Arc<MutateDyn<C>>>,
    crossover: HashMap<i32, Arc<CrossoverDyn<C>>>,
    replace: HashMap<i32, Arc<ReplaceDyn<C>>>,
}

impl<C: Chromosome> Default for OperatorCatalog<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Chromosome> OperatorCatalog<C> {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            evaluate: HashMap::new(),
            seed: HashMap::new(),
            adapt: HashMap::new(),
            select_one: HashMap::new(),
            select_two: HashMap::new(),
            mutate: HashMap::new(),
            crossover: HashMap::new(),
            replace: HashMap::new(),
        }
    }

    fn claim(&mut self, id: i32, name: &'static str) {
        assert!(id > 0, "built-in operator ids must be positive, got {id}");
        let previous = self.names.insert(id, name);
        assert!(
            previous.is_none(),
            "operator id {id} registered twice ({} and {name})",
            previous.unwrap_or_default()
        );
    }

    /// Name registered for `id`, if any.
    pub fn name(&self, id: i32) -> Option<&'static str> {
        self.names.get(&id).copied()
    }

    /// Id registered under `name`, if any.
    pub fn id_by_name(&self, name: &str) -> Option<i32> {
        self.names.iter().find_map(|(&id, &n)| (n == name).then_some(id))
    }

    pub fn register_evaluate(&mut self, id: i32, name: &'static str, f: Arc<EvaluateDyn<C>>) {
        self.claim(id, name);
        self.evaluate.insert(id, f);
    }

    pub fn register_seed(&mut self, id: i32, name: &'static str, f: Arc<SeedDyn<C>>) {
        self.claim(id, name);
        self.seed.insert(id, f);
    }

    pub fn register_adapt(&mut self, id: i32, name: &'static str, f: Arc<AdaptDyn<C>>) {
        self.claim(id, name);
        self.adapt.insert(id, f);
    }

    pub fn register_select_one(&mut self, id: i32, name: &'static str, s: Arc<dyn SelectOne<C>>) {
        self.claim(id, name);
        self.select_one.insert(id, s);
    }

    pub fn register_select_two(&mut self, id: i32, name: &'static str, s: Arc<dyn SelectTwo<C>>) {
        self.claim(id, name);
        self.select_two.insert(id, s);
    }

    pub fn register_mutate(&mut self, id: i32, name: &'static str, f: Arc<MutateDyn<C>>) {
        self.claim(id, name);
        self.mutate.insert(id, f);
    }

    pub fn register_crossover(&mut self, id: i32, name: &'static str, f: Arc<CrossoverDyn<C>>) {
        self.claim(id, name);
        self.crossover.insert(id, f);
    }

    pub fn register_replace(&mut self, id: i32, name: &'static str, f: Arc<ReplaceDyn<C>>) {
        self.claim(id, name);
        self.replace.insert(id, f);
    }

    /// Looks up a seed operator as a bindable slot value.
    pub fn seed_op(&self, id: i32) -> Option<BoundOp<SeedDyn<C>>> {
        self.seed.get(&id).map(|f| BoundOp::builtin(id, Arc::clone(f)))
    }

    pub fn evaluate_op(&self, id: i32) -> Option<BoundOp<EvaluateDyn<C>>> {
        self.evaluate.get(&id).map(|f| BoundOp::builtin(id, Arc::clone(f)))
    }

    pub fn adapt_op(&self, id: i32) -> Option<BoundOp<AdaptDyn<C>>> {
        self.adapt.get(&id).map(|f| BoundOp::builtin(id, Arc::clone(f)))
    }

    pub fn select_one_op(&self, id: i32) -> Option<BoundOp<dyn SelectOne<C>>> {
        self.select_one.get(&id).map(|s| BoundOp::builtin(id, Arc::clone(s)))
    }

    pub fn select_two_op(&self, id: i32) -> Option<BoundOp<dyn SelectTwo<C>>> {
        self.select_two.get(&id).map(|s| BoundOp::builtin(id, Arc::clone(s)))
    }

    pub fn mutate_op(&self, id: i32) -> Option<BoundOp<MutateDyn<C>>> {
        self.mutate.get(&id).map(|f| BoundOp::builtin(id, Arc::clone(f)))
    }

    pub fn crossover_op(&self, id: i32) -> Option<BoundOp<CrossoverDyn<C>>> {
        self.crossover.get(&id).map(|f| BoundOp::builtin(id, Arc::clone(f)))
    }

    pub fn replace_op(&self, id: i32) -> Option<BoundOp<ReplaceDyn<C>>> {
        self.replace.get(&id).map(|f| BoundOp::builtin(id, Arc::clone(f)))
    }

    /// Rebinds the resolvable slots of `ops` from snapshot slot ids, in the
    /// fixed snapshot slot order. Returns how many non-null slots could not
    /// be resolved (external operators and unregistered ids).
    pub fn bind(&self, ids: &[i32; 18], ops: &mut Operators<C>) -> usize {
        let mut unresolved = 0;
        let mut miss = |id: i32| {
            if id != OP_NULL {
                unresolved += 1;
            }
        };

        // Hooks and phenome management have no built-in implementations.
        miss(ids[0]);
        miss(ids[1]);
        miss(ids[2]);
        miss(ids[3]);
        // Structural slots 4..=9 are carried by the chromosome type itself.

        match self.evaluate_op(ids[10]) {
            Some(op) => ops.evaluate = Some(op),
            None => miss(ids[10]),
        }
        match self.seed_op(ids[11]) {
            Some(op) => ops.seed = Some(op),
            None => miss(ids[11]),
        }
        match self.adapt_op(ids[12]) {
            Some(op) => ops.adapt = Some(op),
            None => miss(ids[12]),
        }
        match self.select_one_op(ids[13]) {
            Some(op) => ops.select_one = Some(op),
            None => miss(ids[13]),
        }
        match self.select_two_op(ids[14]) {
            Some(op) => ops.select_two = Some(op),
            None => miss(ids[14]),
        }
        match self.mutate_op(ids[15]) {
            Some(op) => ops.mutate = Some(op),
            None => miss(ids[15]),
        }
        match self.crossover_op(ids[16]) {
            Some(op) => ops.crossover = Some(op),
            None => miss(ids[16]),
        }
        match self.replace_op(ids[17]) {
            Some(op) => ops.replace = Some(op),
            None => miss(ids[17]),
        }

        if unresolved > 0 {
            warn!("{unresolved} callback slot(s) could not be rebound from the snapshot");
        }
        unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::IntegerChromosome;
    use crate::ops::builtin;

    #[test]
    fn test_register_and_lookup() {
        let catalog = builtin::integer_catalog(0, 100);
        let op = catalog.seed_op(builtin::ids::SEED_INTEGER_RANDOM).unwrap();
        assert_eq!(op.id, builtin::ids::SEED_INTEGER_RANDOM);
        assert_eq!(catalog.name(op.id), Some("seed_integer_random"));
        assert_eq!(catalog.id_by_name("seed_integer_random"), Some(op.id));
        assert!(catalog.seed_op(9999).is_none());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn test_duplicate_id_panics() {
        let mut catalog: OperatorCatalog<IntegerChromosome> = OperatorCatalog::new();
        let f: Arc<ReplaceDyn<IntegerChromosome>> = Arc::new(|_, _| {});
        catalog.register_replace(7, "first", Arc::clone(&f));
        catalog.register_replace(7, "second", f);
    }

    #[test]
    fn test_bind_reports_unresolved_slots() {
        let catalog = builtin::integer_catalog(0, 100);
        let mut ops = Operators::<IntegerChromosome>::default();
        let mut ids = [OP_NULL; 18];
        ids[0] = OP_EXTERNAL; // external generation hook
        ids[11] = builtin::ids::SEED_INTEGER_RANDOM;
        ids[15] = 9999; // unregistered mutator
        let unresolved = catalog.bind(&ids, &mut ops);
        assert_eq!(unresolved, 2);
        assert!(ops.seed.is_some());
        assert!(ops.mutate.is_none());
    }
}
