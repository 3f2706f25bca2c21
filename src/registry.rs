//! The process-wide population table.
//!
//! External bindings that cannot hold references identify populations by
//! small integer handles. The table is created lazily on the first
//! insertion and torn down when the last population is removed; every
//! operation is serialised by one mutex. Registration is explicit; the
//! engine itself never consults the table.
//!
//! Populations of any chromosome type share the table, so entries are
//! stored type-erased; typed lookups downcast back.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::genome::Chromosome;
use crate::population::Population;

/// Handle identifying a registered population. Handles are reused after
/// removal.
pub type PopulationId = u32;

/// A registered population, shared behind a mutex. A population is not
/// internally thread-safe; the mutex serialises all access to it.
pub type SharedPopulation<C> = Arc<Mutex<Population<C>>>;

struct PopTable {
    entries: HashMap<PopulationId, Arc<dyn Any + Send + Sync>>,
    free_ids: Vec<PopulationId>,
    next_id: PopulationId,
}

static POP_TABLE: Mutex<Option<PopTable>> = Mutex::new(None);

fn insert_entry(entry: Arc<dyn Any + Send + Sync>) -> PopulationId {
    let mut guard = POP_TABLE.lock().expect("population table mutex poisoned");
    let table = guard.get_or_insert_with(|| PopTable {
        entries: HashMap::new(),
        free_ids: Vec::new(),
        next_id: 0,
    });
    let id = table.free_ids.pop().unwrap_or_else(|| {
        let id = table.next_id;
        table.next_id += 1;
        id
    });
    table.entries.insert(id, entry);
    debug!("registered population id {id}");
    id
}

/// Tears the table down if it has become empty. Must run under the lock.
fn teardown_if_empty(guard: &mut Option<PopTable>) {
    if guard.as_ref().is_some_and(|t| t.entries.is_empty()) {
        *guard = None;
        debug!("population table torn down");
    }
}

/// Moves a population into the table, returning its handle and the shared
/// reference through which it is used from now on.
pub fn register<C: Chromosome>(pop: Population<C>) -> (PopulationId, SharedPopulation<C>) {
    let shared: SharedPopulation<C> = Arc::new(Mutex::new(pop));
    let id = insert_entry(shared.clone());
    (id, shared)
}

/// Re-inserts a previously transcended population, assigning a fresh
/// handle.
pub fn resurrect<C: Chromosome>(pop: &SharedPopulation<C>) -> PopulationId {
    insert_entry(pop.clone())
}

/// Looks a population up by handle. Returns `None` for unknown handles and
/// for populations of a different chromosome type.
pub fn lookup<C: Chromosome>(id: PopulationId) -> Option<SharedPopulation<C>> {
    let guard = POP_TABLE.lock().expect("population table mutex poisoned");
    let table = guard.as_ref()?;
    let entry = table.entries.get(&id)?.clone();
    entry.downcast::<Mutex<Population<C>>>().ok()
}

/// Reverse lookup: the handle under which `pop` is registered, if any.
pub fn id_of<C: Chromosome>(pop: &SharedPopulation<C>) -> Option<PopulationId> {
    let guard = POP_TABLE.lock().expect("population table mutex poisoned");
    let table = guard.as_ref()?;
    table.entries.iter().find_map(|(&id, entry)| {
        let same = entry
            .clone()
            .downcast::<Mutex<Population<C>>>()
            .is_ok_and(|candidate| Arc::ptr_eq(&candidate, pop));
        same.then_some(id)
    })
}

/// Removes a population from the table and returns it to the caller for
/// further use. The handle becomes reusable.
pub fn transcend<C: Chromosome>(id: PopulationId) -> Option<SharedPopulation<C>> {
    let mut guard = POP_TABLE.lock().expect("population table mutex poisoned");
    let table = guard.as_mut()?;
    let entry = table.entries.get(&id)?.clone();
    let typed = entry.downcast::<Mutex<Population<C>>>().ok()?;
    table.entries.remove(&id);
    table.free_ids.push(id);
    teardown_if_empty(&mut guard);
    Some(typed)
}

/// Removes a population from the table and drops the table's reference.
/// Returns `false` for unknown handles.
pub fn extinguish(id: PopulationId) -> bool {
    let mut guard = POP_TABLE.lock().expect("population table mutex poisoned");
    let Some(table) = guard.as_mut() else {
        return false;
    };
    let removed = table.entries.remove(&id).is_some();
    if removed {
        table.free_ids.push(id);
        teardown_if_empty(&mut guard);
    }
    removed
}

/// Removes a population found by reference. Returns `false` if it was not
/// registered.
pub fn extinguish_by_ref<C: Chromosome>(pop: &SharedPopulation<C>) -> bool {
    let mut guard = POP_TABLE.lock().expect("population table mutex poisoned");
    let Some(table) = guard.as_mut() else {
        return false;
    };
    let found = table.entries.iter().find_map(|(&id, entry)| {
        entry
            .clone()
            .downcast::<Mutex<Population<C>>>()
            .is_ok_and(|candidate| Arc::ptr_eq(&candidate, pop))
            .then_some(id)
    });
    match found {
        Some(id) => {
            table.entries.remove(&id);
            table.free_ids.push(id);
            teardown_if_empty(&mut guard);
            true
        }
        None => false,
    }
}

/// Number of registered populations, or `None` when the table does not
/// currently exist.
pub fn population_count() -> Option<usize> {
    let guard = POP_TABLE.lock().expect("population table mutex poisoned");
    guard.as_ref().map(|table| table.entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{IntegerChromosome, PrintableChromosome};

    // The table is process-global and unit tests run concurrently, so all
    // registry tests share one serialising mutex.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_register_lookup_roundtrip_and_teardown() {
        let _serial = TEST_LOCK.lock().unwrap();

        let (id_a, pop_a) = register(Population::<IntegerChromosome>::new(4, 1, 2));
        let (id_b, pop_b) = register(Population::<IntegerChromosome>::new(8, 1, 2));
        assert_ne!(id_a, id_b, "live populations must get distinct handles");
        assert_eq!(population_count(), Some(2));

        let found = lookup::<IntegerChromosome>(id_a).expect("registered population");
        assert!(Arc::ptr_eq(&found, &pop_a));
        assert_eq!(found.lock().unwrap().stable_size(), 4);

        assert_eq!(id_of(&pop_a), Some(id_a));
        assert_eq!(id_of(&pop_b), Some(id_b));

        // Wrong chromosome type resolves to nothing.
        assert!(lookup::<PrintableChromosome>(id_a).is_none());

        // Transcending returns the population and frees the handle.
        let transcended = transcend::<IntegerChromosome>(id_a).expect("was registered");
        assert!(Arc::ptr_eq(&transcended, &pop_a));
        assert!(lookup::<IntegerChromosome>(id_a).is_none());
        assert_eq!(population_count(), Some(1));

        // Resurrection re-inserts, reusing the freed handle.
        let id_again = resurrect(&transcended);
        assert_eq!(id_again, id_a);
        assert_eq!(population_count(), Some(2));

        assert!(extinguish(id_again));
        assert!(extinguish_by_ref(&pop_b));
        assert_eq!(population_count(), None, "empty table must be torn down");
    }

    #[test]
    fn test_unknown_handles_are_harmless() {
        let _serial = TEST_LOCK.lock().unwrap();

        assert!(lookup::<IntegerChromosome>(123).is_none());
        assert!(!extinguish(123));
        assert!(transcend::<IntegerChromosome>(123).is_none());
        assert_eq!(population_count(), None);

        let (id, pop) = register(Population::<IntegerChromosome>::new(2, 1, 1));
        assert!(lookup::<IntegerChromosome>(id + 1000).is_none());
        assert!(extinguish_by_ref(&pop));
        let _ = id;
    }
}
