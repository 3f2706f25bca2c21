//! Binary population and entity snapshots.
//!
//! The on-disk layout is fixed: a magic tag, a 64-byte version field, the
//! population configuration, the eighteen callback-slot ids, the entities
//! in rank order (fitness, buffer length, genome bytes), and an `"END"`
//! trailer. All fields are written in host byte order. Readers accept the
//! older 001 population format, which lacks the island field.
//!
//! Snapshots are lossy for user code: external callbacks are stored as id
//! `-1` and come back unbound; built-in callbacks are rebound through an
//! [`OperatorCatalog`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, warn};

use crate::base::Fitness;
use crate::errors::SnapshotError;
use crate::genome::Chromosome;
use crate::ops::{OperatorCatalog, OP_EXTERNAL};
use crate::population::{Elitism, Entity, EntityId, Population, Scheme};

/// Magic tag of the current population snapshot format.
pub const POPULATION_MAGIC: &[u8] = b"FORMAT: GAUL POPULATION 002";
/// Magic tag of the legacy population format (no island field).
pub const POPULATION_MAGIC_001: &[u8] = b"FORMAT: GAUL POPULATION 001";
/// Magic tag of the entity snapshot format.
pub const ENTITY_MAGIC: &[u8] = b"FORMAT: GAUL ENTITY 001";

const TRAILER: &[u8] = b"END\0";
const VERSION_FIELD_LEN: usize = 64;

fn version_field() -> [u8; VERSION_FIELD_LEN] {
    let mut field = [0u8; VERSION_FIELD_LEN];
    let tag = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));
    let len = tag.len().min(VERSION_FIELD_LEN - 1);
    field[..len].copy_from_slice(&tag.as_bytes()[..len]);
    field
}

fn write_i32<W: Write>(w: &mut W, value: i32) -> Result<(), SnapshotError> {
    w.write_all(&value.to_ne_bytes())?;
    Ok(())
}

fn write_u32<W: Write>(w: &mut W, value: u32) -> Result<(), SnapshotError> {
    w.write_all(&value.to_ne_bytes())?;
    Ok(())
}

fn write_f64<W: Write>(w: &mut W, value: f64) -> Result<(), SnapshotError> {
    w.write_all(&value.to_ne_bytes())?;
    Ok(())
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32, SnapshotError> {
    let mut bytes = [0u8; 4];
    r.read_exact(&mut bytes)?;
    Ok(i32::from_ne_bytes(bytes))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, SnapshotError> {
    let mut bytes = [0u8; 4];
    r.read_exact(&mut bytes)?;
    Ok(u32::from_ne_bytes(bytes))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64, SnapshotError> {
    let mut bytes = [0u8; 8];
    r.read_exact(&mut bytes)?;
    Ok(f64::from_ne_bytes(bytes))
}

fn read_ratio<R: Read>(r: &mut R, field: &'static str) -> Result<f64, SnapshotError> {
    let value = read_f64(r)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SnapshotError::InvalidField(field));
    }
    Ok(value)
}

fn positive(value: i32, field: &'static str) -> Result<usize, SnapshotError> {
    if value <= 0 {
        return Err(SnapshotError::InvalidField(field));
    }
    Ok(value as usize)
}

fn non_negative(value: i32, field: &'static str) -> Result<usize, SnapshotError> {
    if value < 0 {
        return Err(SnapshotError::InvalidField(field));
    }
    Ok(value as usize)
}

fn write_entity_record<C: Chromosome, W: Write>(
    pop: &Population<C>,
    id: EntityId,
    w: &mut W,
) -> Result<(), SnapshotError> {
    write_f64(w, pop.entity(id).fitness().get())?;
    let bytes = pop.encode_genome(id);
    write_u32(w, bytes.len() as u32)?;
    w.write_all(&bytes)?;
    Ok(())
}

fn read_entity_record<C: Chromosome, R: Read>(
    pop: &mut Population<C>,
    r: &mut R,
) -> Result<EntityId, SnapshotError> {
    let fitness = read_f64(r)?;
    let len = read_u32(r)? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    let chromosomes = pop.decode_genome(&bytes)?;
    let mut entity = Entity::from_chromosomes(chromosomes);
    entity.set_fitness(Fitness::new(fitness));
    Ok(pop.adopt(entity))
}

fn read_trailer<R: Read>(r: &mut R) -> Result<(), SnapshotError> {
    let mut trailer = [0u8; 4];
    r.read_exact(&mut trailer).map_err(|_| SnapshotError::BadTrailer)?;
    if trailer.as_slice() != TRAILER {
        return Err(SnapshotError::BadTrailer);
    }
    Ok(())
}

/// Writes a population snapshot.
pub fn write_population<C: Chromosome, W: Write>(
    pop: &Population<C>,
    w: &mut W,
) -> Result<(), SnapshotError> {
    w.write_all(POPULATION_MAGIC)?;
    w.write_all(&version_field())?;

    write_i32(w, pop.size() as i32)?;
    write_i32(w, pop.stable_size() as i32)?;
    write_i32(w, pop.num_chromosomes() as i32)?;
    write_i32(w, pop.len_chromosomes() as i32)?;

    write_f64(w, pop.crossover_ratio())?;
    write_f64(w, pop.mutation_ratio())?;
    write_f64(w, pop.migration_ratio())?;

    write_i32(w, pop.scheme().to_i32())?;
    write_i32(w, pop.elitism().to_i32())?;
    write_i32(w, pop.island())?;

    let ids = pop.ops().slot_ids();
    for id in ids {
        write_i32(w, id)?;
    }
    let external = ids.iter().filter(|&&id| id == OP_EXTERNAL).count();
    if external > 0 {
        warn!("{external} external callback slot(s) cannot be stored in the snapshot");
    }

    for rank in 0..pop.size() {
        write_entity_record(pop, pop.id_at_rank(rank), w)?;
    }

    w.write_all(TRAILER)?;
    Ok(())
}

/// Reads a population snapshot, rebinding built-in callbacks through
/// `catalog`. Accepts both the 002 and the legacy 001 format.
pub fn read_population<C: Chromosome, R: Read>(
    r: &mut R,
    catalog: &OperatorCatalog<C>,
) -> Result<Population<C>, SnapshotError> {
    let mut magic = [0u8; 27];
    r.read_exact(&mut magic)?;
    let has_island = if magic.as_slice() == POPULATION_MAGIC {
        true
    } else if magic.as_slice() == POPULATION_MAGIC_001 {
        debug!("reading legacy population format (pre-002)");
        false
    } else {
        return Err(SnapshotError::BadMagic);
    };

    let mut version = [0u8; VERSION_FIELD_LEN];
    r.read_exact(&mut version)?; // Presently ignored.

    let size = non_negative(read_i32(r)?, "size")?;
    let stable_size = positive(read_i32(r)?, "stable_size")?;
    let num_chromosomes = positive(read_i32(r)?, "num_chromosomes")?;
    let len_chromosomes = non_negative(read_i32(r)?, "len_chromosomes")?;

    let mut pop = Population::<C>::new(stable_size, num_chromosomes, len_chromosomes);

    pop.set_crossover_ratio(read_ratio(r, "crossover_ratio")?);
    pop.set_mutation_ratio(read_ratio(r, "mutation_ratio")?);
    pop.set_migration_ratio(read_ratio(r, "migration_ratio")?);

    let scheme =
        Scheme::from_i32(read_i32(r)?).ok_or(SnapshotError::InvalidField("scheme"))?;
    pop.set_scheme(scheme);
    let elitism =
        Elitism::from_i32(read_i32(r)?).ok_or(SnapshotError::InvalidField("elitism"))?;
    pop.set_elitism(elitism);
    if has_island {
        pop.set_island(read_i32(r)?);
    }

    let mut ids = [0i32; 18];
    for slot in ids.iter_mut() {
        *slot = read_i32(r)?;
    }
    // The constructor slot identifies the chromosome family the snapshot
    // was written for.
    if ids[4] > 0 && C::SLOT_ID_BASE > 0 && ids[4] != C::SLOT_ID_BASE {
        return Err(SnapshotError::ChromosomeKind {
            expected: C::SLOT_ID_BASE,
            found: ids[4],
        });
    }
    catalog.bind(&ids, pop.ops_mut());

    for _ in 0..size {
        read_entity_record(&mut pop, r)?;
    }

    read_trailer(r)?;
    debug!("read {} entities from population snapshot", pop.size());
    Ok(pop)
}

/// Writes a single-entity snapshot.
pub fn write_entity<C: Chromosome, W: Write>(
    pop: &Population<C>,
    id: EntityId,
    w: &mut W,
) -> Result<(), SnapshotError> {
    w.write_all(ENTITY_MAGIC)?;
    w.write_all(&version_field())?;
    write_entity_record(pop, id, w)?;
    w.write_all(TRAILER)?;
    Ok(())
}

/// Reads a single-entity snapshot into an existing population, returning
/// the new entity's id.
pub fn read_entity<C: Chromosome, R: Read>(
    pop: &mut Population<C>,
    r: &mut R,
) -> Result<EntityId, SnapshotError> {
    let mut magic = [0u8; 23];
    r.read_exact(&mut magic)?;
    if magic.as_slice() != ENTITY_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let mut version = [0u8; VERSION_FIELD_LEN];
    r.read_exact(&mut version)?;
    let id = read_entity_record(pop, r)?;
    read_trailer(r)?;
    Ok(id)
}

/// Writes a population snapshot to a file.
pub fn write_population_file<C: Chromosome, P: AsRef<Path>>(
    pop: &Population<C>,
    path: P,
) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_population(pop, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a population snapshot from a file.
pub fn read_population_file<C: Chromosome, P: AsRef<Path>>(
    path: P,
    catalog: &OperatorCatalog<C>,
) -> Result<Population<C>, SnapshotError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_population(&mut reader, catalog)
}

/// Writes a single-entity snapshot to a file.
pub fn write_entity_file<C: Chromosome, P: AsRef<Path>>(
    pop: &Population<C>,
    id: EntityId,
    path: P,
) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_entity(pop, id, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Reads a single-entity snapshot from a file into `pop`.
pub fn read_entity_file<C: Chromosome, P: AsRef<Path>>(
    pop: &mut Population<C>,
    path: P,
) -> Result<EntityId, SnapshotError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_entity(pop, &mut reader)
}
