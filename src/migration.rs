//! Migration of entities between demes as typed, tagged messages.
//!
//! Migration moves **bytes**, never references: the sender serialises each
//! emigrant's genome, dereferences it, and the receiver reconstructs a
//! fresh entity. A transfer is a three-part sequence: entity count, shared
//! buffer length, then fitness and genome bytes per entity.

use std::sync::mpsc;

use log::debug;

use crate::errors::TransportError;
use crate::genome::Chromosome;
use crate::population::{Entity, Population};

/// One tagged migration message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Number of entities in the incoming batch.
    NumEntities(u32),
    /// Byte length shared by every entity buffer in the batch.
    EntityLen(u32),
    /// Fitness of the next entity.
    EntityFitness(f64),
    /// Genome bytes of the next entity.
    EntityChromosome(Vec<u8>),
}

/// Sending half of a migration link.
pub trait MigrantSink {
    fn send(&mut self, message: Message) -> Result<(), TransportError>;
}

/// Receiving half of a migration link.
pub trait MigrantSource {
    fn recv(&mut self) -> Result<Message, TransportError>;
}

impl MigrantSink for mpsc::Sender<Message> {
    fn send(&mut self, message: Message) -> Result<(), TransportError> {
        mpsc::Sender::send(self, message).map_err(|_| TransportError::Disconnected)
    }
}

impl MigrantSource for mpsc::Receiver<Message> {
    fn recv(&mut self) -> Result<Message, TransportError> {
        mpsc::Receiver::recv(self).map_err(|_| TransportError::Disconnected)
    }
}

/// An in-process migration link over a std channel.
pub fn channel_link() -> (mpsc::Sender<Message>, mpsc::Receiver<Message>) {
    mpsc::channel()
}

/// A packed batch of emigrants, detached from their source population.
pub(crate) struct MigrantBatch {
    pub entity_len: u32,
    /// Fitness and genome bytes per emigrant.
    pub migrants: Vec<(f64, Vec<u8>)>,
}

/// Serialises the top `count` ranks of `pop` and dereferences them.
///
/// All emigrants must serialise to the same byte length; a mismatch is a
/// caller bug (variable-length genomes cannot use the batch protocol).
pub(crate) fn pack_emigrants<C: Chromosome>(
    pop: &mut Population<C>,
    count: usize,
) -> MigrantBatch {
    let count = count.min(pop.size());
    let mut migrants = Vec::with_capacity(count);
    let mut entity_len: Option<u32> = None;
    for rank in 0..count {
        let id = pop.id_at_rank(rank);
        let bytes = pop.encode_genome(id);
        match entity_len {
            None => entity_len = Some(bytes.len() as u32),
            Some(len) => assert_eq!(
                len as usize,
                bytes.len(),
                "emigrant genome buffers must share one length"
            ),
        }
        migrants.push((pop.entity(id).fitness().get(), bytes));
    }
    for _ in 0..count {
        pop.dereference_by_rank(0);
    }
    debug!("packed {count} emigrants from island {}", pop.island());
    MigrantBatch { entity_len: entity_len.unwrap_or(0), migrants }
}

/// Reconstructs a batch of immigrants into `pop`, appending them to the
/// rank index. Returns how many entities were added.
pub(crate) fn append_immigrants<C: Chromosome>(
    pop: &mut Population<C>,
    batch: MigrantBatch,
) -> usize {
    let count = batch.migrants.len();
    for (fitness, bytes) in batch.migrants {
        let chromosomes = pop
            .decode_genome(&bytes)
            .expect("immigrant genome failed to decode; incompatible deme configuration");
        let mut entity = Entity::from_chromosomes(chromosomes);
        entity.set_fitness(fitness);
        pop.adopt(entity);
    }
    debug!("island {} received {count} immigrants", pop.island());
    count
}

/// Sends the top `count` ranks of `pop` over `link` as one batch,
/// dereferencing them locally.
pub fn send_emigrants<C: Chromosome, L: MigrantSink>(
    pop: &mut Population<C>,
    count: usize,
    link: &mut L,
) -> Result<usize, TransportError> {
    let batch = pack_emigrants(pop, count);
    let sent = batch.migrants.len();
    link.send(Message::NumEntities(sent as u32))?;
    link.send(Message::EntityLen(batch.entity_len))?;
    for (fitness, bytes) in batch.migrants {
        link.send(Message::EntityFitness(fitness))?;
        link.send(Message::EntityChromosome(bytes))?;
    }
    Ok(sent)
}

/// Receives one batch from `link` and appends it to `pop`.
pub fn receive_immigrants<C: Chromosome, L: MigrantSource>(
    pop: &mut Population<C>,
    link: &mut L,
) -> Result<usize, TransportError> {
    let count = match link.recv()? {
        Message::NumEntities(n) => n as usize,
        _ => return Err(TransportError::UnexpectedMessage { expected: "NUMENTITIES" }),
    };
    let entity_len = match link.recv()? {
        Message::EntityLen(len) => len as usize,
        _ => return Err(TransportError::UnexpectedMessage { expected: "ENTITYLEN" }),
    };

    let mut migrants = Vec::with_capacity(count);
    for _ in 0..count {
        let fitness = match link.recv()? {
            Message::EntityFitness(f) => f,
            _ => return Err(TransportError::UnexpectedMessage { expected: "ENTITYFITNESS" }),
        };
        let bytes = match link.recv()? {
            Message::EntityChromosome(b) => b,
            _ => return Err(TransportError::UnexpectedMessage { expected: "ENTITYCHROMOSOME" }),
        };
        if bytes.len() != entity_len {
            return Err(TransportError::LengthMismatch {
                expected: entity_len,
                found: bytes.len(),
            });
        }
        migrants.push((fitness, bytes));
    }
    Ok(append_immigrants(pop, MigrantBatch { entity_len: entity_len as u32, migrants }))
}
