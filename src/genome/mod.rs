//! Chromosome capability trait and the built-in chromosome types.
//!
//! The engine never inspects chromosome contents; everything it needs from a
//! genome representation is captured by the [`Chromosome`] trait. Replication
//! is `Clone`, release is `Drop`, and the byte codec backs both migration and
//! snapshots.

pub mod integer;
pub mod printable;

pub use integer::IntegerChromosome;
pub use printable::PrintableChromosome;

use crate::errors::CodecError;

/// Capabilities a chromosome value must provide to live in a population.
///
/// `alloc` is the structural constructor invoked when a fresh entity is drawn
/// from the pool; the contents it produces are unspecified until a seed
/// operator runs. `write_bytes`/`read_bytes` define the opaque byte
/// representation used by migration and snapshots; `render` is the printable
/// diagnostic form.
pub trait Chromosome: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Allocates a fresh chromosome of `len` loci.
    fn alloc(len: usize) -> Self;

    /// Number of loci.
    fn len(&self) -> usize;

    /// Whether the chromosome has no loci.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the opaque byte representation to `buf`.
    fn write_bytes(&self, buf: &mut Vec<u8>);

    /// Reconstructs a chromosome from a buffer produced by `write_bytes`.
    fn read_bytes(bytes: &[u8]) -> Result<Self, CodecError>;

    /// Printable form for diagnostics.
    fn render(&self) -> String;

    /// Base identifier of this type's six structural operator slots in
    /// snapshots. Built-in types override this with a positive id family;
    /// the default marks the type as external.
    const SLOT_ID_BASE: i32 = crate::ops::catalog::OP_EXTERNAL;
}

/// Integer-addressable loci, required by [`allele_search`] and the
/// generic mixing helpers.
///
/// [`allele_search`]: crate::evolution::allele_search
pub trait AlleleAccess: Chromosome {
    /// Value at `locus`, widened to `i64`.
    fn allele(&self, locus: usize) -> i64;

    /// Overwrites the value at `locus`. Values outside the representation's
    /// range are narrowed by the implementation.
    fn set_allele(&mut self, locus: usize, value: i64);
}
