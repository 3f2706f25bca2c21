use crate::errors::CodecError;
use crate::genome::{AlleleAccess, Chromosome};
use crate::ops::catalog::SLOT_BASE_INTEGER;

/// A chromosome of signed 32-bit integer alleles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerChromosome {
    alleles: Vec<i32>,
}

impl IntegerChromosome {
    /// Creates a chromosome from explicit allele values.
    pub fn new(alleles: Vec<i32>) -> Self {
        Self { alleles }
    }

    /// Borrow the allele values.
    pub fn alleles(&self) -> &[i32] {
        &self.alleles
    }

    /// Borrow the allele values mutably.
    pub fn alleles_mut(&mut self) -> &mut [i32] {
        &mut self.alleles
    }
}

impl Chromosome for IntegerChromosome {
    const SLOT_ID_BASE: i32 = SLOT_BASE_INTEGER;

    fn alloc(len: usize) -> Self {
        Self { alleles: vec![0; len] }
    }

    fn len(&self) -> usize {
        self.alleles.len()
    }

    fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.alleles.len() * 4);
        for allele in &self.alleles {
            buf.extend_from_slice(&allele.to_ne_bytes());
        }
    }

    fn read_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() % 4 != 0 {
            return Err(CodecError::TrailingBytes { extra: bytes.len() % 4 });
        }
        let alleles = bytes
            .chunks_exact(4)
            .map(|chunk| i32::from_ne_bytes(chunk.try_into().expect("chunk is 4 bytes")))
            .collect();
        Ok(Self { alleles })
    }

    fn render(&self) -> String {
        let parts: Vec<String> = self.alleles.iter().map(|a| a.to_string()).collect();
        parts.join(" ")
    }
}

impl AlleleAccess for IntegerChromosome {
    fn allele(&self, locus: usize) -> i64 {
        self.alleles[locus] as i64
    }

    fn set_allele(&mut self, locus: usize, value: i64) {
        self.alleles[locus] = value as i32;
    }
}

impl From<Vec<i32>> for IntegerChromosome {
    fn from(alleles: Vec<i32>) -> Self {
        Self { alleles }
    }
}
