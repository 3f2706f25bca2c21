use crate::errors::CodecError;
use crate::genome::{AlleleAccess, Chromosome};
use crate::ops::catalog::SLOT_BASE_PRINTABLE;

/// Lowest allele of the printable ASCII range (space).
pub const PRINTABLE_MIN: u8 = b' ';
/// Highest allele of the printable ASCII range (tilde).
pub const PRINTABLE_MAX: u8 = b'~';

/// A chromosome of printable ASCII characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintableChromosome {
    chars: Vec<u8>,
}

impl PrintableChromosome {
    /// Creates a chromosome from raw bytes. Non-printable bytes are accepted
    /// here; seeding and mutation keep values inside the printable range.
    pub fn new(chars: Vec<u8>) -> Self {
        Self { chars }
    }

    /// Borrow the character bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.chars
    }

    /// Borrow the character bytes mutably.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.chars
    }
}

impl Chromosome for PrintableChromosome {
    const SLOT_ID_BASE: i32 = SLOT_BASE_PRINTABLE;

    fn alloc(len: usize) -> Self {
        Self { chars: vec![PRINTABLE_MIN; len] }
    }

    fn len(&self) -> usize {
        self.chars.len()
    }

    fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.chars);
    }

    fn read_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(Self { chars: bytes.to_vec() })
    }

    fn render(&self) -> String {
        String::from_utf8_lossy(&self.chars).into_owned()
    }
}

impl AlleleAccess for PrintableChromosome {
    fn allele(&self, locus: usize) -> i64 {
        self.chars[locus] as i64
    }

    fn set_allele(&mut self, locus: usize, value: i64) {
        self.chars[locus] = value as u8;
    }
}

impl From<&str> for PrintableChromosome {
    fn from(text: &str) -> Self {
        Self { chars: text.as_bytes().to_vec() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_fills_with_spaces() {
        let chrom = PrintableChromosome::alloc(4);
        assert_eq!(chrom.as_bytes(), b"    ");
    }

    #[test]
    fn test_byte_roundtrip() {
        let chrom = PrintableChromosome::from("When we reflect");
        let mut buf = Vec::new();
        chrom.write_bytes(&mut buf);
        let back = PrintableChromosome::read_bytes(&buf).unwrap();
        assert_eq!(back, chrom);
    }

    #[test]
    fn test_render() {
        assert_eq!(PrintableChromosome::from("abc").render(), "abc");
    }

    #[test]
    fn test_allele_access() {
        let mut chrom = PrintableChromosome::from("abc");
        chrom.set_allele(0, b'z' as i64);
        assert_eq!(chrom.allele(0), b'z' as i64);
        assert_eq!(chrom.render(), "zbc");
    }
}
