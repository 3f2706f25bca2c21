use std::error;
use std::fmt;
use std::io;

/// Errors produced while encoding or decoding chromosome byte buffers.
#[derive(Debug)]
pub enum CodecError {
    /// The buffer ended before the expected amount of data was read.
    Truncated { needed: usize, available: usize },
    /// The buffer contained data beyond the last expected frame.
    TrailingBytes { extra: usize },
    /// A decoded value was not valid for the chromosome type.
    InvalidValue(&'static str),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "Truncated buffer: needed {needed} bytes, {available} available")
            }
            Self::TrailingBytes { extra } => {
                write!(f, "Unexpected trailing data: {extra} bytes")
            }
            Self::InvalidValue(what) => write!(f, "Invalid encoded value: {what}"),
        }
    }
}

impl error::Error for CodecError {}

/// Errors produced while reading or writing population snapshots.
#[derive(Debug)]
pub enum SnapshotError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// The file does not start with a recognised format tag.
    BadMagic,
    /// The `"END"` trailer was missing or malformed.
    BadTrailer,
    /// A header field held a value outside its legal range.
    InvalidField(&'static str),
    /// The snapshot was written for a different chromosome type.
    ChromosomeKind { expected: i32, found: i32 },
    /// A stored genome buffer failed to decode.
    Codec(CodecError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Snapshot I/O error: {e}"),
            Self::BadMagic => write!(f, "Unrecognised snapshot format tag"),
            Self::BadTrailer => write!(f, "Corrupt snapshot: missing END trailer"),
            Self::InvalidField(field) => write!(f, "Invalid snapshot field: {field}"),
            Self::ChromosomeKind { expected, found } => write!(
                f,
                "Snapshot chromosome type mismatch: expected family {expected}, found {found}"
            ),
            Self::Codec(e) => write!(f, "Stored genome failed to decode: {e}"),
        }
    }
}

impl error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<CodecError> for SnapshotError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Errors produced by the migration transport.
#[derive(Debug)]
pub enum TransportError {
    /// The other end of the link has gone away.
    Disconnected,
    /// A message arrived out of protocol order.
    UnexpectedMessage { expected: &'static str },
    /// An entity buffer did not have the length announced for the batch.
    LengthMismatch { expected: usize, found: usize },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Migration link disconnected"),
            Self::UnexpectedMessage { expected } => {
                write!(f, "Out-of-order migration message: expected {expected}")
            }
            Self::LengthMismatch { expected, found } => {
                write!(f, "Entity buffer length mismatch: expected {expected}, found {found}")
            }
        }
    }
}

impl error::Error for TransportError {}
