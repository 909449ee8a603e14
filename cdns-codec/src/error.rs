use std::io;

use crate::CborType;


/// Something that can go wrong decoding a CBOR item.
///
/// Carries the byte offset into the input stream at which the problem was
/// detected, so a caller working with large files can at least report
/// roughly where decoding gave up.
#[derive(Debug)]
pub struct CborError {

    /// What went wrong.
    pub kind: CborErrorKind,

    /// The byte offset into the stream at which `kind` was detected.
    pub offset: u64,
}

impl CborError {
    pub(crate) fn new(kind: CborErrorKind, offset: u64) -> Self {
        Self { kind, offset }
    }
}

impl std::fmt::Display for CborError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} at offset {}", self.kind, self.offset)
    }
}

impl std::error::Error for CborError {}


/// The specific way a CBOR item failed to decode.
#[derive(Debug)]
pub enum CborErrorKind {

    /// The underlying reader returned an I/O error.
    Io(io::Error),

    /// The stream ended in the middle of an item.
    UnexpectedEof,

    /// A header byte used an additional-info value this decoder does not
    /// understand (28, 29, or 30 are reserved by RFC 8949).
    MalformedHeader(u8),

    /// The caller asked to read one CBOR type but the stream held another.
    TypeMismatch {

        /// What the caller asked for.
        expected: CborType,

        /// What was actually found.
        found: CborType,
    },

    /// An indefinite-length byte or text string contained a chunk whose
    /// major type didn't match the string being assembled.
    InconsistentChunk,
}

impl From<io::Error> for CborErrorKind {
    fn from(ioe: io::Error) -> Self {
        if ioe.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        }
        else {
            Self::Io(ioe)
        }
    }
}
