use cdns_codec::CborError;


/// Something that can go wrong producing or consuming a C-DNS file.
#[derive(Debug)]
pub enum Error {

    /// Underlying write/read/rename failure from the byte-stream layer.
    Io(std::io::Error),

    /// The gzip or xz backend reported a failure.
    Compression(std::io::Error),

    /// The CBOR stream was truncated, had a malformed header, or held the
    /// wrong type where a specific one was expected.
    CborDecode(CborError),

    /// The CBOR decoded fine but violates a C-DNS invariant: an unknown
    /// format version, a missing required map entry, or a buffered item
    /// whose index points outside its intern table.
    Format(String),

    /// The caller asked for something the API does not allow in the
    /// current state: `set_block_parameters` on a non-empty block,
    /// `set_active_block_parameters` with an out-of-range index, writing
    /// after close, and the like.
    InvalidState(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Compression(e) => write!(f, "compression error: {}", e),
            Self::CborDecode(e) => write!(f, "CBOR decode error: {}", e),
            Self::Format(msg) => write!(f, "C-DNS format error: {}", msg),
            Self::InvalidState(msg) => write!(f, "invalid state: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(inner: std::io::Error) -> Self {
        Self::Io(inner)
    }
}

impl From<CborError> for Error {
    fn from(inner: CborError) -> Self {
        Self::CborDecode(inner)
    }
}

impl From<cdns_io::Error> for Error {
    fn from(inner: cdns_io::Error) -> Self {
        match inner {
            cdns_io::Error::Io(e) => Self::Io(e),
            cdns_io::Error::Compression(e) => Self::Compression(e),
        }
    }
}

/// Shorthand for a `Result` whose error is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
