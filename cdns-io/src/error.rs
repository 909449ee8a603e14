/// Something that can go wrong reading or writing a C-DNS byte stream.
#[derive(Debug)]
pub enum Error {

    /// A plain I/O failure: opening, writing, renaming, or closing a file.
    Io(std::io::Error),

    /// The gzip or xz backend reported a failure.
    Compression(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Compression(e) => write!(f, "compression error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(inner: std::io::Error) -> Self {
        Self::Io(inner)
    }
}
