use std::fs::File;
use std::path::PathBuf;


/// Where a `Writer` or `Reader` gets its bytes from or to.
#[derive(Debug)]
pub enum Target {

    /// A filesystem path the library manages itself: the writer stages
    /// output in a sibling file with a `.part` suffix (and, for compressed
    /// output, a compression-extension suffix ordered before `.part`) and
    /// renames it into place on a clean close.
    Path(PathBuf),

    /// A file descriptor the caller already owns. The library writes or
    /// reads through it directly: no suffix is added, no rename happens,
    /// and the descriptor is flushed but not closed when the writer or
    /// reader is dropped.
    Fd(File),
}

impl Target {

    /// Builds a `Path` target.
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    /// Builds an `Fd` target from an already-open file.
    pub fn fd(f: File) -> Self {
        Self::Fd(f)
    }
}
