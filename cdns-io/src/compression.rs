/// Which compression, if any, wraps a byte stream.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum Compression {

    /// No compression: bytes are written or read as-is.
    Plain,

    /// gzip, via `flate2`.
    Gzip,

    /// xz (LZMA2), via `xz2`.
    Xz,
}

impl Compression {

    /// The filename extension this compression adds, or an empty string
    /// for `Plain`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Plain => "",
            Self::Gzip  => ".gz",
            Self::Xz    => ".xz",
        }
    }
}
