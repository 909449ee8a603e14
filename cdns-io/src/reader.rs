use std::fs::File;
use std::io::{self, Read};

use flate2::read::GzDecoder;
use xz2::read::XzDecoder;

use crate::compression::Compression;
use crate::target::Target;


/// The concrete thing currently supplying bytes, mirroring [`crate::writer::Writer`]'s
/// `Sink` as a sealed enum rather than `Box<dyn Read>`.
enum Source {
    Plain(File),
    Gzip(GzDecoder<File>),
    Xz(XzDecoder<File>),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(f) => f.read(buf),
            Self::Gzip(d) => d.read(buf),
            Self::Xz(d) => d.read(buf),
        }
    }
}


/// Sequential byte input for a C-DNS file: plain, gzip, or xz, from either
/// a filesystem path or a caller-supplied open file descriptor.
///
/// Implements [`std::io::Read`] so `cdns_codec::Decoder` can be driven
/// from it directly, without caring which backend is underneath.
pub struct Reader {
    source: Source,
}

impl Reader {

    /// Opens `target` for reading, transparently decompressing per
    /// `compression`.
    pub fn new(target: Target, compression: Compression) -> io::Result<Self> {
        let file = match target {
            crate::target::Target::Path(path) => {
                let full = crate::writer::append_extension(&path, compression.extension());
                File::open(full)?
            }
            crate::target::Target::Fd(file) => file,
        };

        let source = match compression {
            Compression::Plain => Source::Plain(file),
            Compression::Gzip => Source::Gzip(GzDecoder::new(file)),
            Compression::Xz => Source::Xz(XzDecoder::new(file)),
        };
        Ok(Self { source })
    }
}

impl Read for Reader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read(buf)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::target::Target;
    use crate::writer::Writer;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("cdns-io-reader-test-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn plain_round_trip() {
        let path = temp_path("plain.cdns");
        let mut w = Writer::new(Target::path(&path), Compression::Plain).unwrap();
        w.write(b"hello reader").unwrap();
        w.close().unwrap();

        let mut r = Reader::new(Target::path(&path), Compression::Plain).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello reader");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn gzip_round_trip() {
        let path = temp_path("gzip.cdns");
        let mut w = Writer::new(Target::path(&path), Compression::Gzip).unwrap();
        w.write(b"hello gzip").unwrap();
        w.close().unwrap();

        let mut r = Reader::new(Target::path(&path), Compression::Gzip).unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello gzip");

        let gz_path = {
            let mut s = path.as_os_str().to_owned();
            s.push(".gz");
            PathBuf::from(s)
        };
        fs::remove_file(&gz_path).unwrap();
    }
}
