use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use log::*;
use xz2::write::XzEncoder;

use crate::compression::Compression;
use crate::error::Error;
use crate::target::Target;


/// The concrete thing currently receiving bytes: either a plain file (or
/// caller-owned descriptor) or one of the two compressing wrappers around
/// it. Kept as a sealed enum rather than `Box<dyn Write>` so the hot write
/// path never pays for a vtable call, per the crate's own guidance against
/// per-call dynamic dispatch on writer back-ends.
enum Sink {
    Plain(File),
    Gzip(GzEncoder<File>),
    Xz(XzEncoder<File>),
}

impl Sink {
    fn new(file: File, compression: Compression) -> Self {
        match compression {
            Compression::Plain => Self::Plain(file),
            Compression::Gzip => Self::Gzip(GzEncoder::new(file, GzLevel::default())),
            Compression::Xz => Self::Xz(XzEncoder::new(file, 6)),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Plain(f) => f.write_all(buf),
            Self::Gzip(e) => e.write_all(buf),
            Self::Xz(e) => e.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(f) => f.flush(),
            Self::Gzip(e) => e.flush(),
            Self::Xz(e) => e.flush(),
        }
    }

    /// Finishes the compression stream (if any) and returns the
    /// underlying file, flushed and ready to be renamed or dropped.
    fn finish(self) -> io::Result<File> {
        match self {
            Self::Plain(f) => Ok(f),
            Self::Gzip(e) => e.finish(),
            Self::Xz(e) => e.finish(),
        }
    }
}


/// Where an open `Sink` came from, so `close`/`Drop` knows whether to
/// rename a staging file into place.
enum Origin {
    /// A path the writer manages: `staging_path` is the `.part` (plus
    /// compression extension) name currently being written; `final_path`
    /// is where it gets renamed to on a clean close.
    Path { staging_path: PathBuf, final_path: PathBuf },

    /// A caller-owned descriptor: no rename, no suffix.
    Fd,
}


/// Sequential byte output for a C-DNS file: plain, gzip, or xz, to either
/// a filesystem path (staged through a `.part` file and renamed on close)
/// or a caller-supplied open file descriptor.
///
/// Dropping a `Writer` flushes and closes it on a best-effort basis,
/// logging (never panicking) on failure — exactly the "fallible
/// destructor" discipline the core API follows throughout. Call
/// [`Writer::close`] directly to observe the final result.
pub struct Writer {
    sink: Option<Sink>,
    origin: Origin,
    compression: Compression,
}

impl Writer {

    /// Opens `target` for writing with the given `compression`.
    ///
    /// For a `Target::Path`, the file is created at `<path><ext>.part`
    /// (where `<ext>` is `.gz`/`.xz`/empty per `compression`) and is
    /// renamed to `<path><ext>` on [`Writer::close`]. For a `Target::Fd`,
    /// the descriptor is used as-is.
    pub fn new(target: Target, compression: Compression) -> io::Result<Self> {
        match target {
            Target::Path(path) => {
                let final_path = append_extension(&path, compression.extension());
                let staging_path = append_extension(&final_path, ".part");
                debug!("Opening C-DNS output at {:?}", staging_path);
                let file = File::create(&staging_path)?;
                Ok(Self {
                    sink: Some(Sink::new(file, compression)),
                    origin: Origin::Path { staging_path, final_path },
                    compression,
                })
            }
            Target::Fd(file) => {
                Ok(Self {
                    sink: Some(Sink::new(file, compression)),
                    origin: Origin::Fd,
                    compression,
                })
            }
        }
    }

    /// Writes `bytes` to the current target.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        let sink = self.sink.as_mut().expect("write after close");
        sink.write_all(bytes).map_err(Error::Io)?;
        Ok(bytes.len())
    }

    /// Flushes and closes the current target (renaming it into place if
    /// it's a managed path), then begins writing to `new_target` under
    /// the same compression. Each rotated file is an independent,
    /// self-contained compressed stream.
    pub fn rotate(&mut self, new_target: Target) -> Result<(), Error> {
        self.finish_current()?;
        let fresh = Self::new(new_target, self.compression)?;
        *self = fresh;
        Ok(())
    }

    /// Flushes, finishes compression, and (for a managed path) renames the
    /// staging file into its final, suffix-free location. Returns any
    /// error encountered; after this call the writer no longer accepts
    /// writes.
    pub fn close(mut self) -> Result<(), Error> {
        self.finish_current()
    }

    fn finish_current(&mut self) -> Result<(), Error> {
        let Some(sink) = self.sink.take() else { return Ok(()) };
        let mut file = sink.finish().map_err(Error::Compression)?;
        file.flush().map_err(Error::Io)?;

        match &self.origin {
            Origin::Path { staging_path, final_path } => {
                fs::rename(staging_path, final_path).map_err(Error::Io)?;
                debug!("Closed C-DNS output, renamed {:?} -> {:?}", staging_path, final_path);
            }
            Origin::Fd => {
                // caller owns the descriptor: flush only, no rename, no close.
            }
        }
        Ok(())
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if self.sink.is_none() {
            return;
        }
        if let Err(e) = self.finish_current() {
            error!("Writer dropped without clean close, best-effort flush failed -> {:?}", e);
        }
    }
}

pub(crate) fn append_extension(path: &Path, ext: &str) -> PathBuf {
    if ext.is_empty() {
        return path.to_path_buf();
    }
    let mut s = path.as_os_str().to_owned();
    s.push(ext);
    PathBuf::from(s)
}


#[cfg(test)]
mod test {
    use super::*;
    use std::io::Read;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("cdns-io-test-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn plain_path_stages_then_renames() {
        let path = temp_path("plain.cdns");
        let staging = append_extension(&path, ".part");

        let mut w = Writer::new(Target::path(&path), Compression::Plain).unwrap();
        assert!(staging.exists());
        w.write(b"test").unwrap();
        w.close().unwrap();

        assert!(!staging.exists());
        assert!(path.exists());
        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "test");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn gzip_path_uses_gz_extension() {
        let path = temp_path("gzip.cdns");
        let gz_path = append_extension(&path, ".gz");
        let staging = append_extension(&gz_path, ".part");

        let w = Writer::new(Target::path(&path), Compression::Gzip).unwrap();
        assert!(staging.exists());
        w.close().unwrap();

        assert!(!staging.exists());
        assert!(gz_path.exists());
        fs::remove_file(&gz_path).unwrap();
    }

    #[test]
    fn drop_without_close_still_renames() {
        let path = temp_path("drop.cdns");
        let staging = append_extension(&path, ".part");

        {
            let mut w = Writer::new(Target::path(&path), Compression::Plain).unwrap();
            w.write(b"x").unwrap();
        }

        assert!(!staging.exists());
        assert!(path.exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rotate_writes_two_independent_files() {
        let path1 = temp_path("rotate1.cdns");
        let path2 = temp_path("rotate2.cdns");

        let mut w = Writer::new(Target::path(&path1), Compression::Plain).unwrap();
        w.write(b"test").unwrap();
        w.rotate(Target::path(&path2)).unwrap();
        w.write(b"test").unwrap();
        w.close().unwrap();

        let mut c1 = String::new();
        File::open(&path1).unwrap().read_to_string(&mut c1).unwrap();
        assert_eq!(c1, "test");

        let mut c2 = String::new();
        File::open(&path2).unwrap().read_to_string(&mut c2).unwrap();
        assert_eq!(c2, "test");

        fs::remove_file(&path1).unwrap();
        fs::remove_file(&path2).unwrap();
    }
}
