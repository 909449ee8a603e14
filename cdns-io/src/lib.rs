//! Byte-stream output and input backends for C-DNS files.
//!
//! This crate knows nothing about CBOR or C-DNS semantics: it only knows
//! how to get bytes onto, and off of, disk — plain, gzip, or xz, targeting
//! either a filesystem path (staged through a `.part` file and renamed on
//! close) or a caller-supplied open file descriptor.

#![warn(deprecated_in_future)]
#![warn(future_incompatible)]
#![warn(missing_copy_implementations)]
#![warn(missing_docs)]
#![warn(nonstandard_style)]
#![warn(rust_2018_compatibility)]
#![warn(rust_2018_idioms)]
#![warn(single_use_lifetimes)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused)]

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::wildcard_imports)]

#![deny(clippy::cast_possible_truncation)]
#![deny(unsafe_code)]


mod error;
pub use self::error::Error;

mod compression;
pub use self::compression::Compression;

mod target;
pub use self::target::Target;

mod writer;
pub use self::writer::Writer;

mod reader;
pub use self::reader::Reader;
