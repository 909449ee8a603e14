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
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::wildcard_imports)]

#![deny(clippy::cast_possible_truncation)]
#![deny(unsafe_code)]


//! A small, typed, streaming CBOR (RFC 8949) encoder and decoder.
//!
//! This crate knows nothing about C-DNS, compression, or files: it only
//! knows how to turn CBOR primitives into bytes on any `std::io::Write`,
//! and how to pull them back off any `std::io::Read`. The `cdns` crate
//! builds the C-DNS data model and block format on top of it.

mod error;
pub use self::error::{CborError, CborErrorKind};

mod cbor_type;
pub use self::cbor_type::CborType;

mod encoder;
pub use self::encoder::Encoder;

mod decoder;
pub use self::decoder::Decoder;
