use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use log::*;

use crate::cbor_type::CborType;
use crate::error::{CborError, CborErrorKind};


const BREAK: u8 = 0xFF;


/// A streaming CBOR decoder over any `Read` implementor.
///
/// The decoder keeps a one-byte lookahead so a caller can ask
/// [`Decoder::peek_type`] what kind of item is next before committing to
/// a `read_*` call. Once any read fails, the decoder is poisoned in the
/// same way `Encoder` is: every subsequent call returns the same error
/// without touching the reader again.
pub struct Decoder<R> {
    r: R,
    offset: u64,
    lookahead: Option<u8>,
    poisoned: bool,
}

impl<R: Read> Decoder<R> {

    /// Wraps a reader in a fresh decoder.
    pub fn new(r: R) -> Self {
        Self { r, offset: 0, lookahead: None, poisoned: false }
    }

    /// Consumes the decoder, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.r
    }

    /// The number of bytes consumed from the underlying reader so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn fail<T>(&mut self, kind: CborErrorKind) -> Result<T, CborError> {
        let offset = self.offset;
        self.poisoned = true;
        Err(CborError::new(kind, offset))
    }

    fn read_byte(&mut self) -> Result<u8, CborError> {
        if let Some(b) = self.lookahead.take() {
            self.offset += 1;
            return Ok(b);
        }

        if self.poisoned {
            return self.fail(CborErrorKind::Io(io::Error::new(io::ErrorKind::Other, "decoder is poisoned by a previous error")));
        }

        let mut buf = [0u8; 1];
        match self.r.read_exact(&mut buf) {
            Ok(()) => {
                self.offset += 1;
                Ok(buf[0])
            }
            Err(e) => {
                error!("Decoder read failed, poisoning -> {:?}", e);
                self.poisoned = true;
                let offset = self.offset;
                Err(CborError::new(CborErrorKind::from(e), offset))
            }
        }
    }

    fn peek_byte(&mut self) -> Result<u8, CborError> {
        if let Some(b) = self.lookahead {
            return Ok(b);
        }

        let b = self.read_byte()?;
        self.lookahead = Some(b);
        // read_byte already advanced offset; peeking shouldn't have.
        self.offset -= 1;
        Ok(b)
    }

    fn read_exact_bytes(&mut self, n: usize) -> Result<Vec<u8>, CborError> {
        let mut buf = vec![0u8; n];
        if self.poisoned {
            return self.fail(CborErrorKind::Io(io::Error::new(io::ErrorKind::Other, "decoder is poisoned by a previous error")));
        }

        match self.r.read_exact(&mut buf) {
            Ok(()) => {
                self.offset += n as u64;
                Ok(buf)
            }
            Err(e) => {
                error!("Decoder read failed, poisoning -> {:?}", e);
                self.poisoned = true;
                let offset = self.offset;
                Err(CborError::new(CborErrorKind::from(e), offset))
            }
        }
    }

    /// Reads the trailing bytes of a header (if any) given its additional
    /// info field, returning the decoded value.
    fn read_additional_value(&mut self, additional: u8) -> Result<u64, CborError> {
        match additional {
            0..=23 => Ok(u64::from(additional)),
            24 => {
                let b = self.read_exact_bytes(1)?;
                Ok(u64::from(b[0]))
            }
            25 => {
                let b = self.read_exact_bytes(2)?;
                Ok(u64::from((&b[..]).read_u16::<BigEndian>().expect("length checked above")))
            }
            26 => {
                let b = self.read_exact_bytes(4)?;
                Ok(u64::from((&b[..]).read_u32::<BigEndian>().expect("length checked above")))
            }
            27 => {
                let b = self.read_exact_bytes(8)?;
                Ok((&b[..]).read_u64::<BigEndian>().expect("length checked above"))
            }
            _ => self.fail(CborErrorKind::MalformedHeader(additional)),
        }
    }

    /// Reads a header byte, returning its major type (0–7) and additional
    /// info field (0–31), without interpreting the additional info.
    fn read_header_byte(&mut self) -> Result<(u8, u8), CborError> {
        let byte = self.read_byte()?;
        Ok((byte >> 5, byte & 0x1F))
    }

    /// Reports the major type of the next item without consuming it.
    pub fn peek_type(&mut self) -> Result<CborType, CborError> {
        let byte = self.peek_byte()?;
        let major = byte >> 5;
        let additional = byte & 0x1F;
        Ok(match major {
            0 => CborType::Unsigned,
            1 => CborType::Negative,
            2 => CborType::ByteString,
            3 => CborType::TextString,
            4 => CborType::Array,
            5 => CborType::Map,
            6 => CborType::Tag,
            7 if additional == 31 => CborType::Break,
            7 => CborType::Simple,
            _ => unreachable!("major type is 3 bits"),
        })
    }

    fn expect_major(&mut self, expected_major: u8, expected: CborType) -> Result<u8, CborError> {
        let (major, additional) = self.read_header_byte()?;
        if major != expected_major {
            let found = match major {
                0 => CborType::Unsigned,
                1 => CborType::Negative,
                2 => CborType::ByteString,
                3 => CborType::TextString,
                4 => CborType::Array,
                5 => CborType::Map,
                6 => CborType::Tag,
                7 if additional == 31 => CborType::Break,
                _ => CborType::Simple,
            };
            return self.fail(CborErrorKind::TypeMismatch { expected, found });
        }
        Ok(additional)
    }

    // -- scalars -----------------------------------------------------

    /// Reads an unsigned integer (major type 0).
    pub fn read_unsigned(&mut self) -> Result<u64, CborError> {
        let additional = self.expect_major(0, CborType::Unsigned)?;
        self.read_additional_value(additional)
    }

    /// Reads a negative integer (major type 1), returning its magnitude
    /// as encoded on the wire (`-1 - n`), not the signed value itself.
    pub fn read_negative(&mut self) -> Result<u64, CborError> {
        let additional = self.expect_major(1, CborType::Negative)?;
        self.read_additional_value(additional)
    }

    /// Reads either an unsigned or negative integer and returns it as a
    /// signed `i64`.
    pub fn read_integer(&mut self) -> Result<i64, CborError> {
        match self.peek_type()? {
            CborType::Unsigned => {
                let n = self.read_unsigned()?;
                Ok(n as i64)
            }
            CborType::Negative => {
                let magnitude = self.read_negative()?;
                Ok(-1 - magnitude as i64)
            }
            found => self.fail(CborErrorKind::TypeMismatch { expected: CborType::Unsigned, found }),
        }
    }

    /// Reads a boolean simple value.
    pub fn read_bool(&mut self) -> Result<bool, CborError> {
        let additional = self.expect_major(7, CborType::Simple)?;
        match additional {
            20 => Ok(false),
            21 => Ok(true),
            _ => self.fail(CborErrorKind::MalformedHeader(0xE0 | additional)),
        }
    }

    /// Reads a byte string, collecting all chunks if it is indefinite-length.
    pub fn read_bytestring(&mut self) -> Result<Vec<u8>, CborError> {
        let (major, additional) = self.read_header_byte()?;
        if major != 2 {
            return self.fail(CborErrorKind::TypeMismatch { expected: CborType::ByteString, found: self.major_to_type(major, additional) });
        }

        if additional == 31 {
            let mut out = Vec::new();
            loop {
                if self.peek_byte()? == BREAK {
                    self.read_byte()?;
                    break;
                }
                let (chunk_major, chunk_additional) = self.read_header_byte()?;
                if chunk_major != 2 {
                    return self.fail(CborErrorKind::InconsistentChunk);
                }
                let len = self.read_additional_value(chunk_additional)? as usize;
                out.extend(self.read_exact_bytes(len)?);
            }
            Ok(out)
        }
        else {
            let len = self.read_additional_value(additional)? as usize;
            self.read_exact_bytes(len)
        }
    }

    /// Reads a UTF-8 text string, collecting all chunks if it is
    /// indefinite-length.
    pub fn read_textstring(&mut self) -> Result<String, CborError> {
        let (major, additional) = self.read_header_byte()?;
        if major != 3 {
            return self.fail(CborErrorKind::TypeMismatch { expected: CborType::TextString, found: self.major_to_type(major, additional) });
        }

        let bytes = if additional == 31 {
            let mut out = Vec::new();
            loop {
                if self.peek_byte()? == BREAK {
                    self.read_byte()?;
                    break;
                }
                let (chunk_major, chunk_additional) = self.read_header_byte()?;
                if chunk_major != 3 {
                    return self.fail(CborErrorKind::InconsistentChunk);
                }
                let len = self.read_additional_value(chunk_additional)? as usize;
                out.extend(self.read_exact_bytes(len)?);
            }
            out
        }
        else {
            let len = self.read_additional_value(additional)? as usize;
            self.read_exact_bytes(len)?
        };

        match String::from_utf8(bytes) {
            Ok(s) => Ok(s),
            Err(_) => self.fail(CborErrorKind::MalformedHeader(major << 5)),
        }
    }

    fn major_to_type(&self, major: u8, additional: u8) -> CborType {
        match major {
            0 => CborType::Unsigned,
            1 => CborType::Negative,
            2 => CborType::ByteString,
            3 => CborType::TextString,
            4 => CborType::Array,
            5 => CborType::Map,
            6 => CborType::Tag,
            7 if additional == 31 => CborType::Break,
            _ => CborType::Simple,
        }
    }

    // -- containers --------------------------------------------------

    /// Reads an array header, returning `Some(len)` for a definite-length
    /// array or `None` for an indefinite-length one (terminated later by
    /// [`Decoder::read_break`]).
    pub fn read_array_start(&mut self) -> Result<Option<u64>, CborError> {
        let additional = self.expect_major(4, CborType::Array)?;
        if additional == 31 {
            Ok(None)
        }
        else {
            Ok(Some(self.read_additional_value(additional)?))
        }
    }

    /// Reads a map header, returning `Some(len)` for a definite-length map
    /// (the number of key/value pairs, not raw items) or `None` for an
    /// indefinite-length one.
    pub fn read_map_start(&mut self) -> Result<Option<u64>, CborError> {
        let additional = self.expect_major(5, CborType::Map)?;
        if additional == 31 {
            Ok(None)
        }
        else {
            Ok(Some(self.read_additional_value(additional)?))
        }
    }

    /// Reads a semantic tag, returning the tag number. The tagged item
    /// itself must be read separately right after.
    pub fn read_tag(&mut self) -> Result<u64, CborError> {
        let additional = self.expect_major(6, CborType::Tag)?;
        self.read_additional_value(additional)
    }

    /// Consumes a break stop code, failing if the next item isn't one.
    pub fn read_break(&mut self) -> Result<(), CborError> {
        let byte = self.read_byte()?;
        if byte == BREAK {
            Ok(())
        }
        else {
            let major = byte >> 5;
            let additional = byte & 0x1F;
            self.fail(CborErrorKind::TypeMismatch { expected: CborType::Break, found: self.major_to_type(major, additional) })
        }
    }

    /// True if the next item is the break stop code, without consuming it.
    pub fn at_break(&mut self) -> Result<bool, CborError> {
        Ok(self.peek_type()? == CborType::Break)
    }

    /// Reads a definite- or indefinite-length array, calling `read_item`
    /// once per element.
    pub fn read_array<T>(&mut self, mut read_item: impl FnMut(&mut Self) -> Result<T, CborError>) -> Result<Vec<T>, CborError> {
        match self.read_array_start()? {
            Some(len) => {
                let mut out = Vec::with_capacity(len.min(4096) as usize);
                for _ in 0..len {
                    out.push(read_item(self)?);
                }
                Ok(out)
            }
            None => {
                let mut out = Vec::new();
                while !self.at_break()? {
                    out.push(read_item(self)?);
                }
                self.read_break()?;
                Ok(out)
            }
        }
    }

    /// Skips over a single CBOR item of any type, including nested
    /// arrays, maps, and tags, without decoding its value.
    pub fn skip_item(&mut self) -> Result<(), CborError> {
        match self.peek_type()? {
            CborType::Unsigned => { self.read_unsigned()?; }
            CborType::Negative => { self.read_negative()?; }
            CborType::ByteString => { self.read_bytestring()?; }
            CborType::TextString => { self.read_textstring()?; }
            CborType::Simple => {
                let (_, additional) = self.read_header_byte()?;
                match additional {
                    24 => { self.read_exact_bytes(1)?; }
                    25 => { self.read_exact_bytes(2)?; }
                    26 => { self.read_exact_bytes(4)?; }
                    27 => { self.read_exact_bytes(8)?; }
                    0..=23 => {}
                    _ => return self.fail(CborErrorKind::MalformedHeader(0xE0 | additional)),
                }
            }
            CborType::Tag => {
                self.read_tag()?;
                self.skip_item()?;
            }
            CborType::Array => {
                match self.read_array_start()? {
                    Some(len) => {
                        for _ in 0..len {
                            self.skip_item()?;
                        }
                    }
                    None => {
                        while !self.at_break()? {
                            self.skip_item()?;
                        }
                        self.read_break()?;
                    }
                }
            }
            CborType::Map => {
                match self.read_map_start()? {
                    Some(len) => {
                        for _ in 0..len {
                            self.skip_item()?;
                            self.skip_item()?;
                        }
                    }
                    None => {
                        while !self.at_break()? {
                            self.skip_item()?;
                            self.skip_item()?;
                        }
                        self.read_break()?;
                    }
                }
            }
            CborType::Break => {
                return self.fail(CborErrorKind::TypeMismatch { expected: CborType::Unsigned, found: CborType::Break });
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn map_start() {
        let mut dec = Decoder::new(&[0xA0, 0xBF, 0xFF][..]);
        assert_eq!(dec.read_map_start().unwrap(), Some(0));
        assert_eq!(dec.read_map_start().unwrap(), None);
        dec.read_break().unwrap();
    }

    #[test]
    fn array_start() {
        let mut dec = Decoder::new(&[0x81, 0x9F, 0xFF][..]);
        assert_eq!(dec.read_array_start().unwrap(), Some(1));
        assert_eq!(dec.read_array_start().unwrap(), None);
        dec.read_break().unwrap();
    }

    #[test]
    fn fixed_width_integers_read_back() {
        let bytes: Vec<u8> = vec![
            0x9F,
            0x18, 0x40,
            0x19, 0xFE, 0x68,
            0x1A, 0x00, 0x07, 0xD1, 0x00,
            0x1B, 0x00, 0x00, 0x00, 0x01, 0x84, 0x2A, 0xCF, 0x71,
            0x38, 0x3F,
            0x39, 0x5F, 0xBF,
            0x3A, 0x00, 0x01, 0xF6, 0x8B,
            0x3B, 0x00, 0x00, 0x00, 0x01, 0x84, 0x2A, 0xCF, 0x70,
            0xFF,
        ];
        let mut dec = Decoder::new(&bytes[..]);
        assert_eq!(dec.read_array_start().unwrap(), None);
        assert_eq!(dec.read_integer().unwrap(), 64);
        assert_eq!(dec.read_integer().unwrap(), 65128);
        assert_eq!(dec.read_integer().unwrap(), 512256);
        assert_eq!(dec.read_integer().unwrap(), 6512365425);
        assert_eq!(dec.read_integer().unwrap(), -64);
        assert_eq!(dec.read_integer().unwrap(), -24512);
        assert_eq!(dec.read_integer().unwrap(), -128652);
        assert_eq!(dec.read_integer().unwrap(), -6512365425);
        dec.read_break().unwrap();
    }

    #[test]
    fn strings_roundtrip() {
        let bytes: Vec<u8> = vec![
            0x82,
            0x6A, 0x74, 0x65, 0x78, 0x74, 0x73, 0x74, 0x72, 0x69, 0x6E, 0x67,
            0x4A, 0x62, 0x79, 0x74, 0x65, 0x73, 0x74, 0x72, 0x69, 0x6E, 0x67,
        ];
        let mut dec = Decoder::new(&bytes[..]);
        assert_eq!(dec.read_array_start().unwrap(), Some(2));
        assert_eq!(dec.read_textstring().unwrap(), "textstring");
        assert_eq!(dec.read_bytestring().unwrap(), b"bytestring");
    }

    #[test]
    fn skip_item_is_byte_accurate() {
        // [1, {2: [3, 4]}, "five"] followed by a trailing marker byte.
        let bytes: Vec<u8> = vec![
            0x83,
            0x01,
            0xA1, 0x02, 0x82, 0x03, 0x04,
            0x64, 0x66, 0x69, 0x76, 0x65,
            0xFF,
        ];
        let mut dec = Decoder::new(&bytes[..]);
        dec.skip_item().unwrap();
        assert_eq!(dec.read_byte().unwrap(), 0xFF);
    }

    #[test]
    fn peek_type_does_not_consume() {
        let mut dec = Decoder::new(&[0x05][..]);
        assert_eq!(dec.peek_type().unwrap(), CborType::Unsigned);
        assert_eq!(dec.read_unsigned().unwrap(), 5);
    }

    #[test]
    fn type_mismatch_reports_offset() {
        let mut dec = Decoder::new(&[0x01, 0x64, 0x74, 0x65, 0x78, 0x74][..]);
        dec.read_unsigned().unwrap();
        let err = dec.read_bytestring().unwrap_err();
        assert_eq!(err.offset, 1);
        match err.kind {
            CborErrorKind::TypeMismatch { expected: CborType::ByteString, found: CborType::TextString } => {}
            other => panic!("unexpected error kind: {:?}", other),
        }
    }
}
