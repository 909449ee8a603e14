use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use log::*;


/// CBOR major types, shifted into position for a header byte.
mod major {
    pub const UNSIGNED: u8 = 0 << 5;
    pub const NEGATIVE: u8 = 1 << 5;
    pub const BYTE_STRING: u8 = 2 << 5;
    pub const TEXT_STRING: u8 = 3 << 5;
    pub const ARRAY: u8 = 4 << 5;
    pub const MAP: u8 = 5 << 5;
    pub const TAG: u8 = 6 << 5;
    pub const SIMPLE: u8 = 7 << 5;
}

const BREAK: u8 = 0xFF;
const SIMPLE_FALSE: u8 = 20;
const SIMPLE_TRUE: u8 = 21;


/// A streaming CBOR encoder over any `Write` implementor.
///
/// Once any write fails, the encoder is poisoned: every subsequent call
/// returns the same I/O error without touching the underlying writer
/// again, matching the "first failure poisons the writer" policy used
/// throughout this crate.
pub struct Encoder<W> {
    w: W,
    poisoned: bool,
}

impl<W: Write> Encoder<W> {

    /// Wraps a writer in a fresh encoder.
    pub fn new(w: W) -> Self {
        Self { w, poisoned: false }
    }

    /// Swaps in a new writer, returning the old one so the caller can
    /// flush and close it. Clears the poisoned flag: a fresh target
    /// deserves a fresh chance.
    pub fn rotate_output(&mut self, new_writer: W) -> W {
        self.poisoned = false;
        std::mem::replace(&mut self.w, new_writer)
    }

    /// Consumes the encoder, returning the wrapped writer.
    pub fn into_inner(self) -> W {
        self.w
    }

    fn write_bytes(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.poisoned {
            return Err(io::Error::new(io::ErrorKind::Other, "encoder is poisoned by a previous I/O error"));
        }

        match self.w.write_all(buf) {
            Ok(()) => Ok(buf.len()),
            Err(e) => {
                error!("Encoder write failed, poisoning -> {:?}", e);
                self.poisoned = true;
                Err(e)
            }
        }
    }

    /// Writes a header with the shortest additional-info encoding that
    /// fits `value`: embedded for 0–23, then 1/2/4/8 trailing bytes.
    fn write_header_shortest(&mut self, major: u8, value: u64) -> io::Result<usize> {
        if value < 24 {
            self.write_bytes(&[major | value as u8])
        }
        else if value <= u64::from(u8::MAX) {
            let mut n = self.write_bytes(&[major | 24])?;
            n += self.write_bytes(&[value as u8])?;
            Ok(n)
        }
        else if value <= u64::from(u16::MAX) {
            let mut n = self.write_bytes(&[major | 25])?;
            n += self.write_u16_be(value as u16)?;
            Ok(n)
        }
        else if value <= u64::from(u32::MAX) {
            let mut n = self.write_bytes(&[major | 26])?;
            n += self.write_u32_be(value as u32)?;
            Ok(n)
        }
        else {
            let mut n = self.write_bytes(&[major | 27])?;
            n += self.write_u64_be(value)?;
            Ok(n)
        }
    }

    /// Writes a header that always uses the given fixed additional-info
    /// code, regardless of whether a shorter encoding would fit — this is
    /// what the `write_uintN`/`write_intN` family uses, so a caller who
    /// asks for a specific width gets exactly that width on the wire.
    fn write_header_fixed(&mut self, major: u8, additional: u8) -> io::Result<usize> {
        self.write_bytes(&[major | additional])
    }

    fn write_u16_be(&mut self, v: u16) -> io::Result<usize> {
        let mut buf = Vec::with_capacity(2);
        buf.write_u16::<BigEndian>(v)?;
        self.write_bytes(&buf)
    }

    fn write_u32_be(&mut self, v: u32) -> io::Result<usize> {
        let mut buf = Vec::with_capacity(4);
        buf.write_u32::<BigEndian>(v)?;
        self.write_bytes(&buf)
    }

    fn write_u64_be(&mut self, v: u64) -> io::Result<usize> {
        let mut buf = Vec::with_capacity(8);
        buf.write_u64::<BigEndian>(v)?;
        self.write_bytes(&buf)
    }

    // -- containers --------------------------------------------------

    /// Writes a definite-length array header for `len` following items.
    pub fn write_array_start(&mut self, len: u64) -> io::Result<usize> {
        self.write_header_shortest(major::ARRAY, len)
    }

    /// Writes an indefinite-length array header; terminate with `write_break`.
    pub fn write_indef_array_start(&mut self) -> io::Result<usize> {
        self.write_bytes(&[major::ARRAY | 31])
    }

    /// Writes a definite-length map header for `len` following key/value pairs.
    pub fn write_map_start(&mut self, len: u64) -> io::Result<usize> {
        self.write_header_shortest(major::MAP, len)
    }

    /// Writes an indefinite-length map header; terminate with `write_break`.
    pub fn write_indef_map_start(&mut self) -> io::Result<usize> {
        self.write_bytes(&[major::MAP | 31])
    }

    /// Writes the break stop code that ends an indefinite array or map.
    pub fn write_break(&mut self) -> io::Result<usize> {
        self.write_bytes(&[BREAK])
    }

    /// Writes a semantic tag, to be immediately followed by the tagged item.
    pub fn write_tag(&mut self, tag: u64) -> io::Result<usize> {
        self.write_header_shortest(major::TAG, tag)
    }

    // -- scalars -------------------------------------------------------

    /// Writes a CBOR boolean simple value.
    pub fn write_bool(&mut self, b: bool) -> io::Result<usize> {
        self.write_bytes(&[major::SIMPLE | if b { SIMPLE_TRUE } else { SIMPLE_FALSE }])
    }

    /// Writes `n` as an unsigned integer, using the shortest CBOR form
    /// that holds it.
    pub fn write_uint(&mut self, n: u64) -> io::Result<usize> {
        self.write_header_shortest(major::UNSIGNED, n)
    }

    /// Writes `n` as an 8-bit unsigned integer, always using the 1-byte
    /// trailing form regardless of magnitude.
    pub fn write_uint8(&mut self, n: u8) -> io::Result<usize> {
        let mut written = self.write_header_fixed(major::UNSIGNED, 24)?;
        written += self.write_bytes(&[n])?;
        Ok(written)
    }

    /// Writes `n` as a 16-bit unsigned integer, always using the 2-byte
    /// trailing form.
    pub fn write_uint16(&mut self, n: u16) -> io::Result<usize> {
        let mut written = self.write_header_fixed(major::UNSIGNED, 25)?;
        written += self.write_u16_be(n)?;
        Ok(written)
    }

    /// Writes `n` as a 32-bit unsigned integer, always using the 4-byte
    /// trailing form.
    pub fn write_uint32(&mut self, n: u32) -> io::Result<usize> {
        let mut written = self.write_header_fixed(major::UNSIGNED, 26)?;
        written += self.write_u32_be(n)?;
        Ok(written)
    }

    /// Writes `n` as a 64-bit unsigned integer, always using the 8-byte
    /// trailing form.
    pub fn write_uint64(&mut self, n: u64) -> io::Result<usize> {
        let mut written = self.write_header_fixed(major::UNSIGNED, 27)?;
        written += self.write_u64_be(n)?;
        Ok(written)
    }

    /// Writes `n` as a signed integer, choosing the positive or negative
    /// CBOR major type by sign, and the shortest form that holds it.
    pub fn write_int(&mut self, n: i64) -> io::Result<usize> {
        if n >= 0 {
            self.write_header_shortest(major::UNSIGNED, n as u64)
        }
        else {
            // CBOR negative integers encode `-1 - n`.
            let magnitude = -1 - n;
            self.write_header_shortest(major::NEGATIVE, magnitude as u64)
        }
    }

    /// Writes `n` as an 8-bit signed integer, always using the 1-byte
    /// trailing form.
    pub fn write_int8(&mut self, n: i8) -> io::Result<usize> {
        if n >= 0 {
            let mut written = self.write_header_fixed(major::UNSIGNED, 24)?;
            written += self.write_bytes(&[n as u8])?;
            Ok(written)
        }
        else {
            let magnitude = (-1 - i16::from(n)) as u8;
            let mut written = self.write_header_fixed(major::NEGATIVE, 24)?;
            written += self.write_bytes(&[magnitude])?;
            Ok(written)
        }
    }

    /// Writes `n` as a 16-bit signed integer, always using the 2-byte
    /// trailing form.
    pub fn write_int16(&mut self, n: i16) -> io::Result<usize> {
        if n >= 0 {
            let mut written = self.write_header_fixed(major::UNSIGNED, 25)?;
            written += self.write_u16_be(n as u16)?;
            Ok(written)
        }
        else {
            let magnitude = (-1 - i32::from(n)) as u16;
            let mut written = self.write_header_fixed(major::NEGATIVE, 25)?;
            written += self.write_u16_be(magnitude)?;
            Ok(written)
        }
    }

    /// Writes `n` as a 32-bit signed integer, always using the 4-byte
    /// trailing form.
    pub fn write_int32(&mut self, n: i32) -> io::Result<usize> {
        if n >= 0 {
            let mut written = self.write_header_fixed(major::UNSIGNED, 26)?;
            written += self.write_u32_be(n as u32)?;
            Ok(written)
        }
        else {
            let magnitude = (-1 - i64::from(n)) as u32;
            let mut written = self.write_header_fixed(major::NEGATIVE, 26)?;
            written += self.write_u32_be(magnitude)?;
            Ok(written)
        }
    }

    /// Writes `n` as a 64-bit signed integer, always using the 8-byte
    /// trailing form.
    pub fn write_int64(&mut self, n: i64) -> io::Result<usize> {
        if n >= 0 {
            let mut written = self.write_header_fixed(major::UNSIGNED, 27)?;
            written += self.write_u64_be(n as u64)?;
            Ok(written)
        }
        else {
            let magnitude = (-1 - i128::from(n)) as u64;
            let mut written = self.write_header_fixed(major::NEGATIVE, 27)?;
            written += self.write_u64_be(magnitude)?;
            Ok(written)
        }
    }

    // -- strings ---------------------------------------------------------

    /// Writes a length-prefixed byte string.
    pub fn write_bytestring(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut written = self.write_header_shortest(major::BYTE_STRING, bytes.len() as u64)?;
        written += self.write_bytes(bytes)?;
        Ok(written)
    }

    /// Writes a length-prefixed UTF-8 text string.
    pub fn write_textstring(&mut self, text: &str) -> io::Result<usize> {
        let bytes = text.as_bytes();
        let mut written = self.write_header_shortest(major::TEXT_STRING, bytes.len() as u64)?;
        written += self.write_bytes(bytes)?;
        Ok(written)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn map_start() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_map_start(0).unwrap();
        enc.write_indef_map_start().unwrap();
        enc.write_break().unwrap();
        assert_eq!(enc.into_inner(), vec![0xA0, 0xBF, 0xFF]);
    }

    #[test]
    fn array_start() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_array_start(1).unwrap();
        enc.write_indef_array_start().unwrap();
        enc.write_break().unwrap();
        assert_eq!(enc.into_inner(), vec![0x81, 0x9F, 0xFF]);
    }

    #[test]
    fn bools() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_array_start(2).unwrap();
        enc.write_bool(true).unwrap();
        enc.write_bool(false).unwrap();
        assert_eq!(enc.into_inner(), vec![0x82, 0xF5, 0xF4]);
    }

    #[test]
    fn fixed_width_integers() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_indef_array_start().unwrap();
        enc.write_uint8(64).unwrap();
        enc.write_uint16(65128).unwrap();
        enc.write_uint32(512256).unwrap();
        enc.write_uint64(6512365425).unwrap();
        enc.write_int8(-64).unwrap();
        enc.write_int16(-24512).unwrap();
        enc.write_int32(-128652).unwrap();
        enc.write_int64(-6512365425).unwrap();
        enc.write_break().unwrap();

        let expected: Vec<u8> = vec![
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
        assert_eq!(enc.into_inner(), expected);
    }

    #[test]
    fn strings() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_array_start(2).unwrap();
        enc.write_textstring("textstring").unwrap();
        enc.write_bytestring(b"bytestring").unwrap();

        let expected: Vec<u8> = vec![
            0x82,
            0x6A, 0x74, 0x65, 0x78, 0x74, 0x73, 0x74, 0x72, 0x69, 0x6E, 0x67,
            0x4A, 0x62, 0x79, 0x74, 0x65, 0x73, 0x74, 0x72, 0x69, 0x6E, 0x67,
        ];
        assert_eq!(enc.into_inner(), expected);
    }

    #[test]
    fn rotate_output() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_array_start(1).unwrap();
        enc.write_uint8(3).unwrap();

        let first = enc.rotate_output(Vec::new());
        assert_eq!(first, vec![0x81, 0x18, 0x03]);

        enc.write_array_start(1).unwrap();
        enc.write_uint8(4).unwrap();
        assert_eq!(enc.into_inner(), vec![0x81, 0x18, 0x04]);
    }

    #[test]
    fn shortest_uint_under_24_is_embedded() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_uint(5).unwrap();
        assert_eq!(enc.into_inner(), vec![0x05]);
    }

    #[test]
    fn poisoning_fails_fast() {
        struct AlwaysFails;
        impl Write for AlwaysFails {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "nope"))
            }
            fn flush(&mut self) -> io::Result<()> { Ok(()) }
        }

        let mut enc = Encoder::new(AlwaysFails);
        assert!(enc.write_uint8(1).is_err());
        assert!(enc.write_uint8(2).is_err());
    }
}
