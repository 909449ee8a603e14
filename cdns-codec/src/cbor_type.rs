/// The major type of a CBOR data item, as reported by `Decoder::peek_type`.
///
/// This collapses definite- and indefinite-length arrays and maps into a
/// single variant each — callers ask `read_array_start`/`read_map_start`
/// for the length distinction — and reports the `0xFF` break stop code as
/// its own variant rather than folding it into `Simple`.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub enum CborType {

    /// A major type 0 item: an unsigned integer.
    Unsigned,

    /// A major type 1 item: a negative integer.
    Negative,

    /// A major type 2 item: a byte string.
    ByteString,

    /// A major type 3 item: a UTF-8 text string.
    TextString,

    /// A major type 4 item: an array, definite or indefinite length.
    Array,

    /// A major type 5 item: a map, definite or indefinite length.
    Map,

    /// A major type 6 item: a semantic tag wrapping one following item.
    Tag,

    /// A major type 7 item other than the break stop code: booleans,
    /// null, undefined, floats, and other simple values.
    Simple,

    /// The major type 7, additional info 31 break stop code, which
    /// terminates an indefinite-length array or map.
    Break,
}
