//! The C-DNS configuration surface: storage parameters, collection
//! parameters, storage hints, and the file preamble that wraps them.
//!
//! These are plain structs with `Default` impls carrying the RFC-specified
//! defaults — there is no file or environment parsing here. An embedder
//! (CLI, capture daemon, language binding) builds these directly, or
//! through a thin adapter of its own.

use std::collections::BTreeSet;
use std::io::{self, Read, Write};

use cdns_codec::{CborError, Decoder, Encoder};

use crate::error::{Error, Result};
use crate::wire;


/// The fixed format version this library reads and writes.
pub const VERSION_MAJOR: u32 = 1;

/// The fixed format version this library reads and writes.
pub const VERSION_MINOR: u32 = 0;

/// The fixed format version this library reads and writes.
pub const VERSION_PRIVATE: u32 = 0;

/// Default sub-second tick resolution: one microsecond.
pub const DEFAULT_TICKS_PER_SECOND: u64 = 1_000_000;

/// Default cap on buffered items per block.
pub const DEFAULT_MAX_BLOCK_ITEMS: u32 = 10_000;

/// Standard DNS opcodes a default `StorageParameters` expects to see:
/// QUERY, IQUERY, STATUS, NOTIFY, UPDATE, DSO.
pub const DEFAULT_OPCODES: &[u8] = &[0, 1, 2, 4, 5, 6];

/// Standard RR types a default `StorageParameters` expects to see.
pub const DEFAULT_RR_TYPES: &[u16] = &[
    1,    // A
    2,    // NS
    5,    // CNAME
    6,    // SOA
    12,   // PTR
    15,   // MX
    16,   // TXT
    28,   // AAAA
    33,   // SRV
    35,   // NAPTR
    41,   // OPT
    43,   // DS
    46,   // RRSIG
    47,   // NSEC
    48,   // DNSKEY
    50,   // NSEC3
    51,   // NSEC3PARAM
    52,   // TLSA
    99,   // SPF
    255,  // ANY
];

/// Default `query_response_hints`: every optional `QueryResponse` field
/// this library populates by default.
pub const DEFAULT_QR_HINTS: u32 = 0x03FF;

/// Default `query_response_signature_hints`: every optional
/// `QueryResponseSignature` field populated by default.
pub const DEFAULT_QR_SIG_HINTS: u32 = 0x01FF;

/// Default `rr_hints`: every optional `RR` field populated by default.
pub const DEFAULT_RR_HINTS: u32 = 0x000F;

/// Default `other_data_hints`: malformed-message and address-event data,
/// both populated by default.
pub const DEFAULT_OTHER_DATA_HINTS: u32 = 0x0003;


/// Four bitmasks declaring which optional fields an emitter populates.
///
/// The emitter must not record a field its hint does not flag; a decoder
/// must tolerate either presence — see the open question in the crate's
/// design notes about hints vs. actually-populated fields.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct StorageHints {

    /// Which `QueryResponse` fields are recorded.
    pub query_response_hints: u32,

    /// Which `QueryResponseSignature` fields are recorded.
    pub query_response_signature_hints: u32,

    /// Which `RR` fields are recorded.
    pub rr_hints: u32,

    /// Which malformed-message / address-event fields are recorded.
    pub other_data_hints: u32,
}

impl Default for StorageHints {
    fn default() -> Self {
        Self {
            query_response_hints: DEFAULT_QR_HINTS,
            query_response_signature_hints: DEFAULT_QR_SIG_HINTS,
            rr_hints: DEFAULT_RR_HINTS,
            other_data_hints: DEFAULT_OTHER_DATA_HINTS,
        }
    }
}


/// Per-block storage configuration: tick resolution, block size cap,
/// which fields get recorded, and which opcodes/RR types are in scope.
#[derive(PartialEq, Debug, Clone)]
pub struct StorageParameters {

    /// Sub-second ticks per second; scales every `Timestamp` in blocks
    /// using this profile.
    pub ticks_per_second: u64,

    /// Maximum buffered items (`|QR| + |MM| + distinct(AEC)`) before a
    /// block is flushed.
    pub max_block_items: u32,

    /// Which optional fields get recorded.
    pub storage_hints: StorageHints,

    /// DNS opcodes expected to appear in this capture.
    pub opcodes: BTreeSet<u8>,

    /// RR types expected to appear in this capture.
    pub rr_types: BTreeSet<u16>,

    /// Free-form bitmask of storage behaviour flags not otherwise modelled
    /// (e.g. anonymization applied, sampling applied).
    pub storage_flags: u32,

    /// IPv4 client address prefix length actually stored, if addresses are
    /// truncated.
    pub client_address_prefix_ipv4: Option<u8>,

    /// IPv6 client address prefix length actually stored, if addresses are
    /// truncated.
    pub client_address_prefix_ipv6: Option<u8>,

    /// IPv4 server address prefix length actually stored, if addresses are
    /// truncated.
    pub server_address_prefix_ipv4: Option<u8>,

    /// IPv6 server address prefix length actually stored, if addresses are
    /// truncated.
    pub server_address_prefix_ipv6: Option<u8>,

    /// Free-form description of the sampling method applied, if any.
    pub sampling_method: Option<String>,

    /// Free-form description of the anonymization method applied, if any.
    pub anonymization_method: Option<String>,
}

impl Default for StorageParameters {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            max_block_items: DEFAULT_MAX_BLOCK_ITEMS,
            storage_hints: StorageHints::default(),
            opcodes: DEFAULT_OPCODES.iter().copied().collect(),
            rr_types: DEFAULT_RR_TYPES.iter().copied().collect(),
            storage_flags: 0,
            client_address_prefix_ipv4: None,
            client_address_prefix_ipv6: None,
            server_address_prefix_ipv4: None,
            server_address_prefix_ipv6: None,
            sampling_method: None,
            anonymization_method: None,
        }
    }
}


/// Capture-session metadata: timeouts, interfaces, filter, generator
/// identity. Entirely optional — a profile with no `CollectionParameters`
/// simply omits this section when serialised.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct CollectionParameters {

    /// Query timeout, in the enclosing profile's ticks.
    pub query_timeout: Option<u64>,

    /// Timeout used to associate closely-timed query/response pairs whose
    /// clocks may be skewed, in ticks.
    pub skew_timeout: Option<u64>,

    /// Capture snap length, if packets were truncated at capture time.
    pub snaplen: Option<u32>,

    /// Whether the capturing interface was in promiscuous mode.
    pub promisc: Option<bool>,

    /// Names of the interfaces captured from.
    pub interfaces: Vec<String>,

    /// Addresses of the server(s) being captured, in textual form.
    pub server_address: Vec<String>,

    /// VLAN IDs observed during capture.
    pub vlan_ids: Vec<u32>,

    /// The capture filter expression applied, if any.
    pub filter: Option<String>,

    /// Free-form identifier of the software that generated this capture.
    pub generator_id: Option<String>,

    /// Free-form identifier of the host that generated this capture.
    pub host_id: Option<String>,
}


/// One named profile of storage + collection behaviour. Blocks reference
/// a profile by index into the preamble's `block_parameters` sequence.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct BlockParameters {

    /// Per-block storage configuration.
    pub storage_parameters: StorageParameters,

    /// Capture-session metadata, if recorded.
    pub collection_parameters: Option<CollectionParameters>,
}


/// The file-level header: format versions plus the ordered sequence of
/// block-parameter profiles blocks may reference.
///
/// Created once, at exporter construction; after the first block is
/// written only `block_parameters` may grow, and only by appending —
/// existing entries (and their indices) never change.
#[derive(PartialEq, Debug, Clone)]
pub struct FilePreamble {

    /// Major format version. Always [`VERSION_MAJOR`] for files this
    /// library writes.
    pub major_format_version: u32,

    /// Minor format version. Always [`VERSION_MINOR`] for files this
    /// library writes.
    pub minor_format_version: u32,

    /// Implementation-private version, free for embedders to use.
    pub private_version: u32,

    /// Ordered block-parameter profiles; `[0]` is the default profile a
    /// freshly-constructed exporter starts with.
    pub block_parameters: Vec<BlockParameters>,
}

impl Default for FilePreamble {
    fn default() -> Self {
        Self {
            major_format_version: VERSION_MAJOR,
            minor_format_version: VERSION_MINOR,
            private_version: VERSION_PRIVATE,
            block_parameters: vec![BlockParameters::default()],
        }
    }
}


impl StorageHints {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_map_start(4)?;
        n += enc.write_uint(wire::storage_hints::QUERY_RESPONSE_HINTS)?;
        n += enc.write_uint(u64::from(self.query_response_hints))?;
        n += enc.write_uint(wire::storage_hints::QUERY_RESPONSE_SIGNATURE_HINTS)?;
        n += enc.write_uint(u64::from(self.query_response_signature_hints))?;
        n += enc.write_uint(wire::storage_hints::RR_HINTS)?;
        n += enc.write_uint(u64::from(self.rr_hints))?;
        n += enc.write_uint(wire::storage_hints::OTHER_DATA_HINTS)?;
        n += enc.write_uint(u64::from(self.other_data_hints))?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut hints = Self { query_response_hints: 0, query_response_signature_hints: 0, rr_hints: 0, other_data_hints: 0 };
        read_map(dec, |dec, key| {
            match key {
                wire::storage_hints::QUERY_RESPONSE_HINTS => hints.query_response_hints = dec.read_unsigned()? as u32,
                wire::storage_hints::QUERY_RESPONSE_SIGNATURE_HINTS => hints.query_response_signature_hints = dec.read_unsigned()? as u32,
                wire::storage_hints::RR_HINTS => hints.rr_hints = dec.read_unsigned()? as u32,
                wire::storage_hints::OTHER_DATA_HINTS => hints.other_data_hints = dec.read_unsigned()? as u32,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(hints)
    }
}

impl StorageParameters {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut count = 3; // ticks_per_second, max_block_items, storage_hints are always present
        count += !self.opcodes.is_empty() as u64;
        count += !self.rr_types.is_empty() as u64;
        count += (self.storage_flags != 0) as u64;
        count += self.client_address_prefix_ipv4.is_some() as u64;
        count += self.client_address_prefix_ipv6.is_some() as u64;
        count += self.server_address_prefix_ipv4.is_some() as u64;
        count += self.server_address_prefix_ipv6.is_some() as u64;
        count += self.sampling_method.is_some() as u64;
        count += self.anonymization_method.is_some() as u64;

        let mut n = enc.write_map_start(count)?;
        n += enc.write_uint(wire::storage_parameters::TICKS_PER_SECOND)?;
        n += enc.write_uint(self.ticks_per_second)?;
        n += enc.write_uint(wire::storage_parameters::MAX_BLOCK_ITEMS)?;
        n += enc.write_uint(u64::from(self.max_block_items))?;
        n += enc.write_uint(wire::storage_parameters::STORAGE_HINTS)?;
        n += self.storage_hints.write(enc)?;

        if !self.opcodes.is_empty() {
            n += enc.write_uint(wire::storage_parameters::OPCODES)?;
            n += enc.write_array_start(self.opcodes.len() as u64)?;
            for op in &self.opcodes {
                n += enc.write_uint(u64::from(*op))?;
            }
        }
        if !self.rr_types.is_empty() {
            n += enc.write_uint(wire::storage_parameters::RR_TYPES)?;
            n += enc.write_array_start(self.rr_types.len() as u64)?;
            for t in &self.rr_types {
                n += enc.write_uint(u64::from(*t))?;
            }
        }
        if self.storage_flags != 0 {
            n += enc.write_uint(wire::storage_parameters::STORAGE_FLAGS)?;
            n += enc.write_uint(u64::from(self.storage_flags))?;
        }
        if let Some(v) = self.client_address_prefix_ipv4 {
            n += enc.write_uint(wire::storage_parameters::CLIENT_ADDRESS_PREFIX_IPV4)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.client_address_prefix_ipv6 {
            n += enc.write_uint(wire::storage_parameters::CLIENT_ADDRESS_PREFIX_IPV6)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.server_address_prefix_ipv4 {
            n += enc.write_uint(wire::storage_parameters::SERVER_ADDRESS_PREFIX_IPV4)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.server_address_prefix_ipv6 {
            n += enc.write_uint(wire::storage_parameters::SERVER_ADDRESS_PREFIX_IPV6)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(s) = &self.sampling_method {
            n += enc.write_uint(wire::storage_parameters::SAMPLING_METHOD)?;
            n += enc.write_textstring(s)?;
        }
        if let Some(s) = &self.anonymization_method {
            n += enc.write_uint(wire::storage_parameters::ANONYMIZATION_METHOD)?;
            n += enc.write_textstring(s)?;
        }
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut sp = Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            max_block_items: DEFAULT_MAX_BLOCK_ITEMS,
            storage_hints: StorageHints { query_response_hints: 0, query_response_signature_hints: 0, rr_hints: 0, other_data_hints: 0 },
            opcodes: BTreeSet::new(),
            rr_types: BTreeSet::new(),
            storage_flags: 0,
            client_address_prefix_ipv4: None,
            client_address_prefix_ipv6: None,
            server_address_prefix_ipv4: None,
            server_address_prefix_ipv6: None,
            sampling_method: None,
            anonymization_method: None,
        };
        read_map(dec, |dec, key| {
            match key {
                wire::storage_parameters::TICKS_PER_SECOND => sp.ticks_per_second = dec.read_unsigned()?,
                wire::storage_parameters::MAX_BLOCK_ITEMS => sp.max_block_items = dec.read_unsigned()? as u32,
                wire::storage_parameters::STORAGE_HINTS => sp.storage_hints = StorageHints::read(dec)?,
                wire::storage_parameters::OPCODES => {
                    sp.opcodes = dec.read_array(|d| Ok(d.read_unsigned()? as u8))?.into_iter().collect();
                }
                wire::storage_parameters::RR_TYPES => {
                    sp.rr_types = dec.read_array(|d| Ok(d.read_unsigned()? as u16))?.into_iter().collect();
                }
                wire::storage_parameters::STORAGE_FLAGS => sp.storage_flags = dec.read_unsigned()? as u32,
                wire::storage_parameters::CLIENT_ADDRESS_PREFIX_IPV4 => sp.client_address_prefix_ipv4 = Some(dec.read_unsigned()? as u8),
                wire::storage_parameters::CLIENT_ADDRESS_PREFIX_IPV6 => sp.client_address_prefix_ipv6 = Some(dec.read_unsigned()? as u8),
                wire::storage_parameters::SERVER_ADDRESS_PREFIX_IPV4 => sp.server_address_prefix_ipv4 = Some(dec.read_unsigned()? as u8),
                wire::storage_parameters::SERVER_ADDRESS_PREFIX_IPV6 => sp.server_address_prefix_ipv6 = Some(dec.read_unsigned()? as u8),
                wire::storage_parameters::SAMPLING_METHOD => sp.sampling_method = Some(dec.read_textstring()?),
                wire::storage_parameters::ANONYMIZATION_METHOD => sp.anonymization_method = Some(dec.read_textstring()?),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(sp)
    }
}

impl CollectionParameters {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut count = 0u64;
        count += self.query_timeout.is_some() as u64;
        count += self.skew_timeout.is_some() as u64;
        count += self.snaplen.is_some() as u64;
        count += self.promisc.is_some() as u64;
        count += !self.interfaces.is_empty() as u64;
        count += !self.server_address.is_empty() as u64;
        count += !self.vlan_ids.is_empty() as u64;
        count += self.filter.is_some() as u64;
        count += self.generator_id.is_some() as u64;
        count += self.host_id.is_some() as u64;

        let mut n = enc.write_map_start(count)?;
        if let Some(v) = self.query_timeout {
            n += enc.write_uint(wire::collection_parameters::QUERY_TIMEOUT)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.skew_timeout {
            n += enc.write_uint(wire::collection_parameters::SKEW_TIMEOUT)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.snaplen {
            n += enc.write_uint(wire::collection_parameters::SNAPLEN)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.promisc {
            n += enc.write_uint(wire::collection_parameters::PROMISC)?;
            n += enc.write_bool(v)?;
        }
        if !self.interfaces.is_empty() {
            n += enc.write_uint(wire::collection_parameters::INTERFACES)?;
            n += enc.write_array_start(self.interfaces.len() as u64)?;
            for s in &self.interfaces {
                n += enc.write_textstring(s)?;
            }
        }
        if !self.server_address.is_empty() {
            n += enc.write_uint(wire::collection_parameters::SERVER_ADDRESS)?;
            n += enc.write_array_start(self.server_address.len() as u64)?;
            for s in &self.server_address {
                n += enc.write_textstring(s)?;
            }
        }
        if !self.vlan_ids.is_empty() {
            n += enc.write_uint(wire::collection_parameters::VLAN_IDS)?;
            n += enc.write_array_start(self.vlan_ids.len() as u64)?;
            for v in &self.vlan_ids {
                n += enc.write_uint(u64::from(*v))?;
            }
        }
        if let Some(s) = &self.filter {
            n += enc.write_uint(wire::collection_parameters::FILTER)?;
            n += enc.write_textstring(s)?;
        }
        if let Some(s) = &self.generator_id {
            n += enc.write_uint(wire::collection_parameters::GENERATOR_ID)?;
            n += enc.write_textstring(s)?;
        }
        if let Some(s) = &self.host_id {
            n += enc.write_uint(wire::collection_parameters::HOST_ID)?;
            n += enc.write_textstring(s)?;
        }
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut cp = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::collection_parameters::QUERY_TIMEOUT => cp.query_timeout = Some(dec.read_unsigned()?),
                wire::collection_parameters::SKEW_TIMEOUT => cp.skew_timeout = Some(dec.read_unsigned()?),
                wire::collection_parameters::SNAPLEN => cp.snaplen = Some(dec.read_unsigned()? as u32),
                wire::collection_parameters::PROMISC => cp.promisc = Some(dec.read_bool()?),
                wire::collection_parameters::INTERFACES => cp.interfaces = dec.read_array(|d| d.read_textstring())?,
                wire::collection_parameters::SERVER_ADDRESS => cp.server_address = dec.read_array(|d| d.read_textstring())?,
                wire::collection_parameters::VLAN_IDS => cp.vlan_ids = dec.read_array(|d| Ok(d.read_unsigned()? as u32))?,
                wire::collection_parameters::FILTER => cp.filter = Some(dec.read_textstring()?),
                wire::collection_parameters::GENERATOR_ID => cp.generator_id = Some(dec.read_textstring()?),
                wire::collection_parameters::HOST_ID => cp.host_id = Some(dec.read_textstring()?),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(cp)
    }
}

impl BlockParameters {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = 1 + self.collection_parameters.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        n += enc.write_uint(wire::block_parameters::STORAGE_PARAMETERS)?;
        n += self.storage_parameters.write(enc)?;
        if let Some(cp) = &self.collection_parameters {
            n += enc.write_uint(wire::block_parameters::COLLECTION_PARAMETERS)?;
            n += cp.write(enc)?;
        }
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut bp = Self { storage_parameters: StorageParameters::default(), collection_parameters: None };
        read_map(dec, |dec, key| {
            match key {
                wire::block_parameters::STORAGE_PARAMETERS => bp.storage_parameters = StorageParameters::read(dec)?,
                wire::block_parameters::COLLECTION_PARAMETERS => bp.collection_parameters = Some(CollectionParameters::read(dec)?),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(bp)
    }
}

impl FilePreamble {
    /// Serialises the preamble as a CBOR map.
    pub fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_map_start(4)?;
        n += enc.write_uint(wire::file_preamble::MAJOR_FORMAT_VERSION)?;
        n += enc.write_uint(u64::from(self.major_format_version))?;
        n += enc.write_uint(wire::file_preamble::MINOR_FORMAT_VERSION)?;
        n += enc.write_uint(u64::from(self.minor_format_version))?;
        n += enc.write_uint(wire::file_preamble::PRIVATE_VERSION)?;
        n += enc.write_uint(u64::from(self.private_version))?;
        n += enc.write_uint(wire::file_preamble::BLOCK_PARAMETERS)?;
        n += enc.write_array_start(self.block_parameters.len() as u64)?;
        for bp in &self.block_parameters {
            n += bp.write(enc)?;
        }
        Ok(n)
    }

    /// Parses a preamble back out of a CBOR map, validating the format
    /// version and requiring at least one block-parameters profile.
    pub fn read<R: Read>(dec: &mut Decoder<R>) -> Result<Self> {
        let mut fp = Self { major_format_version: 0, minor_format_version: 0, private_version: 0, block_parameters: Vec::new() };
        let mut seen_version = false;
        read_map(dec, |dec, key| {
            match key {
                wire::file_preamble::MAJOR_FORMAT_VERSION => { fp.major_format_version = dec.read_unsigned()? as u32; seen_version = true; }
                wire::file_preamble::MINOR_FORMAT_VERSION => fp.minor_format_version = dec.read_unsigned()? as u32,
                wire::file_preamble::PRIVATE_VERSION => fp.private_version = dec.read_unsigned()? as u32,
                wire::file_preamble::BLOCK_PARAMETERS => {
                    fp.block_parameters = dec.read_array(BlockParameters::read)?;
                }
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;

        if !seen_version {
            return Err(Error::Format("file preamble is missing major_format_version".into()));
        }
        if fp.major_format_version != VERSION_MAJOR {
            return Err(Error::Format(format!("unsupported C-DNS major version {}", fp.major_format_version)));
        }
        if fp.block_parameters.is_empty() {
            return Err(Error::Format("file preamble has no block_parameters entries".into()));
        }
        Ok(fp)
    }
}

/// Writes an index into one of a block's intern tables, 1-based with `0`
/// meaning "absent" (RFC 8618's convention for these fields): the map key
/// is always emitted, unlike every other optional field in this crate's
/// encoding, which omits its key entirely when absent.
pub(crate) fn write_index_field<W: Write>(enc: &mut Encoder<W>, key: u64, index: Option<usize>) -> io::Result<usize> {
    let mut n = enc.write_uint(key)?;
    n += enc.write_uint(index.map(|i| i as u64 + 1).unwrap_or(0))?;
    Ok(n)
}

/// Reads back a value written by [`write_index_field`]: `0` decodes to
/// `None`, anything else decodes to `Some(value - 1)`.
pub(crate) fn read_index_field<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Option<usize>, CborError> {
    let raw = dec.read_unsigned()?;
    Ok(if raw == 0 { None } else { Some(raw as usize - 1) })
}

/// Reads a definite- or indefinite-length map, calling `handle_entry` once
/// per key with the decoder positioned to read that key's value; the
/// callback is responsible for consuming exactly the value.
pub(crate) fn read_map<R: Read>(
    dec: &mut Decoder<R>,
    mut handle_entry: impl FnMut(&mut Decoder<R>, u64) -> std::result::Result<(), CborError>,
) -> std::result::Result<(), CborError> {
    match dec.read_map_start()? {
        Some(len) => {
            for _ in 0..len {
                let key = dec.read_unsigned()?;
                handle_entry(dec, key)?;
            }
        }
        None => {
            while !dec.at_break()? {
                let key = dec.read_unsigned()?;
                handle_entry(dec, key)?;
            }
            dec.read_break()?;
        }
    }
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_preamble_has_one_profile() {
        let fp = FilePreamble::default();
        assert_eq!(fp.block_parameters.len(), 1);
        assert_eq!(fp.major_format_version, VERSION_MAJOR);
    }

    #[test]
    fn default_storage_parameters_cover_standard_opcodes() {
        let sp = StorageParameters::default();
        assert!(sp.opcodes.contains(&0));
        assert_eq!(sp.max_block_items, DEFAULT_MAX_BLOCK_ITEMS);
    }
}
