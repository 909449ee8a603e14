//! The value types stored in a block's intern tables.
//!
//! Each of these is looked up by structural equality (`#[derive(Hash)]`
//! matching `#[derive(PartialEq, Eq)]`), so two callers who build an
//! equal value always land on the same table index.

use std::io::{self, Read, Write};

use cdns_codec::{CborError, Decoder, Encoder};

use crate::config::{read_index_field, read_map, write_index_field};
use crate::wire;

/// A Question: a name and a `(type, class)` pair, both already interned
/// in their own tables.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct Question {

    /// Index into the block's `name_rdata` table.
    pub name_index: usize,

    /// Index into the block's `classtype` table.
    pub classtype_index: usize,
}

impl Question {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_map_start(2)?;
        n += enc.write_uint(wire::question::NAME_INDEX)?;
        n += enc.write_uint(self.name_index as u64)?;
        n += enc.write_uint(wire::question::CLASSTYPE_INDEX)?;
        n += enc.write_uint(self.classtype_index as u64)?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut q = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::question::NAME_INDEX => q.name_index = dec.read_unsigned()? as usize,
                wire::question::CLASSTYPE_INDEX => q.classtype_index = dec.read_unsigned()? as usize,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(q)
    }
}


/// A Resource Record: a name, a `(type, class)` pair, a TTL, and rdata —
/// name, classtype, and rdata are indices into their own tables.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct Rr {

    /// Index into the block's `name_rdata` table.
    pub name_index: usize,

    /// Index into the block's `classtype` table.
    pub classtype_index: usize,

    /// Time-to-live, if recorded.
    pub ttl: Option<u32>,

    /// Index into the block's `name_rdata` table for this RR's rdata, if
    /// recorded.
    pub rdata_index: Option<usize>,
}

impl Rr {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = 3 + self.ttl.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        n += enc.write_uint(wire::rr::NAME_INDEX)?;
        n += enc.write_uint(self.name_index as u64)?;
        n += enc.write_uint(wire::rr::CLASSTYPE_INDEX)?;
        n += enc.write_uint(self.classtype_index as u64)?;
        if let Some(ttl) = self.ttl {
            n += enc.write_uint(wire::rr::TTL)?;
            n += enc.write_uint(u64::from(ttl))?;
        }
        n += write_index_field(enc, wire::rr::RDATA_INDEX, self.rdata_index)?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut rr = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::rr::NAME_INDEX => rr.name_index = dec.read_unsigned()? as usize,
                wire::rr::CLASSTYPE_INDEX => rr.classtype_index = dec.read_unsigned()? as usize,
                wire::rr::TTL => rr.ttl = Some(dec.read_unsigned()? as u32),
                wire::rr::RDATA_INDEX => rr.rdata_index = read_index_field(dec)?,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(rr)
    }
}


/// Everything needed to reconstruct a malformed message's addressing and
/// transport context, shared across malformed messages that agree on all
/// of it.
#[derive(PartialEq, Eq, Debug, Clone, Default, Hash)]
pub struct MalformedMessageData {

    /// Index into the block's `ip_address` table for the receiving
    /// server, if recorded.
    pub server_address_index: Option<usize>,

    /// The server's port, if recorded.
    pub server_port: Option<u16>,

    /// Transport-level flags, as in [`crate::generic::transport_flags`].
    pub mm_transport_flags: Option<u8>,

    /// The raw, unparsed message bytes.
    pub mm_payload: Option<Vec<u8>>,
}

impl MalformedMessageData {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = 1
            + self.server_port.is_some() as u64
            + self.mm_transport_flags.is_some() as u64
            + self.mm_payload.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        n += write_index_field(enc, wire::malformed_message_data::SERVER_ADDRESS_INDEX, self.server_address_index)?;
        if let Some(port) = self.server_port {
            n += enc.write_uint(wire::malformed_message_data::SERVER_PORT)?;
            n += enc.write_uint(u64::from(port))?;
        }
        if let Some(flags) = self.mm_transport_flags {
            n += enc.write_uint(wire::malformed_message_data::MM_TRANSPORT_FLAGS)?;
            n += enc.write_uint(u64::from(flags))?;
        }
        if let Some(payload) = &self.mm_payload {
            n += enc.write_uint(wire::malformed_message_data::MM_PAYLOAD)?;
            n += enc.write_bytestring(payload)?;
        }
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut mmd = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::malformed_message_data::SERVER_ADDRESS_INDEX => mmd.server_address_index = read_index_field(dec)?,
                wire::malformed_message_data::SERVER_PORT => mmd.server_port = Some(dec.read_unsigned()? as u16),
                wire::malformed_message_data::MM_TRANSPORT_FLAGS => mmd.mm_transport_flags = Some(dec.read_unsigned()? as u8),
                wire::malformed_message_data::MM_PAYLOAD => mmd.mm_payload = Some(dec.read_bytestring()?),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(mmd)
    }
}


/// Everything about a query/response pair that tends to repeat across
/// many pairs: addressing, transport, protocol-level flags, and EDNS
/// parameters. Shared by every `QueryResponse` item with the same
/// signature.
#[derive(PartialEq, Eq, Debug, Clone, Default, Hash)]
pub struct QuerySignature {

    /// Index into the block's `ip_address` table for the server.
    pub server_address_index: Option<usize>,

    /// The server's port.
    pub server_port: Option<u16>,

    /// Transport-level flags (IP version, transport protocol, trailing data).
    pub qr_transport_flags: Option<u8>,

    /// Signature-level flags (query/response presence, OPT presence, …).
    pub qr_sig_flags: Option<u16>,

    /// The query's DNS opcode.
    pub query_opcode: Option<u8>,

    /// The combined DNS header flags observed.
    pub dns_flags: Option<u16>,

    /// Question/Answer/Authority/Additional counts declared in the
    /// query's header.
    pub query_rr_counts: Option<[u16; 4]>,

    /// The EDNS UDP payload size advertised, if EDNS was present.
    pub edns_udp_payload_size: Option<u16>,

    /// The EDNS version advertised, if EDNS was present.
    pub edns_version: Option<u8>,

    /// The response's RCODE.
    pub response_rcode: Option<u16>,
}

impl QuerySignature {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = 1
            + self.server_port.is_some() as u64
            + self.qr_transport_flags.is_some() as u64
            + self.qr_sig_flags.is_some() as u64
            + self.query_opcode.is_some() as u64
            + self.dns_flags.is_some() as u64
            + self.query_rr_counts.is_some() as u64
            + self.edns_udp_payload_size.is_some() as u64
            + self.edns_version.is_some() as u64
            + self.response_rcode.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        n += write_index_field(enc, wire::qr_sig::SERVER_ADDRESS_INDEX, self.server_address_index)?;
        if let Some(v) = self.server_port {
            n += enc.write_uint(wire::qr_sig::SERVER_PORT)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.qr_transport_flags {
            n += enc.write_uint(wire::qr_sig::QR_TRANSPORT_FLAGS)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.qr_sig_flags {
            n += enc.write_uint(wire::qr_sig::QR_SIG_FLAGS)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.query_opcode {
            n += enc.write_uint(wire::qr_sig::QUERY_OPCODE)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.dns_flags {
            n += enc.write_uint(wire::qr_sig::DNS_FLAGS)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(counts) = self.query_rr_counts {
            n += enc.write_uint(wire::qr_sig::QUERY_RR_COUNTS)?;
            n += enc.write_array_start(4)?;
            for c in counts {
                n += enc.write_uint(u64::from(c))?;
            }
        }
        if let Some(v) = self.edns_udp_payload_size {
            n += enc.write_uint(wire::qr_sig::EDNS_UDP_PAYLOAD_SIZE)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.edns_version {
            n += enc.write_uint(wire::qr_sig::EDNS_VERSION)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.response_rcode {
            n += enc.write_uint(wire::qr_sig::RESPONSE_RCODE)?;
            n += enc.write_uint(u64::from(v))?;
        }
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut sig = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::qr_sig::SERVER_ADDRESS_INDEX => sig.server_address_index = read_index_field(dec)?,
                wire::qr_sig::SERVER_PORT => sig.server_port = Some(dec.read_unsigned()? as u16),
                wire::qr_sig::QR_TRANSPORT_FLAGS => sig.qr_transport_flags = Some(dec.read_unsigned()? as u8),
                wire::qr_sig::QR_SIG_FLAGS => sig.qr_sig_flags = Some(dec.read_unsigned()? as u16),
                wire::qr_sig::QUERY_OPCODE => sig.query_opcode = Some(dec.read_unsigned()? as u8),
                wire::qr_sig::DNS_FLAGS => sig.dns_flags = Some(dec.read_unsigned()? as u16),
                wire::qr_sig::QUERY_RR_COUNTS => {
                    let counts = dec.read_array(|d| Ok(d.read_unsigned()? as u16))?;
                    if counts.len() == 4 {
                        sig.query_rr_counts = Some([counts[0], counts[1], counts[2], counts[3]]);
                    }
                }
                wire::qr_sig::EDNS_UDP_PAYLOAD_SIZE => sig.edns_udp_payload_size = Some(dec.read_unsigned()? as u16),
                wire::qr_sig::EDNS_VERSION => sig.edns_version = Some(dec.read_unsigned()? as u8),
                wire::qr_sig::RESPONSE_RCODE => sig.response_rcode = Some(dec.read_unsigned()? as u16),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(sig)
    }
}
