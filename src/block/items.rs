//! The buffered per-record item shapes a block holds until it is
//! serialised. Every field is an index into one of the block's intern
//! tables (never a back-pointer to the block itself).
//!
//! Optional indices (`Option<usize>` fields referencing an intern table)
//! are 1-based on the wire, with `0` meaning "absent", per
//! [`crate::config::write_index_field`]/[`crate::config::read_index_field`]
//! — their map key is always present, unlike every other optional field
//! in this crate's encoding, which omits its key entirely when absent.
//! In memory they stay plain 0-based `Option<usize>`s; the codec converts
//! at the boundary.
//!
//! `QueryResponse` and `MalformedMessage` hold an absolute [`Timestamp`]
//! rather than a precomputed tick offset, because the block's earliest
//! timestamp isn't final until every item has been buffered — an item
//! with an earlier timestamp can still arrive after one whose offset
//! would otherwise already have been fixed. The offset actually written
//! to (and read from) the wire is only ever computed against the
//! block's final `earliest_time`, in [`Block::write`](super::Block::write)
//! and [`BlockReader::read`](super::BlockReader::read).

use std::io::{self, Read, Write};

use cdns_codec::{CborError, Decoder, Encoder};

use crate::config::{read_index_field, read_map, write_index_field};
use crate::timestamp::Timestamp;
use crate::wire;

/// Response-specific processing metadata attached to a `QueryResponse`.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct ResponseProcessingData {

    /// Index into `name_rdata` for the zone the response is authoritative
    /// within.
    pub bailiwick_index: Option<usize>,

    /// Processing flags; see [`crate::generic::processing_flags`].
    pub processing_flags: Option<u32>,
}

impl ResponseProcessingData {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = 1 + self.processing_flags.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        n += write_index_field(enc, wire::response_processing_data::BAILIWICK_INDEX, self.bailiwick_index)?;
        if let Some(flags) = self.processing_flags {
            n += enc.write_uint(wire::response_processing_data::PROCESSING_FLAGS)?;
            n += enc.write_uint(u64::from(flags))?;
        }
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut rpd = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::response_processing_data::BAILIWICK_INDEX => rpd.bailiwick_index = read_index_field(dec)?,
                wire::response_processing_data::PROCESSING_FLAGS => rpd.processing_flags = Some(dec.read_unsigned()? as u32),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(rpd)
    }
}

/// Indices into the question/RR-list tables for one side (query or
/// response) of a `QueryResponse`.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct QueryResponseExtended {

    /// Index into `qlist` for the Question section.
    pub question_index: Option<usize>,

    /// Index into `rrlist` for the Answer section.
    pub answer_index: Option<usize>,

    /// Index into `rrlist` for the Authority section.
    pub authority_index: Option<usize>,

    /// Index into `rrlist` for the Additional section.
    pub additional_index: Option<usize>,
}

impl QueryResponseExtended {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_map_start(4)?;
        n += write_index_field(enc, wire::query_response_extended::QUESTION_INDEX, self.question_index)?;
        n += write_index_field(enc, wire::query_response_extended::ANSWER_INDEX, self.answer_index)?;
        n += write_index_field(enc, wire::query_response_extended::AUTHORITY_INDEX, self.authority_index)?;
        n += write_index_field(enc, wire::query_response_extended::ADDITIONAL_INDEX, self.additional_index)?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut qre = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::query_response_extended::QUESTION_INDEX => qre.question_index = read_index_field(dec)?,
                wire::query_response_extended::ANSWER_INDEX => qre.answer_index = read_index_field(dec)?,
                wire::query_response_extended::AUTHORITY_INDEX => qre.authority_index = read_index_field(dec)?,
                wire::query_response_extended::ADDITIONAL_INDEX => qre.additional_index = read_index_field(dec)?,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(qre)
    }
}

/// A buffered query/response pair.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct QueryResponse {

    /// This record's absolute capture timestamp. Converted to (or from)
    /// a tick offset relative to the block's `earliest_time` only at
    /// the point the block is written or read.
    pub ts: Timestamp,

    /// Index into `ip_address` for the client.
    pub client_address_index: Option<usize>,

    /// The client's port.
    pub client_port: Option<u16>,

    /// The DNS header transaction ID.
    pub transaction_id: Option<u16>,

    /// Index into `qr_sig` for this pair's signature.
    pub qr_signature_index: Option<usize>,

    /// The client's observed IP hop limit / TTL.
    pub client_hoplimit: Option<u8>,

    /// Query-to-response delay, in ticks.
    pub response_delay: Option<i64>,

    /// Index into `name_rdata` for the query name.
    pub query_name_index: Option<usize>,

    /// Wire size of the query message, in bytes.
    pub query_size: Option<u32>,

    /// Wire size of the response message, in bytes.
    pub response_size: Option<u32>,

    /// Bailiwick and cache-processing metadata for the response.
    pub response_processing_data: Option<ResponseProcessingData>,

    /// Question/Answer/Authority/Additional indices for the query.
    pub query_extended: Option<QueryResponseExtended>,

    /// Question/Answer/Authority/Additional indices for the response.
    pub response_extended: Option<QueryResponseExtended>,

    /// Enrichment: client autonomous system number.
    pub asn: Option<String>,

    /// Enrichment: client geolocated country code.
    pub country_code: Option<String>,

    /// Enrichment: measured round-trip time, in ticks.
    pub round_trip_time: Option<i64>,
}

impl QueryResponse {
    /// `earliest` and `ticks_per_second` come from the enclosing block's
    /// finalised preamble; the tick offset actually written is computed
    /// here, not carried from buffering time.
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>, earliest: Timestamp, ticks_per_second: u64) -> io::Result<usize> {
        let time_offset = self.ts.get_time_offset(&earliest, ticks_per_second);
        let count = 1
            + 1 // client_address_index
            + self.client_port.is_some() as u64
            + self.transaction_id.is_some() as u64
            + 1 // qr_signature_index
            + self.client_hoplimit.is_some() as u64
            + self.response_delay.is_some() as u64
            + 1 // query_name_index
            + self.query_size.is_some() as u64
            + self.response_size.is_some() as u64
            + self.response_processing_data.is_some() as u64
            + self.query_extended.is_some() as u64
            + self.response_extended.is_some() as u64
            + self.asn.is_some() as u64
            + self.country_code.is_some() as u64
            + self.round_trip_time.is_some() as u64;

        let mut n = enc.write_map_start(count)?;
        n += enc.write_uint(wire::qr_item::TIME_OFFSET)?;
        n += enc.write_int(time_offset)?;
        n += write_index_field(enc, wire::qr_item::CLIENT_ADDRESS_INDEX, self.client_address_index)?;
        if let Some(v) = self.client_port {
            n += enc.write_uint(wire::qr_item::CLIENT_PORT)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.transaction_id {
            n += enc.write_uint(wire::qr_item::TRANSACTION_ID)?;
            n += enc.write_uint(u64::from(v))?;
        }
        n += write_index_field(enc, wire::qr_item::QR_SIGNATURE_INDEX, self.qr_signature_index)?;
        if let Some(v) = self.client_hoplimit {
            n += enc.write_uint(wire::qr_item::CLIENT_HOPLIMIT)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.response_delay {
            n += enc.write_uint(wire::qr_item::RESPONSE_DELAY)?;
            n += enc.write_int(v)?;
        }
        n += write_index_field(enc, wire::qr_item::QUERY_NAME_INDEX, self.query_name_index)?;
        if let Some(v) = self.query_size {
            n += enc.write_uint(wire::qr_item::QUERY_SIZE)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(v) = self.response_size {
            n += enc.write_uint(wire::qr_item::RESPONSE_SIZE)?;
            n += enc.write_uint(u64::from(v))?;
        }
        if let Some(rpd) = &self.response_processing_data {
            n += enc.write_uint(wire::qr_item::RESPONSE_PROCESSING_DATA)?;
            n += rpd.write(enc)?;
        }
        if let Some(qe) = &self.query_extended {
            n += enc.write_uint(wire::qr_item::QUERY_EXTENDED)?;
            n += qe.write(enc)?;
        }
        if let Some(re) = &self.response_extended {
            n += enc.write_uint(wire::qr_item::RESPONSE_EXTENDED)?;
            n += re.write(enc)?;
        }
        if let Some(s) = &self.asn {
            n += enc.write_uint(wire::qr_item::ASN)?;
            n += enc.write_textstring(s)?;
        }
        if let Some(s) = &self.country_code {
            n += enc.write_uint(wire::qr_item::COUNTRY_CODE)?;
            n += enc.write_textstring(s)?;
        }
        if let Some(v) = self.round_trip_time {
            n += enc.write_uint(wire::qr_item::ROUND_TRIP_TIME)?;
            n += enc.write_int(v)?;
        }
        Ok(n)
    }

    /// `earliest` and `ticks_per_second` resolve this item's wire-level
    /// tick offset back into an absolute [`Timestamp`] immediately.
    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>, earliest: Timestamp, ticks_per_second: u64) -> std::result::Result<Self, CborError> {
        let mut qr = Self::default();
        let mut time_offset = 0i64;
        read_map(dec, |dec, key| {
            match key {
                wire::qr_item::TIME_OFFSET => time_offset = dec.read_integer()?,
                wire::qr_item::CLIENT_ADDRESS_INDEX => qr.client_address_index = read_index_field(dec)?,
                wire::qr_item::CLIENT_PORT => qr.client_port = Some(dec.read_unsigned()? as u16),
                wire::qr_item::TRANSACTION_ID => qr.transaction_id = Some(dec.read_unsigned()? as u16),
                wire::qr_item::QR_SIGNATURE_INDEX => qr.qr_signature_index = read_index_field(dec)?,
                wire::qr_item::CLIENT_HOPLIMIT => qr.client_hoplimit = Some(dec.read_unsigned()? as u8),
                wire::qr_item::RESPONSE_DELAY => qr.response_delay = Some(dec.read_integer()?),
                wire::qr_item::QUERY_NAME_INDEX => qr.query_name_index = read_index_field(dec)?,
                wire::qr_item::QUERY_SIZE => qr.query_size = Some(dec.read_unsigned()? as u32),
                wire::qr_item::RESPONSE_SIZE => qr.response_size = Some(dec.read_unsigned()? as u32),
                wire::qr_item::RESPONSE_PROCESSING_DATA => qr.response_processing_data = Some(ResponseProcessingData::read(dec)?),
                wire::qr_item::QUERY_EXTENDED => qr.query_extended = Some(QueryResponseExtended::read(dec)?),
                wire::qr_item::RESPONSE_EXTENDED => qr.response_extended = Some(QueryResponseExtended::read(dec)?),
                wire::qr_item::ASN => qr.asn = Some(dec.read_textstring()?),
                wire::qr_item::COUNTRY_CODE => qr.country_code = Some(dec.read_textstring()?),
                wire::qr_item::ROUND_TRIP_TIME => qr.round_trip_time = Some(dec.read_integer()?),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        qr.ts = earliest.add_time_offset(time_offset, ticks_per_second);
        Ok(qr)
    }
}

/// A buffered malformed message.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct MalformedMessage {

    /// This record's absolute capture timestamp. See the note on
    /// [`QueryResponse::ts`] for why this is absolute rather than a
    /// precomputed offset.
    pub ts: Timestamp,

    /// Index into `ip_address` for the client.
    pub client_address_index: Option<usize>,

    /// The client's port.
    pub client_port: Option<u16>,

    /// Index into `malformed_message_data` for the rest of this message's
    /// context.
    pub message_data_index: Option<usize>,
}

impl MalformedMessage {
    /// See [`QueryResponse::write`] for `earliest`/`ticks_per_second`.
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>, earliest: Timestamp, ticks_per_second: u64) -> io::Result<usize> {
        let time_offset = self.ts.get_time_offset(&earliest, ticks_per_second);
        let count = 1
            + 1 // client_address_index
            + self.client_port.is_some() as u64
            + 1; // message_data_index
        let mut n = enc.write_map_start(count)?;
        n += enc.write_uint(wire::mm_item::TIME_OFFSET)?;
        n += enc.write_int(time_offset)?;
        n += write_index_field(enc, wire::mm_item::CLIENT_ADDRESS_INDEX, self.client_address_index)?;
        if let Some(v) = self.client_port {
            n += enc.write_uint(wire::mm_item::CLIENT_PORT)?;
            n += enc.write_uint(u64::from(v))?;
        }
        n += write_index_field(enc, wire::mm_item::MESSAGE_DATA_INDEX, self.message_data_index)?;
        Ok(n)
    }

    /// See [`QueryResponse::read`] for `earliest`/`ticks_per_second`.
    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>, earliest: Timestamp, ticks_per_second: u64) -> std::result::Result<Self, CborError> {
        let mut mm = Self::default();
        let mut time_offset = 0i64;
        read_map(dec, |dec, key| {
            match key {
                wire::mm_item::TIME_OFFSET => time_offset = dec.read_integer()?,
                wire::mm_item::CLIENT_ADDRESS_INDEX => mm.client_address_index = read_index_field(dec)?,
                wire::mm_item::CLIENT_PORT => mm.client_port = Some(dec.read_unsigned()? as u16),
                wire::mm_item::MESSAGE_DATA_INDEX => mm.message_data_index = read_index_field(dec)?,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        mm.ts = earliest.add_time_offset(time_offset, ticks_per_second);
        Ok(mm)
    }
}

/// One coalesced address-event entry: the `(ae_code, ae_transport_flags,
/// ae_address_index)` triple plus how many times it occurred.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct AddressEventCount {

    /// The kind of event; see [`crate::generic::address_event_type`].
    pub ae_code: u8,

    /// Transport-level flags under which the event was observed.
    pub ae_transport_flags: u8,

    /// Index into `ip_address` for the affected address.
    pub ae_address_index: usize,

    /// How many times this exact triple was observed.
    pub ae_count: u64,
}

impl AddressEventCount {

    /// The `(ae_code, ae_transport_flags, ae_address_index)` identity
    /// triple used to decide whether two entries coalesce.
    pub fn identity(&self) -> (u8, u8, usize) {
        (self.ae_code, self.ae_transport_flags, self.ae_address_index)
    }

    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_map_start(4)?;
        n += enc.write_uint(wire::aec_item::AE_CODE)?;
        n += enc.write_uint(u64::from(self.ae_code))?;
        n += enc.write_uint(wire::aec_item::AE_TRANSPORT_FLAGS)?;
        n += enc.write_uint(u64::from(self.ae_transport_flags))?;
        n += enc.write_uint(wire::aec_item::AE_ADDRESS_INDEX)?;
        n += enc.write_uint(self.ae_address_index as u64)?;
        n += enc.write_uint(wire::aec_item::AE_COUNT)?;
        n += enc.write_uint(self.ae_count)?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut aec = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::aec_item::AE_CODE => aec.ae_code = dec.read_unsigned()? as u8,
                wire::aec_item::AE_TRANSPORT_FLAGS => aec.ae_transport_flags = dec.read_unsigned()? as u8,
                wire::aec_item::AE_ADDRESS_INDEX => aec.ae_address_index = dec.read_unsigned()? as usize,
                wire::aec_item::AE_COUNT => aec.ae_count = dec.read_unsigned()?,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(aec)
    }
}
