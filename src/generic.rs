//! The generic, fully-optional record types callers build and receive at
//! the library boundary.
//!
//! These are the "bag of optionals" the design notes call for: every field
//! RFC 8618 marks optional is `Option<T>` here rather than a bitmask or
//! union. [`crate::block::Block::add_question_response_record`] and
//! friends translate a generic record into the block's interned tables
//! and buffered item arrays; the reader does the reverse.

use std::io::{self, Read, Write};

use cdns_codec::{CborError, Decoder, Encoder};

use crate::config::read_map;
use crate::timestamp::Timestamp;
use crate::wire;


/// A `(type, class)` pair, shared by every Question and RR that uses it.
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct ClassType {

    /// The RR type number.
    pub rr_type: u16,

    /// The DNS class number.
    pub class: u16,
}

impl ClassType {
    pub(crate) fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let mut n = enc.write_map_start(2)?;
        n += enc.write_uint(wire::classtype::TYPE)?;
        n += enc.write_uint(u64::from(self.rr_type))?;
        n += enc.write_uint(wire::classtype::CLASS)?;
        n += enc.write_uint(u64::from(self.class))?;
        Ok(n)
    }

    pub(crate) fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut ct = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::classtype::TYPE => ct.rr_type = dec.read_unsigned()? as u16,
                wire::classtype::CLASS => ct.class = dec.read_unsigned()? as u16,
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(ct)
    }
}


/// Bit flags carried in [`GenericQueryResponse::qr_transport_flags`] and
/// [`crate::block::tables::QuerySignature::qr_transport_flags`].
pub mod transport_flags {
    /// The address family in use is IPv6 rather than IPv4.
    pub const IPV6: u8 = 0x01;
    /// The transaction used TCP rather than UDP.
    pub const TCP: u8 = 0x02;
    /// The transaction used TLS.
    pub const TLS: u8 = 0x04;
    /// The transaction used DTLS.
    pub const DTLS: u8 = 0x08;
    /// The transaction used DNS-over-HTTPS.
    pub const HTTPS: u8 = 0x10;
    /// Trailing bytes were observed after the DNS message proper.
    pub const TRAILING_DATA: u8 = 0x20;
}

/// Bit flags carried in [`crate::block::tables::QuerySignature::qr_sig_flags`].
pub mod qr_sig_flags {
    /// A query was observed for this signature.
    pub const HAS_QUERY: u16 = 0x0001;
    /// A response was observed for this signature.
    pub const HAS_RESPONSE: u16 = 0x0002;
    /// The query carried an OPT pseudo-RR.
    pub const QUERY_HAS_OPT: u16 = 0x0004;
    /// The response carried an OPT pseudo-RR.
    pub const RESPONSE_HAS_OPT: u16 = 0x0008;
    /// The query's question count was zero.
    pub const QUERY_HAS_NO_QUESTION: u16 = 0x0010;
}

/// Bit flags carried in [`GenericQueryResponse::processing_flags`].
pub mod processing_flags {
    /// The response was served from a resolver cache rather than recursed.
    pub const FROM_CACHE: u32 = 0x0001;
}

/// Values of [`GenericAddressEventCount::ae_code`]: the kind of
/// network-level event an address was observed generating.
pub mod address_event_type {
    /// A TCP RST was observed.
    pub const TCP_RESET: u8 = 0;
    /// An ICMP Time Exceeded was observed.
    pub const ICMP_TIME_EXCEEDED: u8 = 1;
    /// An ICMP Destination Unreachable was observed.
    pub const ICMP_DEST_UNREACHABLE: u8 = 2;
    /// An ICMPv6 Time Exceeded was observed.
    pub const ICMPV6_TIME_EXCEEDED: u8 = 3;
    /// An ICMPv6 Destination Unreachable was observed.
    pub const ICMPV6_DEST_UNREACHABLE: u8 = 4;
    /// An ICMPv6 Packet Too Big was observed.
    pub const ICMPV6_PACKET_TOO_BIG: u8 = 5;
}


/// A single Question or Resource Record, in fully-expanded (not yet
/// interned) form.
///
/// The same shape serves both roles: [`crate::block::Block::add_generic_qlist`]
/// only consults `name` and `classtype`, while
/// [`crate::block::Block::add_generic_rrlist`] also consults `ttl` and
/// `rdata`.
#[derive(PartialEq, Eq, Debug, Clone, Default, Hash)]
pub struct GenericResourceRecord {

    /// The owner name, in whatever wire or textual byte encoding the
    /// embedder uses consistently.
    pub name: Vec<u8>,

    /// The `(type, class)` pair.
    pub classtype: ClassType,

    /// Time-to-live, present for RRs, absent for bare Questions.
    pub ttl: Option<u32>,

    /// Resource data, present for RRs, absent for bare Questions.
    pub rdata: Option<Vec<u8>>,
}


/// A generic query/response pair (or a lone query or lone response),
/// ready to be buffered into a block.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct GenericQueryResponse {

    /// Capture timestamp; the block stores this as a signed offset from
    /// the block's earliest timestamp.
    pub ts: Timestamp,

    /// The querying client's address.
    pub client_ip: Option<Vec<u8>>,

    /// The client's port.
    pub client_port: Option<u16>,

    /// The answering server's address.
    pub server_ip: Option<Vec<u8>>,

    /// The server's port.
    pub server_port: Option<u16>,

    /// The DNS header transaction ID.
    pub transaction_id: Option<u16>,

    /// Transport-level flags (IP version, transport protocol, trailing data).
    pub qr_transport_flags: Option<u8>,

    /// Signature-level flags (query/response presence, OPT presence, …).
    pub qr_sig_flags: Option<u16>,

    /// The query's DNS opcode.
    pub query_opcode: Option<u8>,

    /// The combined DNS header flags (QR, AA, TC, RD, RA, AD, CD, …) as
    /// observed on the query or response.
    pub dns_flags: Option<u16>,

    /// Question/Answer/Authority/Additional counts as declared in the
    /// query's header, when distinct from the reconstructed lists.
    pub query_rr_counts: Option<[u16; 4]>,

    /// The EDNS UDP payload size advertised, if EDNS was present.
    pub edns_udp_payload_size: Option<u16>,

    /// The EDNS version advertised, if EDNS was present.
    pub edns_version: Option<u8>,

    /// The response's RCODE.
    pub response_rcode: Option<u16>,

    /// The client's IP hop limit / TTL as observed at capture.
    pub client_hoplimit: Option<u8>,

    /// Query-to-response delay, in the enclosing profile's ticks.
    pub response_delay: Option<i64>,

    /// The query name, if distinct from `query_questions[0].name`.
    pub query_name: Option<Vec<u8>>,

    /// The wire size of the query message, in bytes.
    pub query_size: Option<u32>,

    /// The wire size of the response message, in bytes.
    pub response_size: Option<u32>,

    /// The zone within which the response is authoritative.
    pub bailiwick: Option<Vec<u8>>,

    /// Response processing metadata (cache hit, etc).
    pub processing_flags: Option<u32>,

    /// The query's Question section.
    pub query_questions: Option<Vec<GenericResourceRecord>>,

    /// The query's Answer section.
    pub query_answers: Option<Vec<GenericResourceRecord>>,

    /// The query's Authority section.
    pub query_authority: Option<Vec<GenericResourceRecord>>,

    /// The query's Additional section.
    pub query_additional: Option<Vec<GenericResourceRecord>>,

    /// The response's Answer section.
    pub response_answers: Option<Vec<GenericResourceRecord>>,

    /// The response's Authority section.
    pub response_authority: Option<Vec<GenericResourceRecord>>,

    /// The response's Additional section.
    pub response_additional: Option<Vec<GenericResourceRecord>>,

    /// Enrichment: the client's autonomous system number.
    pub asn: Option<String>,

    /// Enrichment: the client's geolocated country code.
    pub country_code: Option<String>,

    /// Enrichment: measured round-trip time, in the enclosing profile's
    /// ticks.
    pub round_trip_time: Option<i64>,
}


/// A DNS message that failed to parse, recorded with as much of its
/// context as was salvageable.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct GenericMalformedMessage {

    /// Capture timestamp.
    pub ts: Timestamp,

    /// The sending client's address.
    pub client_ip: Option<Vec<u8>>,

    /// The client's port.
    pub client_port: Option<u16>,

    /// The receiving server's address.
    pub server_ip: Option<Vec<u8>>,

    /// The server's port.
    pub server_port: Option<u16>,

    /// Transport-level flags, as in [`GenericQueryResponse::qr_transport_flags`].
    pub mm_transport_flags: Option<u8>,

    /// The raw, unparsed message bytes.
    pub mm_payload: Option<Vec<u8>>,
}


/// One occurrence of a network-level event (TCP reset, ICMP unreachable,
/// …) associated with an address; repeated occurrences with the same
/// `(ae_code, ae_transport_flags, ip_address)` triple are coalesced by the
/// block into a single entry with an incremented count.
#[derive(PartialEq, Eq, Debug, Clone, Default, Hash)]
pub struct GenericAddressEventCount {

    /// The kind of event; see [`address_event_type`].
    pub ae_code: u8,

    /// Transport-level flags under which the event was observed.
    pub ae_transport_flags: u8,

    /// The address the event concerns.
    pub ip_address: Vec<u8>,
}
