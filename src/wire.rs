//! CBOR map key numbers used when serialising C-DNS structures.
//!
//! RFC 8618 §7 assigns a small integer to every map key in the format.
//! The key numbers below follow that structure (one key per optional
//! field, grouped the way the RFC's own tables group them) and are used
//! consistently by both [`crate::block`]'s writer and reader, so any
//! C-DNS file this library writes, this library also reads back exactly.
//! An unknown key encountered on read is skipped via
//! `cdns_codec::Decoder::skip_item` rather than rejected, so the format
//! tolerates keys this library doesn't (yet) know about.

/// The file-level envelope: an indefinite-length array holding exactly
/// `[tag(FILE_TYPE_TAG), file_preamble, block, block, …]`, closed with a
/// CBOR break. The tag lets a reader reject a file that is syntactically
/// valid CBOR but isn't a C-DNS file before it even looks at the preamble.
pub mod file {
    pub const FILE_TYPE_TAG: u64 = 8618;
}

/// Keys within the top-level `FilePreamble` map.
pub mod file_preamble {
    pub const MAJOR_FORMAT_VERSION: u64 = 0;
    pub const MINOR_FORMAT_VERSION: u64 = 1;
    pub const PRIVATE_VERSION: u64 = 2;
    pub const BLOCK_PARAMETERS: u64 = 3;
}

/// Keys within a `BlockParameters` map.
pub mod block_parameters {
    pub const STORAGE_PARAMETERS: u64 = 0;
    pub const COLLECTION_PARAMETERS: u64 = 1;
}

/// Keys within a `StorageParameters` map.
pub mod storage_parameters {
    pub const TICKS_PER_SECOND: u64 = 0;
    pub const MAX_BLOCK_ITEMS: u64 = 1;
    pub const STORAGE_HINTS: u64 = 2;
    pub const OPCODES: u64 = 3;
    pub const RR_TYPES: u64 = 4;
    pub const STORAGE_FLAGS: u64 = 5;
    pub const CLIENT_ADDRESS_PREFIX_IPV4: u64 = 6;
    pub const CLIENT_ADDRESS_PREFIX_IPV6: u64 = 7;
    pub const SERVER_ADDRESS_PREFIX_IPV4: u64 = 8;
    pub const SERVER_ADDRESS_PREFIX_IPV6: u64 = 9;
    pub const SAMPLING_METHOD: u64 = 10;
    pub const ANONYMIZATION_METHOD: u64 = 11;
}

/// Keys within a `StorageHints` map.
pub mod storage_hints {
    pub const QUERY_RESPONSE_HINTS: u64 = 0;
    pub const QUERY_RESPONSE_SIGNATURE_HINTS: u64 = 1;
    pub const RR_HINTS: u64 = 2;
    pub const OTHER_DATA_HINTS: u64 = 3;
}

/// Keys within a `CollectionParameters` map.
pub mod collection_parameters {
    pub const QUERY_TIMEOUT: u64 = 0;
    pub const SKEW_TIMEOUT: u64 = 1;
    pub const SNAPLEN: u64 = 2;
    pub const PROMISC: u64 = 3;
    pub const INTERFACES: u64 = 4;
    pub const SERVER_ADDRESS: u64 = 5;
    pub const VLAN_IDS: u64 = 6;
    pub const FILTER: u64 = 7;
    pub const GENERATOR_ID: u64 = 8;
    pub const HOST_ID: u64 = 9;
}

/// Keys within the top-level `Block` map.
pub mod block {
    pub const BLOCK_PREAMBLE: u64 = 0;
    pub const BLOCK_STATISTICS: u64 = 1;
    pub const BLOCK_TABLES: u64 = 2;
    pub const QUERY_RESPONSES: u64 = 3;
    pub const ADDRESS_EVENT_COUNTS: u64 = 4;
    pub const MALFORMED_MESSAGES: u64 = 5;
}

/// Keys within a `BlockPreamble` map.
pub mod block_preamble {
    pub const EARLIEST_TIME: u64 = 0;
    pub const BLOCK_PARAMETERS_INDEX: u64 = 1;
}

/// Keys within a `BlockStatistics` map.
pub mod block_statistics {
    pub const PROCESSED_MESSAGES: u64 = 0;
    pub const QR_DATA_ITEMS: u64 = 1;
    pub const UNMATCHED_QUERIES: u64 = 2;
    pub const UNMATCHED_RESPONSES: u64 = 3;
    pub const DISCARDED_OPCODE: u64 = 4;
    pub const MALFORMED_ITEMS: u64 = 5;
}

/// Keys within the `BlockTables` map; only tables that are non-empty are
/// present.
pub mod block_tables {
    pub const IP_ADDRESS: u64 = 0;
    pub const CLASSTYPE: u64 = 1;
    pub const NAME_RDATA: u64 = 2;
    pub const QR_SIG: u64 = 3;
    pub const QLIST: u64 = 4;
    pub const QRR: u64 = 5;
    pub const RRLIST: u64 = 6;
    pub const RR: u64 = 7;
    pub const MALFORMED_MESSAGE_DATA: u64 = 8;
}

/// Keys within a `ClassType` map.
pub mod classtype {
    pub const TYPE: u64 = 0;
    pub const CLASS: u64 = 1;
}

/// Keys within a `Question` map.
pub mod question {
    pub const NAME_INDEX: u64 = 0;
    pub const CLASSTYPE_INDEX: u64 = 1;
}

/// Keys within an `RR` map.
pub mod rr {
    pub const NAME_INDEX: u64 = 0;
    pub const CLASSTYPE_INDEX: u64 = 1;
    pub const TTL: u64 = 2;
    pub const RDATA_INDEX: u64 = 3;
}

/// Keys within a `MalformedMessageData` map.
pub mod malformed_message_data {
    pub const SERVER_ADDRESS_INDEX: u64 = 0;
    pub const SERVER_PORT: u64 = 1;
    pub const MM_TRANSPORT_FLAGS: u64 = 2;
    pub const MM_PAYLOAD: u64 = 3;
}

/// Keys within a `QueryResponseSignature` map.
pub mod qr_sig {
    pub const SERVER_ADDRESS_INDEX: u64 = 0;
    pub const SERVER_PORT: u64 = 1;
    pub const QR_TRANSPORT_FLAGS: u64 = 2;
    pub const QR_SIG_FLAGS: u64 = 3;
    pub const QUERY_OPCODE: u64 = 4;
    pub const DNS_FLAGS: u64 = 5;
    pub const QUERY_RR_COUNTS: u64 = 6;
    pub const EDNS_UDP_PAYLOAD_SIZE: u64 = 7;
    pub const EDNS_VERSION: u64 = 8;
    pub const RESPONSE_RCODE: u64 = 9;
}

/// Keys within a `QueryResponse` item map.
pub mod qr_item {
    pub const TIME_OFFSET: u64 = 0;
    pub const CLIENT_ADDRESS_INDEX: u64 = 1;
    pub const CLIENT_PORT: u64 = 2;
    pub const TRANSACTION_ID: u64 = 3;
    pub const QR_SIGNATURE_INDEX: u64 = 4;
    pub const CLIENT_HOPLIMIT: u64 = 5;
    pub const RESPONSE_DELAY: u64 = 6;
    pub const QUERY_NAME_INDEX: u64 = 7;
    pub const QUERY_SIZE: u64 = 8;
    pub const RESPONSE_SIZE: u64 = 9;
    pub const RESPONSE_PROCESSING_DATA: u64 = 10;
    pub const QUERY_EXTENDED: u64 = 11;
    pub const RESPONSE_EXTENDED: u64 = 12;
    pub const ASN: u64 = 13;
    pub const COUNTRY_CODE: u64 = 14;
    pub const ROUND_TRIP_TIME: u64 = 15;
}

/// Keys within a `ResponseProcessingData` map.
pub mod response_processing_data {
    pub const BAILIWICK_INDEX: u64 = 0;
    pub const PROCESSING_FLAGS: u64 = 1;
}

/// Keys within a `QueryResponseExtended` map.
pub mod query_response_extended {
    pub const QUESTION_INDEX: u64 = 0;
    pub const ANSWER_INDEX: u64 = 1;
    pub const AUTHORITY_INDEX: u64 = 2;
    pub const ADDITIONAL_INDEX: u64 = 3;
}

/// Keys within a `MalformedMessage` item map.
pub mod mm_item {
    pub const TIME_OFFSET: u64 = 0;
    pub const CLIENT_ADDRESS_INDEX: u64 = 1;
    pub const CLIENT_PORT: u64 = 2;
    pub const MESSAGE_DATA_INDEX: u64 = 3;
}

/// Keys within an `AddressEventCount` item map.
pub mod aec_item {
    pub const AE_CODE: u64 = 0;
    pub const AE_TRANSPORT_FLAGS: u64 = 1;
    pub const AE_ADDRESS_INDEX: u64 = 2;
    pub const AE_COUNT: u64 = 3;
}
