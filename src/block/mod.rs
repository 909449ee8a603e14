//! The block engine: per-block intern tables, buffered item lists, the
//! block-size cap, and the CBOR codec for a whole block.
//!
//! A [`Block`] is the unit of deduplication and aggregation inside a
//! C-DNS file. It owns its intern tables outright — buffered items never
//! hold anything but bare indices into them, so there are no back-pointers
//! to worry about, per the crate's cyclic-structure design note.

mod tables;
pub use tables::{MalformedMessageData, Question, QuerySignature, Rr};

mod items;
pub use items::{AddressEventCount, MalformedMessage, QueryResponse, QueryResponseExtended, ResponseProcessingData};

mod codec;
pub use codec::BlockReader;

use std::collections::HashMap;

use log::*;

use crate::config::BlockParameters;
use crate::generic::{ClassType, GenericAddressEventCount, GenericMalformedMessage, GenericQueryResponse, GenericResourceRecord};
use crate::intern::InternTable;
use crate::timestamp::Timestamp;


/// Optional per-block aggregate counters. Omitted from the wire entirely
/// when every field is absent; never populated automatically by
/// `add_*` — a caller sets it explicitly via [`Block::set_statistics`]
/// before [`Block::write`].
#[derive(PartialEq, Eq, Debug, Copy, Clone, Default, Hash)]
pub struct BlockStatistics {

    /// Total DNS messages processed while building this block (queries
    /// plus responses plus malformed messages, before any filtering).
    pub processed_messages: Option<u64>,

    /// Number of `QueryResponse` items in this block.
    pub qr_data_items: Option<u64>,

    /// Queries seen with no matching response.
    pub unmatched_queries: Option<u64>,

    /// Responses seen with no matching query.
    pub unmatched_responses: Option<u64>,

    /// Messages discarded because their opcode fell outside
    /// `StorageParameters::opcodes`.
    pub discarded_opcode: Option<u64>,

    /// Number of `MalformedMessage` items in this block.
    pub malformed_items: Option<u64>,
}

impl BlockStatistics {
    pub(crate) fn is_empty(&self) -> bool {
        self.processed_messages.is_none()
            && self.qr_data_items.is_none()
            && self.unmatched_queries.is_none()
            && self.unmatched_responses.is_none()
            && self.discarded_opcode.is_none()
            && self.malformed_items.is_none()
    }
}


/// The in-memory, write-side block: intern tables plus buffered item
/// lists, accepting records until [`BlockParameters::storage_parameters`]'s
/// `max_block_items` is reached.
pub struct Block {
    block_parameters: BlockParameters,
    block_parameters_index: usize,
    statistics: Option<BlockStatistics>,

    ip_address: InternTable<Vec<u8>>,
    classtype: InternTable<ClassType>,
    name_rdata: InternTable<Vec<u8>>,
    qr_sig: InternTable<QuerySignature>,
    qlist: InternTable<Vec<usize>>,
    qrr: InternTable<Question>,
    rrlist: InternTable<Vec<usize>>,
    rr: InternTable<Rr>,
    malformed_message_data: InternTable<MalformedMessageData>,

    query_responses: Vec<QueryResponse>,
    malformed_messages: Vec<MalformedMessage>,
    address_event_counts: Vec<AddressEventCount>,
    /// Maps an AEC identity triple to its position in `address_event_counts`,
    /// so a repeated triple can find its entry and bump the count instead
    /// of appending a duplicate.
    aec_index: HashMap<(u8, u8, usize), usize>,

    earliest_time: Option<Timestamp>,
}

impl Block {

    /// Builds an empty block using `block_parameters`, which must be the
    /// entry at `block_parameters_index` in the enclosing file's
    /// `block_parameters` sequence.
    pub fn new(block_parameters: BlockParameters, block_parameters_index: usize) -> Self {
        Self {
            block_parameters,
            block_parameters_index,
            statistics: None,
            ip_address: InternTable::new(),
            classtype: InternTable::new(),
            name_rdata: InternTable::new(),
            qr_sig: InternTable::new(),
            qlist: InternTable::new(),
            qrr: InternTable::new(),
            rrlist: InternTable::new(),
            rr: InternTable::new(),
            malformed_message_data: InternTable::new(),
            query_responses: Vec::new(),
            malformed_messages: Vec::new(),
            address_event_counts: Vec::new(),
            aec_index: HashMap::new(),
            earliest_time: None,
        }
    }

    /// The block-parameters profile currently active for this block.
    pub fn block_parameters(&self) -> &BlockParameters {
        &self.block_parameters
    }

    /// The index of the active profile in the file's `block_parameters`
    /// sequence.
    pub fn block_parameters_index(&self) -> usize {
        self.block_parameters_index
    }

    /// `max_block_items` from the active profile's storage parameters.
    fn max_block_items(&self) -> usize {
        self.block_parameters.storage_parameters.max_block_items as usize
    }

    // -- interning -----------------------------------------------------

    /// Interns a raw address, returning its (possibly pre-existing) index.
    pub fn add_ip_address(&mut self, addr: impl Into<Vec<u8>>) -> usize {
        self.ip_address.add(addr.into())
    }

    /// Retrieves a previously-interned address.
    pub fn get_ip_address(&self, index: usize) -> Option<&Vec<u8>> {
        self.ip_address.get(index)
    }

    /// Interns a `(type, class)` pair.
    pub fn add_classtype(&mut self, ct: ClassType) -> usize {
        self.classtype.add(ct)
    }

    /// Retrieves a previously-interned `(type, class)` pair.
    pub fn get_classtype(&self, index: usize) -> Option<&ClassType> {
        self.classtype.get(index)
    }

    /// Interns a name or rdata byte string (both share one table, as in
    /// the source format: names and rdata are both opaque byte blobs).
    pub fn add_name_rdata(&mut self, bytes: impl Into<Vec<u8>>) -> usize {
        self.name_rdata.add(bytes.into())
    }

    /// Retrieves previously-interned name/rdata bytes.
    pub fn get_name_rdata(&self, index: usize) -> Option<&Vec<u8>> {
        self.name_rdata.get(index)
    }

    /// Interns a query/response signature.
    pub fn add_qr_signature(&mut self, sig: QuerySignature) -> usize {
        self.qr_sig.add(sig)
    }

    /// Retrieves a previously-interned signature.
    pub fn get_qr_signature(&self, index: usize) -> Option<&QuerySignature> {
        self.qr_sig.get(index)
    }

    /// Interns a list of question-table indices.
    pub fn add_question_list(&mut self, list: Vec<usize>) -> usize {
        self.qlist.add(list)
    }

    /// Retrieves a previously-interned question-index list.
    pub fn get_question_list(&self, index: usize) -> Option<&Vec<usize>> {
        self.qlist.get(index)
    }

    /// Interns a single Question.
    pub fn add_question(&mut self, q: Question) -> usize {
        self.qrr.add(q)
    }

    /// Retrieves a previously-interned Question.
    pub fn get_question(&self, index: usize) -> Option<&Question> {
        self.qrr.get(index)
    }

    /// Interns a list of RR-table indices.
    pub fn add_rr_list(&mut self, list: Vec<usize>) -> usize {
        self.rrlist.add(list)
    }

    /// Retrieves a previously-interned RR-index list.
    pub fn get_rr_list(&self, index: usize) -> Option<&Vec<usize>> {
        self.rrlist.get(index)
    }

    /// Interns a single RR.
    pub fn add_rr(&mut self, rr: Rr) -> usize {
        self.rr.add(rr)
    }

    /// Retrieves a previously-interned RR.
    pub fn get_rr(&self, index: usize) -> Option<&Rr> {
        self.rr.get(index)
    }

    /// Interns a malformed message's addressing/transport context.
    pub fn add_malformed_message_data(&mut self, mmd: MalformedMessageData) -> usize {
        self.malformed_message_data.add(mmd)
    }

    /// Retrieves previously-interned malformed-message context.
    pub fn get_malformed_message_data(&self, index: usize) -> Option<&MalformedMessageData> {
        self.malformed_message_data.get(index)
    }

    /// Interns each record's name/classtype/rdata, then the Questions
    /// themselves (ignoring `ttl`/`rdata`), then the resulting index list.
    /// Used for a query's or response's Question section.
    pub fn add_generic_qlist(&mut self, records: &[GenericResourceRecord]) -> usize {
        let indices = records.iter().map(|r| {
            let name_index = self.add_name_rdata(r.name.clone());
            let classtype_index = self.add_classtype(r.classtype);
            self.add_question(Question { name_index, classtype_index })
        }).collect();
        self.add_question_list(indices)
    }

    /// Interns each record's name/classtype/rdata, then the RRs
    /// themselves, then the resulting index list. Used for an
    /// Answer/Authority/Additional section.
    pub fn add_generic_rrlist(&mut self, records: &[GenericResourceRecord]) -> usize {
        let indices = records.iter().map(|r| {
            let name_index = self.add_name_rdata(r.name.clone());
            let classtype_index = self.add_classtype(r.classtype);
            let rdata_index = r.rdata.as_ref().map(|d| self.add_name_rdata(d.clone()));
            self.add_rr(Rr { name_index, classtype_index, ttl: r.ttl, rdata_index })
        }).collect();
        self.add_rr_list(indices)
    }

    // -- items -----------------------------------------------------------

    fn note_time(&mut self, ts: Timestamp) {
        self.earliest_time = Some(match self.earliest_time {
            Some(existing) if existing <= ts => existing,
            _ => ts,
        });
    }

    fn add_extended(&mut self, questions: Option<&[GenericResourceRecord]>, answers: Option<&[GenericResourceRecord]>, authority: Option<&[GenericResourceRecord]>, additional: Option<&[GenericResourceRecord]>) -> Option<QueryResponseExtended> {
        if questions.is_none() && answers.is_none() && authority.is_none() && additional.is_none() {
            return None;
        }
        Some(QueryResponseExtended {
            question_index: questions.map(|q| self.add_generic_qlist(q)),
            answer_index: answers.map(|a| self.add_generic_rrlist(a)),
            authority_index: authority.map(|a| self.add_generic_rrlist(a)),
            additional_index: additional.map(|a| self.add_generic_rrlist(a)),
        })
    }

    /// Interns everything a generic query/response pair refers to, then
    /// buffers the resulting item. Returns `true` if this insertion made
    /// the block full (`get_item_count() == max_block_items`); the record
    /// itself is always accepted regardless.
    pub fn add_question_response_record(&mut self, qr: GenericQueryResponse) -> bool {
        self.note_time(qr.ts);

        let client_address_index = qr.client_ip.map(|ip| self.add_ip_address(ip));
        let server_address_index = qr.server_ip.map(|ip| self.add_ip_address(ip));

        let signature = QuerySignature {
            server_address_index,
            server_port: qr.server_port,
            qr_transport_flags: qr.qr_transport_flags,
            qr_sig_flags: qr.qr_sig_flags,
            query_opcode: qr.query_opcode,
            dns_flags: qr.dns_flags,
            query_rr_counts: qr.query_rr_counts,
            edns_udp_payload_size: qr.edns_udp_payload_size,
            edns_version: qr.edns_version,
            response_rcode: qr.response_rcode,
        };
        let qr_signature_index = Some(self.add_qr_signature(signature));

        let query_name_index = qr.query_name.map(|n| self.add_name_rdata(n));

        let response_processing_data = if qr.bailiwick.is_some() || qr.processing_flags.is_some() {
            Some(ResponseProcessingData {
                bailiwick_index: qr.bailiwick.map(|b| self.add_name_rdata(b)),
                processing_flags: qr.processing_flags,
            })
        } else {
            None
        };

        let query_extended = self.add_extended(
            qr.query_questions.as_deref(),
            qr.query_answers.as_deref(),
            qr.query_authority.as_deref(),
            qr.query_additional.as_deref(),
        );
        let response_extended = self.add_extended(
            None,
            qr.response_answers.as_deref(),
            qr.response_authority.as_deref(),
            qr.response_additional.as_deref(),
        );

        let item = QueryResponse {
            ts: qr.ts,
            client_address_index,
            client_port: qr.client_port,
            transaction_id: qr.transaction_id,
            qr_signature_index,
            client_hoplimit: qr.client_hoplimit,
            response_delay: qr.response_delay,
            query_name_index,
            query_size: qr.query_size,
            response_size: qr.response_size,
            response_processing_data,
            query_extended,
            response_extended,
            asn: qr.asn,
            country_code: qr.country_code,
            round_trip_time: qr.round_trip_time,
        };
        self.query_responses.push(item);
        trace!("Buffered QueryResponse, block item count now {}", self.get_item_count());
        self.get_item_count() == self.max_block_items()
    }

    /// Interns everything a generic malformed message refers to, then
    /// buffers the resulting item.
    pub fn add_malformed_message(&mut self, mm: GenericMalformedMessage) -> bool {
        self.note_time(mm.ts);

        let client_address_index = mm.client_ip.map(|ip| self.add_ip_address(ip));
        let server_address_index = mm.server_ip.map(|ip| self.add_ip_address(ip));

        let message_data_index = Some(self.add_malformed_message_data(MalformedMessageData {
            server_address_index,
            server_port: mm.server_port,
            mm_transport_flags: mm.mm_transport_flags,
            mm_payload: mm.mm_payload,
        }));

        self.malformed_messages.push(MalformedMessage {
            ts: mm.ts,
            client_address_index,
            client_port: mm.client_port,
            message_data_index,
        });
        trace!("Buffered MalformedMessage, block item count now {}", self.get_item_count());
        self.get_item_count() == self.max_block_items()
    }

    /// Interns the event's address, then either bumps an existing
    /// coalesced entry's count or appends a fresh one with `ae_count = 1`.
    pub fn add_address_event_count(&mut self, aec: GenericAddressEventCount) -> bool {
        let ae_address_index = self.add_ip_address(aec.ip_address);
        let identity = (aec.ae_code, aec.ae_transport_flags, ae_address_index);

        if let Some(&pos) = self.aec_index.get(&identity) {
            self.address_event_counts[pos].ae_count += 1;
        } else {
            let pos = self.address_event_counts.len();
            self.address_event_counts.push(AddressEventCount {
                ae_code: aec.ae_code,
                ae_transport_flags: aec.ae_transport_flags,
                ae_address_index,
                ae_count: 1,
            });
            self.aec_index.insert(identity, pos);
        }
        trace!("Buffered AddressEventCount, block item count now {}", self.get_item_count());
        self.get_item_count() == self.max_block_items()
    }

    /// `|QR| + |MM| + distinct(AEC)`.
    pub fn get_item_count(&self) -> usize {
        self.query_responses.len() + self.malformed_messages.len() + self.address_event_counts.len()
    }

    /// Swaps in a different block-parameters profile. Only legal
    /// (returns `true`) while the block holds no buffered items — an
    /// empty block hasn't committed to the old profile's semantics yet.
    #[must_use]
    pub fn set_block_parameters(&mut self, bp: BlockParameters, index: usize) -> bool {
        if self.get_item_count() != 0 {
            return false;
        }
        self.block_parameters = bp;
        self.block_parameters_index = index;
        true
    }

    /// Sets the optional aggregate counters to be written with this
    /// block. Never populated automatically.
    pub fn set_statistics(&mut self, stats: BlockStatistics) {
        self.statistics = Some(stats);
    }

    /// Empties every table and buffered-item list, resetting indices back
    /// to 0. The active block-parameters profile is unaffected.
    pub fn clear(&mut self) {
        self.ip_address.clear();
        self.classtype.clear();
        self.name_rdata.clear();
        self.qr_sig.clear();
        self.qlist.clear();
        self.qrr.clear();
        self.rrlist.clear();
        self.rr.clear();
        self.malformed_message_data.clear();
        self.query_responses.clear();
        self.malformed_messages.clear();
        self.address_event_counts.clear();
        self.aec_index.clear();
        self.statistics = None;
        self.earliest_time = None;
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::generic::{address_event_type, ClassType};
    use pretty_assertions::assert_eq;

    fn block() -> Block {
        Block::new(BlockParameters::default(), 0)
    }

    #[test]
    fn dedup_ip_and_classtype() {
        let mut b = block();
        let a1 = b.add_ip_address(b"8.8.8.8".to_vec());
        let a2 = b.add_ip_address(b"8.8.8.8".to_vec());
        assert_eq!((a1, a2), (0, 0));

        let c1 = b.add_classtype(ClassType::default());
        let c2 = b.add_classtype(ClassType::default());
        assert_eq!((c1, c2), (0, 0));

        assert_eq!(b.get_item_count(), 0);
    }

    #[test]
    fn generic_glist_dedup() {
        let mut b = block();
        let classtype = ClassType { rr_type: 2, class: 3 };
        let rrs: Vec<GenericResourceRecord> = (0..2).map(|_| GenericResourceRecord {
            name: b"test_name".to_vec(),
            classtype,
            ttl: Some(128),
            rdata: Some(b"test_data".to_vec()),
        }).collect();

        let q1 = b.add_generic_qlist(&rrs);
        let q2 = b.add_generic_qlist(&rrs);
        assert_eq!((q1, q2), (0, 0));

        let r1 = b.add_generic_rrlist(&rrs);
        let r2 = b.add_generic_rrlist(&rrs);
        assert_eq!((r1, r2), (0, 0));

        let shorter = &rrs[..1];
        assert_eq!(b.add_generic_qlist(shorter), 1);
        assert_eq!(b.add_generic_rrlist(shorter), 1);
    }

    #[test]
    fn aec_coalesces() {
        let mut b = block();
        let aec = GenericAddressEventCount { ae_code: address_event_type::TCP_RESET, ae_transport_flags: 0, ip_address: b"8.8.8.8".to_vec() };

        b.add_address_event_count(aec.clone());
        b.add_address_event_count(aec.clone());
        assert_eq!(b.get_item_count(), 1);

        let mut other = aec;
        other.ae_code = address_event_type::ICMP_DEST_UNREACHABLE;
        b.add_address_event_count(other);
        assert_eq!(b.get_item_count(), 2);

        b.clear();
        assert_eq!(b.get_item_count(), 0);
    }

    #[test]
    fn qr_mm_aec_all_count() {
        let mut b = block();
        let ts = Timestamp::new(13, 1234);

        b.add_question_response_record(GenericQueryResponse { ts, client_ip: Some(b"8.8.8.8".to_vec()), ..Default::default() });
        assert_eq!(b.get_item_count(), 1);

        b.add_malformed_message(GenericMalformedMessage { ts, server_ip: Some(b"8.8.8.8".to_vec()), mm_payload: Some(b"TestMM".to_vec()), ..Default::default() });
        assert_eq!(b.get_item_count(), 2);

        b.add_address_event_count(GenericAddressEventCount { ae_code: address_event_type::TCP_RESET, ae_transport_flags: 0, ip_address: b"8.8.8.8".to_vec() });
        assert_eq!(b.get_item_count(), 3);

        b.clear();
        assert_eq!(b.get_item_count(), 0);
    }

    #[test]
    fn set_block_parameters_requires_empty_block() {
        let mut b = block();
        b.add_question_response_record(GenericQueryResponse { ts: Timestamp::new(13, 1234), ..Default::default() });

        let mut bp2 = BlockParameters::default();
        bp2.storage_parameters.max_block_items = 100;
        assert!(!b.set_block_parameters(bp2.clone(), 1));

        b.clear();
        assert!(b.set_block_parameters(bp2, 1));
    }

    #[test]
    fn block_cap_reports_full_on_nth_insertion() {
        let mut bp = BlockParameters::default();
        bp.storage_parameters.max_block_items = 2;
        let mut b = Block::new(bp, 0);

        let ts = Timestamp::new(1, 0);
        assert!(!b.add_question_response_record(GenericQueryResponse { ts, ..Default::default() }));
        assert!(b.add_question_response_record(GenericQueryResponse { ts, ..Default::default() }));
    }
}
