//! The CBOR codec for a whole [`Block`]: serialising the write side's
//! intern tables and buffered items, and reconstructing generic records
//! from the read side.

use std::io::{self, Read, Write};

use cdns_codec::{CborError, Decoder, Encoder};

use super::tables::{MalformedMessageData, Question, QuerySignature, Rr};
use super::items::{AddressEventCount, MalformedMessage, QueryResponse};
use super::{Block, BlockStatistics};
use crate::config::{read_map, BlockParameters};
use crate::error::{Error, Result};
use crate::generic::{ClassType, GenericAddressEventCount, GenericMalformedMessage, GenericQueryResponse, GenericResourceRecord};
use crate::timestamp::Timestamp;
use crate::wire;


impl BlockStatistics {
    fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = self.processed_messages.is_some() as u64
            + self.qr_data_items.is_some() as u64
            + self.unmatched_queries.is_some() as u64
            + self.unmatched_responses.is_some() as u64
            + self.discarded_opcode.is_some() as u64
            + self.malformed_items.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        if let Some(v) = self.processed_messages {
            n += enc.write_uint(wire::block_statistics::PROCESSED_MESSAGES)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.qr_data_items {
            n += enc.write_uint(wire::block_statistics::QR_DATA_ITEMS)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.unmatched_queries {
            n += enc.write_uint(wire::block_statistics::UNMATCHED_QUERIES)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.unmatched_responses {
            n += enc.write_uint(wire::block_statistics::UNMATCHED_RESPONSES)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.discarded_opcode {
            n += enc.write_uint(wire::block_statistics::DISCARDED_OPCODE)?;
            n += enc.write_uint(v)?;
        }
        if let Some(v) = self.malformed_items {
            n += enc.write_uint(wire::block_statistics::MALFORMED_ITEMS)?;
            n += enc.write_uint(v)?;
        }
        Ok(n)
    }

    fn read<R: Read>(dec: &mut Decoder<R>) -> std::result::Result<Self, CborError> {
        let mut stats = Self::default();
        read_map(dec, |dec, key| {
            match key {
                wire::block_statistics::PROCESSED_MESSAGES => stats.processed_messages = Some(dec.read_unsigned()?),
                wire::block_statistics::QR_DATA_ITEMS => stats.qr_data_items = Some(dec.read_unsigned()?),
                wire::block_statistics::UNMATCHED_QUERIES => stats.unmatched_queries = Some(dec.read_unsigned()?),
                wire::block_statistics::UNMATCHED_RESPONSES => stats.unmatched_responses = Some(dec.read_unsigned()?),
                wire::block_statistics::DISCARDED_OPCODE => stats.discarded_opcode = Some(dec.read_unsigned()?),
                wire::block_statistics::MALFORMED_ITEMS => stats.malformed_items = Some(dec.read_unsigned()?),
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;
        Ok(stats)
    }
}


impl Block {

    /// Serialises this block as a single CBOR map: a preamble, an
    /// optional statistics section, non-empty intern tables, and
    /// whichever of the three buffered-item arrays hold anything.
    pub fn write<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let tables_nonempty = !self.ip_address.is_empty()
            || !self.classtype.is_empty()
            || !self.name_rdata.is_empty()
            || !self.qr_sig.is_empty()
            || !self.qlist.is_empty()
            || !self.qrr.is_empty()
            || !self.rrlist.is_empty()
            || !self.rr.is_empty()
            || !self.malformed_message_data.is_empty();
        let stats_nonempty = self.statistics.as_ref().map(|s| !s.is_empty()).unwrap_or(false);

        let count = 1u64
            + stats_nonempty as u64
            + tables_nonempty as u64
            + !self.query_responses.is_empty() as u64
            + !self.address_event_counts.is_empty() as u64
            + !self.malformed_messages.is_empty() as u64;

        let mut n = enc.write_map_start(count)?;

        n += enc.write_uint(wire::block::BLOCK_PREAMBLE)?;
        n += self.write_preamble(enc)?;

        if stats_nonempty {
            n += enc.write_uint(wire::block::BLOCK_STATISTICS)?;
            n += self.statistics.as_ref().expect("checked above").write(enc)?;
        }
        if tables_nonempty {
            n += enc.write_uint(wire::block::BLOCK_TABLES)?;
            n += self.write_tables(enc)?;
        }
        if !self.query_responses.is_empty() {
            let earliest = self.earliest_time.unwrap_or_default();
            let ticks_per_second = self.block_parameters.storage_parameters.ticks_per_second;
            n += enc.write_uint(wire::block::QUERY_RESPONSES)?;
            n += enc.write_array_start(self.query_responses.len() as u64)?;
            for qr in &self.query_responses {
                n += qr.write(enc, earliest, ticks_per_second)?;
            }
        }
        if !self.address_event_counts.is_empty() {
            n += enc.write_uint(wire::block::ADDRESS_EVENT_COUNTS)?;
            n += enc.write_array_start(self.address_event_counts.len() as u64)?;
            for aec in &self.address_event_counts {
                n += aec.write(enc)?;
            }
        }
        if !self.malformed_messages.is_empty() {
            let earliest = self.earliest_time.unwrap_or_default();
            let ticks_per_second = self.block_parameters.storage_parameters.ticks_per_second;
            n += enc.write_uint(wire::block::MALFORMED_MESSAGES)?;
            n += enc.write_array_start(self.malformed_messages.len() as u64)?;
            for mm in &self.malformed_messages {
                n += mm.write(enc, earliest, ticks_per_second)?;
            }
        }
        Ok(n)
    }

    fn write_preamble<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = 1 + self.earliest_time.is_some() as u64;
        let mut n = enc.write_map_start(count)?;
        if let Some(ts) = self.earliest_time {
            n += enc.write_uint(wire::block_preamble::EARLIEST_TIME)?;
            n += ts.write(enc)?;
        }
        n += enc.write_uint(wire::block_preamble::BLOCK_PARAMETERS_INDEX)?;
        n += enc.write_uint(self.block_parameters_index as u64)?;
        Ok(n)
    }

    fn write_tables<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<usize> {
        let count = !self.ip_address.is_empty() as u64
            + !self.classtype.is_empty() as u64
            + !self.name_rdata.is_empty() as u64
            + !self.qr_sig.is_empty() as u64
            + !self.qlist.is_empty() as u64
            + !self.qrr.is_empty() as u64
            + !self.rrlist.is_empty() as u64
            + !self.rr.is_empty() as u64
            + !self.malformed_message_data.is_empty() as u64;

        let mut n = enc.write_map_start(count)?;

        if !self.ip_address.is_empty() {
            n += enc.write_uint(wire::block_tables::IP_ADDRESS)?;
            n += enc.write_array_start(self.ip_address.len() as u64)?;
            for addr in self.ip_address.iter() {
                n += enc.write_bytestring(addr)?;
            }
        }
        if !self.classtype.is_empty() {
            n += enc.write_uint(wire::block_tables::CLASSTYPE)?;
            n += enc.write_array_start(self.classtype.len() as u64)?;
            for ct in self.classtype.iter() {
                n += ct.write(enc)?;
            }
        }
        if !self.name_rdata.is_empty() {
            n += enc.write_uint(wire::block_tables::NAME_RDATA)?;
            n += enc.write_array_start(self.name_rdata.len() as u64)?;
            for bytes in self.name_rdata.iter() {
                n += enc.write_bytestring(bytes)?;
            }
        }
        if !self.qr_sig.is_empty() {
            n += enc.write_uint(wire::block_tables::QR_SIG)?;
            n += enc.write_array_start(self.qr_sig.len() as u64)?;
            for sig in self.qr_sig.iter() {
                n += sig.write(enc)?;
            }
        }
        if !self.qlist.is_empty() {
            n += enc.write_uint(wire::block_tables::QLIST)?;
            n += enc.write_array_start(self.qlist.len() as u64)?;
            for list in self.qlist.iter() {
                n += enc.write_array_start(list.len() as u64)?;
                for idx in list {
                    n += enc.write_uint(*idx as u64)?;
                }
            }
        }
        if !self.qrr.is_empty() {
            n += enc.write_uint(wire::block_tables::QRR)?;
            n += enc.write_array_start(self.qrr.len() as u64)?;
            for q in self.qrr.iter() {
                n += q.write(enc)?;
            }
        }
        if !self.rrlist.is_empty() {
            n += enc.write_uint(wire::block_tables::RRLIST)?;
            n += enc.write_array_start(self.rrlist.len() as u64)?;
            for list in self.rrlist.iter() {
                n += enc.write_array_start(list.len() as u64)?;
                for idx in list {
                    n += enc.write_uint(*idx as u64)?;
                }
            }
        }
        if !self.rr.is_empty() {
            n += enc.write_uint(wire::block_tables::RR)?;
            n += enc.write_array_start(self.rr.len() as u64)?;
            for rr in self.rr.iter() {
                n += rr.write(enc)?;
            }
        }
        if !self.malformed_message_data.is_empty() {
            n += enc.write_uint(wire::block_tables::MALFORMED_MESSAGE_DATA)?;
            n += enc.write_array_start(self.malformed_message_data.len() as u64)?;
            for mmd in self.malformed_message_data.iter() {
                n += mmd.write(enc)?;
            }
        }
        Ok(n)
    }
}


/// The read-side counterpart to [`Block`]: a block's tables and buffered
/// items, fully decoded, with a cursor into each item array so generic
/// records can be reconstructed one at a time on demand.
pub struct BlockReader {
    block_parameters_index: usize,
    earliest_time: Option<Timestamp>,
    statistics: Option<BlockStatistics>,

    ip_address: Vec<Vec<u8>>,
    classtype: Vec<ClassType>,
    name_rdata: Vec<Vec<u8>>,
    qr_sig: Vec<QuerySignature>,
    qlist: Vec<Vec<usize>>,
    qrr: Vec<Question>,
    rrlist: Vec<Vec<usize>>,
    rr: Vec<Rr>,
    malformed_message_data: Vec<MalformedMessageData>,

    query_responses: Vec<QueryResponse>,
    malformed_messages: Vec<MalformedMessage>,
    address_event_counts: Vec<AddressEventCount>,

    qr_pos: usize,
    mm_pos: usize,
    aec_pos: usize,
}

impl BlockReader {

    /// Parses one block out of `dec`. `block_parameters` is the
    /// enclosing file preamble's profile sequence, used to resolve the
    /// tick scale for `time_offset` fields in the returned generic
    /// records.
    pub fn read<R: Read>(dec: &mut Decoder<R>, block_parameters: &[BlockParameters]) -> Result<Self> {
        let mut reader = Self {
            block_parameters_index: 0,
            earliest_time: None,
            statistics: None,
            ip_address: Vec::new(),
            classtype: Vec::new(),
            name_rdata: Vec::new(),
            qr_sig: Vec::new(),
            qlist: Vec::new(),
            qrr: Vec::new(),
            rrlist: Vec::new(),
            rr: Vec::new(),
            malformed_message_data: Vec::new(),
            query_responses: Vec::new(),
            malformed_messages: Vec::new(),
            address_event_counts: Vec::new(),
            qr_pos: 0,
            mm_pos: 0,
            aec_pos: 0,
        };

        read_map(dec, |dec, key| {
            match key {
                wire::block::BLOCK_PREAMBLE => {
                    read_map(dec, |dec, key| {
                        match key {
                            wire::block_preamble::EARLIEST_TIME => reader.earliest_time = Some(Timestamp::read(dec)?),
                            wire::block_preamble::BLOCK_PARAMETERS_INDEX => reader.block_parameters_index = dec.read_unsigned()? as usize,
                            _ => dec.skip_item()?,
                        }
                        Ok(())
                    })?;
                }
                wire::block::BLOCK_STATISTICS => reader.statistics = Some(BlockStatistics::read(dec)?),
                wire::block::BLOCK_TABLES => {
                    read_map(dec, |dec, key| {
                        match key {
                            wire::block_tables::IP_ADDRESS => reader.ip_address = dec.read_array(|d| d.read_bytestring())?,
                            wire::block_tables::CLASSTYPE => reader.classtype = dec.read_array(ClassType::read)?,
                            wire::block_tables::NAME_RDATA => reader.name_rdata = dec.read_array(|d| d.read_bytestring())?,
                            wire::block_tables::QR_SIG => reader.qr_sig = dec.read_array(QuerySignature::read)?,
                            wire::block_tables::QLIST => {
                                reader.qlist = dec.read_array(|d| d.read_array(|d| Ok(d.read_unsigned()? as usize)))?;
                            }
                            wire::block_tables::QRR => reader.qrr = dec.read_array(Question::read)?,
                            wire::block_tables::RRLIST => {
                                reader.rrlist = dec.read_array(|d| d.read_array(|d| Ok(d.read_unsigned()? as usize)))?;
                            }
                            wire::block_tables::RR => reader.rr = dec.read_array(Rr::read)?,
                            wire::block_tables::MALFORMED_MESSAGE_DATA => reader.malformed_message_data = dec.read_array(MalformedMessageData::read)?,
                            _ => dec.skip_item()?,
                        }
                        Ok(())
                    })?;
                }
                wire::block::QUERY_RESPONSES => {
                    let earliest = reader.earliest_time.unwrap_or_default();
                    let ticks_per_second = block_parameters.get(reader.block_parameters_index)
                        .map(|bp| bp.storage_parameters.ticks_per_second)
                        .unwrap_or(crate::config::DEFAULT_TICKS_PER_SECOND);
                    reader.query_responses = dec.read_array(|d| QueryResponse::read(d, earliest, ticks_per_second))?;
                }
                wire::block::ADDRESS_EVENT_COUNTS => reader.address_event_counts = dec.read_array(AddressEventCount::read)?,
                wire::block::MALFORMED_MESSAGES => {
                    let earliest = reader.earliest_time.unwrap_or_default();
                    let ticks_per_second = block_parameters.get(reader.block_parameters_index)
                        .map(|bp| bp.storage_parameters.ticks_per_second)
                        .unwrap_or(crate::config::DEFAULT_TICKS_PER_SECOND);
                    reader.malformed_messages = dec.read_array(|d| MalformedMessage::read(d, earliest, ticks_per_second))?;
                }
                _ => dec.skip_item()?,
            }
            Ok(())
        })?;

        if reader.block_parameters_index >= block_parameters.len() {
            return Err(Error::Format(format!(
                "block references out-of-range block_parameters index {}",
                reader.block_parameters_index
            )));
        }
        Ok(reader)
    }

    /// The block-parameters profile this block was written under.
    pub fn block_parameters_index(&self) -> usize {
        self.block_parameters_index
    }

    /// The block's earliest timestamp, if it held any items.
    pub fn earliest_time(&self) -> Option<Timestamp> {
        self.earliest_time
    }

    /// The block's optional aggregate counters, if recorded.
    pub fn statistics(&self) -> Option<&BlockStatistics> {
        self.statistics.as_ref()
    }

    /// `|QR| + |MM| + |AEC|` actually present on the wire.
    pub fn item_count(&self) -> usize {
        self.query_responses.len() + self.malformed_messages.len() + self.address_event_counts.len()
    }

    fn resolve_address(&self, index: Option<usize>) -> Option<Vec<u8>> {
        index.and_then(|i| self.ip_address.get(i).cloned())
    }

    fn resolve_name(&self, index: Option<usize>) -> Option<Vec<u8>> {
        index.and_then(|i| self.name_rdata.get(i).cloned())
    }

    fn resolve_section(&self, index: Option<usize>, with_rdata: bool) -> Option<Vec<GenericResourceRecord>> {
        let list_index = index?;
        if with_rdata {
            let indices = self.rrlist.get(list_index)?;
            Some(indices.iter().filter_map(|&i| {
                let rr = self.rr.get(i)?;
                Some(GenericResourceRecord {
                    name: self.name_rdata.get(rr.name_index).cloned().unwrap_or_default(),
                    classtype: self.classtype.get(rr.classtype_index).copied().unwrap_or_default(),
                    ttl: rr.ttl,
                    rdata: rr.rdata_index.and_then(|r| self.name_rdata.get(r).cloned()),
                })
            }).collect())
        }
        else {
            let indices = self.qlist.get(list_index)?;
            Some(indices.iter().filter_map(|&i| {
                let q = self.qrr.get(i)?;
                Some(GenericResourceRecord {
                    name: self.name_rdata.get(q.name_index).cloned().unwrap_or_default(),
                    classtype: self.classtype.get(q.classtype_index).copied().unwrap_or_default(),
                    ttl: None,
                    rdata: None,
                })
            }).collect())
        }
    }

    /// Reconstructs the next buffered query/response pair as a generic
    /// record, resolving every table reference. Each item's absolute
    /// timestamp was already resolved against the block's `earliest_time`
    /// while the block itself was being read. Returns `(value, end)`;
    /// `end` is `true` once every item has been read (`value` is
    /// meaningless in that case).
    pub fn read_generic_qr(&mut self) -> (GenericQueryResponse, bool) {
        if self.qr_pos >= self.query_responses.len() {
            return (GenericQueryResponse::default(), true);
        }
        let item = self.query_responses[self.qr_pos].clone();
        self.qr_pos += 1;

        let signature = item.qr_signature_index.and_then(|i| self.qr_sig.get(i).cloned());

        let value = GenericQueryResponse {
            ts: item.ts,
            client_ip: self.resolve_address(item.client_address_index),
            client_port: item.client_port,
            server_ip: signature.as_ref().and_then(|s| self.resolve_address(s.server_address_index)),
            server_port: signature.as_ref().and_then(|s| s.server_port),
            transaction_id: item.transaction_id,
            qr_transport_flags: signature.as_ref().and_then(|s| s.qr_transport_flags),
            qr_sig_flags: signature.as_ref().and_then(|s| s.qr_sig_flags),
            query_opcode: signature.as_ref().and_then(|s| s.query_opcode),
            dns_flags: signature.as_ref().and_then(|s| s.dns_flags),
            query_rr_counts: signature.as_ref().and_then(|s| s.query_rr_counts),
            edns_udp_payload_size: signature.as_ref().and_then(|s| s.edns_udp_payload_size),
            edns_version: signature.as_ref().and_then(|s| s.edns_version),
            response_rcode: signature.as_ref().and_then(|s| s.response_rcode),
            client_hoplimit: item.client_hoplimit,
            response_delay: item.response_delay,
            query_name: self.resolve_name(item.query_name_index),
            query_size: item.query_size,
            response_size: item.response_size,
            bailiwick: item.response_processing_data.as_ref().and_then(|d| self.resolve_name(d.bailiwick_index)),
            processing_flags: item.response_processing_data.as_ref().and_then(|d| d.processing_flags),
            query_questions: item.query_extended.as_ref().and_then(|e| self.resolve_section(e.question_index, false)),
            query_answers: item.query_extended.as_ref().and_then(|e| self.resolve_section(e.answer_index, true)),
            query_authority: item.query_extended.as_ref().and_then(|e| self.resolve_section(e.authority_index, true)),
            query_additional: item.query_extended.as_ref().and_then(|e| self.resolve_section(e.additional_index, true)),
            response_answers: item.response_extended.as_ref().and_then(|e| self.resolve_section(e.answer_index, true)),
            response_authority: item.response_extended.as_ref().and_then(|e| self.resolve_section(e.authority_index, true)),
            response_additional: item.response_extended.as_ref().and_then(|e| self.resolve_section(e.additional_index, true)),
            asn: item.asn,
            country_code: item.country_code,
            round_trip_time: item.round_trip_time,
        };
        (value, false)
    }

    /// Reconstructs the next buffered malformed message. See
    /// [`BlockReader::read_generic_qr`] for the `(value, end)` contract.
    pub fn read_generic_mm(&mut self) -> (GenericMalformedMessage, bool) {
        if self.mm_pos >= self.malformed_messages.len() {
            return (GenericMalformedMessage::default(), true);
        }
        let item = self.malformed_messages[self.mm_pos];
        self.mm_pos += 1;

        let data = item.message_data_index.and_then(|i| self.malformed_message_data.get(i).cloned());

        let value = GenericMalformedMessage {
            ts: item.ts,
            client_ip: self.resolve_address(item.client_address_index),
            client_port: item.client_port,
            server_ip: data.as_ref().and_then(|d| self.resolve_address(d.server_address_index)),
            server_port: data.as_ref().and_then(|d| d.server_port),
            mm_transport_flags: data.as_ref().and_then(|d| d.mm_transport_flags),
            mm_payload: data.and_then(|d| d.mm_payload),
        };
        (value, false)
    }

    /// Reconstructs the next coalesced address-event entry. See
    /// [`BlockReader::read_generic_qr`] for the `(value, end)` contract.
    pub fn read_generic_aec(&mut self) -> (GenericAddressEventCount, bool) {
        if self.aec_pos >= self.address_event_counts.len() {
            return (GenericAddressEventCount::default(), true);
        }
        let item = self.address_event_counts[self.aec_pos];
        self.aec_pos += 1;

        let value = GenericAddressEventCount {
            ae_code: item.ae_code,
            ae_transport_flags: item.ae_transport_flags,
            ip_address: self.resolve_address(Some(item.ae_address_index)).unwrap_or_default(),
        };
        (value, false)
    }

    /// How many times the address-event entry just read by
    /// [`BlockReader::read_generic_aec`] was coalesced.
    pub fn last_aec_count(&self) -> u64 {
        self.address_event_counts.get(self.aec_pos.saturating_sub(1)).map(|a| a.ae_count).unwrap_or(0)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::generic::{address_event_type, ClassType};
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_a_mixed_block() {
        let bp = BlockParameters::default();
        let mut block = Block::new(bp.clone(), 0);

        let ts = Timestamp::new(1_600_000_000, 500_000);
        block.add_question_response_record(GenericQueryResponse {
            ts,
            client_ip: Some(b"10.0.0.1".to_vec()),
            server_ip: Some(b"10.0.0.2".to_vec()),
            query_questions: Some(vec![GenericResourceRecord {
                name: b"example.com".to_vec(),
                classtype: ClassType { rr_type: 1, class: 1 },
                ttl: None,
                rdata: None,
            }]),
            ..Default::default()
        });
        block.add_malformed_message(GenericMalformedMessage {
            ts,
            client_ip: Some(b"10.0.0.3".to_vec()),
            mm_payload: Some(b"garbage".to_vec()),
            ..Default::default()
        });
        block.add_address_event_count(GenericAddressEventCount {
            ae_code: address_event_type::TCP_RESET,
            ae_transport_flags: 0,
            ip_address: b"10.0.0.1".to_vec(),
        });
        block.add_address_event_count(GenericAddressEventCount {
            ae_code: address_event_type::TCP_RESET,
            ae_transport_flags: 0,
            ip_address: b"10.0.0.1".to_vec(),
        });

        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        block.write(&mut enc).unwrap();

        let mut dec = Decoder::new(&buf[..]);
        let block_parameters = vec![bp.clone()];
        let mut reader = BlockReader::read(&mut dec, &block_parameters).unwrap();

        let (qr, end) = reader.read_generic_qr();
        assert!(!end);
        assert_eq!(qr.client_ip, Some(b"10.0.0.1".to_vec()));
        assert_eq!(qr.server_ip, Some(b"10.0.0.2".to_vec()));
        assert_eq!(qr.ts, ts);
        assert_eq!(qr.query_questions.unwrap()[0].name, b"example.com".to_vec());
        let (_, end) = reader.read_generic_qr();
        assert!(end);

        let (mm, end) = reader.read_generic_mm();
        assert!(!end);
        assert_eq!(mm.mm_payload, Some(b"garbage".to_vec()));

        let (aec, end) = reader.read_generic_aec();
        assert!(!end);
        assert_eq!(aec.ip_address, b"10.0.0.1".to_vec());
        assert_eq!(reader.last_aec_count(), 2);
        let (_, end) = reader.read_generic_aec();
        assert!(end);
    }

    #[test]
    fn empty_tables_and_items_are_omitted_from_wire() {
        let block = Block::new(BlockParameters::default(), 0);
        let mut buf = Vec::new();
        let mut enc = Encoder::new(&mut buf);
        block.write(&mut enc).unwrap();

        // Only BLOCK_PREAMBLE should be present: a 1-entry map.
        assert_eq!(buf[0] & 0xE0, 0xA0);
        assert_eq!(buf[0] & 0x1F, 1);
    }
}
