//! Reading a C-DNS file: parses the preamble once, then streams blocks
//! back out one at a time, forward-only.

use cdns_codec::Decoder;
use cdns_io::{Compression, Reader as IoReader, Target};

use crate::block::BlockReader;
use crate::config::FilePreamble;
use crate::error::{Error, Result};
use crate::wire;


/// Parses a C-DNS file's envelope and preamble on construction, then
/// yields [`BlockReader`]s one at a time via [`Reader::read_block`].
///
/// There is no random access: blocks are read strictly in file order, and
/// nothing is buffered beyond the block currently being decoded.
pub struct Reader {
    decoder: Decoder<IoReader>,
    preamble: FilePreamble,
    done: bool,
}

impl Reader {

    /// Opens `target`, validates the file-type tag, and parses the file
    /// preamble.
    pub fn new(target: Target, compression: Compression) -> Result<Self> {
        let io_reader = IoReader::new(target, compression)?;
        let mut decoder = Decoder::new(io_reader);

        if decoder.read_array_start()?.is_some() {
            return Err(Error::Format("C-DNS file envelope must be an indefinite-length array".into()));
        }

        let tag = decoder.read_tag()?;
        if tag != wire::file::FILE_TYPE_TAG {
            return Err(Error::Format(format!("unexpected file-type tag {} (expected {})", tag, wire::file::FILE_TYPE_TAG)));
        }

        let preamble = FilePreamble::read(&mut decoder)?;

        Ok(Self { decoder, preamble, done: false })
    }

    /// The file preamble: format versions and the block-parameters
    /// sequence every block in this file references by index.
    pub fn preamble(&self) -> &FilePreamble {
        &self.preamble
    }

    /// Advances to the next block in the file's top-level array. Returns
    /// `(_, true)` once the closing break has been reached; every call
    /// after that keeps returning `(_, true)` without touching the
    /// decoder again.
    pub fn read_block(&mut self) -> Result<(Option<BlockReader>, bool)> {
        if self.done {
            return Ok((None, true));
        }

        if self.decoder.at_break()? {
            self.decoder.read_break()?;
            self.done = true;
            return Ok((None, true));
        }

        let block = BlockReader::read(&mut self.decoder, &self.preamble.block_parameters)?;
        Ok((Some(block), false))
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::config::BlockParameters;
    use crate::exporter::Exporter;
    use crate::generic::GenericQueryResponse;
    use crate::timestamp::Timestamp;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("cdns-reader-test-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn empty_file_reads_back_with_no_blocks() {
        let path = temp_path("empty.cdns");
        let exp = Exporter::new(FilePreamble::default(), Target::path(&path), Compression::Plain).unwrap();
        exp.close().unwrap();

        let mut r = Reader::new(Target::path(&path), Compression::Plain).unwrap();
        let (block, eof) = r.read_block().unwrap();
        assert!(block.is_none());
        assert!(eof);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn round_trips_buffered_records_across_a_block() {
        let path = temp_path("records.cdns");
        let mut exp = Exporter::new(FilePreamble::default(), Target::path(&path), Compression::Plain).unwrap();

        let ts1 = Timestamp::new(1_636_068_056, 971_687);
        let ts2 = Timestamp::new(1_636_070_675, 31_614);
        exp.buffer_qr(GenericQueryResponse { ts: ts1, client_ip: Some(b"10.0.0.1".to_vec()), ..Default::default() }).unwrap();
        exp.buffer_qr(GenericQueryResponse { ts: ts2, client_ip: Some(b"10.0.0.2".to_vec()), ..Default::default() }).unwrap();
        exp.close().unwrap();

        let mut r = Reader::new(Target::path(&path), Compression::Plain).unwrap();

        let (block, eof) = r.read_block().unwrap();
        assert!(!eof);
        let mut block = block.unwrap();

        let (qr1, end) = block.read_generic_qr();
        assert!(!end);
        assert_eq!(qr1.ts, ts1);
        assert_eq!(qr1.client_ip, Some(b"10.0.0.1".to_vec()));

        let (qr2, end) = block.read_generic_qr();
        assert!(!end);
        assert_eq!(qr2.ts, ts2);
        assert_eq!(qr2.client_ip, Some(b"10.0.0.2".to_vec()));

        let (_, end) = block.read_generic_qr();
        assert!(end);

        let (_, eof) = r.read_block().unwrap();
        assert!(eof);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn earlier_timestamp_buffered_second_still_round_trips() {
        // Regression test: an item buffered before the block's eventual
        // earliest_time is known must still decode to its own original
        // timestamp, not to whatever earliest_time settles on later.
        let path = temp_path("out_of_order.cdns");
        let mut exp = Exporter::new(FilePreamble::default(), Target::path(&path), Compression::Plain).unwrap();

        let ts1 = Timestamp::new(12, 12_543);
        let ts2 = Timestamp::new(6, 3_020);
        exp.buffer_qr(GenericQueryResponse { ts: ts1, client_ip: Some(b"10.0.0.1".to_vec()), ..Default::default() }).unwrap();
        exp.buffer_qr(GenericQueryResponse { ts: ts2, client_ip: Some(b"10.0.0.2".to_vec()), ..Default::default() }).unwrap();
        exp.close().unwrap();

        let mut r = Reader::new(Target::path(&path), Compression::Plain).unwrap();
        let (block, eof) = r.read_block().unwrap();
        assert!(!eof);
        let mut block = block.unwrap();

        let (qr1, end) = block.read_generic_qr();
        assert!(!end);
        assert_eq!(qr1.ts, ts1);

        let (qr2, end) = block.read_generic_qr();
        assert!(!end);
        assert_eq!(qr2.ts, ts2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_wrong_file_type_tag() {
        let path = temp_path("badtag.cdns");
        {
            use cdns_io::Writer;
            // 0x9F = indefinite array start, 0xD9 0x04 0xD2 = tag(1234), 0xFF = break.
            let mut writer = Writer::new(Target::path(&path), Compression::Plain).unwrap();
            writer.write(&[0x9F, 0xD9, 0x04, 0xD2, 0xFF]).unwrap();
            writer.close().unwrap();
        }

        let err = Reader::new(Target::path(&path), Compression::Plain).unwrap_err();
        match err {
            Error::Format(_) => {}
            other => panic!("expected Error::Format, got {:?}", other),
        }

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_out_of_range_block_parameters_index() {
        let path = temp_path("badparams.cdns");
        let mut preamble = FilePreamble::default();
        let mut extra = BlockParameters::default();
        extra.storage_parameters.max_block_items = 1;
        preamble.block_parameters.push(extra);

        let mut exp = Exporter::new(preamble, Target::path(&path), Compression::Plain).unwrap();
        assert!(exp.set_active_block_parameters(1));
        exp.buffer_qr(GenericQueryResponse { ts: Timestamp::new(1, 0), ..Default::default() }).unwrap();
        exp.close().unwrap();

        let mut r = Reader::new(Target::path(&path), Compression::Plain).unwrap();
        let (block, eof) = r.read_block().unwrap();
        assert!(!eof);
        assert_eq!(block.unwrap().block_parameters_index(), 1);

        std::fs::remove_file(&path).unwrap();
    }
}
