//! Writing a C-DNS file: buffers generic records into blocks and flushes
//! them through a [`cdns_io::Writer`] as they fill.

use std::io::{self, Write};

use cdns_codec::Encoder;
use cdns_io::{Compression, Target, Writer};
use log::*;

use crate::block::Block;
use crate::config::{BlockParameters, FilePreamble};
use crate::error::Result;
use crate::generic::{GenericAddressEventCount, GenericMalformedMessage, GenericQueryResponse};
use crate::wire;


/// Adapts [`cdns_io::Writer`] (whose `write` returns a `cdns_io::Error`) to
/// `std::io::Write`, so it can sit behind `cdns_codec::Encoder`. Errors
/// collapse to the inner `io::Error` either way; `Exporter::close` talks to
/// the wrapped `Writer` directly for the distinction that matters (rename
/// on close).
struct IoWriter(Writer);

impl Write for IoWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf).map_err(|e| match e {
            cdns_io::Error::Io(e) | cdns_io::Error::Compression(e) => e,
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}


/// Buffers [`GenericQueryResponse`], [`GenericMalformedMessage`], and
/// [`GenericAddressEventCount`] records into [`Block`]s, flushing each
/// through the underlying writer as it fills.
///
/// `new` writes the file envelope (an indefinite array opening with a tag
/// identifying the C-DNS file type) and the preamble immediately; every
/// `block_parameters` entry referenced by a block must already be present
/// in the preamble, either from construction or a later
/// [`Exporter::add_block_parameters`].
pub struct Exporter {
    encoder: Option<Encoder<IoWriter>>,
    preamble: FilePreamble,
    compression: Compression,
    active_block: Block,
    pending_params_index: Option<usize>,
    bytes_written: usize,
}

impl Exporter {

    /// Opens `target` and writes the file envelope and `preamble`
    /// immediately. The active block starts at `block_parameters[0]`.
    pub fn new(preamble: FilePreamble, target: Target, compression: Compression) -> Result<Self> {
        let writer = Writer::new(target, compression)?;
        let mut encoder = Encoder::new(IoWriter(writer));

        let mut n = encoder.write_indef_array_start()?;
        n += encoder.write_tag(wire::file::FILE_TYPE_TAG)?;
        n += preamble.write(&mut encoder)?;

        let active_block = Block::new(preamble.block_parameters[0].clone(), 0);
        debug!("Opened C-DNS exporter, wrote {} bytes of envelope", n);

        Ok(Self {
            encoder: Some(encoder),
            preamble,
            compression,
            active_block,
            pending_params_index: None,
            bytes_written: n,
        })
    }

    fn encoder(&mut self) -> &mut Encoder<IoWriter> {
        self.encoder.as_mut().expect("exporter used after close")
    }

    /// Appends a new block-parameters profile to the preamble, returning
    /// its index. Valid at any time, provided the index is referenced only
    /// after this call (the exporter never rewrites or reorders the
    /// preamble's `block_parameters` once written).
    pub fn add_block_parameters(&mut self, bp: BlockParameters) -> usize {
        self.preamble.block_parameters.push(bp);
        self.preamble.block_parameters.len() - 1
    }

    /// Records which profile the *next* block (the one that begins once
    /// the current one is cleared) should use. Returns `false` only if
    /// `index` is out of range; does not require the current block to be
    /// empty, unlike [`Block::set_block_parameters`].
    pub fn set_active_block_parameters(&mut self, index: usize) -> bool {
        if index >= self.preamble.block_parameters.len() {
            return false;
        }
        self.pending_params_index = Some(index);
        true
    }

    fn apply_pending_params(&mut self) {
        if let Some(index) = self.pending_params_index.take() {
            let bp = self.preamble.block_parameters[index].clone();
            let applied = self.active_block.set_block_parameters(bp, index);
            debug_assert!(applied, "active block must be empty right after clear()");
        }
    }

    /// Buffers a query/response pair; if this fills the active block, it
    /// is serialised and cleared (applying any pending parameter switch)
    /// and the number of bytes written is returned. Otherwise returns 0.
    pub fn buffer_qr(&mut self, qr: GenericQueryResponse) -> Result<usize> {
        let full = self.active_block.add_question_response_record(qr);
        if full { self.write_block() } else { Ok(0) }
    }

    /// Buffers a malformed message; see [`Exporter::buffer_qr`].
    pub fn buffer_mm(&mut self, mm: GenericMalformedMessage) -> Result<usize> {
        let full = self.active_block.add_malformed_message(mm);
        if full { self.write_block() } else { Ok(0) }
    }

    /// Buffers an address event; see [`Exporter::buffer_qr`].
    pub fn buffer_aec(&mut self, aec: GenericAddressEventCount) -> Result<usize> {
        let full = self.active_block.add_address_event_count(aec);
        if full { self.write_block() } else { Ok(0) }
    }

    /// Flushes the active block immediately, even if it isn't full.
    /// A no-op (returns `Ok(0)`) when the block holds no items, though a
    /// pending parameter switch still takes effect.
    pub fn write_block(&mut self) -> Result<usize> {
        if self.active_block.get_item_count() == 0 {
            self.apply_pending_params();
            return Ok(0);
        }

        let enc = self.encoder.as_mut().expect("exporter used after close");
        let n = self.active_block.write(enc)?;
        self.active_block.clear();
        self.apply_pending_params();
        self.bytes_written += n;
        trace!("Flushed block, {} bytes, item count now 0", n);
        Ok(n)
    }

    /// The active block's current buffered item count.
    pub fn get_block_item_count(&self) -> usize {
        self.active_block.get_item_count()
    }

    /// Optionally flushes the active block, then closes the current
    /// output (writing the closing break and renaming it into place) and
    /// opens `new_target` under the same compression, re-emitting the file
    /// envelope and preamble there. A reader sees each rotated file as a
    /// complete, independent C-DNS file. Returns the number of bytes
    /// written across both operations.
    pub fn rotate_output(&mut self, new_target: Target, flush_current_block: bool) -> Result<usize> {
        // `write_block` already folds its byte count into `self.bytes_written`,
        // so only the bytes written below (not `flushed`) get added to it again.
        let flushed = if flush_current_block { self.write_block()? } else { 0 };

        let mut n = self.encoder().write_break()?;
        let new_writer = Writer::new(new_target, self.compression)?;
        let old = self.encoder().rotate_output(IoWriter(new_writer));
        old.0.close()?;

        n += self.encoder().write_indef_array_start()?;
        n += self.encoder().write_tag(wire::file::FILE_TYPE_TAG)?;
        let enc = self.encoder.as_mut().expect("exporter used after close");
        n += self.preamble.write(enc)?;

        self.bytes_written += n;
        let total = flushed + n;
        info!("Rotated C-DNS output, wrote {} bytes", total);
        Ok(total)
    }

    /// Flushes the active block if non-empty, writes the closing break,
    /// and closes the output (renaming it into place). Returns the total
    /// number of bytes written across this exporter's lifetime.
    pub fn close(mut self) -> Result<usize> {
        self.write_block()?;
        let break_bytes = self.encoder().write_break()?;
        self.bytes_written += break_bytes;
        let encoder = self.encoder.take().expect("exporter used after close");
        encoder.into_inner().0.close()?;
        Ok(self.bytes_written)
    }
}

impl Drop for Exporter {
    fn drop(&mut self) {
        if self.encoder.is_none() {
            return;
        }
        if let Err(e) = self.write_block() {
            error!("Exporter dropped, best-effort block flush failed -> {:?}", e);
            return;
        }
        if let Err(e) = self.encoder().write_break() {
            error!("Exporter dropped, failed to write closing break -> {:?}", e);
            return;
        }
        let encoder = self.encoder.take().expect("checked above");
        if let Err(e) = encoder.into_inner().0.close() {
            error!("Exporter dropped, failed to close output -> {:?}", e);
        }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    use crate::reader::Reader;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("cdns-exporter-test-{}-{}", std::process::id(), name));
        p
    }

    #[test]
    fn writes_envelope_and_closes_cleanly() {
        let path = temp_path("basic.cdns");
        let exp = Exporter::new(FilePreamble::default(), Target::path(&path), Compression::Plain).unwrap();
        let n = exp.close().unwrap();
        assert!(n > 0);

        let mut r = Reader::new(Target::path(&path), Compression::Plain).unwrap();
        let (_block, eof) = r.read_block().unwrap();
        assert!(eof);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn full_block_flushes_automatically() {
        let path = temp_path("autoflush.cdns");
        let mut preamble = FilePreamble::default();
        preamble.block_parameters[0].storage_parameters.max_block_items = 2;

        let mut exp = Exporter::new(preamble, Target::path(&path), Compression::Plain).unwrap();
        let ts = crate::timestamp::Timestamp::new(1, 0);
        assert_eq!(exp.buffer_qr(GenericQueryResponse { ts, ..Default::default() }).unwrap(), 0);
        let n = exp.buffer_qr(GenericQueryResponse { ts, ..Default::default() }).unwrap();
        assert!(n > 0, "second insertion should have filled and flushed the block");
        exp.close().unwrap();

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn set_active_block_parameters_rejects_out_of_range() {
        let path = temp_path("params.cdns");
        let mut exp = Exporter::new(FilePreamble::default(), Target::path(&path), Compression::Plain).unwrap();
        assert!(!exp.set_active_block_parameters(5));
        assert!(exp.set_active_block_parameters(0));
        exp.close().unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn set_active_block_parameters_succeeds_on_nonempty_block() {
        let path = temp_path("params-nonempty.cdns");
        let mut preamble = FilePreamble::default();
        let mut alt = BlockParameters::default();
        alt.storage_parameters.max_block_items = 100;
        preamble.block_parameters.push(alt);

        let mut exp = Exporter::new(preamble, Target::path(&path), Compression::Plain).unwrap();
        exp.buffer_qr(GenericQueryResponse { ts: crate::timestamp::Timestamp::new(1, 0), ..Default::default() }).unwrap();
        assert!(exp.set_active_block_parameters(1));
        assert_eq!(exp.get_block_item_count(), 1, "switch only takes effect once the current block clears");
        exp.close().unwrap();

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rotate_with_flush_does_not_double_count_flushed_bytes() {
        let path_a = temp_path("rotate-a.cdns");
        let path_b = temp_path("rotate-b.cdns");

        let mut exp = Exporter::new(FilePreamble::default(), Target::path(&path_a), Compression::Plain).unwrap();
        exp.buffer_qr(GenericQueryResponse { ts: crate::timestamp::Timestamp::new(1, 0), ..Default::default() }).unwrap();
        exp.rotate_output(Target::path(&path_b), true).unwrap();
        let total = exp.close().unwrap();

        let on_disk = std::fs::metadata(&path_a).unwrap().len() + std::fs::metadata(&path_b).unwrap().len();
        assert_eq!(total as u64, on_disk, "lifetime byte total must match what actually landed on disk");

        std::fs::remove_file(&path_a).unwrap();
        std::fs::remove_file(&path_b).unwrap();
    }
}
