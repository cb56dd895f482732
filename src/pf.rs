//! PF Format Reader Module
//!
//! Provides parsing for the block-structured PF reaction files produced by
//! MetaPathways and consumed by Pathway Tools (PathoLogic).
//!
//! # PF Format
//! A PF file is a sequence of blocks. Each block is a run of
//! `KEY<TAB>value` lines closed by a line containing exactly `//`:
//! ```text
//! ID\tO_1
//! NAME\tO_1
//! PRODUCT-TYPE\tP
//! FUNCTION\talcohol dehydrogenase
//! EC\t1.1.1.1
//! METACYC\tALCOHOL-DEHYDROG-RXN
//! //
//! ```
//! `EC` and `METACYC` may repeat within a block and accumulate; any other
//! key repeated within a block keeps only its last value. The value stored
//! for every key is the *entire source line* (key and tab included): the
//! downstream duplicate-ORF map and annotation table are keyed on the same
//! `ID\t<orf>` form, and the per-MAG writer re-emits the lines verbatim.
//!
//! # Example Usage
//! ```no_run
//! use magsplitter::pf::PfReader;
//!
//! let mut reader = PfReader::open("0.pf").unwrap();
//! while let Some(record) = reader.read_next().unwrap() {
//!     println!("{:?}: {} EC accession(s)", record.orf_id, record.ec.len());
//! }
//! ```

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Opens a text input file, decompressing transparently if it ends in `.gz`.
pub(crate) fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if ext == "gz" {
        Ok(Box::new(BufReader::with_capacity(
            1024 * 1024,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(1024 * 1024, file)))
    }
}

// ============================================================================
// PF Record
// ============================================================================

/// A single PF reaction block.
///
/// The PF schema is open-ended: beyond the keys given their own fields here,
/// any key a block happens to carry lands in `fields` in first-seen order.
/// Every stored value is the full source line (`KEY\t...`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PfRecord {
    /// The block's `ID` line, when present. Carries the ORF identifier in
    /// the `ID\t<orf>` form the map loaders key on.
    pub orf_id: Option<String>,
    /// The block's `PRODUCT-TYPE` line, when present.
    pub product_type: Option<String>,
    /// `EC` lines in source order; empty if the block declares none.
    pub ec: Vec<String>,
    /// `METACYC` lines in source order; empty if the block declares none.
    pub metacyc: Vec<String>,
    /// Every other key, as (key, full line), in first-seen order.
    /// A repeated key overwrites its stored line in place.
    pub fields: Vec<(String, String)>,
}

impl PfRecord {
    /// Folds one block line into the record.
    ///
    /// The line is split at its first tab; the substring before the tab is
    /// the key, the stored value is the whole line.
    ///
    /// # Errors
    /// Returns an error if the line contains no tab (malformed PF input).
    fn push_line(&mut self, line: &str, line_no: usize) -> Result<()> {
        let tab = line.find('\t').ok_or_else(|| {
            anyhow::anyhow!("PF line {} has no tab separator: {:?}", line_no, line)
        })?;

        match &line[..tab] {
            "EC" => self.ec.push(line.to_string()),
            "METACYC" => self.metacyc.push(line.to_string()),
            "ID" => self.orf_id = Some(line.to_string()),
            "PRODUCT-TYPE" => self.product_type = Some(line.to_string()),
            key => self.set_field(key, line),
        }
        Ok(())
    }

    fn set_field(&mut self, key: &str, line: &str) {
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| k == key) {
            slot.1 = line.to_string();
        } else {
            self.fields.push((key.to_string(), line.to_string()));
        }
    }

    /// Returns a copy of this record with its `ID` line replaced.
    ///
    /// Used when re-expanding collapsed duplicate ORFs: the clone carries
    /// the duplicate's identity but the canonical ORF's annotation.
    pub fn clone_with_orf_id(&self, orf_id: &str) -> PfRecord {
        let mut clone = self.clone();
        clone.orf_id = Some(orf_id.to_string());
        clone
    }

    /// Serializes the record back into a `//`-terminated PF block.
    ///
    /// Lines are emitted id first, then the open fields in first-seen order,
    /// then product type, `EC` and `METACYC` accessions. The lines themselves
    /// are the verbatim source lines.
    pub fn write_block<W: Write>(&self, out: &mut W) -> Result<()> {
        if let Some(id) = &self.orf_id {
            writeln!(out, "{}", id)?;
        }
        for (_, line) in &self.fields {
            writeln!(out, "{}", line)?;
        }
        if let Some(product_type) = &self.product_type {
            writeln!(out, "{}", product_type)?;
        }
        for line in &self.ec {
            writeln!(out, "{}", line)?;
        }
        for line in &self.metacyc {
            writeln!(out, "{}", line)?;
        }
        writeln!(out, "//")?;
        Ok(())
    }
}

// ============================================================================
// PF Reader
// ============================================================================

/// Sequential reader for PF format files.
///
/// Yields one [`PfRecord`] per `//`-terminated block, in file order.
/// Implements Iterator for convenient use in for loops.
pub struct PfReader<R: BufRead> {
    reader: R,
    line_buf: String,
    line_no: usize,
}

impl PfReader<Box<dyn BufRead>> {
    /// Opens a PF file for reading (plain or gzip-compressed).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(open_text(path)?))
    }
}

impl<R: BufRead> PfReader<R> {
    /// Wraps any buffered reader as a PF block source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: String::with_capacity(256),
            line_no: 0,
        }
    }

    /// Reads the next PF block from the input.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - a complete `//`-terminated block was read
    /// - `Ok(None)` - clean end of input (no partial block pending)
    /// - `Err(e)` - I/O error, tab-less line, or input ending mid-block
    pub fn read_next(&mut self) -> Result<Option<PfRecord>> {
        let mut record = PfRecord::default();
        let mut block_start = 0usize;

        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                if block_start == 0 {
                    return Ok(None);
                }
                anyhow::bail!(
                    "PF block starting at line {} not terminated by '//'",
                    block_start
                );
            }
            self.line_no += 1;

            let line = self.line_buf.trim_end();
            if line == "//" {
                return Ok(Some(record));
            }

            if block_start == 0 {
                block_start = self.line_no;
            }
            record.push_line(line, self.line_no)?;
        }
    }
}

impl<R: BufRead> Iterator for PfReader<R> {
    type Item = Result<PfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Reads an entire PF file into memory, preserving block order.
pub fn read_pf_file<P: AsRef<Path>>(path: P) -> Result<Vec<PfRecord>> {
    PfReader::open(path.as_ref())
        .with_context(|| format!("Failed to read PF file {}", path.as_ref().display()))?
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<PfRecord>> {
        PfReader::new(text.as_bytes()).collect()
    }

    #[test]
    fn test_parse_two_blocks_in_order() {
        let text = "ID\tO_1\nNAME\tO_1\nPRODUCT-TYPE\tP\n//\nID\tO_2\nPRODUCT-TYPE\tP\n//\n";
        let records = parse(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].orf_id.as_deref(), Some("ID\tO_1"));
        assert_eq!(records[1].orf_id.as_deref(), Some("ID\tO_2"));
        assert_eq!(records[0].product_type.as_deref(), Some("PRODUCT-TYPE\tP"));
        assert_eq!(records[0].fields, vec![("NAME".to_string(), "NAME\tO_1".to_string())]);
    }

    #[test]
    fn test_ec_and_metacyc_accumulate_in_source_order() {
        let text = "ID\tO_1\nEC\t1.1.1.1\nMETACYC\tRXN-1\nEC\t2.7.7.7\nMETACYC\tRXN-2\n//\n";
        let records = parse(text).unwrap();

        assert_eq!(records[0].ec, vec!["EC\t1.1.1.1", "EC\t2.7.7.7"]);
        assert_eq!(records[0].metacyc, vec!["METACYC\tRXN-1", "METACYC\tRXN-2"]);
    }

    #[test]
    fn test_ec_defaults_to_empty() {
        let records = parse("ID\tO_1\n//\n").unwrap();
        assert!(records[0].ec.is_empty());
        assert!(records[0].metacyc.is_empty());
    }

    #[test]
    fn test_repeated_scalar_key_keeps_last_value() {
        let text = "ID\tO_1\nFUNCTION\tfirst\nNAME\tO_1\nFUNCTION\tsecond\n//\n";
        let records = parse(text).unwrap();

        // Last write wins, original position kept
        assert_eq!(
            records[0].fields,
            vec![
                ("FUNCTION".to_string(), "FUNCTION\tsecond".to_string()),
                ("NAME".to_string(), "NAME\tO_1".to_string()),
            ]
        );
    }

    #[test]
    fn test_value_is_full_line() {
        let records = parse("ID\tO_1\nFUNCTION\thypothetical\tprotein\n//\n").unwrap();
        assert_eq!(records[0].fields[0].1, "FUNCTION\thypothetical\tprotein");
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_unterminated_block_is_fatal() {
        let err = parse("ID\tO_1\nNAME\tO_1\n").unwrap_err();
        assert!(err.to_string().contains("not terminated"));
    }

    #[test]
    fn test_line_without_tab_is_fatal() {
        let err = parse("ID\tO_1\nNOTAB\n//\n").unwrap_err();
        assert!(err.to_string().contains("no tab"));
    }

    #[test]
    fn test_clone_with_orf_id_keeps_annotation() {
        let records = parse("ID\tO_1\nNAME\tO_1\nEC\t1.1.1.1\n//\n").unwrap();
        let clone = records[0].clone_with_orf_id("ID\tO_9");

        assert_eq!(clone.orf_id.as_deref(), Some("ID\tO_9"));
        assert_eq!(clone.ec, records[0].ec);
        assert_eq!(clone.fields, records[0].fields);
    }

    #[test]
    fn test_write_block_round_trip() {
        let text = "ID\tO_1\nNAME\tO_1\nPRODUCT-TYPE\tP\nEC\t1.1.1.1\nMETACYC\tRXN-1\n//\n";
        let records = parse(text).unwrap();

        let mut out = Vec::new();
        records[0].write_block(&mut out).unwrap();
        let reparsed = parse(std::str::from_utf8(&out).unwrap()).unwrap();

        assert_eq!(reparsed, records);
    }
}
