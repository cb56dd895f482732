//! MAG Splitting Pipeline Module
//!
//! Re-partitions a pooled metagenome reaction database per recovered MAG.
//! Four stages run in order over the in-memory record set, each materialized
//! fully before the next:
//!
//! 1. Duplicate restoration: re-expand ORFs collapsed by upstream
//!    dereplication, cloning each canonical record per duplicate.
//! 2. Contig attachment: inner-join records to contigs via the ORF
//!    annotation table; ORFs without a contig drop out.
//! 3. Bin attachment: inner-join contigs to bins via the contig-MAG
//!    table; unbinned contigs drop out.
//! 4. Partition: group records by bin, preserving document order within
//!    each bin.
//!
//! Joins drop individual records; everything else (missing files, malformed
//! rows) aborts the run. The pipeline is a bounded single-threaded batch:
//! all inputs are whole-sample annotation tables, not streaming-scale data.

use anyhow::Result;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::maps::{self, ContigBinMap, DuplicateGroup, OrfContigMap};
use crate::pf::{read_pf_file, PfRecord};

// ============================================================================
// Configuration
// ============================================================================

/// Input locations for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pooled PF reaction database (MetaPathways ptools output, usually `0.pf`).
    pub pf_path: PathBuf,
    /// Duplicate-ORF map (`orf_map.txt`).
    pub orf_map_path: PathBuf,
    /// ORF annotation table (`<sample>.ORF_annotation_table.txt`).
    pub orf_contig_map_path: PathBuf,
    /// Contig-MAG table from the binning step (`contig_info.tsv`).
    pub contig_mag_map_path: PathBuf,
    /// Optional internal→original contig id mapping, for runs where the
    /// annotation pipeline renamed contigs before binning saw them.
    pub contig_map_path: Option<PathBuf>,
    /// Report per-stage progress on stderr.
    pub verbose: bool,
}

// ============================================================================
// Stage outputs
// ============================================================================

/// A reaction record with its contig resolved (after contig attachment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRecord {
    pub record: PfRecord,
    pub contig_id: String,
}

/// A reaction record with contig and bin resolved (after bin attachment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinnedRecord {
    pub record: PfRecord,
    pub contig_id: String,
    pub bin_id: String,
}

/// Bin id → that MAG's reaction records, in document order.
/// Bins iterate in sorted order.
pub type MagPartition = BTreeMap<String, Vec<BinnedRecord>>;

// ============================================================================
// Pipeline stages
// ============================================================================

/// Re-expands collapsed duplicate ORFs (stage 1).
///
/// For each group, the record whose `ID` line matches the canonical ORF is
/// cloned once per duplicate with the duplicate's identity, and the clones
/// are appended to the document. Groups whose canonical ORF is not in the
/// document (filtered upstream, or a stale map) are skipped.
///
/// The ORF index is built once up front; restoration is a single pass over
/// the groups, so the cost stays linear in document size.
///
/// # Returns
/// The number of groups skipped for want of a canonical record.
pub fn restore_duplicate_orfs(records: &mut Vec<PfRecord>, groups: &[DuplicateGroup]) -> usize {
    let index: FxHashMap<&str, usize> = records
        .iter()
        .enumerate()
        .filter_map(|(pos, record)| record.orf_id.as_deref().map(|id| (id, pos)))
        .collect();

    let mut skipped = 0usize;
    let mut restored = Vec::new();
    for group in groups {
        match index.get(group.canonical.as_str()) {
            Some(&pos) => {
                for duplicate in &group.duplicates {
                    restored.push(records[pos].clone_with_orf_id(duplicate));
                }
            }
            None => skipped += 1,
        }
    }

    records.extend(restored);
    skipped
}

/// Attaches a contig id to every record the annotation table covers
/// (stage 2). Records whose ORF has no contig mapping carry no genome
/// context and are dropped.
pub fn attach_contigs(records: Vec<PfRecord>, map: &OrfContigMap) -> Vec<MappedRecord> {
    records
        .into_iter()
        .filter_map(|record| {
            let contig_id = record.orf_id.as_ref().and_then(|id| map.get(id))?.clone();
            Some(MappedRecord { record, contig_id })
        })
        .collect()
}

/// Rewrites internal contig ids to their original form where the mapping
/// table knows them; ids absent from the table pass through unchanged.
pub fn remap_contig_ids(records: &mut [MappedRecord], remap: &FxHashMap<String, String>) {
    for mapped in records.iter_mut() {
        if let Some(original) = remap.get(&mapped.contig_id) {
            mapped.contig_id = original.clone();
        }
    }
}

/// Attaches a bin id to every record whose contig was binned (stage 3).
/// Records on unbinned contigs belong to no recovered genome and are
/// dropped.
pub fn attach_bins(records: Vec<MappedRecord>, bins: &ContigBinMap) -> Vec<BinnedRecord> {
    records
        .into_iter()
        .filter_map(|mapped| {
            let bin_id = bins.get(&mapped.contig_id)?.clone();
            Some(BinnedRecord {
                record: mapped.record,
                contig_id: mapped.contig_id,
                bin_id,
            })
        })
        .collect()
}

/// Groups records by bin (stage 4). The partition is stable: within each
/// bin, records keep their relative document order.
pub fn partition_by_bin(records: Vec<BinnedRecord>) -> MagPartition {
    let mut partition = MagPartition::new();
    for record in records {
        partition
            .entry(record.bin_id.clone())
            .or_default()
            .push(record);
    }
    partition
}

// ============================================================================
// Entry point
// ============================================================================

/// Runs the full pipeline: load all inputs, then stage 1-4.
pub fn run(config: &Config) -> Result<MagPartition> {
    let mut records = read_pf_file(&config.pf_path)?;
    let duplicate_groups = maps::load_duplicate_orf_map(&config.orf_map_path)?;
    let orf_contig_map = maps::load_orf_contig_map(&config.orf_contig_map_path)?;
    let contig_bin_map = maps::load_contig_bin_map(&config.contig_mag_map_path)?;
    let contig_remap = match &config.contig_map_path {
        Some(path) => Some(maps::load_contig_contig_map(path)?),
        None => None,
    };

    if config.verbose {
        eprintln!(
            "  [1/4] Loaded {} reaction record(s), {} duplicate group(s), {} annotated ORF(s), {} binned contig(s)",
            records.len(),
            duplicate_groups.len(),
            orf_contig_map.len(),
            contig_bin_map.len()
        );
    }

    let skipped = restore_duplicate_orfs(&mut records, &duplicate_groups);
    if config.verbose {
        eprintln!(
            "  [2/4] Restored duplicate ORFs: {} record(s) total, {} group(s) without a canonical record skipped",
            records.len(),
            skipped
        );
    }

    let mut mapped = attach_contigs(records, &orf_contig_map);
    if let Some(remap) = &contig_remap {
        remap_contig_ids(&mut mapped, remap);
    }
    if config.verbose {
        eprintln!("  [3/4] Attached contigs: {} record(s) mapped", mapped.len());
    }

    let binned = attach_bins(mapped, &contig_bin_map);
    let partition = partition_by_bin(binned);
    if config.verbose {
        eprintln!("  [4/4] Partitioned into {} MAG(s)", partition.len());
    }

    Ok(partition)
}

// ============================================================================
// Tests
// ============================================================================
