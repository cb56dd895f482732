//! PathoLogic Output Module
//!
//! Writes the per-MAG folder tree consumed by Pathway Tools' PathoLogic
//! batch mode. Each recovered MAG gets its own folder under the output
//! directory:
//!
//! ```text
//! results/
//!   bin_1/
//!     0.pf                   reaction records assigned to this MAG
//!     genetic-elements.dat   points PathoLogic at 0.pf
//!     organism-params.dat    organism stanza keyed by the MAG id
//!     pathologic.log         placeholder PathoLogic appends to
//!     <sample>.dummy.txt     per-sample marker
//!   bin_2/
//!     ...
//! ```

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::splitter::{BinnedRecord, MagPartition};

/// Derives the sample name from the ORF annotation table's file name.
///
/// MetaPathways names the table `<sample>.ORF_annotation_table.txt`; the
/// stem before that suffix is the sample name. Falls back to the file stem
/// for tables named differently.
pub fn sample_name_from_path(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("sample");
    let name = name.strip_suffix(".gz").unwrap_or(name);
    if let Some(sample) = name.strip_suffix(".ORF_annotation_table.txt") {
        return sample.to_string();
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sample")
        .to_string()
}

/// Writes one PathoLogic input folder per MAG in the partition.
///
/// Bins are written in partition (sorted) order; records within each `0.pf`
/// keep their document order.
pub fn write_mag_folders(outdir: &Path, sample: &str, partition: &MagPartition) -> Result<()> {
    fs::create_dir_all(outdir)
        .with_context(|| format!("Failed to create output directory {}", outdir.display()))?;

    for (bin_id, records) in partition {
        let mag_dir = outdir.join(bin_id);
        fs::create_dir_all(&mag_dir)
            .with_context(|| format!("Failed to create MAG directory {}", mag_dir.display()))?;

        write_pf_file(&mag_dir.join("0.pf"), records)?;
        write_genetic_elements(&mag_dir.join("genetic-elements.dat"))?;
        write_organism_params(&mag_dir.join("organism-params.dat"), sample, bin_id)?;
        File::create(mag_dir.join("pathologic.log"))?;
        File::create(mag_dir.join(format!("{}.dummy.txt", sample)))?;
    }

    Ok(())
}

fn write_pf_file(path: &Path, records: &[BinnedRecord]) -> Result<()> {
    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );
    for binned in records {
        binned.record.write_block(&mut out)?;
    }
    out.flush()?;
    Ok(())
}

fn write_genetic_elements(path: &Path) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "ID\t0")?;
    writeln!(out, "NAME\t0")?;
    writeln!(out, "TYPE\t:CONTIG")?;
    writeln!(out, "ANNOT-FILE\t0.pf")?;
    writeln!(out, "//")?;
    Ok(())
}

fn write_organism_params(path: &Path, sample: &str, bin_id: &str) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "ID\t{}", bin_id)?;
    writeln!(out, "STORAGE\tFILE")?;
    writeln!(out, "NAME\t{}_{}", sample, bin_id)?;
    writeln!(out, "DOMAIN\tTAX-2")?;
    writeln!(out, "RANK\t|species|")?;
    writeln!(out, "CREATE?\tt")?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
