//! Annotation Map Loaders Module
//!
//! Readers for the auxiliary tables that tie PF reaction records back to
//! assembly and binning context:
//!
//! - ORF annotation table (headered TSV) → ORF id → contig id
//! - contig mapping table (headerless TSV) → internal contig id → original id
//! - contig-MAG table (headerless TSV) → contig id → bin id
//! - duplicate-ORF map → groups of collapsed ORF identifiers
//!
//! ORF identifiers are stored in the `ID\t<orf>` form so they compare
//! directly against the `ID` lines the PF reader keeps verbatim.
//!
//! Each table has a `parse_*` function over any buffered reader and a
//! `load_*` wrapper that opens a file (gzip auto-detected).

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::io::BufRead;
use std::path::Path;

use crate::pf::open_text;

/// Prefix gluing a raw ORF identifier into the PF `ID` line form.
pub const ORF_ID_PREFIX: &str = "ID\t";

/// ORF id (prefixed) → contig id. Exactly one contig per ORF.
pub type OrfContigMap = FxHashMap<String, String>;

/// Contig id → bin (MAG) id. Contigs absent from the map are unbinned.
pub type ContigBinMap = FxHashMap<String, String>;

/// One line of the duplicate-ORF map: the ORF kept by upstream
/// dereplication plus the identical ORFs that were collapsed into it.
/// All identifiers carry the `ID\t` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub canonical: String,
    pub duplicates: Vec<String>,
}

// ============================================================================
// ORF annotation table
// ============================================================================

/// Parses the ORF annotation table (tab-separated, with header).
///
/// The header must carry an ORF id column (`# ORF_ID`, or `ORF_ID` if a
/// producer already dropped the comment marker) and a `CONTIG_ID` column.
/// Only those two columns are kept; ORF ids are stored `ID\t`-prefixed.
///
/// # Errors
/// Missing header, missing required columns, or a data row too short to
/// cover both columns are fatal.
pub fn parse_orf_contig_map<R: BufRead>(reader: R) -> Result<OrfContigMap> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => anyhow::bail!("ORF annotation table is empty"),
    };
    let columns: Vec<&str> = header.trim_end_matches('\r').split('\t').collect();

    let orf_col = columns
        .iter()
        .position(|c| *c == "# ORF_ID" || *c == "ORF_ID")
        .ok_or_else(|| anyhow::anyhow!("ORF annotation table has no '# ORF_ID' column"))?;
    let contig_col = columns
        .iter()
        .position(|c| *c == "CONTIG_ID")
        .ok_or_else(|| anyhow::anyhow!("ORF annotation table has no 'CONTIG_ID' column"))?;

    let mut map = OrfContigMap::default();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let width = orf_col.max(contig_col);
        if fields.len() <= width {
            anyhow::bail!(
                "ORF annotation table line {}: expected at least {} columns, found {}",
                idx + 2,
                width + 1,
                fields.len()
            );
        }
        map.insert(
            format!("{}{}", ORF_ID_PREFIX, fields[orf_col]),
            fields[contig_col].to_string(),
        );
    }

    Ok(map)
}

/// Loads the ORF annotation table from a file.
pub fn load_orf_contig_map<P: AsRef<Path>>(path: P) -> Result<OrfContigMap> {
    parse_orf_contig_map(open_text(path.as_ref())?)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
}

// ============================================================================
// Contig mapping table (internal id → original id)
// ============================================================================

/// Parses the preprocessing contig mapping table (tab-separated, headerless,
/// three columns: internal contig id, original contig id, contig length).
///
/// Projects to internal → original; the length column is dropped. Used only
/// when the pipeline's internal contig ids differ from the ids the binning
/// step saw.
pub fn parse_contig_contig_map<R: BufRead>(reader: R) -> Result<FxHashMap<String, String>> {
    let mut map = FxHashMap::default();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            anyhow::bail!(
                "contig mapping table line {}: expected 3 columns, found {}",
                idx + 1,
                fields.len()
            );
        }
        map.insert(fields[0].to_string(), fields[1].to_string());
    }
    Ok(map)
}

/// Loads the contig mapping table from a file.
pub fn load_contig_contig_map<P: AsRef<Path>>(path: P) -> Result<FxHashMap<String, String>> {
    parse_contig_contig_map(open_text(path.as_ref())?)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
}

// ============================================================================
// Contig-MAG table
// ============================================================================

/// Parses the contig-MAG table (tab-separated, headerless, two columns:
/// contig id, bin id).
///
/// Recovery is total: a malformed table (any non-blank line without exactly
/// two fields) yields an empty map after a warning, so a run on an unbinned
/// or oddly-exported dataset still completes: every contig then simply has
/// no bin and drops out of the partitioned output.
pub fn parse_contig_bin_map<R: BufRead>(reader: R) -> Result<ContigBinMap> {
    let mut map = ContigBinMap::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let contig = fields.next();
        let bin = fields.next();
        match (contig, bin, fields.next()) {
            (Some(contig), Some(bin), None) => {
                map.insert(contig.to_string(), bin.to_string());
            }
            _ => {
                eprintln!("Warning: contig-MAG table is malformed; treating all contigs as unbinned");
                return Ok(ContigBinMap::default());
            }
        }
    }
    Ok(map)
}

/// Loads the contig-MAG table from a file.
///
/// An absent file is not an error: binning output may legitimately not
/// exist yet, and the pipeline is defined to produce no partitions then.
pub fn load_contig_bin_map<P: AsRef<Path>>(path: P) -> Result<ContigBinMap> {
    if !path.as_ref().exists() {
        return Ok(ContigBinMap::default());
    }
    parse_contig_bin_map(open_text(path.as_ref())?)
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))
}

// ============================================================================
// Duplicate-ORF map
// ============================================================================

/// Parses the duplicate-ORF map (tab-separated, headerless).
///
/// Each line lists the canonical ORF first, then the duplicates collapsed
/// into it. Lines without any tab carry no group and are skipped. Every
/// identifier is stored `ID\t`-prefixed.
pub fn parse_duplicate_orf_map<R: BufRead>(reader: R) -> Result<Vec<DuplicateGroup>> {
    let mut groups = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if !line.contains('\t') {
            continue;
        }
        let mut orfs = line
            .split('\t')
            .map(|orf| format!("{}{}", ORF_ID_PREFIX, orf));
        if let Some(canonical) = orfs.next() {
            groups.push(DuplicateGroup {
                canonical,
                duplicates: orfs.collect(),
            });
        }
    }
    Ok(groups)
}

/// Loads the duplicate-ORF map from a file.
pub fn load_duplicate_orf_map<P: AsRef<Path>>(path: P) -> Result<Vec<DuplicateGroup>> {
    parse_duplicate_orf_map(open_text(path.as_ref())?)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orf_contig_map_prefixes_and_projects() {
        let table = "# ORF_ID\tSTART\tCONTIG_ID\nO_1\t10\tC_1\nO_2\t55\tC_2\n";
        let map = parse_orf_contig_map(table.as_bytes()).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("ID\tO_1").map(String::as_str), Some("C_1"));
        assert_eq!(map.get("ID\tO_2").map(String::as_str), Some("C_2"));
    }

    #[test]
    fn test_orf_contig_map_accepts_renamed_header() {
        let table = "ORF_ID\tCONTIG_ID\nO_1\tC_1\n";
        let map = parse_orf_contig_map(table.as_bytes()).unwrap();
        assert_eq!(map.get("ID\tO_1").map(String::as_str), Some("C_1"));
    }

    #[test]
    fn test_orf_contig_map_missing_column_is_fatal() {
        let err = parse_orf_contig_map("# ORF_ID\tSTART\nO_1\t10\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("CONTIG_ID"));
    }

    #[test]
    fn test_orf_contig_map_short_row_is_fatal() {
        let table = "# ORF_ID\tCONTIG_ID\nO_1\n";
        assert!(parse_orf_contig_map(table.as_bytes()).is_err());
    }

    #[test]
    fn test_contig_contig_map_drops_length() {
        let table = "mp_1\tC_1\t4521\nmp_2\tC_2\t887\n";
        let map = parse_contig_contig_map(table.as_bytes()).unwrap();

        assert_eq!(map.get("mp_1").map(String::as_str), Some("C_1"));
        assert_eq!(map.get("mp_2").map(String::as_str), Some("C_2"));
    }

    #[test]
    fn test_contig_bin_map_two_columns() {
        let table = "C_1\tbin_1\nC_2\tbin_2\n";
        let map = parse_contig_bin_map(table.as_bytes()).unwrap();

        assert_eq!(map.get("C_1").map(String::as_str), Some("bin_1"));
        assert_eq!(map.get("C_2").map(String::as_str), Some("bin_2"));
    }

    #[test]
    fn test_contig_bin_map_malformed_yields_empty() {
        // Three columns where two are expected: whole table is suspect
        let table = "C_1\tbin_1\textra\n";
        assert!(parse_contig_bin_map(table.as_bytes()).unwrap().is_empty());

        let table = "C_1\n";
        assert!(parse_contig_bin_map(table.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_contig_bin_map_absent_file_yields_empty() {
        let map = load_contig_bin_map("/nonexistent/contig_info.tsv").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_duplicate_orf_map_skips_tabless_lines() {
        let table = "O_1\tO_3\tO_4\nno-group-here\nO_2\tO_5\n";
        let groups = parse_duplicate_orf_map(table.as_bytes()).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].canonical, "ID\tO_1");
        assert_eq!(groups[0].duplicates, vec!["ID\tO_3", "ID\tO_4"]);
        assert_eq!(groups[1].canonical, "ID\tO_2");
        assert_eq!(groups[1].duplicates, vec!["ID\tO_5"]);
    }
}
