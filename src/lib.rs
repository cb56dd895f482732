//! MAGSplitter - Re-partition MetaPathways Annotations per Recovered MAG
//!
//! Reconciles the pooled reaction database a metagenomic annotation pipeline
//! produces (MetaPathways PF output for Pathway Tools) with a downstream
//! genome-binning step, so every recovered MAG gets its own PathoLogic
//! input folder.
//!
//! # Modules
//! - `pf`: PF reaction-block reading and re-serialization
//! - `maps`: ORF/contig/bin annotation table loaders
//! - `splitter`: duplicate restoration, join and per-MAG partition pipeline
//! - `ptools`: per-MAG PathoLogic folder writing

pub mod maps;
pub mod pf;
pub mod ptools;
pub mod splitter;
