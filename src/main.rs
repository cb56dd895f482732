use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use magsplitter::ptools;
use magsplitter::splitter::{self, Config};

#[derive(Parser)]
#[command(name = "magsplitter")]
#[command(version)]
#[command(about = "Split a pooled MetaPathways reaction database per recovered MAG")]
#[command(long_about = r#"
magsplitter - per-MAG Pathway Tools inputs from pooled metagenome annotation

MetaPathways annotates the pooled metagenome once and emits a single PF
reaction database; binning later assigns contigs to MAGs. This tool
re-partitions the pooled PF records per MAG so each recovered genome can be
fed to PathoLogic on its own.

WORKFLOW:
  PF records → restore dereplicated ORFs → attach contigs → attach MAG bins
             → split per MAG → write PathoLogic folders

INPUTS:
  0.pf                              MetaPathways ptools output
  orf_map.txt                       duplicate-ORF map (canonical first)
  <sample>.ORF_annotation_table.txt ORF → contig table ('# ORF_ID', 'CONTIG_ID')
  contig_info.tsv                   contig → MAG table from binning (2 columns)

OUTPUT:
  One folder per MAG under --outdir, each holding 0.pf,
  genetic-elements.dat, organism-params.dat, pathologic.log and a
  per-sample marker file.

ORFs without a contig mapping and contigs without a MAG assignment are
excluded from the split output; an absent contig-MAG table yields no MAG
folders rather than an error.

EXAMPLE:
  magsplitter -i ptools/0.pf -m orf_map.txt \
      -a results/GAPP-1234.ORF_annotation_table.txt \
      -b binning/contig_info.tsv -o results/mags -v
"#)]
struct Args {
    #[arg(short = 'i', long = "pf", value_name = "FILE", help_heading = "Input")]
    pf: PathBuf,

    #[arg(short = 'm', long = "orf-map", value_name = "FILE", help_heading = "Input")]
    orf_map: PathBuf,

    #[arg(short = 'a', long = "annotation-table", value_name = "FILE", help_heading = "Input")]
    annotation_table: PathBuf,

    #[arg(short = 'b', long = "contig-mag-map", value_name = "FILE", help_heading = "Input")]
    contig_mag_map: PathBuf,

    #[arg(short = 'c', long = "contig-map", value_name = "FILE", help_heading = "Input")]
    contig_map: Option<PathBuf>,

    #[arg(short = 'o', long, value_name = "DIR", default_value = "results", help_heading = "Output")]
    outdir: PathBuf,

    #[arg(short = 's', long, value_name = "NAME", help_heading = "Output")]
    sample: Option<String>,

    #[arg(short = 'v', long, help_heading = "Output")]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let start_time = Instant::now();

    let config = Config {
        pf_path: args.pf.clone(),
        orf_map_path: args.orf_map.clone(),
        orf_contig_map_path: args.annotation_table.clone(),
        contig_mag_map_path: args.contig_mag_map.clone(),
        contig_map_path: args.contig_map.clone(),
        verbose: args.verbose,
    };

    let partition = splitter::run(&config)?;
    if partition.is_empty() {
        eprintln!("Warning: no reaction record fell in any MAG; no MAG folders to write");
    }

    let sample = args
        .sample
        .unwrap_or_else(|| ptools::sample_name_from_path(&args.annotation_table));
    ptools::write_mag_folders(&args.outdir, &sample, &partition)?;

    if args.verbose {
        for (bin_id, records) in &partition {
            eprintln!("  {}: {} record(s)", bin_id, records.len());
        }
        eprintln!(
            "Wrote {} MAG folder(s) to {} in {:.1}s",
            partition.len(),
            args.outdir.display(),
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
