//! CLI argument definitions for conesearch-ingest

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "conesearch-ingest")]
#[command(about = "Partition a CSV table of sky positions into HEALPix pixel files")]
#[command(version)]
pub struct Cli {
    /// Input CSV file
    #[arg(short = 'f', long = "csvfile")]
    pub csvfile: PathBuf,

    /// Right ascension column: header name or zero-based index
    #[arg(short = 'r', long = "rafield")]
    pub rafield: String,

    /// Declination column: header name or zero-based index
    #[arg(short = 'd', long = "decfield")]
    pub decfield: String,

    /// Identifier column; a synthetic record_ID is added when omitted
    #[arg(short = 'i', long = "idfield")]
    pub idfield: Option<String>,

    /// Existing, empty output directory
    #[arg(short = 'o', long = "outputdir")]
    pub outputdir: PathBuf,

    /// Force the HEALPix nside instead of choosing from the table size
    #[arg(long)]
    pub nside: Option<u32>,

    /// Treat the first line as a header without guessing
    #[arg(long, conflicts_with = "no_header")]
    pub header: bool,

    /// Treat the first line as data without guessing
    #[arg(long)]
    pub no_header: bool,

    /// Input field delimiter (a single byte)
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Log every rejected row
    #[arg(long)]
    pub debug: bool,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    let s = if s == "\\t" { "\t" } else { s };
    match s.as_bytes() {
        [b] => Ok(*b),
        _ => Err(format!("delimiter must be a single byte, got {:?}", s)),
    }
}
