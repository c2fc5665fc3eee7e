//! conesearch-ingest: build a cone-searchable pixel catalog from a CSV file

mod cli;

use anyhow::Context;
use celestial_conesearch::ingest::{ingest_with_progress, HeaderMode, IngestOptions, IngestSummary};
use celestial_conesearch::logging::init_subscriber;
use clap::Parser;
use cli::Cli;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(cli.debug);

    let options = build_options(&cli);
    print_plan(&cli);

    let spinner = create_spinner()?;
    let start = Instant::now();
    let result = ingest_with_progress(&cli.csvfile, &cli.outputdir, &options, |lines| {
        spinner.set_message(format!("{} lines parsed", lines));
    });
    spinner.finish_and_clear();
    let summary = result.with_context(|| format!("Failed to ingest {:?}", cli.csvfile))?;

    print_summary(&cli, &summary, start.elapsed());
    Ok(())
}

fn build_options(cli: &Cli) -> IngestOptions {
    let header = if cli.header {
        HeaderMode::Present
    } else if cli.no_header {
        HeaderMode::Absent
    } else {
        HeaderMode::Detect
    };
    let mut options = IngestOptions::new(&cli.rafield, &cli.decfield)
        .header(header)
        .delimiter(cli.delimiter);
    if let Some(id) = &cli.idfield {
        options = options.id_column(id);
    }
    if let Some(nside) = cli.nside {
        options = options.nside(nside);
    }
    options
}

fn create_spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} ({elapsed})")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}

fn print_plan(cli: &Cli) {
    println!("\n=== Cone Search Catalog Ingestion ===");
    println!("Input file: {:?}", cli.csvfile);
    println!("RA field: {}", cli.rafield);
    println!("Dec field: {}", cli.decfield);
    match &cli.idfield {
        Some(id) => println!("ID field: {}", id),
        None => println!("ID field: none (record_ID will be generated)"),
    }
    if let Some(nside) = cli.nside {
        println!("Forced nside: {}", nside);
    }
    println!("Output directory: {:?}", cli.outputdir);
    println!();
}

fn print_summary(cli: &Cli, summary: &IngestSummary, elapsed: Duration) {
    println!("=== Summary ===");
    println!("{} lines parsed in {:.1}s", summary.lines_read, elapsed.as_secs_f64());
    if summary.has_header {
        println!("First line was used as header");
    } else {
        println!("No header line detected");
    }
    println!(
        "Estimated rows: {} -> nside {}",
        summary.estimated_rows, summary.nside
    );
    println!("Valid rows: {}", summary.valid_rows);
    println!("Invalid rows: {}", summary.invalid_rows);
    if summary.invalid_rows > 0 && !cli.debug {
        println!("Run again with --debug to see why rows were rejected");
    }
    println!("Pixel files written: {}", summary.pixel_files);
    println!("Output directory: {:?}", cli.outputdir);
}
