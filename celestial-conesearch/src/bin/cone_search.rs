use anyhow::Context;
use celestial_conesearch::config::ServiceConfig;
use celestial_conesearch::logging::init_subscriber;
use celestial_conesearch::query::{Cone, Dataset};
use celestial_conesearch::row::join_row;
use celestial_conesearch::votable::write_votable;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Votable,
    Csv,
    Json,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Source {
    /// Catalog directory (holding metadata.json)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Service config file whose dataPath names the catalog directory
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "cone-search")]
#[command(about = "Query HEALPix-partitioned CSV catalogs")]
struct Cli {
    #[command(flatten)]
    source: Source,

    /// Debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print catalog information
    Info,
    /// Perform a cone search
    #[command(allow_negative_numbers = true)]
    Search {
        /// Right ascension of the centre, degrees in [0, 360)
        ra: f64,
        /// Declination of the centre, degrees in [-90, 90]
        dec: f64,
        /// Search radius in degrees
        #[arg(long, default_value = "1.0")]
        radius: f64,
        /// Output format
        #[arg(long, value_enum, default_value = "votable")]
        format: OutputFormat,
        /// Scan candidate pixel files in parallel
        #[arg(long)]
        parallel: bool,
        /// Print query timing
        #[arg(long)]
        timing: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(cli.debug);

    let root = match (&cli.source.data, &cli.source.config) {
        (Some(data), _) => data.clone(),
        (None, Some(config)) => ServiceConfig::load(config)?.data_path,
        (None, None) => anyhow::bail!("one of --data or --config is required"),
    };
    let dataset =
        Dataset::open(&root).with_context(|| format!("Failed to open catalog {:?}", root))?;

    match cli.command {
        Commands::Info => print_info(&dataset),
        Commands::Search {
            ra,
            dec,
            radius,
            format,
            parallel,
            timing,
        } => {
            let cone = Cone::new(ra, dec, radius)?;
            let start = timing.then(Instant::now);

            let rows: Vec<Vec<String>> = if parallel {
                dataset.cone_search_parallel(&cone)?
            } else {
                dataset
                    .cone_search(&cone)
                    .collect::<celestial_conesearch::Result<_>>()?
            };

            if let Some(start_time) = start {
                eprintln!(
                    "Query completed in {:.2} ms ({} rows)",
                    start_time.elapsed().as_secs_f64() * 1000.0,
                    rows.len()
                );
            }

            let stdout = io::stdout().lock();
            match format {
                OutputFormat::Votable => {
                    write_votable(stdout, dataset.fields(), rows.into_iter().map(Ok))?;
                }
                OutputFormat::Csv => print_csv(stdout, &dataset, &rows)?,
                OutputFormat::Json => print_json(stdout, &dataset, &rows)?,
            }
        }
    }

    Ok(())
}

fn print_info(dataset: &Dataset) {
    let meta = dataset.metadata();
    println!("Catalog: {:?}", dataset.root());
    println!("Created: {}", meta.creation_date);
    println!("nside: {}", meta.nside);
    println!("Fields:");
    for field in &meta.fields {
        let ucd = field.ucd.map(|u| u.as_str()).unwrap_or("-");
        let datatype = field.datatype.map(|d| d.as_str()).unwrap_or("-");
        let unit = field.unit.as_deref().unwrap_or("");
        println!("  {:<20} {:<16} {:<8} {}", field.name, ucd, datatype, unit);
    }
}

fn print_csv(mut out: impl Write, dataset: &Dataset, rows: &[Vec<String>]) -> anyhow::Result<()> {
    let names: Vec<&str> = dataset.fields().iter().map(|f| f.name.as_str()).collect();
    writeln!(out, "{}", join_row(&names))?;
    for row in rows {
        writeln!(out, "{}", join_row(row))?;
    }
    Ok(())
}

fn print_json(mut out: impl Write, dataset: &Dataset, rows: &[Vec<String>]) -> anyhow::Result<()> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .map(|row| {
            dataset
                .fields()
                .iter()
                .zip(row)
                .map(|(field, value)| (field.name.clone(), serde_json::Value::from(value.as_str())))
                .collect()
        })
        .collect();
    serde_json::to_writer_pretty(&mut out, &records)?;
    writeln!(out)?;
    Ok(())
}
