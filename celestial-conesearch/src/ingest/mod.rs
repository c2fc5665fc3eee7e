//! Pixel catalog builder.
//!
//! Streams a delimited table once and partitions it on disk by nested
//! HEALPix pixel:
//!
//! 1. The target directory must exist and be empty.
//! 2. The first [`SAMPLE_ROWS`] lines decide whether there is a header
//!    ([`sniff`]) and give an estimate of the table size, which picks the
//!    resolution ([`resolution`]).
//! 3. Every data row is validated, pixelized and queued in a
//!    [`PixelBuffer`] that appends to pixel files whenever it grows past
//!    [`FLUSH_THRESHOLD`] rows.
//! 4. `metadata.json` is written last, so a dataset without it is incomplete.
//!
//! Rows that cannot be placed on the sky, including lines that are not
//! valid UTF-8, are skipped and counted, never fatal. A fatal error after
//! the target check removes whatever was written to the target. Without an identifier column, each row gets `id_<n>` appended,
//! `n` being its position among all data rows.

pub mod buffer;
pub mod resolution;
pub mod sniff;

pub use buffer::{PixelBuffer, FLUSH_THRESHOLD};
pub use resolution::{choose_resolution, estimate_row_count, SAMPLE_ROWS};
pub use sniff::{has_header, HeaderMode};

use crate::error::{Error, Result};
use crate::healpix::pixelize;
use crate::metadata::{DatasetMetadata, Datatype, FieldDescriptor, Ucd};
use crate::row::{split_row, trim_line_end};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Name of the identifier column added when the input has none.
pub const SYNTHETIC_ID_FIELD: &str = "record_ID";

/// Lines between two progress callbacks.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// How to read the input table.
///
/// Columns are given by header name, or by zero-based position when the
/// name is not a header column.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub ra_column: String,
    pub dec_column: String,
    pub id_column: Option<String>,
    pub nside: Option<u32>,
    pub header: HeaderMode,
    pub delimiter: u8,
}

impl IngestOptions {
    pub fn new(ra_column: impl Into<String>, dec_column: impl Into<String>) -> Self {
        Self {
            ra_column: ra_column.into(),
            dec_column: dec_column.into(),
            id_column: None,
            nside: None,
            header: HeaderMode::Detect,
            delimiter: b',',
        }
    }

    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Skip the size-based choice and pixelize at `nside`.
    pub fn nside(mut self, nside: u32) -> Self {
        self.nside = Some(nside);
        self
    }

    pub fn header(mut self, mode: HeaderMode) -> Self {
        self.header = mode;
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    /// Input lines read, header included.
    pub lines_read: u64,
    pub has_header: bool,
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_rows: u64,
    pub estimated_rows: u64,
    pub nside: u32,
    /// Distinct pixel files written.
    pub pixel_files: usize,
    pub metadata: DatasetMetadata,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    width: usize,
    ra: usize,
    dec: usize,
    id: Option<usize>,
}

/// Build a pixel catalog from `source` into the empty directory `output`.
pub fn ingest(source: &Path, output: &Path, options: &IngestOptions) -> Result<IngestSummary> {
    ingest_with_progress(source, output, options, |_| {})
}

/// Like [`ingest`], calling `progress` with the running line count every
/// [`PROGRESS_INTERVAL`] lines.
pub fn ingest_with_progress<F>(
    source: &Path,
    output: &Path,
    options: &IngestOptions,
    progress: F,
) -> Result<IngestSummary>
where
    F: FnMut(u64),
{
    check_target(output)?;
    build(source, output, options, progress).inspect_err(|e| {
        tracing::warn!(error = %e, output = %output.display(), "ingestion failed, clearing output");
        if let Err(cleanup) = clear_target(output) {
            tracing::warn!(error = %cleanup, "could not clear output directory");
        }
    })
}

fn build<F>(
    source: &Path,
    output: &Path,
    options: &IngestOptions,
    mut progress: F,
) -> Result<IngestSummary>
where
    F: FnMut(u64),
{
    let sample = read_sample(source)?;
    if sample.is_empty() {
        return Err(Error::EmptyInput(source.to_path_buf()));
    }
    let has_header = match options.header {
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
        HeaderMode::Detect => sniff::has_header(&sample, options.delimiter),
    };
    let first = split_row(&sample[0], options.delimiter);
    let names: Vec<String> = if has_header {
        first
    } else {
        (0..first.len()).map(|i| format!("col_{}", i)).collect()
    };
    let columns = resolve_columns(&names, options)?;

    let estimated_rows = estimate_row_count(source)?;
    let nside = choose_resolution(estimated_rows, options.nside)?;
    tracing::info!(
        source = %source.display(),
        estimated_rows,
        nside,
        has_header,
        "starting ingestion"
    );

    let mut buffer = PixelBuffer::new(output, nside);
    let mut reader = BufReader::new(File::open(source)?);
    let mut line = Vec::new();
    let mut lines_read = 0u64;
    let mut total_rows = 0u64;
    let mut valid_rows = 0u64;
    let mut first_valid: Option<Vec<String>> = None;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        lines_read += 1;
        if lines_read % PROGRESS_INTERVAL == 0 {
            progress(lines_read);
        }
        if has_header && lines_read == 1 {
            continue;
        }

        let ordinal = total_rows;
        total_rows += 1;

        let text = match std::str::from_utf8(&line) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(line = lines_read, reason = %e, "skipping row that is not valid UTF-8");
                continue;
            }
        };
        let mut row = split_row(trim_line_end(text), options.delimiter);
        let (ra, dec) = match parse_position(&row, columns) {
            Ok(position) => position,
            Err(reason) => {
                tracing::debug!(line = lines_read, reason, "skipping invalid row");
                continue;
            }
        };
        if columns.id.is_none() {
            row.push(format!("id_{}", ordinal));
        }
        if first_valid.is_none() {
            first_valid = Some(row.clone());
        }
        buffer.push(pixelize(nside, ra, dec), row)?;
        valid_rows += 1;
    }
    buffer.flush()?;

    let fields = describe_fields(&names, columns, first_valid.as_deref());
    let metadata = DatasetMetadata::new(nside, fields);
    metadata.save(output)?;

    let summary = IngestSummary {
        lines_read,
        has_header,
        total_rows,
        valid_rows,
        invalid_rows: total_rows - valid_rows,
        estimated_rows,
        nside,
        pixel_files: buffer.pixel_files(),
        metadata,
    };
    tracing::info!(
        rows = summary.total_rows,
        valid = summary.valid_rows,
        invalid = summary.invalid_rows,
        pixel_files = summary.pixel_files,
        flushes = buffer.flushes(),
        "ingestion complete"
    );
    Ok(summary)
}

fn check_target(output: &Path) -> Result<()> {
    if !output.is_dir() {
        return Err(Error::TargetMissing(output.to_path_buf()));
    }
    if fs::read_dir(output)?.next().is_some() {
        return Err(Error::TargetNotEmpty(output.to_path_buf()));
    }
    Ok(())
}

/// Remove everything below `output`, leaving the directory itself.
fn clear_target(output: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(output)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// The first [`SAMPLE_ROWS`] lines. Invalid UTF-8 is replaced, not fatal.
fn read_sample(source: &Path) -> Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(source)?);
    let mut sample = Vec::with_capacity(SAMPLE_ROWS);
    let mut line = Vec::new();
    while sample.len() < SAMPLE_ROWS {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        sample.push(trim_line_end(&String::from_utf8_lossy(&line)).to_string());
    }
    Ok(sample)
}

fn resolve_column(names: &[String], column: &str, role: &'static str) -> Result<usize> {
    names
        .iter()
        .position(|name| name == column)
        .or_else(|| column.parse::<usize>().ok().filter(|&i| i < names.len()))
        .ok_or_else(|| Error::ColumnNotFound {
            role,
            column: column.to_string(),
        })
}

fn resolve_columns(names: &[String], options: &IngestOptions) -> Result<Columns> {
    let columns = Columns {
        width: names.len(),
        ra: resolve_column(names, &options.ra_column, "ra")?,
        dec: resolve_column(names, &options.dec_column, "dec")?,
        id: options
            .id_column
            .as_deref()
            .map(|column| resolve_column(names, column, "id"))
            .transpose()?,
    };

    // Each column carries at most one role.
    let mut roles = vec![("ra", columns.ra), ("dec", columns.dec)];
    roles.extend(columns.id.map(|id| ("id", id)));
    for (i, &(first, index)) in roles.iter().enumerate() {
        if let Some(&(second, _)) = roles[i + 1..].iter().find(|(_, other)| *other == index) {
            return Err(Error::ColumnConflict {
                first,
                second,
                index,
            });
        }
    }
    Ok(columns)
}

/// RA/DEC of a data row, or why it cannot be placed.
fn parse_position(row: &[String], columns: Columns) -> std::result::Result<(f64, f64), &'static str> {
    if row.len() != columns.width {
        return Err("field count differs from header");
    }
    let ra = parse_coordinate(&row[columns.ra]).ok_or("unparsable ra")?;
    let dec = parse_coordinate(&row[columns.dec]).ok_or("unparsable dec")?;
    if !(-90.0..=90.0).contains(&dec) {
        return Err("dec out of range");
    }
    Ok((ra, dec))
}

fn parse_coordinate(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn describe_fields(
    names: &[String],
    columns: Columns,
    first_valid: Option<&[String]>,
) -> Vec<FieldDescriptor> {
    let mut fields: Vec<FieldDescriptor> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == columns.ra {
                FieldDescriptor::position(name.as_str(), Ucd::RaMain)
            } else if i == columns.dec {
                FieldDescriptor::position(name.as_str(), Ucd::DecMain)
            } else if Some(i) == columns.id {
                FieldDescriptor::identifier(name.as_str())
            } else {
                match first_valid.and_then(|row| row.get(i)) {
                    Some(cell) => FieldDescriptor::new(name.as_str()).with_datatype(Datatype::infer(cell)),
                    None => FieldDescriptor::new(name.as_str()),
                }
            }
        })
        .collect();
    if columns.id.is_none() {
        fields.push(FieldDescriptor::identifier(SYNTHETIC_ID_FIELD));
    }
    fields
}
