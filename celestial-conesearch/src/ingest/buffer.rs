//! Address-keyed row buffer with a size-triggered flush.
//!
//! Rows for every pixel accumulate in memory. Once the total row count
//! exceeds the threshold, each pixel's rows are appended to its file and
//! the buffer is emptied, so peak memory stays proportional to the threshold
//! whatever the table size. A pixel file may therefore be opened many times
//! over one ingestion; it is always opened in append mode.

use crate::error::Result;
use crate::layout;
use crate::row::join_row;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Buffered rows that trigger a flush when exceeded.
pub const FLUSH_THRESHOLD: usize = 20_000;

pub struct PixelBuffer {
    root: PathBuf,
    nside: u32,
    threshold: usize,
    rows: BTreeMap<u64, Vec<Vec<String>>>,
    buffered: usize,
    written: BTreeSet<u64>,
    flushes: u64,
}

impl PixelBuffer {
    pub fn new(root: impl Into<PathBuf>, nside: u32) -> Self {
        Self::with_threshold(root, nside, FLUSH_THRESHOLD)
    }

    pub fn with_threshold(root: impl Into<PathBuf>, nside: u32, threshold: usize) -> Self {
        Self {
            root: root.into(),
            nside,
            threshold,
            rows: BTreeMap::new(),
            buffered: 0,
            written: BTreeSet::new(),
            flushes: 0,
        }
    }

    /// Queue a row for pixel `pix`, flushing everything if the buffer is now
    /// over the threshold.
    pub fn push(&mut self, pix: u64, row: Vec<String>) -> Result<()> {
        self.rows.entry(pix).or_default().push(row);
        self.buffered += 1;
        if self.buffered > self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Append all buffered rows to their pixel files and clear the buffer.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        tracing::debug!(
            rows = self.buffered,
            pixels = self.rows.len(),
            "flushing pixel buffer"
        );
        for (pix, rows) in std::mem::take(&mut self.rows) {
            self.append(pix, &rows)?;
            self.written.insert(pix);
        }
        self.buffered = 0;
        self.flushes += 1;
        Ok(())
    }

    fn append(&self, pix: u64, rows: &[Vec<String>]) -> Result<()> {
        let path = layout::pixel_path(&self.root, self.nside, pix);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            writer.write_all(join_row(row).as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Rows currently held in memory.
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Distinct pixel files written so far.
    pub fn pixel_files(&self) -> usize {
        self.written.len()
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}
