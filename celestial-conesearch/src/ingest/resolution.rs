//! Choosing the pixel resolution for a new catalog.

use crate::error::{Error, Result};
use crate::healpix::is_valid_nside;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Number of leading lines sampled to estimate the average row size.
pub const SAMPLE_ROWS: usize = 100;

/// (row count threshold, nside) pairs, coarsest last. A table with more
/// rows than the threshold gets that nside.
const LADDER: [(f64, u32); 3] = [(1e8, 256), (1e7, 128), (1e5, 64)];
const COARSEST_NSIDE: u32 = 32;

/// Pick the nside for a table of roughly `row_count_estimate` rows.
///
/// A forced value is used as-is after validation. Otherwise larger tables
/// get finer pixelization so that rows per pixel file stay bounded.
pub fn choose_resolution(row_count_estimate: u64, forced_nside: Option<u32>) -> Result<u32> {
    if let Some(nside) = forced_nside {
        if !is_valid_nside(nside) {
            return Err(Error::InvalidNside(nside));
        }
        return Ok(nside);
    }
    let rows = row_count_estimate as f64;
    Ok(LADDER
        .iter()
        .find(|(threshold, _)| rows > *threshold)
        .map(|&(_, nside)| nside)
        .unwrap_or(COARSEST_NSIDE))
}

/// Estimate the number of lines in a text file from the mean size of its
/// first [`SAMPLE_ROWS`] lines and the total file size.
pub fn estimate_row_count(path: &Path) -> Result<u64> {
    let total_bytes = std::fs::metadata(path)?.len();
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = Vec::new();
    let mut sampled_rows = 0u64;
    let mut sampled_bytes = 0u64;

    while sampled_rows < SAMPLE_ROWS as u64 {
        line.clear();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        sampled_rows += 1;
        sampled_bytes += n as u64;
    }

    if sampled_bytes == 0 {
        return Ok(0);
    }
    let mean_row_bytes = sampled_bytes as f64 / sampled_rows as f64;
    Ok((total_bytes as f64 / mean_row_bytes).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_ladder() {
        assert_eq!(choose_resolution(0, None).unwrap(), 32);
        assert_eq!(choose_resolution(100_000, None).unwrap(), 32);
        assert_eq!(choose_resolution(100_001, None).unwrap(), 64);
        assert_eq!(choose_resolution(10_000_001, None).unwrap(), 128);
        assert_eq!(choose_resolution(2_000_000_000, None).unwrap(), 256);
    }

    #[test]
    fn test_monotonic() {
        let mut previous = 0;
        let mut rows = 1u64;
        while rows < u64::MAX / 3 {
            let nside = choose_resolution(rows, None).unwrap();
            assert!(nside >= previous, "nside dropped at {} rows", rows);
            previous = nside;
            rows = rows * 3 + 1;
        }
    }

    #[test]
    fn test_forced() {
        assert_eq!(choose_resolution(1_000_000_000, Some(8)).unwrap(), 8);
        assert!(matches!(
            choose_resolution(10, Some(100)),
            Err(Error::InvalidNside(100))
        ));
        assert!(matches!(
            choose_resolution(10, Some(0)),
            Err(Error::InvalidNside(0))
        ));
    }

    #[test]
    fn test_estimate_uniform_rows() {
        let mut file = NamedTempFile::new().unwrap();
        for i in 0..1000 {
            writeln!(file, "{:04},10.000,20.000", i).unwrap();
        }
        file.flush().unwrap();
        assert_eq!(estimate_row_count(file.path()).unwrap(), 1000);
    }

    #[test]
    fn test_estimate_short_and_empty_files() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "ra,dec\n1,2\n3,4\n").unwrap();
        file.flush().unwrap();
        assert_eq!(estimate_row_count(file.path()).unwrap(), 3);

        let empty = NamedTempFile::new().unwrap();
        assert_eq!(estimate_row_count(empty.path()).unwrap(), 0);
    }

    #[test]
    fn test_estimate_ignores_encoding() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Ori\xf3n,1.0,2.0\nVega,3.0,4.0\n").unwrap();
        file.flush().unwrap();
        assert_eq!(estimate_row_count(file.path()).unwrap(), 2);
    }
}
