//! Cone search over a pixelized catalog.
//!
//! [`query`] resolves the cone to the nested pixels that can intersect it,
//! then streams only those pixel files and keeps the rows whose haversine
//! distance to the centre is at most the radius. Rows come back exactly as
//! stored; order follows pixel number, then file order.

use crate::error::{Error, Result};
use crate::healpix::{angular_separation_deg, query_disc_nest};
use crate::layout;
use crate::metadata::DatasetMetadata;
use crate::row::{split_row, PIXEL_DELIMITER};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};

/// A validated search cone, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cone {
    ra_deg: f64,
    dec_deg: f64,
    radius_deg: f64,
}

impl Cone {
    /// Build a cone, rejecting RA outside `[0, 360)`, DEC outside
    /// `[-90, 90]`, and a negative or NaN radius. An infinite radius covers
    /// the whole sky.
    pub fn new(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Result<Self> {
        if !(0.0..360.0).contains(&ra_deg) {
            return Err(Error::OutOfRange {
                name: "RA",
                range: "[0, 360[",
            });
        }
        if !(-90.0..=90.0).contains(&dec_deg) {
            return Err(Error::OutOfRange {
                name: "DEC",
                range: "[-90, 90]",
            });
        }
        if radius_deg.is_nan() || radius_deg < 0.0 {
            return Err(Error::OutOfRange {
                name: "SR",
                range: "[0, +inf[",
            });
        }
        Ok(Self {
            ra_deg,
            dec_deg,
            radius_deg,
        })
    }

    pub fn ra_deg(&self) -> f64 {
        self.ra_deg
    }

    pub fn dec_deg(&self) -> f64 {
        self.dec_deg
    }

    pub fn radius_deg(&self) -> f64 {
        self.radius_deg
    }

    /// True if (`ra_deg`, `dec_deg`) lies inside the cone, boundary included.
    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> bool {
        angular_separation_deg(self.ra_deg, self.dec_deg, ra_deg, dec_deg) <= self.radius_deg
    }

    /// Candidate pixels at `nside`, sorted.
    pub fn pixels(&self, nside: u32) -> Vec<u64> {
        query_disc_nest(nside, self.ra_deg, self.dec_deg, self.radius_deg)
    }
}

/// Positions of the RA and DEC columns in a stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PositionColumns {
    pub ra: usize,
    pub dec: usize,
}

impl PositionColumns {
    pub fn from_metadata(metadata: &DatasetMetadata) -> Result<Self> {
        let (ra, dec) = metadata.position_indices()?;
        Ok(Self { ra, dec })
    }

    fn position(&self, row: &[String]) -> Option<(f64, f64)> {
        let ra = row.get(self.ra)?.trim().parse().ok()?;
        let dec = row.get(self.dec)?.trim().parse().ok()?;
        Some((ra, dec))
    }
}

struct PixelReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: u64,
}

/// Lazy sequence of rows inside a cone.
///
/// Yields an error item for a stored row whose position cannot be read,
/// then carries on with the next line.
pub struct ConeRows {
    root: PathBuf,
    nside: u32,
    cone: Cone,
    columns: PositionColumns,
    pixels: std::vec::IntoIter<u64>,
    current: Option<PixelReader>,
}

impl ConeRows {
    pub(crate) fn new(
        root: PathBuf,
        nside: u32,
        cone: Cone,
        columns: PositionColumns,
        pixels: Vec<u64>,
    ) -> Self {
        Self {
            root,
            nside,
            cone,
            columns,
            pixels: pixels.into_iter(),
            current: None,
        }
    }

    /// Open the next candidate pixel file that exists.
    fn advance(&mut self) -> Option<Result<()>> {
        loop {
            let pix = self.pixels.next()?;
            let path = layout::pixel_path(&self.root, self.nside, pix);
            match File::open(&path) {
                Ok(file) => {
                    self.current = Some(PixelReader {
                        path,
                        lines: BufReader::new(file).lines(),
                        line: 0,
                    });
                    return Some(Ok(()));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

impl Iterator for ConeRows {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                if let Err(e) = self.advance()? {
                    return Some(Err(e));
                }
            }
            let reader = self.current.as_mut()?;
            let line = match reader.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.current = None;
                    return Some(Err(e.into()));
                }
                None => {
                    self.current = None;
                    continue;
                }
            };
            reader.line += 1;
            if line.is_empty() {
                continue;
            }
            let row = split_row(&line, PIXEL_DELIMITER);
            match self.columns.position(&row) {
                Some((ra, dec)) if self.cone.contains(ra, dec) => return Some(Ok(row)),
                Some(_) => continue,
                None => {
                    return Some(Err(Error::CorruptPixelRow {
                        path: reader.path.clone(),
                        line: reader.line,
                    }))
                }
            }
        }
    }
}

/// Rows of the catalog at `root` that fall inside `cone`.
///
/// Fails before touching any pixel file when the metadata does not name
/// exactly one RA and one DEC field.
pub fn query(metadata: &DatasetMetadata, root: &Path, cone: &Cone) -> Result<ConeRows> {
    let columns = PositionColumns::from_metadata(metadata)?;
    let pixels = cone.pixels(metadata.nside);
    tracing::debug!(
        ra = cone.ra_deg,
        dec = cone.dec_deg,
        radius = cone.radius_deg,
        candidates = pixels.len(),
        "resolved cone"
    );
    Ok(ConeRows::new(
        root.to_path_buf(),
        metadata.nside,
        *cone,
        columns,
        pixels,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healpix::pixelize;
    use crate::metadata::{FieldDescriptor, Ucd};
    use std::fs;
    use tempfile::TempDir;

    fn metadata() -> DatasetMetadata {
        DatasetMetadata::new(
            32,
            vec![
                FieldDescriptor::new("name"),
                FieldDescriptor::position("ra", Ucd::RaMain),
                FieldDescriptor::position("dec", Ucd::DecMain),
            ],
        )
    }

    fn write_pixel(root: &Path, ra: f64, dec: f64, lines: &str) {
        let path = layout::pixel_path(root, 32, pixelize(32, ra, dec));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, lines).unwrap();
    }

    #[test]
    fn test_cone_validation() {
        assert!(Cone::new(0.0, -90.0, 0.0).is_ok());
        assert!(Cone::new(359.999, 90.0, 180.0).is_ok());
        for (ra, dec, sr, name) in [
            (360.0, 0.0, 1.0, "RA"),
            (-0.1, 0.0, 1.0, "RA"),
            (f64::NAN, 0.0, 1.0, "RA"),
            (10.0, 90.5, 1.0, "DEC"),
            (10.0, 0.0, -1.0, "SR"),
            (10.0, 0.0, f64::NAN, "SR"),
        ] {
            match Cone::new(ra, dec, sr) {
                Err(Error::OutOfRange { name: got, .. }) => assert_eq!(got, name),
                other => panic!("expected {} out of range, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_infinite_radius_covers_the_sky() {
        let cone = Cone::new(10.0, 0.0, f64::INFINITY).unwrap();
        assert!(cone.contains(190.0, -45.0));
        assert_eq!(cone.pixels(4).len(), 192);

        let dir = TempDir::new().unwrap();
        write_pixel(dir.path(), 10.0, 0.0, "a,10.0,0.0
");
        write_pixel(dir.path(), 200.0, -80.0, "c,200.0,-80.0
");
        assert_eq!(query(&metadata(), dir.path(), &cone).unwrap().count(), 2);
    }

    #[test]
    fn test_filters_by_distance() {
        let dir = TempDir::new().unwrap();
        write_pixel(dir.path(), 10.0, 0.0, "a,10.0,0.0\nfar,10.0,0.9\n");

        let cone = Cone::new(10.0, 0.0, 0.5).unwrap();
        let rows: Vec<Vec<String>> = query(&metadata(), dir.path(), &cone)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(rows, vec![vec!["a", "10.0", "0.0"]]);
    }

    #[test]
    fn test_missing_pixel_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let cone = Cone::new(100.0, 40.0, 2.0).unwrap();
        assert_eq!(query(&metadata(), dir.path(), &cone).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let dir = TempDir::new().unwrap();
        write_pixel(dir.path(), 10.0, 0.0, "a,10.0,0.0\nb,oops,0.0\nc,10.0,0.0\n");

        let cone = Cone::new(10.0, 0.0, 0.1).unwrap();
        let items: Vec<Result<Vec<String>>> =
            query(&metadata(), dir.path(), &cone).unwrap().collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(matches!(
            items[1],
            Err(Error::CorruptPixelRow { line: 2, .. })
        ));
        assert_eq!(items[2].as_ref().unwrap()[0], "c");
    }

    #[test]
    fn test_requires_position_roles() {
        let dir = TempDir::new().unwrap();
        let mut meta = metadata();
        meta.fields[2].ucd = None;
        let cone = Cone::new(10.0, 0.0, 1.0).unwrap();
        assert!(matches!(
            query(&meta, dir.path(), &cone),
            Err(Error::MissingRole(Ucd::DecMain))
        ));
    }
}
