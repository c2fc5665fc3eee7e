//! Read-only handle on a pixelized catalog directory.

use super::cone::{Cone, ConeRows, PositionColumns};
use crate::error::Result;
use crate::layout;
use crate::metadata::{DatasetMetadata, FieldDescriptor};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// An opened catalog: its metadata plus the resolved RA/DEC columns.
///
/// Pixel files are never written after ingestion, so one `Dataset` can
/// serve any number of queries, including from several threads at once.
#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
    metadata: DatasetMetadata,
    columns: PositionColumns,
}

impl Dataset {
    /// Load `metadata.json` from `root` and check it names exactly one RA
    /// and one DEC field.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let metadata = DatasetMetadata::load(root)?;
        Self::from_metadata(root, metadata)
    }

    pub fn from_metadata(root: impl Into<PathBuf>, metadata: DatasetMetadata) -> Result<Self> {
        let columns = PositionColumns::from_metadata(&metadata)?;
        Ok(Self {
            root: root.into(),
            metadata,
            columns,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn nside(&self) -> u32 {
        self.metadata.nside
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.metadata.fields
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    /// Number of pixel files present on disk among the candidates of `cone`.
    pub fn candidate_files(&self, cone: &Cone) -> usize {
        cone.pixels(self.nside())
            .into_iter()
            .filter(|&pix| layout::pixel_path(&self.root, self.nside(), pix).is_file())
            .count()
    }

    /// Lazily stream the rows inside `cone`.
    pub fn cone_search(&self, cone: &Cone) -> ConeRows {
        let pixels = cone.pixels(self.nside());
        tracing::debug!(candidates = pixels.len(), "cone search");
        ConeRows::new(self.root.clone(), self.nside(), *cone, self.columns, pixels)
    }

    /// Collect the rows inside `cone`, scanning candidate pixel files on the
    /// rayon pool. Rows are grouped by ascending pixel number.
    pub fn cone_search_parallel(&self, cone: &Cone) -> Result<Vec<Vec<String>>> {
        let pixels = cone.pixels(self.nside());
        tracing::debug!(candidates = pixels.len(), "parallel cone search");
        let per_pixel: Vec<Vec<Vec<String>>> = pixels
            .par_iter()
            .map(|&pix| {
                ConeRows::new(self.root.clone(), self.nside(), *cone, self.columns, vec![pix])
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<_>>()?;
        Ok(per_pixel.into_iter().flatten().collect())
    }
}
