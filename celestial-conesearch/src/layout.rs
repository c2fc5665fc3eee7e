//! On-disk layout of a pixelized catalog.
//!
//! ```text
//! <root>/metadata.json
//! <root>/nside<N>/dir<D>/npix<A>.csv     D = (A / 10000) * 10000
//! ```

use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";

/// Pixels per shard directory.
pub const SHARD_WIDTH: u64 = 10_000;

pub fn metadata_path(root: &Path) -> PathBuf {
    root.join(METADATA_FILE)
}

/// Path of the pixel file holding address `pix` at resolution `nside`.
pub fn pixel_path(root: &Path, nside: u32, pix: u64) -> PathBuf {
    let shard = (pix / SHARD_WIDTH) * SHARD_WIDTH;
    root.join(format!("nside{}", nside))
        .join(format!("dir{}", shard))
        .join(format!("npix{}.csv", pix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_path_sharding() {
        let root = Path::new("/data/cat");
        assert_eq!(
            pixel_path(root, 32, 42),
            PathBuf::from("/data/cat/nside32/dir0/npix42.csv")
        );
        assert_eq!(
            pixel_path(root, 64, 19_999),
            PathBuf::from("/data/cat/nside64/dir10000/npix19999.csv")
        );
        assert_eq!(
            pixel_path(root, 256, 786_431),
            PathBuf::from("/data/cat/nside256/dir780000/npix786431.csv")
        );
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("cat")),
            PathBuf::from("cat/metadata.json")
        );
    }
}
