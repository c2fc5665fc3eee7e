//! Error type shared by the catalog builder and the cone query engine.
//!
//! | Group | Variants | Effect |
//! |-------|----------|--------|
//! | Configuration | [`ColumnNotFound`](Error::ColumnNotFound), [`ColumnConflict`](Error::ColumnConflict), [`TargetMissing`](Error::TargetMissing), [`TargetNotEmpty`](Error::TargetNotEmpty), [`MetadataMissing`](Error::MetadataMissing), [`MetadataInvalid`](Error::MetadataInvalid), [`MissingRole`](Error::MissingRole), [`DuplicateRole`](Error::DuplicateRole), [`InvalidNside`](Error::InvalidNside), [`ServiceConfigMissing`](Error::ServiceConfigMissing), [`ServiceConfigInvalid`](Error::ServiceConfigInvalid), [`EmptyInput`](Error::EmptyInput) | Operation aborted, no output left behind |
//! | Request | [`MissingParameter`](Error::MissingParameter), [`InvalidParameter`](Error::InvalidParameter), [`OutOfRange`](Error::OutOfRange) | Single request rejected |
//! | Data | [`CorruptPixelRow`](Error::CorruptPixelRow) | Query stream interrupted |
//!
//! Rows rejected during ingestion are not errors; they are counted in
//! [`IngestSummary`](crate::ingest::IngestSummary).

use crate::metadata::Ucd;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not find {role} field \"{column}\"")]
    ColumnNotFound { role: &'static str, column: String },

    #[error("{first} and {second} fields both refer to column {index}")]
    ColumnConflict {
        first: &'static str,
        second: &'static str,
        index: usize,
    },

    #[error("output directory {0:?} does not exist")]
    TargetMissing(PathBuf),

    #[error("output directory {0:?} is not empty")]
    TargetNotEmpty(PathBuf),

    #[error("input {0:?} contains no rows")]
    EmptyInput(PathBuf),

    #[error("invalid nside {0}: must be a power of two between 1 and 2^29")]
    InvalidNside(u32),

    #[error("could not find metadata file {0:?}")]
    MetadataMissing(PathBuf),

    #[error("could not parse metadata file {path:?}: {source}")]
    MetadataInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not find field with ucd='{0}'")]
    MissingRole(Ucd),

    #[error("more than one field with ucd='{0}'")]
    DuplicateRole(Ucd),

    #[error("could not find config file {0:?}")]
    ServiceConfigMissing(PathBuf),

    #[error("could not parse config file {path:?}: {source}")]
    ServiceConfigInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing compulsory parameter {0}")]
    MissingParameter(&'static str),

    #[error("could not parse value '{value}' of {name} parameter as a float")]
    InvalidParameter { name: &'static str, value: String },

    #[error("value for {name} parameter should be in range {range}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
    },

    #[error("{path:?} line {line}: could not read position from row")]
    CorruptPixelRow { path: PathBuf, line: u64 },

    #[error("votable output error: {0}")]
    Render(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by a malformed query request rather than by
    /// the dataset or the service configuration.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::MissingParameter(_) | Error::InvalidParameter { .. } | Error::OutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
