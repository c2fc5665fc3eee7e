//! Dataset metadata: the contract between the builder and the query engine.
//!
//! Stored as `metadata.json` at the dataset root:
//!
//! ```json
//! {
//!     "version": 1,
//!     "creationDate": "2024-05-01 12:00:00.000000",
//!     "nside": 32,
//!     "fields": [
//!         { "name": "ra", "ucd": "POS_EQ_RA_MAIN", "unit": "deg", "datatype": "double" },
//!         { "name": "dec", "ucd": "POS_EQ_DEC_MAIN", "unit": "deg", "datatype": "double" },
//!         { "name": "record_ID", "ucd": "ID_MAIN", "datatype": "char", "arraysize": "*" }
//!     ]
//! }
//! ```

use crate::error::{Error, Result};
use crate::layout;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

pub const METADATA_VERSION: u32 = 1;

/// Semantic role of a column, expressed as a UCD1 tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ucd {
    #[serde(rename = "POS_EQ_RA_MAIN")]
    RaMain,
    #[serde(rename = "POS_EQ_DEC_MAIN")]
    DecMain,
    #[serde(rename = "ID_MAIN")]
    IdMain,
}

impl Ucd {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ucd::RaMain => "POS_EQ_RA_MAIN",
            Ucd::DecMain => "POS_EQ_DEC_MAIN",
            Ucd::IdMain => "ID_MAIN",
        }
    }
}

impl fmt::Display for Ucd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar type of a column, using VOTable datatype names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
    Int,
    Long,
    Double,
    Char,
}

impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Int => "int",
            Datatype::Long => "long",
            Datatype::Double => "double",
            Datatype::Char => "char",
        }
    }

    /// Classify a raw cell: integer, then finite floating point, then text.
    /// `inf` and `nan` spellings are text.
    pub fn infer(value: &str) -> Self {
        let value = value.trim();
        if let Ok(v) = value.parse::<i64>() {
            if i32::try_from(v).is_ok() {
                Datatype::Int
            } else {
                Datatype::Long
            }
        } else if value.parse::<f64>().is_ok_and(f64::is_finite) {
            Datatype::Double
        } else {
            Datatype::Char
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ucd: Option<Ucd>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Datatype>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arraysize: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ucd: None,
            unit: None,
            datatype: None,
            arraysize: None,
        }
    }

    pub fn position(name: impl Into<String>, ucd: Ucd) -> Self {
        Self {
            ucd: Some(ucd),
            unit: Some("deg".into()),
            datatype: Some(Datatype::Double),
            ..Self::new(name)
        }
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            ucd: Some(Ucd::IdMain),
            ..Self::new(name).with_datatype(Datatype::Char)
        }
    }

    /// Set the datatype; text columns get a variable array size.
    pub fn with_datatype(mut self, datatype: Datatype) -> Self {
        self.datatype = Some(datatype);
        self.arraysize = (datatype == Datatype::Char).then(|| "*".to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "creationDate")]
    pub creation_date: String,
    pub nside: u32,
    pub fields: Vec<FieldDescriptor>,
}

fn default_version() -> u32 {
    METADATA_VERSION
}

impl DatasetMetadata {
    /// New metadata stamped with the current time.
    pub fn new(nside: u32, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            version: METADATA_VERSION,
            creation_date: chrono::Utc::now()
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
            nside,
            fields,
        }
    }

    /// Read `metadata.json` from a dataset root.
    pub fn load(root: &Path) -> Result<Self> {
        let path = layout::metadata_path(root);
        if !path.is_file() {
            return Err(Error::MetadataMissing(path));
        }
        let text = fs::read_to_string(&path)?;
        let metadata: Self = serde_json::from_str(&text)
            .map_err(|source| Error::MetadataInvalid { path: path.clone(), source })?;
        if !crate::healpix::is_valid_nside(metadata.nside) {
            return Err(Error::InvalidNside(metadata.nside));
        }
        Ok(metadata)
    }

    /// Write `metadata.json` into a dataset root, four-space indented.
    pub fn save(&self, root: &Path) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser).map_err(std::io::Error::from)?;
        buf.push(b'\n');
        fs::write(layout::metadata_path(root), buf)?;
        Ok(())
    }

    /// Column index of the single field carrying `ucd`.
    pub fn role_index(&self, ucd: Ucd) -> Result<usize> {
        let mut matches = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.ucd == Some(ucd))
            .map(|(i, _)| i);
        let first = matches.next().ok_or(Error::MissingRole(ucd))?;
        if matches.next().is_some() {
            return Err(Error::DuplicateRole(ucd));
        }
        Ok(first)
    }

    /// Column indexes of the RA and DEC fields.
    pub fn position_indices(&self) -> Result<(usize, usize)> {
        Ok((self.role_index(Ucd::RaMain)?, self.role_index(Ucd::DecMain)?))
    }
}
