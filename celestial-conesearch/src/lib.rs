//! HEALPix-partitioned point catalogs with cone search.
//!
//! A delimited table of sky positions is ingested once into a directory of
//! small CSV files, one per non-empty nested HEALPix pixel, plus a
//! `metadata.json` describing the columns. A cone search then resolves the
//! query disc to the pixels it can touch, reads only those files and keeps
//! the rows within the radius by exact great-circle distance.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`ingest`] | [`ingest`](ingest::ingest) builder, [`IngestOptions`](ingest::IngestOptions), resolution choice, header sniffing, pixel buffer |
//! | [`query`] | [`Dataset`](query::Dataset), [`Cone`](query::Cone), lazy [`ConeRows`](query::ConeRows), request decoding |
//! | [`healpix`] | Nested pixelization ([`pixelize`](healpix::pixelize)), disc resolution, haversine separation |
//! | [`metadata`] | [`DatasetMetadata`](metadata::DatasetMetadata) and field descriptors |
//! | [`layout`] | Pixel file and metadata paths |
//! | [`votable`] | VOTable 1.1 response and error documents |
//! | [`config`] | `cgi-config.json` service configuration |
//! | [`service`] | One request answered as a VOTable document, for the CGI program |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_conesearch::ingest::{ingest, IngestOptions};
//! use celestial_conesearch::query::{Cone, Dataset};
//!
//! ingest("stars.csv".as_ref(), "catalog".as_ref(), &IngestOptions::new("ra", "dec"))?;
//!
//! let dataset = Dataset::open("catalog")?;
//! for row in dataset.cone_search(&Cone::new(83.633, -5.375, 0.5)?) {
//!     println!("{}", row?.join(","));
//! }
//! ```
//!
//! # On-disk Layout
//!
//! ```text
//! catalog/metadata.json
//! catalog/nside32/dir0/npix4521.csv
//! catalog/nside32/dir10000/npix10007.csv
//! ```
//!
//! # Features
//!
//! - **`cli`** (default): the `conesearch-ingest`, `cone-search` and
//!   `cone-cgi` binaries, and [`logging`].

pub mod config;
pub mod error;
pub mod healpix;
pub mod ingest;
pub mod layout;
#[cfg(feature = "cli")]
pub mod logging;
pub mod metadata;
pub mod query;
pub mod row;
pub mod service;
pub mod votable;

pub use error::{Error, Result};
