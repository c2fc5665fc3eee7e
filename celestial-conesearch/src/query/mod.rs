//! Cone query engine.
//!
//! - [`dataset`]: open a catalog directory, run cone searches against it
//! - [`cone`]: the search cone and the lazy row stream
//! - [`request`]: decode and validate `RA`/`DEC`/`SR` request parameters

pub mod cone;
pub mod dataset;
pub mod request;

pub use cone::{query, Cone, ConeRows};
pub use dataset::Dataset;
pub use request::{parse_query_string, ConeRequest};
