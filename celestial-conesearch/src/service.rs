//! One cone search request served end to end, as the CGI program does it.

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::query::{ConeRequest, Dataset};
use crate::votable::{self, write_error, write_votable};
use std::io::Write;
use std::path::Path;

/// Answer `query_string` for the service running in `dir`.
///
/// Always produces a VOTable document: the matching rows, or a single
/// error `INFO` when the configuration, the request or a pixel file is bad.
pub fn respond(dir: &Path, query_string: &str) -> Vec<u8> {
    match render(dir, query_string) {
        Ok(body) => body,
        Err(e) => {
            if e.is_request_error() {
                tracing::debug!(error = %e, "rejected request");
            } else {
                tracing::warn!(error = %e, "service error");
            }
            let mut body = Vec::new();
            let _ = write_error(&mut body, &error_message(&e));
            body
        }
    }
}

fn render(dir: &Path, query_string: &str) -> Result<Vec<u8>> {
    let config = ServiceConfig::locate(dir)?;
    let dataset = Dataset::open(&config.data_path)?;
    let cone = ConeRequest::from_query_string(query_string)?.cone()?;

    let mut body = Vec::new();
    let rows = write_votable(&mut body, dataset.fields(), dataset.cone_search(&cone))?;
    tracing::debug!(
        ra = cone.ra_deg(),
        dec = cone.dec_deg(),
        radius = cone.radius_deg(),
        rows,
        "served cone search"
    );
    Ok(body)
}

fn error_message(e: &Error) -> String {
    let message = e.to_string();
    let mut chars = message.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => message.clone(),
    };
    if e.is_request_error() {
        capitalized
    } else {
        format!("Service error: {}", message)
    }
}

/// Write the CGI response header followed by `body`.
pub fn write_cgi_response<W: Write>(mut out: W, body: &[u8]) -> Result<()> {
    write!(out, "Content-type: {}\n\n", votable::CONTENT_TYPE)?;
    out.write_all(body)?;
    out.flush()?;
    Ok(())
}
