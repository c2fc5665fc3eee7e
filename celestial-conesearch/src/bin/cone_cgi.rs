//! cone-cgi: cone search CGI program
//!
//! Reads `RA`, `DEC` and `SR` from `QUERY_STRING` (or from the request body
//! of a POST), finds the catalog through `cgi-config.json` in the working
//! directory and prints a VOTable. Logs go to stderr only.

use anyhow::Context;
use celestial_conesearch::logging::init_subscriber;
use celestial_conesearch::service::{respond, write_cgi_response};
use std::env;
use std::io::{self, Read};

fn main() -> anyhow::Result<()> {
    init_subscriber(env::var_os("CONESEARCH_DEBUG").is_some());

    let query = read_query()?;
    let dir = env::current_dir().context("Failed to read working directory")?;
    let body = respond(&dir, &query);
    write_cgi_response(io::stdout().lock(), &body)?;
    Ok(())
}

fn read_query() -> anyhow::Result<String> {
    let method = env::var("REQUEST_METHOD").unwrap_or_default();
    if method.eq_ignore_ascii_case("POST") {
        let length: u64 = env::var("CONTENT_LENGTH")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        let mut body = String::new();
        io::stdin()
            .take(length)
            .read_to_string(&mut body)
            .context("Failed to read request body")?;
        return Ok(body);
    }
    Ok(env::var("QUERY_STRING").unwrap_or_default())
}
