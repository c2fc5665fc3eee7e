//! Decoding cone search requests.
//!
//! A request carries `RA`, `DEC` and `SR` in decimal degrees. Checks run in
//! three passes so the first reported problem is stable: all parameters
//! present, then each parses as a float, then each is in range.

use super::cone::Cone;
use crate::error::{Error, Result};

const PARAMETERS: [&str; 3] = ["RA", "DEC", "SR"];

/// Raw parameter values of one cone search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConeRequest {
    pub ra: String,
    pub dec: String,
    pub sr: String,
}

impl ConeRequest {
    /// Collect `RA`, `DEC` and `SR` from decoded name/value pairs. Names are
    /// case sensitive and the first occurrence of a repeated name wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values: [Option<String>; 3] = [None, None, None];
        for (name, value) in pairs {
            if let Some(i) = PARAMETERS.iter().position(|p| *p == name.as_ref()) {
                values[i].get_or_insert_with(|| value.as_ref().to_string());
            }
        }
        let [ra, dec, sr] = values;
        Ok(Self {
            ra: ra.ok_or(Error::MissingParameter("RA"))?,
            dec: dec.ok_or(Error::MissingParameter("DEC"))?,
            sr: sr.ok_or(Error::MissingParameter("SR"))?,
        })
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    pub fn from_query_string(query: &str) -> Result<Self> {
        Self::from_pairs(parse_query_string(query))
    }

    /// Parse and range-check the values.
    pub fn cone(&self) -> Result<Cone> {
        let ra = parse_float("RA", &self.ra)?;
        let dec = parse_float("DEC", &self.dec)?;
        let sr = parse_float("SR", &self.sr)?;
        Cone::new(ra, dec, sr)
    }
}

fn parse_float(name: &'static str, value: &str) -> Result<f64> {
    value.trim().parse().map_err(|_| Error::InvalidParameter {
        name,
        value: value.to_string(),
    })
}

/// Split a query string into decoded name/value pairs. `+` decodes to a
/// space and `%XX` to the byte it names; malformed escapes pass through.
pub fn parse_query_string(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split(['&', ';'])
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (percent_decode(name), percent_decode(value)),
            None => (percent_decode(pair), String::new()),
        })
        .collect()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                        continue;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
