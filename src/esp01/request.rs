//! Extraction of client id, method and path from an `+IPD` notification.
//!
//! ```text
//! +IPD,<id>,<len>:<METHOD> <path> HTTP/1.1
//! ```
//!
//! Parsing is a handful of delimiter searches over the matched slice. Any
//! step that does not find what it expects yields
//! [`AtError::MalformedRequest`] instead of a partial path.

use super::error::{AtError, AtResult};
use super::http::Method;
use super::matcher::find;
use super::state::ClientId;
use heapless::String;

pub const PATH_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParsedRequest {
    pub client: ClientId,
    pub method: Method,
    pub path: String<PATH_CAPACITY>,
}

/// Bytes following the first occurrence of `token`.
fn after<'a>(bytes: &'a [u8], token: &[u8]) -> Option<&'a [u8]> {
    find(bytes, token).map(|at| &bytes[at + token.len()..])
}

fn split_once(bytes: &[u8], delimiter: u8) -> Option<(&[u8], &[u8])> {
    let at = bytes.iter().position(|&b| b == delimiter)?;
    Some((&bytes[..at], &bytes[at + 1..]))
}

fn trim_spaces(mut bytes: &[u8]) -> &[u8] {
    while let [b' ', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' '] = bytes {
        bytes = rest;
    }
    bytes
}

pub fn parse_request(slice: &[u8]) -> AtResult<ParsedRequest> {
    parse(slice).ok_or(AtError::MalformedRequest)
}

fn parse(slice: &[u8]) -> Option<ParsedRequest> {
    let header = after(slice, b"+IPD,")?;

    let (id, header) = split_once(header, b',')?;
    let client = match id {
        [digit] => ClientId::from_ascii(*digit)?,
        _ => return None,
    };

    let (length, payload) = split_once(header, b':')?;
    if length.is_empty() || !length.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let (verb, rest) = split_once(payload, b' ')?;
    let method = Method::from_token(verb)?;

    // Paths may contain "HTTP"; the version token is the first " HTTP/"
    let version = find(rest, b" HTTP/")?;
    let path = trim_spaces(&rest[..version]);
    if path.is_empty() || path.contains(&b' ') {
        return None;
    }

    let mut owned = String::new();
    owned.push_str(core::str::from_utf8(path).ok()?).ok()?;

    Some(ParsedRequest {
        client,
        method,
        path: owned,
    })
}
