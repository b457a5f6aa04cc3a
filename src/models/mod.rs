//! Data models shared across the caching engine.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use std::collections::HashMap;

/// Case-insensitive header lookup over a plain header map.
pub(crate) fn header_value<'a>(
    headers: &'a HashMap<String, String>,
    name: &str,
) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
