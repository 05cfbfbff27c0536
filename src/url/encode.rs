use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters escaped inside a query value: everything but RFC 3986 unreserved
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encodes a search term for use as a query value
///
/// Spaces become `%20`; a literal `+` becomes `%2B` so it survives
/// form-urlencoded decoding.
pub fn encode_term(term: &str) -> String {
    utf8_percent_encode(term, QUERY_VALUE).to_string()
}

/// Percent-encodes a location, writing spaces as a literal `+`
pub fn encode_location(location: &str) -> String {
    location
        .split(' ')
        .map(|part| utf8_percent_encode(part, QUERY_VALUE).to_string())
        .collect::<Vec<_>>()
        .join("+")
}
