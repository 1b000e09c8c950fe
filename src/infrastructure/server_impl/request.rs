use crate::infrastructure::server_impl::server::{latin1, Header, Method};
use enum_map::EnumMap;

/// Request head borrowed from the read buffer.
#[derive(Debug)]
pub struct Request<'a> {
    pub method: Method,
    pub resource: &'a str,
    /// Every header as received, duplicates included.
    pub headers: Vec<(&'a str, &'a [u8])>,
    /// First occurrence of each header the receiver cares about.
    pub known: EnumMap<Header, Option<&'a [u8]>>,
    /// Offset of the first body byte in the buffer.
    pub head_len: usize,
}

impl Request<'_> {
    /// Declared body length. Missing, non-numeric and non-positive values all mean "no body".
    pub fn content_length(&self) -> usize {
        self.known[Header::CONTENT_LENGTH]
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|length| usize::try_from(length).ok())
            .unwrap_or(0)
    }

    /// Owned copy of the header list, values decoded as Latin-1.
    pub fn owned_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| ((*name).to_owned(), latin1(value)))
            .collect()
    }
}
