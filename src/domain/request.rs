use std::net::IpAddr;

use bytes::Bytes;
use compact_str::CompactString;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Local time, second precision, no offset: `2024-03-01T17:05:09`.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// One received request. Lives for the duration of a single connection.
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub method: CompactString,
    /// Raw request target, query and fragment included.
    pub path: String,
    /// Arrival order, names as sent, no deduplication.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub client_address: IpAddr,
    pub timestamp: OffsetDateTime,
}

impl IncomingRequest {
    /// First `Host` header value, matched case-insensitively.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| unicase::eq_ascii(name.as_str(), "host"))
            .map(|(_, value)| value.as_str())
    }

    /// Absolute URL the client most likely used. `fallback` is the bound `host:port`.
    pub fn url(&self, fallback: &str) -> String {
        let authority = self.host().unwrap_or(fallback);
        format!("http://{authority}{}", self.path)
    }

    pub fn timestamp_label(&self) -> String {
        self.timestamp
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| self.timestamp.unix_timestamp().to_string())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::net::Ipv4Addr;
    use time::macros::datetime;

    pub fn request(method: &str, path: &str, headers: &[(&str, &str)], body: &[u8]) -> IncomingRequest {
        IncomingRequest {
            method: method.into(),
            path: path.to_owned(),
            headers: headers
                .iter()
                .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
                .collect(),
            body: Bytes::copy_from_slice(body),
            client_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            timestamp: datetime!(2024-03-01 17:05:09 +1),
        }
    }
}
