use std::str::FromStr;

use enum_map::{Enum, EnumMap};
use httparse::{ParserConfig, Status};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::domain::errors::RequestError;
use crate::infrastructure::server_impl::request::Request;

/// Same ceiling as the header count accepted by most stdlib HTTP servers.
pub const MAX_HEADERS: usize = 100;

/// Upper bound for request line plus header block.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Headers the receiver has to look at. Everything else is only carried along.
#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, IntoStaticStr, EnumIter)]
#[non_exhaustive]
pub enum Header {
    #[strum(serialize = "content-length")]
    CONTENT_LENGTH,
}

impl FromStr for Header {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::iter().find(|c| unicase::eq(c.into(), s)).ok_or(())
    }
}

/// Request method. Any token the parser accepts is kept, known verbs get their own variant.
#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Eq, EnumString, IntoStaticStr)]
pub enum Method {
    CONNECT,
    DELETE,
    GET,
    HEAD,
    OPTIONS,
    PATCH,
    POST,
    PUT,
    TRACE,
    #[strum(default)]
    Extension(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Extension(token) => token,
            known => known.into(),
        }
    }

    /// Known verbs map to their variant, any other token is kept verbatim.
    pub fn from_token(token: &str) -> Self {
        token
            .parse::<Method>()
            .unwrap_or_else(|_| Method::Extension(token.to_owned()))
    }
}

/// Header values are opaque octets; map them one byte per char so nothing gets lost.
pub fn latin1(value: &[u8]) -> String {
    value.iter().map(|&b| char::from(b)).collect()
}

/// Parses the request line and header block out of `buffer`.
///
/// Returns `Ok(None)` while the header block is still incomplete, so the caller can
/// read more bytes and try again. The body is not touched, see [Request::head_len].
pub fn parse_http(buffer: &[u8]) -> Result<Option<Request<'_>>, RequestError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    let status = ParserConfig::default().parse_request(&mut req, buffer)?;

    let head_len = match status {
        Status::Complete(idx) if idx > MAX_HEAD_BYTES => return Err(RequestError::HeadTooLarge),
        Status::Complete(idx) => idx,
        Status::Partial if buffer.len() > MAX_HEAD_BYTES => return Err(RequestError::HeadTooLarge),
        Status::Partial => return Ok(None),
    };

    // a complete parse always fills both of these
    let (Some(method), Some(resource)) = (req.method, req.path) else {
        return Err(RequestError::Malformed(httparse::Error::Token));
    };

    let mut known: EnumMap<Header, Option<&[u8]>> = EnumMap::default();
    let mut all = Vec::with_capacity(req.headers.len());
    for header in req.headers.iter() {
        if let Ok(name) = Header::from_str(header.name) {
            known[name].get_or_insert(header.value);
        }
        all.push((header.name, header.value));
    }

    Ok(Some(Request {
        method: Method::from_token(method),
        resource,
        headers: all,
        known,
        head_len,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_body() {
        let sample = b"POST /submit HTTP/1.1\r\nHost: ifconfig.me\r\nContent-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"a\":1}";

        let request = parse_http(sample).unwrap().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.resource, "/submit");
        assert_eq!(request.known[Header::CONTENT_LENGTH], Some(&b"7"[..]));
        assert_eq!(request.content_length(), 7);
        assert_eq!(&sample[request.head_len..], br#"{"a":1}"#);
    }

    #[test]
    fn success_without_body() {
        let sample = b"GET /status?x=1 HTTP/1.1\r\nHost: example.com:6565\r\nUser-Agent: curl/8.5.0\r\nAccept: */*\r\n\r\n";

        let request = parse_http(sample).unwrap().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.resource, "/status?x=1");
        assert_eq!(request.headers[0], ("Host", &b"example.com:6565"[..]));
        assert_eq!(request.content_length(), 0);
        assert_eq!(request.head_len, sample.len());
    }

    #[test]
    fn partial_head_asks_for_more() {
        let sample = b"GET / HTTP/1.1\r\nHost: exam";
        assert!(parse_http(sample).unwrap().is_none());
    }

    #[test]
    fn oversized_head_is_rejected() {
        let mut sample = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        sample.resize(MAX_HEAD_BYTES + 1, b'a');

        assert!(matches!(
            parse_http(&sample),
            Err(RequestError::HeadTooLarge)
        ));
    }

    #[test]
    fn complete_head_over_the_limit_is_rejected() {
        let mut sample = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        sample.resize(MAX_HEAD_BYTES + 16, b'a');
        sample.extend_from_slice(b"\r\n\r\n");

        assert!(matches!(
            parse_http(&sample),
            Err(RequestError::HeadTooLarge)
        ));
    }

    #[test]
    fn garbage_request_line_is_malformed() {
        let sample = b"\x01\x02 nonsense\r\n\r\n";
        assert!(matches!(
            parse_http(sample),
            Err(RequestError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_methods_are_kept_verbatim() {
        let sample = b"PROPFIND /dav HTTP/1.1\r\n\r\n";
        let request = parse_http(sample).unwrap().unwrap();
        assert_eq!(request.method, Method::Extension("PROPFIND".into()));
        assert_eq!(request.method.as_str(), "PROPFIND");
        assert_eq!(Method::from_token("get"), Method::Extension("get".into()));
        assert_eq!(Method::from_token("DELETE"), Method::DELETE);
    }

    #[test]
    fn headers_keep_order_and_duplicates() {
        let sample = b"POST / HTTP/1.1\r\nX-Tag: one\r\ncontent-length: 3\r\nX-Tag: two\r\nContent-Length: 9\r\n\r\n";
        let request = parse_http(sample).unwrap().unwrap();

        let names: Vec<_> = request.headers.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["X-Tag", "content-length", "X-Tag", "Content-Length"]);
        // lookups see the first occurrence, case-insensitively
        assert_eq!(request.content_length(), 3);
    }

    #[test]
    fn content_length_fallbacks() {
        fn parse(raw: &[u8]) -> usize {
            parse_http(raw).unwrap().unwrap().content_length()
        }

        assert_eq!(parse(b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n"), 0);
        assert_eq!(parse(b"POST / HTTP/1.1\r\nContent-Length: -5\r\n\r\n"), 0);
        assert_eq!(parse(b"POST / HTTP/1.1\r\nContent-Length:  12 \r\n\r\n"), 12);
        assert_eq!(parse(b"POST / HTTP/1.1\r\n\r\n"), 0);
    }

    #[test]
    fn header_values_decode_as_latin1() {
        assert_eq!(latin1(b"caf\xe9"), "caf\u{e9}");
        assert_eq!(Header::from_str("CONTENT-LENGTH"), Ok(Header::CONTENT_LENGTH));
        assert_eq!(Header::from_str("x-other"), Err(()));
    }
}
