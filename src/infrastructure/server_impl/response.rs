use std::fmt::Write;
use std::time::SystemTime;

use bytes::{BufMut, Bytes, BytesMut};
use compact_str::CompactString;
use strum::{EnumMessage, IntoStaticStr};

pub const SERVER_NAME: &str = "LogServer/1.0";

#[allow(clippy::upper_case_acronyms, non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoStaticStr, EnumMessage)]
pub enum StatusCode {
    #[strum(serialize = "200", message = "OK")]
    Ok,
    #[strum(serialize = "400", message = "Bad Request")]
    BadRequest,
}

/// Body and content type handed out for every request. Built once at startup.
#[derive(Debug, Clone)]
pub struct ResponseConfig {
    pub body: Bytes,
    pub content_type: CompactString,
}

impl ResponseConfig {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<CompactString>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    pub fn to_response(&self) -> Response {
        Response {
            status_code: StatusCode::Ok,
            content_type: Some(self.content_type.clone()),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    pub status_code: StatusCode,
    pub content_type: Option<CompactString>,
    pub body: Bytes,
}

impl Response {
    pub fn from_status_code(value: StatusCode) -> Self {
        Self {
            status_code: value,
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Serializes status line, headers and body. One request per connection, so always `close`.
    pub fn into_http(self) -> Bytes {
        let mut head = String::with_capacity(160);
        let status_code: &str = self.status_code.into();
        let status_message = self.status_code.get_message().unwrap_or_default();
        let date = httpdate::fmt_http_date(SystemTime::now());
        let length = self.body.len();

        // writing into a String cannot fail
        let _ = write!(
            head,
            "HTTP/1.1 {status_code} {status_message}\r\n\
             Server: {SERVER_NAME}\r\n\
             Date: {date}\r\n\
             Connection: close\r\n"
        );
        if let Some(content_type) = &self.content_type {
            let _ = write!(head, "Content-Type: {content_type}\r\n");
        }
        let _ = write!(head, "Content-Length: {length}\r\n\r\n");

        let mut buf = BytesMut::with_capacity(head.len() + length);
        buf.put_slice(head.as_bytes());
        buf.put_slice(&self.body);
        buf.freeze()
    }
}
