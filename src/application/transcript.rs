//! Transcript blocks. The layout is parsed by replay tooling, keep labels and order stable.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::application::replay;
use crate::domain::request::IncomingRequest;

const REPLAY_INDENT: &str = "    ";

/// Renders one request as a transcript block.
#[derive(Debug)]
pub struct Transcript<'a> {
    request: &'a IncomingRequest,
    url: String,
}

impl<'a> Transcript<'a> {
    /// `fallback_authority` is used for the URL when the client sent no `Host`.
    pub fn new(request: &'a IncomingRequest, fallback_authority: &str) -> Self {
        Self {
            request,
            url: request.url(fallback_authority),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Transcript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let request = self.request;
        let timestamp = request.timestamp_label();
        let body = &request.body;

        writeln!(f, "----- REQUEST START {timestamp} -----")?;
        writeln!(f, "client: {}", request.client_address)?;
        writeln!(f, "method: {}", request.method)?;
        writeln!(f, "path: {}", request.path)?;
        writeln!(f, "url: {}", self.url)?;

        writeln!(f, "headers:")?;
        if request.headers.is_empty() {
            writeln!(f, "  - (none)")?;
        }
        for (name, value) in &request.headers {
            writeln!(f, "  - {name}: {value}")?;
        }

        writeln!(f, "body:")?;
        writeln!(f, "  length: {} bytes", body.len())?;
        writeln!(f, "  utf8: {}", String::from_utf8_lossy(body))?;
        writeln!(f, "  base64: {}", STANDARD.encode(body))?;

        writeln!(f, "replay:")?;
        writeln!(f, "  curl: |")?;
        writeln!(f, "{}", indent(&replay::curl(request, &self.url)))?;
        writeln!(f, "  httpie: |")?;
        writeln!(f, "{}", indent(&replay::httpie(request, &self.url)))?;
        writeln!(f, "  python_requests: |")?;
        writeln!(f, "{}", indent(&replay::python_requests(request, &self.url)))?;
        writeln!(f, "----- REQUEST END {timestamp} -----")
    }
}

/// Prefixes every line that has visible content; blank lines stay blank.
fn indent(text: &str) -> String {
    let mut indented = String::with_capacity(text.len() + 64);
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            indented.push_str(REPLAY_INDENT);
        }
        indented.push_str(line);
    }
    indented
}
