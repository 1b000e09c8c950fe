//! Replay renderings: text that reproduces a logged request with curl, HTTPie or python-requests.

use std::borrow::Cow;
use std::fmt::Write;

use memchr::memchr;

use crate::domain::request::IncomingRequest;

/// Body as it should be handed to a command line client.
#[derive(Debug, PartialEq, Eq)]
enum CliBody<'a> {
    Utf8(&'a str),
    /// One char per byte, so the shell passes the exact octets back out.
    Latin1(String),
}

impl<'a> CliBody<'a> {
    fn from_bytes(body: &'a [u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }

        let decoded = match std::str::from_utf8(body) {
            Ok(text) => Self::Utf8(text),
            Err(_) => Self::Latin1(body.iter().map(|&b| char::from(b)).collect()),
        };
        Some(decoded)
    }

    fn text(&self) -> &str {
        match self {
            Self::Utf8(text) => text,
            Self::Latin1(text) => text.as_str(),
        }
    }
}

/// Single-quote `value` for a POSIX shell: `'` becomes `'\''`.
pub fn shell_quote(value: &str) -> String {
    if memchr(b'\'', value.as_bytes()).is_none() {
        return format!("'{value}'");
    }

    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Leaves plain words alone and quotes anything a shell would interpret.
fn shell_word(value: &str) -> Cow<'_, str> {
    let plain = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"_@%+=:,./-".contains(&b));

    if plain {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(shell_quote(value))
    }
}

pub fn curl(request: &IncomingRequest, url: &str) -> String {
    let mut parts: Vec<Cow<'_, str>> = vec!["curl".into(), "-i".into(), "-X".into()];
    parts.push(shell_word(&request.method));

    for (name, value) in &request.headers {
        parts.push("-H".into());
        parts.push(shell_quote(&format!("{name}: {value}")).into());
    }

    match CliBody::from_bytes(&request.body) {
        Some(body @ CliBody::Utf8(_)) => {
            parts.push("--data-raw".into());
            parts.push(shell_quote(body.text()).into());
        }
        Some(body @ CliBody::Latin1(_)) => {
            parts.push("--data-binary".into());
            parts.push(shell_quote(body.text()).into());
        }
        None => {}
    }

    parts.push(shell_quote(url).into());
    parts.join(" ")
}

pub fn httpie(request: &IncomingRequest, url: &str) -> String {
    let mut parts: Vec<Cow<'_, str>> = vec!["http".into(), "-v".into()];
    parts.push(shell_word(&request.method));
    parts.push(shell_quote(url).into());

    for (name, value) in &request.headers {
        parts.push(shell_quote(&format!("{name}:{value}")).into());
    }

    if let Some(body) = CliBody::from_bytes(&request.body) {
        parts.push("--raw".into());
        parts.push(shell_quote(body.text()).into());
    }

    parts.join(" ")
}

/// Illustrative python-requests script. Invalid UTF-8 shows up as `\xNN` text.
pub fn python_requests(request: &IncomingRequest, url: &str) -> String {
    let mut snippet = String::with_capacity(256);
    let url = py_str(url);
    let headers = py_dict(&merged_headers(&request.headers));
    let data = py_str(&backslash_replace(&request.body));
    let method = py_str(&request.method);

    // writing into a String cannot fail
    let _ = write!(
        snippet,
        "import requests\n\
         \n\
         url = {url}\n\
         headers = {headers}\n\
         data = {data}\n\
         \n\
         resp = requests.request({method}, url, headers=headers, data=data)\n\
         print(resp.status_code)\n\
         print(resp.text)"
    );

    snippet
}

/// A dict cannot hold repeated keys, so repeated headers are folded into one comma separated value.
fn merged_headers(headers: &[(String, String)]) -> Vec<(&str, String)> {
    let mut merged: Vec<(&str, String)> = Vec::with_capacity(headers.len());
    for (name, value) in headers {
        match merged
            .iter_mut()
            .find(|(seen, _)| unicase::eq_ascii(*seen, name.as_str()))
        {
            Some((_, joined)) => {
                joined.push_str(", ");
                joined.push_str(value);
            }
            None => merged.push((name.as_str(), value.clone())),
        }
    }
    merged
}

/// Lossless UTF-8 text where possible; every invalid byte becomes the four chars `\xNN`.
fn backslash_replace(body: &[u8]) -> String {
    let mut text = String::with_capacity(body.len());
    for chunk in body.utf8_chunks() {
        text.push_str(chunk.valid());
        for byte in chunk.invalid() {
            let _ = write!(text, "\\x{byte:02x}");
        }
    }
    text
}

fn py_dict(entries: &[(&str, String)]) -> String {
    let body = entries
        .iter()
        .map(|(key, value)| format!("{}: {}", py_str(key), py_str(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

/// Python string literal with `repr()` quoting.
fn py_str(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut literal = String::with_capacity(value.len() + 2);
    literal.push(quote);
    for c in value.chars() {
        match c {
            '\\' => literal.push_str(r"\\"),
            '\n' => literal.push_str(r"\n"),
            '\r' => literal.push_str(r"\r"),
            '\t' => literal.push_str(r"\t"),
            c if c == quote => {
                literal.push('\\');
                literal.push(c);
            }
            c if (c as u32) < 0x20 || ('\u{7f}'..='\u{a0}').contains(&c) || c == '\u{ad}' => {
                let _ = write!(literal, "\\x{:02x}", c as u32);
            }
            // separators and format characters; unassigned code points still pass through
            '\u{61c}'
            | '\u{1680}'
            | '\u{180e}'
            | '\u{2000}'..='\u{200f}'
            | '\u{2028}'..='\u{202f}'
            | '\u{205f}'..='\u{2064}'
            | '\u{2066}'..='\u{206f}'
            | '\u{3000}'
            | '\u{e000}'..='\u{f8ff}'
            | '\u{feff}'
            | '\u{fff9}'..='\u{fffb}' => {
                let _ = write!(literal, "\\u{:04x}", c as u32);
            }
            c => literal.push(c),
        }
    }
    literal.push(quote);
    literal
}
