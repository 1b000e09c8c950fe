//! Command line flags and the startup work that turns them into a [ResponseConfig].

use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::WrapErr;
use mime_guess::mime;

use crate::infrastructure::server_impl::response::ResponseConfig;
use crate::AnyResult;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 6565;
pub const DEFAULT_LOG_FILE: &str = "requests.log";
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Simple HTTP logger server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Bind host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Bind port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// File whose contents will be returned for every request (read once at startup)
    #[arg(long)]
    pub response_file: PathBuf,

    /// Path to append request logs
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Truncate the log file at startup before writing new entries
    #[arg(long)]
    pub clear_log: bool,

    /// Content-Type for responses. Guessed from the response file when omitted
    #[arg(long)]
    pub content_type: Option<String>,
}

impl ServerArgs {
    /// Reads the response file and settles the content type.
    pub fn load_response(&self) -> AnyResult<ResponseConfig> {
        let body = std::fs::read(&self.response_file).wrap_err_with(|| {
            format!(
                "could not read response file {}",
                self.response_file.display()
            )
        })?;
        let content_type = determine_content_type(&self.response_file, self.content_type.as_deref());
        Ok(ResponseConfig::new(body, content_type))
    }
}

/// Explicit override first, then a guess from the file name. `text/*` guesses get a UTF-8 charset.
pub fn determine_content_type(path: &Path, explicit: Option<&str>) -> String {
    if let Some(content_type) = explicit.filter(|value| !value.is_empty()) {
        return content_type.to_owned();
    }

    let Some(guessed) = mime_guess::from_path(path).first() else {
        return FALLBACK_CONTENT_TYPE.to_owned();
    };

    let mut content_type = guessed.essence_str().to_owned();
    if guessed.type_() == mime::TEXT && guessed.get_param(mime::CHARSET).is_none() {
        content_type.push_str("; charset=utf-8");
    }
    content_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn defaults_match_the_documented_cli() {
        let args = ServerArgs::try_parse_from(["log-server", "--response-file", "body.json"]).unwrap();

        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 6565);
        assert_eq!(args.log_file, PathBuf::from("requests.log"));
        assert!(!args.clear_log);
        assert_eq!(args.content_type, None);
    }

    #[test]
    fn response_file_is_required() {
        assert!(ServerArgs::try_parse_from(["log-server"]).is_err());
    }

    #[test]
    fn all_flags_parse() {
        let args = ServerArgs::try_parse_from([
            "log-server",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--response-file",
            "ok.txt",
            "--log-file",
            "logs/out.log",
            "--clear-log",
            "--content-type",
            "application/xml",
        ])
        .unwrap();

        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 8080);
        assert_eq!(args.log_file, PathBuf::from("logs/out.log"));
        assert!(args.clear_log);
        assert_eq!(args.content_type.as_deref(), Some("application/xml"));
    }

    #[test]
    fn content_type_inference() {
        let guess = |name: &str| determine_content_type(Path::new(name), None);

        assert_eq!(guess("resp.json"), "application/json");
        assert_eq!(guess("page.html"), "text/html; charset=utf-8");
        assert_eq!(guess("notes.txt"), "text/plain; charset=utf-8");
        assert_eq!(guess("no_extension"), FALLBACK_CONTENT_TYPE);
        assert_eq!(
            determine_content_type(Path::new("resp.json"), Some("text/x-custom")),
            "text/x-custom"
        );
    }

    #[test]
    fn load_response_reads_bytes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.bin");
        std::fs::write(&path, b"\x00\x01raw").unwrap();

        let args = ServerArgs::try_parse_from([
            OsString::from("log-server"),
            OsString::from("--response-file"),
            path.into_os_string(),
        ])
        .unwrap();
        let response = args.load_response().unwrap();

        assert_eq!(&response.body[..], b"\x00\x01raw");
        assert_eq!(response.content_type, "application/octet-stream");
    }

    #[test]
    fn missing_response_file_is_fatal() {
        let args = ServerArgs::try_parse_from(["log-server", "--response-file", "/definitely/not/here"])
            .unwrap();
        assert!(args.load_response().is_err());
    }
}
