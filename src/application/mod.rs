pub mod replay;
pub mod sink;
pub mod transcript;

use std::sync::Arc;

use compact_str::CompactString;
use time::{OffsetDateTime, UtcOffset};

use crate::application::sink::TranscriptSink;
use crate::infrastructure::server_impl::response::ResponseConfig;

/// Everything a connection handler needs. Shared read-only across tasks.
#[derive(Debug)]
pub struct ServerData {
    pub response: ResponseConfig,
    pub sink: Arc<TranscriptSink>,
    /// Bound `host:port`, used in URLs when the client sent no `Host`.
    pub authority: CompactString,
    /// Resolved once at startup, while the process is single threaded. `time` will not
    /// read the local offset later, so a DST change while running is not picked up.
    pub local_offset: UtcOffset,
}

impl ServerData {
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.local_offset)
    }
}
