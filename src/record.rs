use crate::types::InboundEvent;
use axum::http::HeaderMap;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

const DELIMITER_WIDTH: usize = 50;

/// Materialize request headers as a JSON object. The first value wins for
/// repeated names.
pub fn capture_headers(headers: &HeaderMap) -> Map<String, Value> {
    let mut map = Map::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string()).or_insert_with(|| {
            Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned())
        });
    }
    map
}

/// Format the printed block for one event.
pub fn format_record(event: &InboundEvent) -> String {
    let delimiter = "=".repeat(DELIMITER_WIDTH);
    let headers = serde_json::to_string_pretty(&event.headers).unwrap_or_else(|_| "{}".into());

    format!(
        "\n{delimiter}\n\
         ⏰ EVENT RECEIVED AT: {received}\n\
         🔗 PATH: {path}\n\
         🔄 METHOD: {method}\n\
         📝 HEADERS: {headers}\n\
         📦 PAYLOAD: {payload}\n\
         {delimiter}\n\n",
        received = event.received_at.format("%Y-%m-%d %H:%M:%S"),
        path = event.path,
        method = event.method,
        payload = event.payload.pretty(),
    )
}

/// Destination for formatted records, stdout unless replaced.
///
/// Each record is written with a single `write_all` while the lock is held,
/// so concurrent handlers never interleave their blocks.
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl EventLog {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn emit(&self, event: &InboundEvent) -> io::Result<()> {
        let record = format_record(event);
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| io::Error::other("event log lock poisoned"))?;
        sink.write_all(record.as_bytes())?;
        sink.flush()
    }
}
