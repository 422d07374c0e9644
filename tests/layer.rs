use std::io;
use std::sync::{Arc, Mutex};

use serde_json::json;
use serde_json::value::Value as JsonValue;

use ts::fmt::MakeWriter;
use ts::layer::SubscriberExt as _;

use tracing_jsonmap::tracing::JsonMapLayer;
use tracing_jsonmap::*;

/// Collects the written lines in memory.
#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    fn lines(&self) -> Vec<JsonValue> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Buffer {
    type Writer = Buffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture(formatter: JsonMapFormatter, emit: impl FnOnce()) -> Vec<JsonValue> {
    let buffer = Buffer::default();
    let subscriber =
        ts::registry().with(JsonMapLayer::new(buffer.clone()).with_formatter(formatter));
    t::subscriber::with_default(subscriber, emit);
    buffer.lines()
}

#[test]
fn test_event_with_span_fields() {
    let schema = Schema::new()
        .leaf("time")
        .leaf("levelname")
        .leaf("name")
        .leaf("msg")
        .leaf("funcName");

    let lines = capture(JsonMapFormatter::new().with_schema(schema), || {
        let _span = t::info_span!("handle_request", request_id = 7).entered();
        t::info!(target: "app", user = "bob", "hello {}", "world");
    });

    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert!(line["time"].is_string());
    assert_eq!(line["levelname"], json!("INFO"));
    assert_eq!(line["name"], json!("app"));
    assert_eq!(line["msg"], json!("hello world"));
    assert_eq!(line["funcName"], json!("handle_request"));
    assert_eq!(
        line["extra"]["data"],
        json!({"request_id": 7, "user": "bob"})
    );
}

#[test]
fn test_span_record_updates_fields() {
    let schema = Schema::new().leaf("time").leaf("msg").leaf("status");

    let lines = capture(JsonMapFormatter::new().with_schema(schema), || {
        let span = t::info_span!("job", status = t::field::Empty);
        let _entered = span.enter();
        t::info!("started");
        span.record("status", "done");
        t::info!("finished");
    });

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["status"], json!(""));
    assert_eq!(lines[1]["status"], json!("done"));
    assert_eq!(lines[1]["msg"], json!("finished"));
}

#[test]
fn test_error_field_becomes_exception() {
    let err = "forty two".parse::<u32>().unwrap_err();

    let lines = capture(JsonMapFormatter::new(), || {
        t::error!(
            target: "app",
            error = &err as &(dyn std::error::Error + 'static),
            "parse failed"
        );
    });

    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(line["levelname"], json!("ERROR"));
    assert_eq!(line["msg"], json!("invalid digit found in string"));
    assert_eq!(line["extra"]["exception"]["exctype"], json!("ParseIntError"));
    assert_eq!(
        line["extra"]["exception"]["excvalue"],
        json!(["invalid digit found in string"])
    );
}

#[test]
fn test_events_outside_spans() {
    let schema = Schema::new().leaf("time").leaf("msg").leaf("funcName");
    let formatter = JsonMapFormatter::new().with_schema(schema).with_strip(true);

    let lines = capture(formatter, || t::warn!(attempt = 3, "retrying"));

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["msg"], json!("retrying"));
    assert!(lines[0].get("funcName").is_none());
    assert_eq!(lines[0]["extra"]["data"], json!({"attempt": 3}));
}
