use chrono::{DateTime, TimeZone, Utc};

use indexmap::IndexMap;

use serde_json::json;
use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

use tracing_jsonmap::formatter::auxiliary::TimeFormat;
use tracing_jsonmap::formatter::text::TextFormatter;
use tracing_jsonmap::record::ExcInfo;
use tracing_jsonmap::template::FormatStyle;
use tracing_jsonmap::*;

const TIME: &str = "2024-05-01 13:45:12,042";

fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 45, 12).unwrap() + chrono::Duration::milliseconds(42)
}

fn formatter(schema: Schema) -> JsonMapFormatter {
    let utc = TimeFormat::new()
        .with_timezone_name("UTC")
        .expect("UTC is a known timezone");
    JsonMapFormatter::new().with_schema(schema).with_time_format(utc)
}

fn record(levelname: &str, msg: &str) -> LogRecord {
    LogRecord::new("app", levelname, msg).with_created(created())
}

fn scenario_schema() -> Schema {
    Schema::new()
        .leaf("time")
        .leaf("levelname")
        .leaf("msg")
        .branch("extra", Schema::new().leaf("funcName").leaf("lineno"))
}

fn document(line: &str) -> JsonValue {
    serde_json::from_str(line).expect("the formatter emits json")
}

#[test]
fn test_fills_schema() -> Result<(), JsonMapError> {
    let mut formatter = formatter(scenario_schema());
    let mut record = record("INFO", "hello")
        .with_func_name("handle")
        .with_lineno(42);

    let line = formatter.format(&mut record)?;
    assert_eq!(
        document(&line),
        json!({
            "time": TIME,
            "levelname": "INFO",
            "msg": "hello",
            "extra": {"funcName": "handle", "lineno": 42}
        })
    );
    Ok(())
}

#[test]
fn test_strip_removes_empty_branch() -> Result<(), JsonMapError> {
    let mut formatter = formatter(scenario_schema()).with_strip(true);
    let line = formatter.format(&mut record("INFO", "hello"))?;

    let document = document(&line);
    assert_eq!(
        document,
        json!({"time": TIME, "levelname": "INFO", "msg": "hello"})
    );
    assert!(document.get("extra").is_none());
    Ok(())
}

#[test]
fn test_sentinel_marks_absent_values() {
    let formatter = formatter(scenario_schema()).with_null(json!("-"));
    let tree = formatter.build_tree(&record("INFO", "").with_lineno(3));

    // an empty message is a value, only absent fields get the sentinel
    assert_eq!(tree["msg"], json!(""));
    assert_eq!(tree["extra"]["funcName"], json!("-"));
    assert_eq!(tree["extra"]["lineno"], json!(3));
}

#[test]
fn test_default_schema() -> Result<(), JsonMapError> {
    let mut formatter = formatter(Schema::default());
    let mut record = record("INFO", "hello")
        .with_pathname("src/main.rs")
        .with_func_name("handle")
        .with_lineno(42);

    let line = formatter.format(&mut record)?;
    assert_eq!(
        document(&line),
        json!({
            "time": TIME,
            "levelname": "INFO",
            "name": "app",
            "msg": "hello",
            "extra": {
                "funcName": "handle",
                "lineno": 42,
                "pathname": "src/main.rs",
                "exception": {"exctype": "", "excvalue": "", "exctrace": ""}
            }
        })
    );
    Ok(())
}

#[test]
fn test_exception_value_becomes_message() -> Result<(), JsonMapError> {
    let mut formatter = formatter(Schema::default());
    let mut record = record("ERROR", "saving failed")
        .with_exc_info(ExcInfo::new("ValueError", vec![json!("boom")]));

    let line = formatter.format(&mut record)?;
    let document = document(&line);
    assert_eq!(document["msg"], json!("boom"));
    assert_eq!(
        document["extra"]["exception"],
        json!({
            "exctype": "ValueError",
            "excvalue": ["boom"],
            "exctrace": "Traceback (most recent call last):\nValueError: boom"
        })
    );
    // the trace is not appended to the line a second time
    assert!(!line.contains('\n'));
    assert!(record.exc_info.is_none());
    Ok(())
}

#[test]
fn test_exception_without_arguments_uses_type_name() -> Result<(), JsonMapError> {
    let mut formatter = formatter(Schema::default());
    let mut record = record("ERROR", "lookup failed").with_exc_info(ExcInfo::new("KeyError", vec![]));

    let document = document(&formatter.format(&mut record)?);
    assert_eq!(document["msg"], json!("KeyError"));
    assert_eq!(document["extra"]["exception"]["excvalue"], json!([]));
    Ok(())
}

#[test]
fn test_merge_orders() {
    let schema = Schema::new().leaf("time").leaf("user");
    let record = record("INFO", "hi").with_args(vec![json!({"time": "from args", "user": "bob"})]);

    let auxiliary_first = formatter(schema.clone()).with_merge_order(MergeOrder::AuxiliaryFirst);
    assert_eq!(
        JsonValue::Object(auxiliary_first.build_tree(&record)),
        json!({"time": "from args", "user": "bob"})
    );

    let arguments_first = formatter(schema).with_merge_order(MergeOrder::ArgumentsFirst);
    assert_eq!(
        JsonValue::Object(arguments_first.build_tree(&record)),
        json!({"time": TIME, "user": "bob"})
    );
}

#[test]
fn test_overflow_is_complete_without_duplicates() {
    let formatter = formatter(Schema::new().leaf("time").leaf("msg").leaf("user"));
    let record = record("INFO", "order placed")
        .with_args(vec![
            json!({"user": "bob", "order": 17}),
            json!(7),
            json!({"cart": ["apple"]}),
            json!("x"),
        ])
        .with_extra("request_id", json!("r-1"));

    let tree = formatter.build_tree(&record);
    assert_eq!(
        JsonValue::Object(tree),
        json!({
            "time": TIME,
            "msg": "order placed",
            "user": "bob",
            "extra": {"data": {"order": 17, "cart": ["apple"], "args": [7, "x"]}}
        })
    );
}

#[test]
fn test_custom_overflow_paths() {
    let formatter = formatter(Schema::new().leaf("time"))
        .with_extra_keys(vec!["context".to_owned()])
        .with_args_key(vec!["positional".to_owned(), "values".to_owned()]);
    let record = record("INFO", "hi").with_args(vec![json!({"user": "bob"}), json!(1)]);

    assert_eq!(
        JsonValue::Object(formatter.build_tree(&record)),
        json!({"time": TIME, "context": {"user": "bob", "positional": {"values": [1]}}})
    );
}

#[test]
fn test_schema_placed_extra_node_is_merged() {
    let schema = Schema::new()
        .leaf("time")
        .branch("extra", Schema::new().branch("data", Schema::new().leaf("user")));
    let formatter = formatter(schema);
    let record = record("INFO", "hi").with_args(vec![json!({"user": "bob", "order": 1})]);

    assert_eq!(
        JsonValue::Object(formatter.build_tree(&record)),
        json!({"time": TIME, "extra": {"data": {"user": "bob", "order": 1}}})
    );
}

#[test]
fn test_document_round_trip() -> Result<(), JsonMapError> {
    let formatter = formatter(Schema::default());
    let record = record("WARNING", "disk almost full")
        .with_lineno(9)
        .with_args(vec![json!({"free": 0.125, "big": 12345678901234567890u64}), json!(true)]);

    let tree = formatter.build_tree(&record);
    let document = formatter.to_document(&tree)?;
    let parsed: JsonMap<String, JsonValue> = serde_json::from_str(&document)?;
    assert_eq!(parsed, tree);
    assert_eq!(
        parsed.keys().collect::<Vec<_>>(),
        tree.keys().collect::<Vec<_>>()
    );
    Ok(())
}

#[test]
fn test_remapped_keys() -> Result<(), JsonMapError> {
    let mut remap = IndexMap::new();
    remap.insert("msg".to_owned(), "message".to_owned());
    remap.insert("levelname".to_owned(), "level".to_owned());
    let mut formatter = formatter(Schema::new().leaf("levelname").leaf("msg").leaf("time"))
        .with_remap(Some(remap));

    let line = formatter.format(&mut record("INFO", "hello"))?;
    assert_eq!(
        document(&line),
        json!({"level": "INFO", "message": "hello", "time": TIME})
    );
    Ok(())
}

#[test]
fn test_fresh_tree_per_record() -> Result<(), JsonMapError> {
    let mut formatter = formatter(Schema::new().leaf("time").leaf("msg"));
    let first = formatter.format(&mut record("INFO", "first"))?;
    let second = formatter.format(&mut record("INFO", "second"))?;
    assert_eq!(document(&first)["msg"], json!("first"));
    assert_eq!(document(&second)["msg"], json!("second"));
    Ok(())
}

#[test]
fn test_reuse_tree() -> Result<(), JsonMapError> {
    let mut formatter = formatter(Schema::new().leaf("time").leaf("msg")).with_reuse_tree(true);
    let first = formatter.format(&mut record("INFO", "first"))?;
    let mut later = record("ERROR", "second");
    let second = formatter.format(&mut later)?;
    assert_eq!(first, second);
    assert_eq!(later.msg, first);
    Ok(())
}

#[test]
fn test_text_layer_wraps_document() -> Result<(), JsonMapError> {
    let text = TextFormatter::new("{asctime} {levelname:<7} {message}", FormatStyle::Brace);
    let mut formatter = formatter(Schema::new().leaf("time").leaf("msg")).with_text(text);

    let line = formatter.format(&mut record("INFO", "hello"))?;
    assert_eq!(
        line,
        format!(r#"{TIME} INFO    {{"time":"{TIME}","msg":"hello"}}"#)
    );
    Ok(())
}
