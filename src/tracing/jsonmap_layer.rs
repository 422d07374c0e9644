use std::io::Write as _;
use std::sync::Mutex;

use chrono::Local as DateTimeLocal;

use serde_json::value::Value as JsonValue;

use t::span::{Attributes as SpanAttributes, Id as SpanId, Record as TSpanRecord};
use t::{Event as TEvent, Metadata, Subscriber};

use ts::fmt::MakeWriter;
use ts::layer::{Context, Layer as TsLayer};
use ts::registry::{ExtensionsMut, LookupSpan};

use crate::formatter::JsonMapFormatter;
use crate::record::LogRecord;
use crate::tracing::FieldRecord;

/// A [`tracing-subscriber`][mod@ts] [`Layer`][trait@TsLayer] that formats every event with a [`JsonMapFormatter`][struct@JsonMapFormatter]
/// and writes the resulting line to a [`MakeWriter`][trait@MakeWriter].
///
/// Events become [`LogRecord`][struct@LogRecord]s as follows:
/// - `name` : the event target
/// - `levelname` : the event level, e.g. `INFO`
/// - `msg` : the `message` field
/// - `pathname`, `module`, `lineno` : the event call site
/// - `funcName` : the name of the innermost span
/// - `args` : the fields of every span in scope, root first, followed by the event fields, one mapping each
/// - `exc_info` : the first field recorded as an error
///
/// The layer keeps span fields in the span extensions so it needs a [`Registry`][struct@ts::registry::Registry] underneath.
pub struct Layer<W> {
    make_writer: W,
    formatter: Mutex<JsonMapFormatter>,
}

impl<W> Layer<W> {
    pub fn new(make_writer: W) -> Self {
        Self {
            make_writer,
            formatter: Mutex::new(JsonMapFormatter::default()),
        }
    }

    pub fn with_formatter(mut self, formatter: JsonMapFormatter) -> Self {
        self.formatter = Mutex::new(formatter);
        self
    }
}

/// Errors cannot be reported through `tracing` from inside the layer.
fn print_error(message: &str) {
    let now = DateTimeLocal::now();
    let error = format!("{now} -> ERROR : JsonMapLayer -- {message}");
    println!("{error}");
    eprintln!("{error}");
}

fn record_span_fields(extensions: &mut ExtensionsMut<'_>, record: impl FnOnce(&mut FieldRecord)) {
    if let Some(fields) = extensions.get_mut::<FieldRecord>() {
        record(fields);
        return;
    }
    let mut fields = FieldRecord::new();
    record(&mut fields);
    extensions.insert(fields);
}

impl<W> Layer<W>
where
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn event_to_record<S>(&self, event: &TEvent<'_>, ctx: &Context<'_, S>) -> LogRecord
    where
        S: Subscriber,
        S: for<'lookup> LookupSpan<'lookup>,
    {
        let metadata = event.metadata();

        let mut args = Vec::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(span_fields) = extensions.get::<FieldRecord>() {
                    if !span_fields.map.is_empty() {
                        args.push(JsonValue::Object(span_fields.map.clone()));
                    }
                }
            }
        }

        let mut fields = FieldRecord::new();
        event.record(&mut fields);
        let FieldRecord {
            map,
            message,
            error,
        } = fields;
        if !map.is_empty() {
            args.push(JsonValue::Object(map));
        }

        let message = message.unwrap_or_default();
        let mut record = LogRecord::new(metadata.target(), metadata.level().as_str(), &message)
            .with_args(args);
        record.pathname = metadata.file().map(str::to_owned);
        record.module = metadata.module_path().map(str::to_owned);
        record.lineno = metadata.line();
        record.func_name = ctx.event_span(event).map(|span| span.name().to_owned());
        record.exc_info = error;
        record
    }

    fn format(&self, record: &mut LogRecord) -> Option<String> {
        let mut formatter = match self.formatter.lock() {
            Ok(formatter) => formatter,
            Err(poisoned) => {
                print_error("the formatter lock is poisoned, recovering");
                poisoned.into_inner()
            }
        };

        match formatter.format(record) {
            Ok(line) => Some(line),
            Err(err) => {
                print_error(&format!("json serialization error ! --> {err:?}"));
                None
            }
        }
    }

    fn write_line(&self, line: &str, metadata: &Metadata<'_>) {
        let mut writer = self.make_writer.make_writer_for(metadata);
        if let Err(err) = writeln!(writer, "{line}") {
            print_error(&format!("write error ! --> {err:?}"));
        }
    }
}

impl<S, W> TsLayer<S> for Layer<W>
where
    S: Subscriber,
    S: for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_new_span(&self, attributes: &SpanAttributes<'_>, id: &SpanId, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            record_span_fields(&mut span.extensions_mut(), |fields| attributes.record(fields));
        }
    }

    fn on_record(&self, id: &SpanId, values: &TSpanRecord<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            record_span_fields(&mut span.extensions_mut(), |fields| values.record(fields));
        }
    }

    fn on_event(&self, event: &TEvent<'_>, ctx: Context<'_, S>) {
        let mut record = self.event_to_record(event, &ctx);
        if let Some(line) = self.format(&mut record) {
            self.write_line(&line, event.metadata());
        }
    }
}
