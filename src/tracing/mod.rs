//! The [`tracing-subscriber`][`ts`] [`Layer`][ts::Layer] that feeds [`tracing`][mod@t] events to a [`JsonMapFormatter`][struct@crate::formatter::JsonMapFormatter].

mod field_record;
mod jsonmap_layer;

pub use field_record::FieldRecord;
pub use jsonmap_layer::Layer as JsonMapLayer;
