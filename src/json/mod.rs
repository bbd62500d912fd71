//! Structured output for decoded saves
//!
//! The decoder emits a stream of events into a [`JsonSink`]. Two sinks are
//! provided: [`JsonWriter`], which streams JSON text to any [`Write`], and
//! [`ValueSink`], which builds a [`serde_json::Value`] tree for consumers that
//! deserialize into their own types.
//!
//! ```
//! use ck3bin::json::{JsonSink, JsonWriter};
//!
//! # fn main() -> Result<(), ck3bin::Error> {
//! let mut writer = JsonWriter::new(Vec::new());
//! writer.begin_object()?;
//! writer.property_name("levels")?;
//! writer.begin_array()?;
//! writer.i32_value(1)?;
//! writer.string_value("1436.1.1")?;
//! writer.end_array()?;
//! writer.end_object()?;
//!
//! let out = writer.into_inner();
//! assert_eq!(out, br#"{"levels":[1,"1436.1.1"]}"#);
//! # Ok(())
//! # }
//! ```

use crate::{Error, ErrorKind};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Map, Number, Value};
use std::io::Write;

/// Receiver of structured output events
///
/// Events arrive in document order. An object alternates between
/// `property_name` and a value (scalar or nested scope).
pub trait JsonSink {
    fn begin_object(&mut self) -> Result<(), Error>;
    fn end_object(&mut self) -> Result<(), Error>;
    fn begin_array(&mut self) -> Result<(), Error>;
    fn end_array(&mut self) -> Result<(), Error>;
    fn property_name(&mut self, name: &str) -> Result<(), Error>;
    fn string_value(&mut self, value: &str) -> Result<(), Error>;
    fn i32_value(&mut self, value: i32) -> Result<(), Error>;
    fn u32_value(&mut self, value: u32) -> Result<(), Error>;
    fn u64_value(&mut self, value: u64) -> Result<(), Error>;
    fn f32_value(&mut self, value: f32) -> Result<(), Error>;
    fn f64_value(&mut self, value: f64) -> Result<(), Error>;
    fn bool_value(&mut self, value: bool) -> Result<(), Error>;
}

impl<S: JsonSink + ?Sized> JsonSink for &mut S {
    fn begin_object(&mut self) -> Result<(), Error> {
        (**self).begin_object()
    }

    fn end_object(&mut self) -> Result<(), Error> {
        (**self).end_object()
    }

    fn begin_array(&mut self) -> Result<(), Error> {
        (**self).begin_array()
    }

    fn end_array(&mut self) -> Result<(), Error> {
        (**self).end_array()
    }

    fn property_name(&mut self, name: &str) -> Result<(), Error> {
        (**self).property_name(name)
    }

    fn string_value(&mut self, value: &str) -> Result<(), Error> {
        (**self).string_value(value)
    }

    fn i32_value(&mut self, value: i32) -> Result<(), Error> {
        (**self).i32_value(value)
    }

    fn u32_value(&mut self, value: u32) -> Result<(), Error> {
        (**self).u32_value(value)
    }

    fn u64_value(&mut self, value: u64) -> Result<(), Error> {
        (**self).u64_value(value)
    }

    fn f32_value(&mut self, value: f32) -> Result<(), Error> {
        (**self).f32_value(value)
    }

    fn f64_value(&mut self, value: f64) -> Result<(), Error> {
        (**self).f64_value(value)
    }

    fn bool_value(&mut self, value: bool) -> Result<(), Error> {
        (**self).bool_value(value)
    }
}

fn sink_error(msg: &str) -> Error {
    Error::new(ErrorKind::Sink(String::from(msg)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Object { first: bool, expect_key: bool },
    Array { first: bool },
}

/// Streams JSON text to a writer
///
/// The order of events is validated so that the output is always well formed
/// or an [`ErrorKind::Sink`] error is raised.
pub struct JsonWriter<W, F = CompactFormatter> {
    writer: W,
    formatter: F,
    scopes: Vec<Scope>,
    root_written: bool,
}

impl<W: Write> JsonWriter<W> {
    /// Minified output
    pub fn new(writer: W) -> Self {
        Self::with_formatter(writer, CompactFormatter)
    }
}

impl<W: Write> JsonWriter<W, PrettyFormatter<'static>> {
    /// Output indented with two spaces
    pub fn pretty(writer: W) -> Self {
        Self::with_formatter(writer, PrettyFormatter::new())
    }
}

impl<W: Write, F: Formatter> JsonWriter<W, F> {
    pub fn with_formatter(writer: W, formatter: F) -> Self {
        JsonWriter {
            writer,
            formatter,
            scopes: Vec::new(),
            root_written: false,
        }
    }

    /// Returns true once a complete top level value has been written
    pub fn is_complete(&self) -> bool {
        self.root_written && self.scopes.is_empty()
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn before_value(&mut self) -> Result<(), Error> {
        match self.scopes.last_mut() {
            None if self.root_written => Err(sink_error("multiple top level values")),
            None => Ok(()),
            Some(Scope::Object {
                expect_key: true, ..
            }) => Err(sink_error("expected property name but received a value")),
            Some(Scope::Object { .. }) => Ok(()),
            Some(Scope::Array { first }) => {
                self.formatter
                    .begin_array_value(&mut self.writer, *first)?;
                *first = false;
                Ok(())
            }
        }
    }

    fn after_value(&mut self) -> Result<(), Error> {
        match self.scopes.last_mut() {
            None => {
                self.root_written = true;
            }
            Some(Scope::Object { expect_key, .. }) => {
                self.formatter.end_object_value(&mut self.writer)?;
                *expect_key = true;
            }
            Some(Scope::Array { .. }) => {
                self.formatter.end_array_value(&mut self.writer)?;
            }
        }
        Ok(())
    }

    fn write_str(&mut self, value: &str) -> Result<(), Error> {
        serde_json::to_writer(&mut self.writer, value)
            .map_err(|e| Error::new(ErrorKind::Io(e.into())))
    }
}

impl<W: Write, F: Formatter> JsonSink for JsonWriter<W, F> {
    fn begin_object(&mut self) -> Result<(), Error> {
        self.before_value()?;
        self.formatter.begin_object(&mut self.writer)?;
        self.scopes.push(Scope::Object {
            first: true,
            expect_key: true,
        });
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), Error> {
        match self.scopes.last() {
            Some(Scope::Object {
                expect_key: true, ..
            }) => {}
            Some(Scope::Object { .. }) => {
                return Err(sink_error("object ended before the property value"))
            }
            _ => return Err(sink_error("end of object without a matching begin")),
        }

        self.scopes.pop();
        self.formatter.end_object(&mut self.writer)?;
        self.after_value()
    }

    fn begin_array(&mut self) -> Result<(), Error> {
        self.before_value()?;
        self.formatter.begin_array(&mut self.writer)?;
        self.scopes.push(Scope::Array { first: true });
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), Error> {
        if !matches!(self.scopes.last(), Some(Scope::Array { .. })) {
            return Err(sink_error("end of array without a matching begin"));
        }

        self.scopes.pop();
        self.formatter.end_array(&mut self.writer)?;
        self.after_value()
    }

    fn property_name(&mut self, name: &str) -> Result<(), Error> {
        let first = match self.scopes.last_mut() {
            Some(Scope::Object { first, expect_key }) if *expect_key => {
                *expect_key = false;
                std::mem::replace(first, false)
            }
            Some(Scope::Object { .. }) => {
                return Err(sink_error("expected a value but received a property name"))
            }
            _ => return Err(sink_error("property name outside of an object")),
        };

        self.formatter.begin_object_key(&mut self.writer, first)?;
        self.write_str(name)?;
        self.formatter.end_object_key(&mut self.writer)?;
        self.formatter.begin_object_value(&mut self.writer)?;
        Ok(())
    }

    fn string_value(&mut self, value: &str) -> Result<(), Error> {
        self.before_value()?;
        self.write_str(value)?;
        self.after_value()
    }

    fn i32_value(&mut self, value: i32) -> Result<(), Error> {
        self.before_value()?;
        let mut buffer = itoa::Buffer::new();
        self.writer.write_all(buffer.format(value).as_bytes())?;
        self.after_value()
    }

    fn u32_value(&mut self, value: u32) -> Result<(), Error> {
        self.before_value()?;
        let mut buffer = itoa::Buffer::new();
        self.writer.write_all(buffer.format(value).as_bytes())?;
        self.after_value()
    }

    fn u64_value(&mut self, value: u64) -> Result<(), Error> {
        self.before_value()?;
        let mut buffer = itoa::Buffer::new();
        self.writer.write_all(buffer.format(value).as_bytes())?;
        self.after_value()
    }

    fn f32_value(&mut self, value: f32) -> Result<(), Error> {
        self.before_value()?;
        if value.is_finite() {
            self.formatter.write_f32(&mut self.writer, value)?;
        } else {
            self.formatter.write_null(&mut self.writer)?;
        }
        self.after_value()
    }

    fn f64_value(&mut self, value: f64) -> Result<(), Error> {
        self.before_value()?;
        if value.is_finite() {
            self.formatter.write_f64(&mut self.writer, value)?;
        } else {
            self.formatter.write_null(&mut self.writer)?;
        }
        self.after_value()
    }

    fn bool_value(&mut self, value: bool) -> Result<(), Error> {
        self.before_value()?;
        self.formatter.write_bool(&mut self.writer, value)?;
        self.after_value()
    }
}

enum Building {
    Object(Map<String, Value>, Option<String>),
    Array(Vec<Value>),
}

/// Builds an in memory [`serde_json::Value`]
///
/// Duplicate keys within an object keep the last value.
///
/// ```
/// use ck3bin::json::{JsonSink, ValueSink};
/// use serde_json::json;
///
/// # fn main() -> Result<(), ck3bin::Error> {
/// let mut sink = ValueSink::new();
/// sink.begin_object()?;
/// sink.property_name("gold")?;
/// sink.f64_value(12.5)?;
/// sink.end_object()?;
/// assert_eq!(sink.into_value()?, json!({"gold": 12.5}));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ValueSink {
    stack: Vec<Building>,
    root: Option<Value>,
}

impl ValueSink {
    pub fn new() -> Self {
        ValueSink::default()
    }

    /// The completed value. Errors if a scope was left open or nothing was
    /// written.
    pub fn into_value(self) -> Result<Value, Error> {
        if !self.stack.is_empty() {
            return Err(sink_error("value requested before all scopes ended"));
        }

        self.root
            .ok_or_else(|| sink_error("value requested before anything was written"))
    }

    fn push_value(&mut self, value: Value) -> Result<(), Error> {
        match self.stack.last_mut() {
            None if self.root.is_some() => Err(sink_error("multiple top level values")),
            None => {
                self.root = Some(value);
                Ok(())
            }
            Some(Building::Array(values)) => {
                values.push(value);
                Ok(())
            }
            Some(Building::Object(map, key)) => match key.take() {
                Some(key) => {
                    map.insert(key, value);
                    Ok(())
                }
                None => Err(sink_error("expected property name but received a value")),
            },
        }
    }
}

impl JsonSink for ValueSink {
    fn begin_object(&mut self) -> Result<(), Error> {
        if let Some(Building::Object(_, None)) = self.stack.last() {
            return Err(sink_error("expected property name but received a value"));
        }

        self.stack.push(Building::Object(Map::new(), None));
        Ok(())
    }

    fn end_object(&mut self) -> Result<(), Error> {
        match self.stack.pop() {
            Some(Building::Object(map, None)) => self.push_value(Value::Object(map)),
            Some(Building::Object(_, Some(_))) => {
                Err(sink_error("object ended before the property value"))
            }
            _ => Err(sink_error("end of object without a matching begin")),
        }
    }

    fn begin_array(&mut self) -> Result<(), Error> {
        if let Some(Building::Object(_, None)) = self.stack.last() {
            return Err(sink_error("expected property name but received a value"));
        }

        self.stack.push(Building::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> Result<(), Error> {
        match self.stack.pop() {
            Some(Building::Array(values)) => self.push_value(Value::Array(values)),
            _ => Err(sink_error("end of array without a matching begin")),
        }
    }

    fn property_name(&mut self, name: &str) -> Result<(), Error> {
        match self.stack.last_mut() {
            Some(Building::Object(_, key)) if key.is_none() => {
                *key = Some(String::from(name));
                Ok(())
            }
            Some(Building::Object(..)) => Err(sink_error(
                "expected a value but received a property name",
            )),
            _ => Err(sink_error("property name outside of an object")),
        }
    }

    fn string_value(&mut self, value: &str) -> Result<(), Error> {
        self.push_value(Value::String(String::from(value)))
    }

    fn i32_value(&mut self, value: i32) -> Result<(), Error> {
        self.push_value(Value::from(value))
    }

    fn u32_value(&mut self, value: u32) -> Result<(), Error> {
        self.push_value(Value::from(value))
    }

    fn u64_value(&mut self, value: u64) -> Result<(), Error> {
        self.push_value(Value::from(value))
    }

    fn f32_value(&mut self, value: f32) -> Result<(), Error> {
        let value = Number::from_f64(f64::from(value)).map_or(Value::Null, Value::Number);
        self.push_value(value)
    }

    fn f64_value(&mut self, value: f64) -> Result<(), Error> {
        let value = Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.push_value(value)
    }

    fn bool_value(&mut self, value: bool) -> Result<(), Error> {
        self.push_value(Value::Bool(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_sample<S: JsonSink>(sink: &mut S) -> Result<(), Error> {
        sink.begin_object()?;
        sink.property_name("checksum")?;
        sink.string_value("SAV\"quoted\"")?;
        sink.property_name("nums")?;
        sink.begin_array()?;
        sink.i32_value(-1)?;
        sink.u32_value(2)?;
        sink.u64_value(u64::MAX)?;
        sink.f64_value(1.5)?;
        sink.f64_value(f64::NAN)?;
        sink.bool_value(true)?;
        sink.end_array()?;
        sink.property_name("empty")?;
        sink.begin_object()?;
        sink.end_object()?;
        sink.end_object()
    }

    #[test]
    fn test_writer_output() {
        let mut writer = JsonWriter::new(Vec::new());
        write_sample(&mut writer).unwrap();
        assert!(writer.is_complete());
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            out,
            r#"{"checksum":"SAV\"quoted\"","nums":[-1,2,18446744073709551615,1.5,null,true],"empty":{}}"#
        );
    }

    #[test]
    fn test_writer_pretty() {
        let mut writer = JsonWriter::pretty(Vec::new());
        writer.begin_object().unwrap();
        writer.property_name("a").unwrap();
        writer.begin_array().unwrap();
        writer.i32_value(1).unwrap();
        writer.end_array().unwrap();
        writer.end_object().unwrap();
        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(out, "{\n  \"a\": [\n    1\n  ]\n}");
    }

    #[test]
    fn test_value_sink_matches_writer() {
        let mut sink = ValueSink::new();
        write_sample(&mut sink).unwrap();
        let value = sink.into_value().unwrap();
        assert_eq!(
            value,
            json!({
                "checksum": "SAV\"quoted\"",
                "nums": [-1, 2, u64::MAX, 1.5, null, true],
                "empty": {}
            })
        );
    }

    #[test]
    fn test_value_without_key() {
        let mut writer = JsonWriter::new(Vec::new());
        writer.begin_object().unwrap();
        let err = writer.i32_value(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Sink(_)));

        let mut sink = ValueSink::new();
        sink.begin_object().unwrap();
        let err = sink.i32_value(1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Sink(_)));
    }

    #[test]
    fn test_mismatched_scopes() {
        let mut writer = JsonWriter::new(Vec::new());
        writer.begin_object().unwrap();
        assert!(writer.end_array().is_err());

        let mut writer = JsonWriter::new(Vec::new());
        writer.begin_object().unwrap();
        writer.property_name("a").unwrap();
        assert!(writer.end_object().is_err());
        assert!(!writer.is_complete());
    }

    #[test]
    fn test_incomplete_value() {
        let mut sink = ValueSink::new();
        sink.begin_array().unwrap();
        assert!(sink.into_value().is_err());
        assert!(ValueSink::new().into_value().is_err());
    }
}
