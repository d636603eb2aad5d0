//! Scalar values passed to and returned from data providers.
//!
//! Parameter values arrive as strings. [`ParamKind`] is the closed set of
//! types a provider parameter may declare, and [`ParamKind::coerce`] holds
//! the conversion rule for each of them.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Declared type of a provider parameter.
///
/// The display form is the type name used when rendering a method
/// signature, so it must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Double precision floating point.
    Float64,
    /// `true` / `false`, case-insensitive.
    Bool,
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    /// Date and time, ISO-8601 or RFC 3339.
    DateTime,
    /// Text, passed through unchanged.
    Text,
}

impl ParamKind {
    /// Returns the type name used in canonical method signatures.
    pub fn type_name(self) -> &'static str {
        match self {
            ParamKind::Int32 => "i32",
            ParamKind::Int64 => "i64",
            ParamKind::Float64 => "f64",
            ParamKind::Bool => "bool",
            ParamKind::Date => "NaiveDate",
            ParamKind::DateTime => "NaiveDateTime",
            ParamKind::Text => "String",
        }
    }

    /// Converts a raw string into a value of this kind.
    ///
    /// Surrounding whitespace is ignored for every kind except
    /// [`ParamKind::Text`]. Returns `None` when the string is not a valid
    /// representation.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            ParamKind::Int32 => trimmed.parse().ok().map(Value::Int32),
            ParamKind::Int64 => trimmed.parse().ok().map(Value::Int64),
            ParamKind::Float64 => trimmed.parse().ok().map(Value::Float64),
            ParamKind::Bool => parse_bool(trimmed).map(Value::Bool),
            ParamKind::Date => parse_date(trimmed).map(Value::Date),
            ParamKind::DateTime => parse_date_time(trimmed).map(Value::DateTime),
            ParamKind::Text => Some(Value::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| parse_date_time(raw).map(|value| value.date()))
}

fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_local());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// A single scalar: a bound provider argument or a cell of a data row.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Absent value. Bound when the caller supplied no matching parameter.
    #[default]
    Null,
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Floating point number.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time.
    DateTime(NaiveDateTime),
    /// Text.
    Text(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as an `i32` when it holds one.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an `i64`, widening 32-bit integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(value) => Some(i64::from(*value)),
            Value::Int64(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as an `f64`, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(value) => Some(f64::from(*value)),
            Value::Int64(value) => Some(*value as f64),
            Value::Float64(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the value as a `bool` when it holds one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the date component of date and date-time values.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(value) => Some(*value),
            Value::DateTime(value) => Some(value.date()),
            _ => None,
        }
    }

    /// Returns the value as a date-time when it holds one.
    pub fn as_date_time(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text when the value holds a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int32(value) => write!(f, "{value}"),
            Value::Int64(value) => write!(f, "{value}"),
            Value::Float64(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{}", value.format(DATE_FORMAT)),
            Value::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Value::Text(value) => f.write_str(value),
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from!(
    i32 => Int32,
    i64 => Int64,
    f64 => Float64,
    bool => Bool,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    String => Text,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
