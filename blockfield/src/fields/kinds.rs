//! Field kinds: the native type of a field and its JSON coercions.
//!
//! `from_json` is deliberately lenient (it is how stored data and scenario
//! files come in); `enforce_type` is the stricter normalization applied to
//! values written through a field.

use std::fmt::Debug;
use std::sync::LazyLock;

use chrono::{DateTime as ChronoDateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use regex::Regex;
use serde_json::{Map, Number, Value};

/// Format of serialized timestamps (always UTC, microsecond precision).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Timedelta units, largest first, with their length in seconds.
const TIMEDELTA_UNITS: [(&str, i64); 4] =
    [("days", 86_400), ("hours", 3_600), ("minutes", 60), ("seconds", 1)];

static TIMEDELTA_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?:(?P<days>\d+?)\s*days?)?",
        r"\s*(?:(?P<hours>\d+?)\s*hours?)?",
        r"\s*(?:(?P<minutes>\d+?)\s*minutes?)?",
        r"\s*(?:(?P<seconds>\d+?)\s*seconds?)?\s*$",
    ))
    .ok()
});

/// The behaviour shared by all fields of one native type.
pub trait FieldKind: Send + Sync + 'static {
    type Native: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Short name used in messages and the CLI.
    const NAME: &'static str;

    /// Whether in-place mutation of a read value is possible, so a read must
    /// snapshot a baseline for change detection.
    const MUTABLE: bool = false;

    /// Value used when a field declares no default.
    fn fallback_default() -> Self::Native;

    fn from_json(value: Value) -> Result<Self::Native, String>;

    fn to_json(value: &Self::Native) -> Value;

    /// Normalize a value written through a field.
    fn enforce_type(value: Self::Native) -> Result<Self::Native, String> {
        Ok(value)
    }

    /// Human-editable rendering: pretty JSON, which is also valid YAML.
    fn to_string(value: &Self::Native) -> Result<String, String> {
        serde_json::to_string_pretty(&Self::to_json(value)).map_err(|err| err.to_string())
    }

    /// Parse the rendering of [`FieldKind::to_string`] (or any YAML).
    fn from_string(text: &str) -> Result<Self::Native, String> {
        if text.trim().is_empty() {
            return Self::from_json(Value::Null);
        }
        let value: Value = serde_yaml::from_str(text).map_err(|err| err.to_string())?;
        Self::from_json(value)
    }
}

fn unexpected(kind: &str, value: &Value) -> String {
    format!("cannot read {value} as {kind}")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

fn float_json(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

/// `None` when the float does not fit an `i64` once truncated.
fn truncate_to_i64(float: f64) -> Option<i64> {
    let truncated = float.trunc();
    // i64::MIN is exactly -2^63; i64::MAX rounds up to 2^63 as a float.
    (truncated >= i64::MIN as f64 && truncated < i64::MAX as f64).then_some(truncated as i64)
}

/// Optional signed integer. `null` and `""` read as absent.
#[derive(Debug)]
pub struct Integer;

impl FieldKind for Integer {
    type Native = Option<i64>;
    const NAME: &'static str = "integer";

    fn fallback_default() -> Self::Native {
        None
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        if is_blank(&value) {
            return Ok(None);
        }
        match &value {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().and_then(truncate_to_i64))
                .map(Some)
                .ok_or_else(|| unexpected(Self::NAME, &value)),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| unexpected(Self::NAME, &value)),
            Value::Bool(flag) => Ok(Some(i64::from(*flag))),
            _ => Err(unexpected(Self::NAME, &value)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

/// Optional float. `null` and `""` read as absent.
#[derive(Debug)]
pub struct Float;

impl FieldKind for Float {
    type Native = Option<f64>;
    const NAME: &'static str = "float";

    fn fallback_default() -> Self::Native {
        None
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        if is_blank(&value) {
            return Ok(None);
        }
        match &value {
            Value::Number(number) => {
                number.as_f64().map(Some).ok_or_else(|| unexpected(Self::NAME, &value))
            }
            Value::String(text) => text
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| unexpected(Self::NAME, &value)),
            Value::Bool(flag) => Ok(Some(if *flag { 1.0 } else { 0.0 })),
            _ => Err(unexpected(Self::NAME, &value)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        value.map(float_json).unwrap_or(Value::Null)
    }

    fn enforce_type(value: Self::Native) -> Result<Self::Native, String> {
        match value {
            Some(float) if !float.is_finite() => Err(format!("{float} has no JSON form")),
            other => Ok(other),
        }
    }
}

/// Boolean. Strings are true only when they spell `true` in any case;
/// everything else follows JSON truthiness.
#[derive(Debug)]
pub struct Boolean;

impl FieldKind for Boolean {
    type Native = bool;
    const NAME: &'static str = "boolean";

    fn fallback_default() -> Self::Native {
        false
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        Ok(match value {
            Value::Null => false,
            Value::Bool(flag) => flag,
            Value::String(text) => text.eq_ignore_ascii_case("true"),
            Value::Number(number) => number.as_f64().is_some_and(|float| float != 0.0),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        })
    }

    fn to_json(value: &Self::Native) -> Value {
        Value::Bool(*value)
    }
}

/// Optional text. Characters that XML 1.0 cannot carry are dropped both
/// on read and on write.
#[derive(Debug)]
pub struct Text;

fn is_xml_invalid(ch: char) -> bool {
    matches!(
        ch,
        '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}'
    )
}

/// Strip characters that cannot appear in an XML document.
pub fn sanitize_text(text: String) -> String {
    if text.chars().any(is_xml_invalid) {
        text.chars().filter(|ch| !is_xml_invalid(*ch)).collect()
    } else {
        text
    }
}

impl FieldKind for Text {
    type Native = Option<String>;
    const NAME: &'static str = "text";

    fn fallback_default() -> Self::Native {
        Some(String::new())
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        match value {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(sanitize_text(text))),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        match value {
            Some(text) => Value::String(sanitize_text(text.clone())),
            None => Value::Null,
        }
    }

    fn enforce_type(value: Self::Native) -> Result<Self::Native, String> {
        Ok(value.map(sanitize_text))
    }

    fn to_string(value: &Self::Native) -> Result<String, String> {
        Ok(value.clone().map(sanitize_text).unwrap_or_default())
    }

    fn from_string(text: &str) -> Result<Self::Native, String> {
        Ok(Some(sanitize_text(text.to_string())))
    }
}

/// A JSON array. `null` reads as empty.
#[derive(Debug)]
pub struct List;

impl FieldKind for List {
    type Native = Vec<Value>;
    const NAME: &'static str = "list";
    const MUTABLE: bool = true;

    fn fallback_default() -> Self::Native {
        Vec::new()
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        Value::Array(value.clone())
    }
}

/// A JSON object. `null` reads as empty.
#[derive(Debug)]
pub struct Dict;

impl FieldKind for Dict {
    type Native = Map<String, Value>;
    const NAME: &'static str = "dict";
    const MUTABLE: bool = true;

    fn fallback_default() -> Self::Native {
        Map::new()
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        match value {
            Value::Null => Ok(Map::new()),
            Value::Object(map) => Ok(map),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        Value::Object(value.clone())
    }
}

/// Any JSON value, stored as-is.
#[derive(Debug)]
pub struct Json;

impl FieldKind for Json {
    type Native = Value;
    const NAME: &'static str = "json";
    const MUTABLE: bool = true;

    fn fallback_default() -> Self::Native {
        Value::Null
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        Ok(value)
    }

    fn to_json(value: &Self::Native) -> Value {
        value.clone()
    }
}

/// Optional UTC timestamp, serialized with microsecond precision. Naive
/// timestamps are read as UTC.
#[derive(Debug)]
pub struct DateTime;

impl FieldKind for DateTime {
    type Native = Option<ChronoDateTime<Utc>>;
    const NAME: &'static str = "datetime";

    fn fallback_default() -> Self::Native {
        None
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        let text = match value {
            Value::Null => return Ok(None),
            Value::String(text) => text,
            other => return Err(unexpected(Self::NAME, &other)),
        };
        if let Ok(parsed) = ChronoDateTime::parse_from_rfc3339(&text) {
            return Ok(Some(parsed.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S"))
            .map(|naive| Some(naive.and_utc()))
            .map_err(|err| format!("cannot read '{text}' as {}: {err}", Self::NAME))
    }

    fn to_json(value: &Self::Native) -> Value {
        match value {
            Some(stamp) => Value::String(stamp.format(DATETIME_FORMAT).to_string()),
            None => Value::Null,
        }
    }

    /// Drop precision below what the serialized form keeps.
    fn enforce_type(value: Self::Native) -> Result<Self::Native, String> {
        Ok(value.map(|stamp| stamp.trunc_subsecs(6)))
    }
}

/// Optional non-negative duration, serialized as
/// `"N days N hours N minutes N seconds"` with zero parts omitted.
#[derive(Debug)]
pub struct Timedelta;

impl FieldKind for Timedelta {
    type Native = Option<Duration>;
    const NAME: &'static str = "timedelta";

    fn fallback_default() -> Self::Native {
        None
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        let text = match value {
            Value::Null => return Ok(None),
            Value::String(text) => text,
            other => return Err(unexpected(Self::NAME, &other)),
        };
        let regex = TIMEDELTA_REGEX
            .as_ref()
            .ok_or_else(|| "timedelta pattern failed to compile".to_string())?;
        let captures = regex
            .captures(&text)
            .ok_or_else(|| format!("cannot read '{text}' as {}", Self::NAME))?;
        let mut total = Duration::zero();
        for (unit, seconds) in TIMEDELTA_UNITS {
            if let Some(part) = captures.name(unit) {
                let count: i64 = part
                    .as_str()
                    .parse()
                    .map_err(|_| format!("{unit} out of range in '{text}'"))?;
                let delta = count
                    .checked_mul(seconds)
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| format!("{unit} out of range in '{text}'"))?;
                total = total
                    .checked_add(&delta)
                    .ok_or_else(|| format!("'{text}' is out of range"))?;
            }
        }
        Ok(Some(total))
    }

    fn to_json(value: &Self::Native) -> Value {
        let Some(delta) = value else {
            return Value::Null;
        };
        let mut remaining = delta.num_seconds().max(0);
        let mut parts = Vec::new();
        for (unit, seconds) in TIMEDELTA_UNITS {
            let count = remaining / seconds;
            remaining %= seconds;
            if count > 0 {
                parts.push(format!("{count} {unit}"));
            }
        }
        Value::String(parts.join(" "))
    }

    /// Whole, non-negative seconds only.
    fn enforce_type(value: Self::Native) -> Result<Self::Native, String> {
        match value {
            Some(delta) if delta < Duration::zero() => {
                Err("negative durations are not supported".to_string())
            }
            Some(delta) => Ok(Duration::try_seconds(delta.num_seconds())),
            None => Ok(None),
        }
    }
}

/// Optional usage id of another block.
#[derive(Debug)]
pub struct Reference;

impl FieldKind for Reference {
    type Native = Option<String>;
    const NAME: &'static str = "reference";

    fn fallback_default() -> Self::Native {
        None
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        match value {
            Value::Null => Ok(None),
            Value::String(id) => Ok(Some(id)),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        value.clone().map(Value::String).unwrap_or(Value::Null)
    }
}

/// Ordered usage ids of other blocks.
#[derive(Debug)]
pub struct ReferenceList;

impl FieldKind for ReferenceList {
    type Native = Vec<String>;
    const NAME: &'static str = "reference_list";
    const MUTABLE: bool = true;

    fn fallback_default() -> Self::Native {
        Vec::new()
    }

    fn from_json(value: Value) -> Result<Self::Native, String> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(id) => Ok(id),
                    other => Err(unexpected(Self::NAME, &other)),
                })
                .collect(),
            other => Err(unexpected(Self::NAME, &other)),
        }
    }

    fn to_json(value: &Self::Native) -> Value {
        Value::Array(value.iter().cloned().map(Value::String).collect())
    }
}
