//! Value type inference and column kind detection

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use dash_core::{TabularResult, Value};

use crate::config::NullConfig;

/// One step of the inference chain
///
/// Matchers are tried in order and the first one that accepts the text
/// decides the value; `Text` accepts everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatcher {
    Null,
    Number,
    Boolean,
    Date,
    Text,
}

impl TypeMatcher {
    pub const DEFAULT_ORDER: [TypeMatcher; 5] = [
        TypeMatcher::Null,
        TypeMatcher::Number,
        TypeMatcher::Boolean,
        TypeMatcher::Date,
        TypeMatcher::Text,
    ];

    /// Try to interpret already-unquoted text
    pub fn try_match(&self, text: &str, nulls: &NullConfig) -> Option<Value> {
        match self {
            TypeMatcher::Null => nulls.is_null(text).then_some(Value::Null),
            TypeMatcher::Number => parse_number(text).map(Value::Number),
            TypeMatcher::Boolean => parse_bool(text).map(Value::Bool),
            TypeMatcher::Date => parse_date(text).map(Value::Date),
            TypeMatcher::Text => Some(Value::String(text.to_string())),
        }
    }
}

/// Turns raw field text into typed values
#[derive(Debug, Clone)]
pub struct ValueInferrer {
    matchers: Vec<TypeMatcher>,
    nulls: NullConfig,
}

impl ValueInferrer {
    pub fn new(nulls: NullConfig) -> Self {
        Self {
            matchers: TypeMatcher::DEFAULT_ORDER.to_vec(),
            nulls,
        }
    }

    /// Use a custom matcher order; a trailing `Text` is appended if missing
    pub fn with_matchers(mut self, mut matchers: Vec<TypeMatcher>) -> Self {
        if matchers.last() != Some(&TypeMatcher::Text) {
            matchers.push(TypeMatcher::Text);
        }
        self.matchers = matchers;
        self
    }

    pub fn matchers(&self) -> &[TypeMatcher] {
        &self.matchers
    }

    pub fn infer(&self, raw: &str) -> Value {
        let text = strip_quotes(raw.trim());
        self.matchers
            .iter()
            .find_map(|matcher| matcher.try_match(text, &self.nulls))
            .unwrap_or_else(|| Value::String(text.to_string()))
    }
}

impl Default for ValueInferrer {
    fn default() -> Self {
        Self::new(NullConfig::default())
    }
}

/// Remove one leading and one trailing quote character, independently
pub fn strip_quotes(text: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let text = text.strip_prefix(is_quote).unwrap_or(text);
    text.strip_suffix(is_quote).unwrap_or(text)
}

fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Dates of the form `YYYY-M-D` or `YYYY/M/D`, optionally followed by a
/// `T` or space separated time of day
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let (date, rest) = split_date_prefix(text)?;
    if rest.is_empty() {
        return Some(date.and_time(NaiveTime::MIN));
    }

    if let Ok(stamped) = DateTime::parse_from_rfc3339(text) {
        return Some(stamped.naive_utc());
    }

    let time = rest.strip_prefix('T').or_else(|| rest.strip_prefix(' '))?;
    let time = time.strip_suffix('Z').unwrap_or(time);
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())
        .map(|t| date.and_time(t))
}

fn split_date_prefix(text: &str) -> Option<(NaiveDate, &str)> {
    let bytes = text.as_bytes();
    if bytes.len() < 8 || !bytes[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let sep = bytes[4];
    if sep != b'-' && sep != b'/' {
        return None;
    }

    let (month, after_month) = take_digits(&bytes[5..], 2)?;
    let next = *after_month.first()?;
    if next != b'-' && next != b'/' {
        return None;
    }
    let (day, rest) = take_digits(&after_month[1..], 2)?;
    if rest.first().map_or(false, u8::is_ascii_digit) {
        return None;
    }

    let year: i32 = text[..4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let consumed = bytes.len() - rest.len();
    Some((date, &text[consumed..]))
}

fn take_digits(bytes: &[u8], max: usize) -> Option<(u32, &[u8])> {
    let len = bytes.iter().take(max).take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let value = bytes[..len]
        .iter()
        .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'));
    Some((value, &bytes[len..]))
}

/// Dominant kind of a column's non-null values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every value is null
    Empty,
    Number,
    Boolean,
    Date,
    /// Strings, or a mix of kinds
    Text,
}

impl ColumnKind {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnKind::Empty => "empty",
            ColumnKind::Number => "number",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
        }
    }

    fn of(value: &Value) -> Option<ColumnKind> {
        match value {
            Value::Null => None,
            Value::Number(_) => Some(ColumnKind::Number),
            Value::Bool(_) => Some(ColumnKind::Boolean),
            Value::Date(_) => Some(ColumnKind::Date),
            Value::String(_) => Some(ColumnKind::Text),
        }
    }
}

/// Statistics about a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnKind,
    pub null_count: usize,
    pub distinct_count: usize,
}

/// Detect the kind of a sequence of values
pub fn detect_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut detected = ColumnKind::Empty;
    for kind in values.into_iter().filter_map(ColumnKind::of) {
        detected = match detected {
            ColumnKind::Empty => kind,
            current if current == kind => current,
            _ => return ColumnKind::Text,
        };
    }
    detected
}

/// Summarise every column of a table
pub fn describe(table: &TabularResult) -> Vec<ColumnSummary> {
    table
        .headers()
        .iter()
        .map(|name| {
            let kind = detect_kind(table.column(name));
            let null_count = table.column(name).filter(|v| v.is_null()).count();
            let distinct_count = table
                .column(name)
                .filter(|v| !v.is_null())
                .map(|v| (v.kind(), v.to_string()))
                .collect::<HashSet<_>>()
                .len();
            ColumnSummary {
                name: name.clone(),
                kind,
                null_count,
                distinct_count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(raw: &str) -> Value {
        ValueInferrer::default().infer(raw)
    }

    #[test]
    fn test_inference_examples() {
        assert_eq!(infer(""), Value::Null);
        assert_eq!(infer("42"), Value::Number(42.0));
        assert_eq!(infer("3.14e2"), Value::Number(314.0));
        assert_eq!(infer("TRUE"), Value::Bool(true));
        assert_eq!(infer("false"), Value::Bool(false));
        assert_eq!(
            infer("2024-01-15").as_date(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(infer("hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn test_quotes_stripped_once() {
        assert_eq!(infer("'7'"), Value::Number(7.0));
        assert_eq!(infer("\"\"x\"\""), Value::String("\"x\"".to_string()));
        assert_eq!(infer("''"), Value::Null);
    }

    #[test]
    fn test_non_finite_numbers_are_text() {
        assert_eq!(infer("inf"), Value::String("inf".to_string()));
        assert_eq!(infer("NaN"), Value::String("NaN".to_string()));
    }

    #[test]
    fn test_date_variants() {
        assert_eq!(infer("2024/3/5").as_date(), NaiveDate::from_ymd_opt(2024, 3, 5));
        let stamped = infer("2024-01-15T08:30:00").as_datetime().unwrap();
        assert_eq!(stamped.format("%H:%M").to_string(), "08:30");
        let zoned = infer("2024-01-15T08:30:00Z").as_datetime().unwrap();
        assert_eq!(zoned, stamped);
        // Impossible calendar dates fall through to text
        assert_eq!(infer("2024-02-30"), Value::String("2024-02-30".to_string()));
        assert_eq!(infer("2024-01-15 extra"), Value::String("2024-01-15 extra".to_string()));
    }

    #[test]
    fn test_matchers_individually() {
        let nulls = NullConfig::new(vec!["-".to_string()]);
        assert_eq!(TypeMatcher::Null.try_match("-", &nulls), Some(Value::Null));
        assert_eq!(TypeMatcher::Number.try_match("abc", &nulls), None);
        assert_eq!(TypeMatcher::Boolean.try_match("True", &nulls), Some(Value::Bool(true)));
        assert_eq!(TypeMatcher::Date.try_match("2024", &nulls), None);
        assert!(TypeMatcher::Text.try_match("anything", &nulls).is_some());
    }

    #[test]
    fn test_custom_matcher_order() {
        let inferrer = ValueInferrer::default().with_matchers(vec![TypeMatcher::Null]);
        assert_eq!(inferrer.matchers().len(), 2);
        assert_eq!(inferrer.infer("42"), Value::String("42".to_string()));
    }

    #[test]
    fn test_detect_kind() {
        let numbers = [Value::Number(1.0), Value::Null, Value::Number(2.0)];
        assert_eq!(detect_kind(&numbers), ColumnKind::Number);
        let mixed = [Value::Number(1.0), Value::from("a")];
        assert_eq!(detect_kind(&mixed), ColumnKind::Text);
        assert_eq!(detect_kind(&[Value::Null]), ColumnKind::Empty);
    }
}
