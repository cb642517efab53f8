//! Typed column values and their canonical text form.
//!
//! Stores hand back values in many shapes. [`ColumnValue`] closes that set
//! into a tagged variant, and [`ColumnValue::normalise`] renders each kind as
//! the text a scenario author would write in an expectation table.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Literal used in scenario tables to denote SQL `NULL`.
pub const NIL_SENTINEL: &str = "<nil>";

/// An address with an optional prefix length, as stored by `INET`/`CIDR`
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPrefix {
    /// Host or network address.
    pub addr: IpAddr,
    /// Prefix length in bits, when one was stored.
    pub prefix_len: Option<u8>,
}

impl NetworkPrefix {
    /// Parses `addr` or `addr/len`, rejecting prefix lengths wider than the
    /// address family allows.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (addr_text, prefix_text) = match raw.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (raw.trim(), None),
        };
        let addr = IpAddr::from_str(addr_text).ok()?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        let prefix_len = match prefix_text {
            Some(text) => {
                let len = text.parse::<u8>().ok()?;
                if len > max {
                    return None;
                }
                Some(len)
            }
            None => None,
        };
        Some(Self { addr, prefix_len })
    }
}

/// A column value as returned by a store, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL `NULL`.
    Null,
    /// Plain text.
    Text(String),
    /// Integer storage.
    Integer(i64),
    /// Floating-point storage.
    Real(f64),
    /// Fixed 16-byte binary, interpreted as a 128-bit identifier.
    Identifier([u8; 16]),
    /// Variable-length binary.
    Bytes(Vec<u8>),
    /// Structured JSON document.
    Json(serde_json::Value),
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// Network address with optional prefix.
    Network(NetworkPrefix),
    /// Any kind the engine does not recognise, already rendered as text.
    Other(String),
}

impl ColumnValue {
    /// Wraps raw bytes, promoting exactly 16 bytes to an identifier.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match <[u8; 16]>::try_from(bytes.as_slice()) {
            Ok(fixed) => Self::Identifier(fixed),
            Err(_) => Self::Bytes(bytes),
        }
    }

    /// Renders the value as canonical comparable text.
    ///
    /// The conversion is total: kinds without a dedicated rendering fall
    /// back to their display form.
    #[must_use]
    pub fn normalise(&self) -> String {
        match self {
            Self::Null => NIL_SENTINEL.to_owned(),
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::Identifier(bytes) => render_identifier(bytes),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Json(value) => value.to_string(),
            Self::Timestamp(at) => at.to_rfc3339_opts(SecondsFormat::Secs, true),
            Self::Network(prefix) => prefix.addr.to_string(),
            Self::Other(rendered) => rendered.clone(),
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalise())
    }
}

fn render_identifier(bytes: &[u8]) -> String {
    uuid::Uuid::from_slice(bytes).map_or_else(|_| format!("{bytes:?}"), |id| id.to_string())
}

/// Semantic kind suggested by a column's declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// No special interpretation.
    Plain,
    /// Date or timestamp column.
    Timestamp,
    /// JSON document column.
    Json,
    /// Network address column.
    Network,
}

impl ColumnKind {
    /// Classifies a declared column type such as `DATETIME` or `JSONB`.
    #[must_use]
    pub fn from_declared_type(declared: Option<&str>) -> Self {
        let Some(declared_type) = declared else {
            return Self::Plain;
        };
        let upper = declared_type.to_ascii_uppercase();
        if upper.contains("TIME") || upper.contains("DATE") {
            Self::Timestamp
        } else if upper.contains("JSON") {
            Self::Json
        } else if upper.contains("INET") || upper.contains("CIDR") {
            Self::Network
        } else {
            Self::Plain
        }
    }

    /// Interprets stored text according to this kind.
    ///
    /// Text that does not parse for the declared kind is kept verbatim.
    #[must_use]
    pub fn interpret_text(self, text: String) -> ColumnValue {
        let parsed = match self {
            Self::Plain => None,
            Self::Timestamp => parse_timestamp(&text).map(ColumnValue::Timestamp),
            Self::Json => serde_json::from_str(&text).ok().map(ColumnValue::Json),
            Self::Network => NetworkPrefix::parse(&text).map(ColumnValue::Network),
        };
        parsed.unwrap_or(ColumnValue::Text(text))
    }
}

/// Parses the timestamp layouts `SQLite` drivers commonly write.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(at.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f %z"] {
        if let Ok(at) = DateTime::parse_from_str(trimmed, layout) {
            return Some(at.with_timezone(&Utc));
        }
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(ColumnValue::Text("abc".into()), "abc")]
    #[case(ColumnValue::Null, "<nil>")]
    #[case(ColumnValue::Integer(42), "42")]
    #[case(ColumnValue::Bytes(b"raw bytes".to_vec()), "raw bytes")]
    #[case(ColumnValue::Other("custom".into()), "custom")]
    fn renders_scalar_kinds(#[case] value: ColumnValue, #[case] expected: &str) {
        assert_eq!(value.normalise(), expected);
    }

    #[test]
    fn renders_identifier_as_hyphenated_uuid() {
        let value = ColumnValue::from_bytes(vec![
            0x67, 0xe5, 0x50, 0x44, 0x10, 0xb1, 0x42, 0x6f, 0x92, 0x47, 0xbb, 0x68, 0x0e, 0x5f,
            0xe0, 0xc8,
        ]);
        assert_eq!(value.normalise(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn keeps_non_identifier_blobs_as_bytes() {
        let value = ColumnValue::from_bytes(b"short".to_vec());
        assert_eq!(value, ColumnValue::Bytes(b"short".to_vec()));
    }

    #[test]
    fn renders_timestamp_in_utc() {
        let at = Utc
            .with_ymd_and_hms(2009, 11, 10, 23, 0, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(ColumnValue::Timestamp(at).normalise(), "2009-11-10T23:00:00Z");
    }

    #[test]
    fn renders_network_without_prefix() {
        let prefix = NetworkPrefix::parse("192.168.1.10/24").expect("valid prefix");
        assert_eq!(prefix.prefix_len, Some(24));
        assert_eq!(ColumnValue::Network(prefix).normalise(), "192.168.1.10");
    }

    #[test]
    fn renders_json_compactly() {
        let value = ColumnValue::Json(json!({ "a": [1, 2], "b": null }));
        assert_eq!(value.normalise(), r#"{"a":[1,2],"b":null}"#);
    }

    #[rstest]
    #[case("10.0.0.1/33")]
    #[case("not-an-address")]
    #[case("::1/129")]
    fn rejects_invalid_network_text(#[case] raw: &str) {
        assert!(NetworkPrefix::parse(raw).is_none());
    }

    #[rstest]
    #[case(Some("DATETIME"), ColumnKind::Timestamp)]
    #[case(Some("timestamp"), ColumnKind::Timestamp)]
    #[case(Some("JSONB"), ColumnKind::Json)]
    #[case(Some("INET"), ColumnKind::Network)]
    #[case(Some("TEXT"), ColumnKind::Plain)]
    #[case(None, ColumnKind::Plain)]
    fn classifies_declared_types(#[case] declared: Option<&str>, #[case] kind: ColumnKind) {
        assert_eq!(ColumnKind::from_declared_type(declared), kind);
    }

    #[rstest]
    #[case("2009-11-10T23:00:00Z")]
    #[case("2009-11-10 23:00:00+00:00")]
    #[case("2009-11-10 23:00:00.000+00:00")]
    #[case("2009-11-10 23:00:00 +0000")]
    #[case("2009-11-10 23:00:00")]
    #[case("2009-11-11T00:00:00+01:00")]
    fn parses_driver_timestamp_layouts(#[case] raw: &str) {
        let value = ColumnKind::Timestamp.interpret_text(raw.to_owned());
        assert_eq!(value.normalise(), "2009-11-10T23:00:00Z");
    }

    #[test]
    fn unparsable_declared_text_stays_text() {
        let value = ColumnKind::Json.interpret_text("{not json".to_owned());
        assert_eq!(value, ColumnValue::Text("{not json".to_owned()));
    }
}
