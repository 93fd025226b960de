//! Decoding of the timestamp encodings the document stores produce.
//!
//! Articles written by different ingestion scripts carry their `timestamp` as
//! RFC 3339 text, epoch milliseconds, MongoDB extended JSON (`{"$date": ..}`)
//! or a Firestore timestamp map (`{"seconds": .., "nanos": ..}`).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Decode a timestamp value. Returns `None` if the value is not a recognised
/// encoding.
pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_str(s),
        Value::Number(n) => n.as_i64().and_then(from_millis),
        Value::Object(map) => {
            if let Some(inner) = map.get("$date") {
                return parse(inner);
            }
            if let Some(Value::String(ms)) = map.get("$numberLong") {
                return ms.parse::<i64>().ok().and_then(from_millis);
            }
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanos")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_encodings() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        assert_eq!(parse(&json!("2024-05-01T12:30:00Z")), Some(expected));
        assert_eq!(parse(&json!("2024-05-01T14:30:00+02:00")), Some(expected));
        assert_eq!(parse(&json!("2024-05-01 12:30:00")), Some(expected));
        assert_eq!(parse(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(parse(&json!({"$date": "2024-05-01T12:30:00Z"})), Some(expected));
        assert_eq!(
            parse(&json!({"$date": {"$numberLong": expected.timestamp_millis().to_string()}})),
            Some(expected)
        );
        assert_eq!(parse(&json!({"seconds": expected.timestamp(), "nanos": 0})), Some(expected));
        assert_eq!(parse(&json!({"_seconds": expected.timestamp(), "_nanoseconds": 0})), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse(&json!("yesterday")), None);
        assert_eq!(parse(&json!(true)), None);
        assert_eq!(parse(&json!(["2024-05-01T12:30:00Z"])), None);
        assert_eq!(parse(&json!({"when": 1})), None);
    }
}
