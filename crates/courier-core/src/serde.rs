// Module name shadows the `serde` crate; use `::serde` for the external crate.
use ::serde::Serializer;
use chrono::{DateTime, SecondsFormat, Utc};

/// Serializes `DateTime<Utc>` as RFC 3339 with millisecond precision,
/// e.g. `2023-02-11T11:09:00.000Z`.
pub fn to_rfc3339_ms<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
