//! Timestamp columns are TEXT in a fixed-width RFC 3339 form so that
//! lexicographic order in SQL is chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::StoreError;

pub(crate) fn encode(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("invalid timestamp '{raw}' in row: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn encoding_sorts_chronologically() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::microseconds(1);
        let t2 = t0 + Duration::seconds(1);
        assert!(encode(t0) < encode(t1));
        assert!(encode(t1) < encode(t2));
        assert_eq!(encode(t0).len(), encode(t2).len());
    }

    #[test]
    fn decodes_what_it_encodes() {
        let t = Utc::now();
        let back = decode(&encode(t)).unwrap();
        assert_eq!(back.timestamp_micros(), t.timestamp_micros());
    }
}
