//! Conversions between domain values and their stored text form.

use chrono::{DateTime, Utc};

use adpulse_core::utils::time_utils::{parse_rfc3339, to_rfc3339_millis};
use adpulse_core::Result;

use crate::errors::StorageError;

pub fn enum_to_db<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

pub fn enum_from_db<T: serde::de::DeserializeOwned>(value: &str) -> Result<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", value))?)
}

pub fn ts_to_db(value: &DateTime<Utc>) -> String {
    to_rfc3339_millis(value)
}

pub fn ts_from_db(value: &str) -> Result<DateTime<Utc>> {
    parse_rfc3339(value)
        .ok_or_else(|| StorageError::InvalidValue(format!("Invalid timestamp '{}'", value)).into())
}

pub fn opt_ts_from_db(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(ts_from_db).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpulse_core::catalog::EntityType;
    use chrono::TimeZone;

    #[test]
    fn enums_store_as_bare_strings() {
        assert_eq!(enum_to_db(&EntityType::AdGroups).unwrap(), "ad_groups");
        assert_eq!(
            enum_from_db::<EntityType>("targets").unwrap(),
            EntityType::Targets
        );
        assert!(enum_from_db::<EntityType>("nope").is_err());
    }

    #[test]
    fn timestamps_round_trip_at_millisecond_precision() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();
        assert_eq!(ts_to_db(&ts), "2026-03-10T09:30:00.000Z");
        assert_eq!(ts_from_db(&ts_to_db(&ts)).unwrap(), ts);
        assert!(ts_from_db("yesterday").is_err());
        assert_eq!(opt_ts_from_db(None).unwrap(), None);
    }
}
