//! Renewable-seat record as stored in the remote collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::expiry::{self, ExpiryTier};

/// Default renewal length pre-filled in the forms.
///
/// The cadence is stored on the record but never enforced afterwards.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RenewalCadence {
    #[default]
    Day,
    Week,
    Month,
}

impl RenewalCadence {
    pub fn default_days(self) -> i64 {
        match self {
            RenewalCadence::Day => 1,
            RenewalCadence::Week => 7,
            RenewalCadence::Month => 30,
        }
    }
}

/// One renewable account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[serde(with = "pb_time")]
    pub exp_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: u64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub xufei_type: Option<RenewalCadence>,
    #[serde(default, with = "pb_time::option")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, with = "pb_time::option")]
    pub updated: Option<DateTime<Utc>>,
}

impl SeatRecord {
    /// The stored cadence, with an absent value read as `day`.
    pub fn cadence(&self) -> RenewalCadence {
        self.xufei_type.unwrap_or_default()
    }

    pub fn remaining_days(&self, now: DateTime<Utc>) -> i64 {
        expiry::remaining_days(self.exp_time, now)
    }

    pub fn tier(&self, now: DateTime<Utc>) -> ExpiryTier {
        ExpiryTier::classify(self.exp_time, now)
    }
}

/// Writable fields sent on create and update.
///
/// Updates always send every field (a full overwrite of the editable
/// attributes, never a partial patch of a subset).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFields {
    pub name: String,
    pub remark: String,
    #[serde(with = "pb_time")]
    pub exp_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xufei_type: Option<RenewalCadence>,
}

/// The store writes unset select fields as `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<RenewalCadence>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Number fields come back as JSON numbers that may carry a fractional part
/// or be null.
fn lenient_limit<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(0),
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v.trunc() as u64),
        Some(v) => Err(serde::de::Error::custom(format!("limit must be non-negative, got {v}"))),
    }
}

/// Datetime codec for the record store.
///
/// The store emits `2025-03-10 12:00:00.000Z`; RFC 3339 (`T` separator) is
/// accepted on input as well.
pub mod pb_time {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

    pub fn format(value: &DateTime<Utc>) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        let naive = raw.strip_suffix('Z').unwrap_or(raw);
        NaiveDateTime::parse_from_str(naive, "%Y-%m-%d %H:%M:%S%.f")
            .map(|n| n.and_utc())
            .map_err(|e| format!("invalid datetime '{raw}': {e}"))
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_str(&super::format(v)),
                None => serializer.serialize_str(""),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(s) => super::parse(s).map(Some).map_err(serde::de::Error::custom),
            }
        }
    }
}
