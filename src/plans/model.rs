//! Core types for plans.
//!
//! A plan is a reminder addressed to a chat, with a recurrence rule and the
//! date it was last included in a digest. The serialized field names match
//! the plan document written by earlier versions of the bot, so existing
//! `plans.json` files load unchanged.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single reminder plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Plan {
    /// Destination chat.
    #[serde(default)]
    pub channel_id: i64,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub period: Period,
    /// Payload interpreted according to `period`.
    #[serde(default)]
    pub period_value: String,
    /// Date of the most recent firing; `None` means never sent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "last_sent::serialize",
        deserialize_with = "last_sent::deserialize"
    )]
    pub last_sent: Option<NaiveDate>,
    #[serde(default)]
    pub summary: String,
}

impl Plan {
    pub fn new(
        channel_id: i64,
        id: i64,
        period: Period,
        period_value: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            channel_id,
            id,
            period,
            period_value: period_value.into(),
            last_sent: None,
            summary: summary.into(),
        }
    }

    pub fn with_last_sent(mut self, date: NaiveDate) -> Self {
        self.last_sent = Some(date);
        self
    }
}

/// How a plan recurs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Period {
    /// Every N days since the last firing (`"N"`).
    EveryNDays,
    /// On the listed ISO weekdays, Monday=1 .. Sunday=7 (`"W"`).
    WeeklyOnDays,
    /// On a single calendar date (`"O"`).
    Once,
    /// Any other code; kept verbatim so rewrites don't lose it. Never due.
    Unknown(String),
}

impl Period {
    /// The code stored in the plan document.
    pub fn code(&self) -> &str {
        match self {
            Period::EveryNDays => "N",
            Period::WeeklyOnDays => "W",
            Period::Once => "O",
            Period::Unknown(code) => code,
        }
    }
}

/// A record without a period keeps an empty code and is never due.
impl Default for Period {
    fn default() -> Self {
        Period::Unknown(String::new())
    }
}

impl From<String> for Period {
    fn from(code: String) -> Self {
        match code.as_str() {
            "N" => Period::EveryNDays,
            "W" => Period::WeeklyOnDays,
            "O" => Period::Once,
            _ => Period::Unknown(code),
        }
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.code().to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `LastSent` is stored as a timestamp of local midnight. The zero timestamp,
/// `null`, and a missing field all mean "never".
mod last_sent {
    use super::*;

    const ZERO_TIMESTAMP_PREFIX: &str = "0001-01-01";

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&format_midnight(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s).map_err(serde::de::Error::custom),
        }
    }

    pub(super) fn parse(s: &str) -> Result<Option<NaiveDate>, String> {
        let s = s.trim();
        if s.is_empty() || s.starts_with(ZERO_TIMESTAMP_PREFIX) {
            return Ok(None);
        }
        // The wall-clock date at the timestamp's own offset.
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Some(ts.date_naive()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| format!("invalid LastSent '{s}': {e}"))
    }

    pub(super) fn format_midnight(date: NaiveDate) -> String {
        match Local
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()
        {
            Some(midnight) => midnight.to_rfc3339(),
            // Midnight skipped by a DST jump; fall back to the bare date.
            None => date.format("%Y-%m-%d").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_codes() {
        assert_eq!(Period::from("N".to_string()), Period::EveryNDays);
        assert_eq!(Period::from("W".to_string()), Period::WeeklyOnDays);
        assert_eq!(Period::from("O".to_string()), Period::Once);
        assert_eq!(
            Period::from("X".to_string()),
            Period::Unknown("X".to_string())
        );
        assert_eq!(Period::Unknown("monthly".into()).code(), "monthly");
    }

    #[test]
    fn plan_deserializes_legacy_document() {
        let json = r#"{
            "ChannelId": -100123,
            "Id": 7,
            "Period": "N",
            "PeriodValue": "3",
            "LastSent": "2024-12-22T00:00:00+03:00",
            "Summary": "Water the plants"
        }"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.channel_id, -100123);
        assert_eq!(plan.id, 7);
        assert_eq!(plan.period, Period::EveryNDays);
        assert_eq!(plan.period_value, "3");
        assert_eq!(plan.last_sent, Some(date(2024, 12, 22)));
        assert_eq!(plan.summary, "Water the plants");
    }

    #[test]
    fn zero_timestamp_means_never() {
        let json = r#"{"ChannelId":1,"Id":1,"Period":"N","PeriodValue":"1",
            "LastSent":"0001-01-01T00:00:00Z","Summary":"a"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.last_sent, None);
    }

    #[test]
    fn missing_and_null_last_sent_mean_never() {
        let missing = r#"{"ChannelId":1,"Id":1,"Period":"W","PeriodValue":"1","Summary":"a"}"#;
        let null = r#"{"ChannelId":1,"Id":1,"Period":"W","PeriodValue":"1","LastSent":null,"Summary":"a"}"#;
        assert_eq!(serde_json::from_str::<Plan>(missing).unwrap().last_sent, None);
        assert_eq!(serde_json::from_str::<Plan>(null).unwrap().last_sent, None);
    }

    #[test]
    fn bare_date_last_sent_accepted() {
        assert_eq!(last_sent::parse("2024-01-31"), Ok(Some(date(2024, 1, 31))));
    }

    #[test]
    fn garbage_last_sent_rejected() {
        let json = r#"{"ChannelId":1,"Id":1,"Period":"W","PeriodValue":"1","LastSent":"yesterday","Summary":"a"}"#;
        assert!(serde_json::from_str::<Plan>(json).is_err());
    }

    #[test]
    fn missing_fields_take_zero_values() {
        let json = r#"{"ChannelId":5,"PeriodValue":"1","Summary":"x"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.channel_id, 5);
        assert_eq!(plan.id, 0);
        assert_eq!(plan.period, Period::Unknown(String::new()));
    }

    #[test]
    fn unknown_period_survives_rewrite() {
        let json = r#"{"ChannelId":1,"Id":1,"Period":"M","PeriodValue":"15","Summary":"rent"}"#;
        let plan: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.period, Period::Unknown("M".into()));
        let out = serde_json::to_value(&plan).unwrap();
        assert_eq!(out["Period"], "M");
    }

    #[test]
    fn last_sent_written_as_local_midnight() {
        let plan = Plan::new(1, 1, Period::Once, "25/12/2024", "gift")
            .with_last_sent(date(2024, 12, 25));
        let out = serde_json::to_value(&plan).unwrap();
        let written = out["LastSent"].as_str().unwrap().to_string();
        assert_eq!(last_sent::parse(&written), Ok(Some(date(2024, 12, 25))));
    }

    #[test]
    fn never_sent_omits_last_sent() {
        let plan = Plan::new(1, 1, Period::EveryNDays, "2", "stretch");
        let out = serde_json::to_value(&plan).unwrap();
        assert!(out.get("LastSent").is_none());
        assert_eq!(out["Period"], "N");
        assert_eq!(out["PeriodValue"], "2");
    }
}
