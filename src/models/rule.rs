use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// How long a recurrence rule stays active after it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "duration_type")]
pub enum Validity {
    #[serde(rename = "forever")]
    Forever,
    #[serde(rename = "weeks")]
    ForWeeks {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_value: Option<u32>,
    },
    #[serde(rename = "months")]
    ForMonths {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_value: Option<u32>,
    },
    /// Inclusive end date. A rule without one never expires.
    #[serde(rename = "until_date")]
    UntilDate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        valid_until: Option<NaiveDate>,
    },
}

/// A weekly availability window maintained by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub validity: Validity,
    #[serde(default, with = "opt_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

fn default_enabled() -> bool {
    true
}

impl RecurrenceRule {
    pub fn new(day_of_week: u8, start_time: &str, end_time: &str, validity: Validity) -> Self {
        Self {
            id: None,
            day_of_week,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            enabled: true,
            validity,
            created_at: None,
        }
    }

    /// Rules used when no rule set has been saved yet: Monday 13:00-15:00
    /// and Tuesday 11:00-13:00, both without expiry.
    pub fn defaults() -> Vec<RecurrenceRule> {
        let mut monday = RecurrenceRule::new(1, "13:00", "15:00", Validity::Forever);
        monday.id = Some("1".to_string());
        let mut tuesday = RecurrenceRule::new(2, "11:00", "13:00", Validity::Forever);
        tuesday.id = Some("2".to_string());
        vec![monday, tuesday]
    }

    pub fn matches_weekday(&self, day: NaiveDate) -> bool {
        u32::from(self.day_of_week) == day.weekday().num_days_from_sunday()
    }

    /// Start and end of the window as minutes after midnight, `start < end`.
    pub fn window_minutes(&self) -> Result<(u32, u32), RuleError> {
        let start = parse_clock(&self.start_time)?;
        let end = parse_clock(&self.end_time)?;
        if end <= start {
            return Err(RuleError::InvertedInterval {
                start: self.start_time.clone(),
                end: self.end_time.clone(),
            });
        }
        Ok((start, end))
    }

    /// Whether the validity policy still covers `day`. Week and month
    /// durations count from `created_at`, or from `now` when the rule has
    /// no creation timestamp.
    pub fn is_active_on(&self, day: NaiveDate, now: NaiveDateTime) -> Result<bool, RuleError> {
        let anchor = self.created_at.unwrap_or(now).date();

        match &self.validity {
            Validity::Forever => Ok(true),
            Validity::UntilDate { valid_until } => Ok(valid_until.map_or(true, |until| until >= day)),
            Validity::ForWeeks { duration_value } => {
                let weeks = positive(*duration_value).ok_or(RuleError::MissingDuration("weeks"))?;
                let expires = anchor.checked_add_signed(Duration::weeks(i64::from(weeks)));
                Ok(expires.map_or(true, |expires| expires >= day))
            }
            Validity::ForMonths { duration_value } => {
                let months = positive(*duration_value).ok_or(RuleError::MissingDuration("months"))?;
                // Calendar months; the day clamps to the end of shorter months.
                let expires = anchor.checked_add_months(Months::new(months));
                Ok(expires.map_or(true, |expires| expires >= day))
            }
        }
    }

    /// Checks everything an administrator could get wrong when saving a rule.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.day_of_week > 6 {
            return Err(RuleError::InvalidWeekday(self.day_of_week));
        }
        self.window_minutes()?;
        match self.validity {
            Validity::ForWeeks { duration_value } if positive(duration_value).is_none() => {
                Err(RuleError::MissingDuration("weeks"))
            }
            Validity::ForMonths { duration_value } if positive(duration_value).is_none() => {
                Err(RuleError::MissingDuration("months"))
            }
            _ => Ok(()),
        }
    }
}

// A zero duration counts as no duration at all
fn positive(value: Option<u32>) -> Option<u32> {
    value.filter(|v| *v > 0)
}

/// Parses "HH:MM" (or "HH:MM:SS" as stored by SQL time columns) into
/// minutes after midnight.
pub fn parse_clock(value: &str) -> Result<u32, RuleError> {
    let trimmed = value.trim();
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| RuleError::MalformedTime(value.to_string()))?;
    Ok(time.hour() * 60 + time.minute())
}

pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Timestamps arrive either as RFC 3339 strings from a hosted database or
/// as naive local values. Offsets are dropped, keeping the wall clock.
mod opt_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };

        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(Some(ts.naive_local()));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("09:30"), Ok(570));
        assert_eq!(parse_clock("13:00:00"), Ok(780));
        assert!(parse_clock("25:00").is_err());
        assert!(parse_clock("nine").is_err());
        assert_eq!(format_clock(570), "09:30");
    }

    #[test]
    fn test_deserialize_hosted_row() {
        let rule: RecurrenceRule = serde_json::from_value(json!({
            "id": "abc",
            "day_of_week": 3,
            "start_time": "09:00",
            "end_time": "11:00",
            "enabled": true,
            "duration_type": "weeks",
            "duration_value": 4,
            "created_at": "2025-03-01T08:15:00+00:00"
        }))
        .unwrap();

        assert_eq!(rule.validity, Validity::ForWeeks { duration_value: Some(4) });
        assert_eq!(rule.created_at, Some(at(2025, 3, 1).date().and_hms_opt(8, 15, 0).unwrap()));
    }

    #[test]
    fn test_until_date_without_date_never_expires() {
        let rule = RecurrenceRule::new(1, "09:00", "10:00", Validity::UntilDate { valid_until: None });
        let day = NaiveDate::from_ymd_opt(2099, 1, 5).unwrap();
        assert_eq!(rule.is_active_on(day, at(2025, 1, 1)), Ok(true));
    }

    #[test]
    fn test_months_clamp_to_month_end() {
        let mut rule = RecurrenceRule::new(
            0,
            "09:00",
            "10:00",
            Validity::ForMonths { duration_value: Some(1) },
        );
        rule.created_at = Some(at(2025, 1, 31));

        let last = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        let after = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(rule.is_active_on(last, at(2025, 1, 31)), Ok(true));
        assert_eq!(rule.is_active_on(after, at(2025, 1, 31)), Ok(false));
    }

    #[test]
    fn test_validate_rejects_bad_rules() {
        let rule = RecurrenceRule::new(7, "09:00", "10:00", Validity::Forever);
        assert_eq!(rule.validate(), Err(RuleError::InvalidWeekday(7)));

        let rule = RecurrenceRule::new(1, "10:00", "10:00", Validity::Forever);
        assert!(matches!(rule.validate(), Err(RuleError::InvertedInterval { .. })));

        let rule = RecurrenceRule::new(1, "09:00", "10:00", Validity::ForMonths { duration_value: None });
        assert_eq!(rule.validate(), Err(RuleError::MissingDuration("months")));

        let rule = RecurrenceRule::new(1, "09:00", "10:00", Validity::ForWeeks { duration_value: Some(0) });
        assert_eq!(rule.validate(), Err(RuleError::MissingDuration("weeks")));

        let rule = RecurrenceRule::new(1, "09:00", "10:00", Validity::ForWeeks { duration_value: Some(2) });
        assert!(rule.validate().is_ok());
    }

    #[test]
    fn test_zero_duration_is_missing() {
        let mut rule = RecurrenceRule::new(1, "09:00", "10:00", Validity::ForMonths { duration_value: Some(0) });
        rule.created_at = Some(at(2025, 6, 2));

        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(
            rule.is_active_on(day, at(2025, 6, 2)),
            Err(RuleError::MissingDuration("months"))
        );
    }
}
