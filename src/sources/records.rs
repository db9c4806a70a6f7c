use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// One row of the ad-event export. The file carries no usable header; fields
/// are bound by position in the fixed column order of the export.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub event_id: i64,
    pub advertiser_name: String,
    pub campaign_name: String,
    pub campaign_start_date: NaiveDate,
    pub campaign_end_date: NaiveDate,
    pub targeting_age: String,
    pub targeting_interest: String,
    pub targeting_country: String,
    pub ad_slot_size: String,
    pub user_id: i64,
    pub device: String,
    pub location: String,
    #[serde(deserialize_with = "de_datetime")]
    pub timestamp: NaiveDateTime,
    pub bid_amount: f64,
    pub ad_cost: f64,
    #[serde(deserialize_with = "de_bool")]
    pub was_clicked: bool,
    #[serde(deserialize_with = "de_opt_datetime")]
    pub click_timestamp: Option<NaiveDateTime>,
    pub ad_revenue: f64,
    pub budget: f64,
    pub remaining_budget: f64,
}

/// One row of the user profile export (headered CSV).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    #[serde(rename = "UserID")]
    pub user_id: i64,
    pub age: i64,
    pub gender: String,
    pub location: String,
    /// Comma-joined free-text interest tags.
    pub interests: String,
    pub signup_date: NaiveDate,
}

/// One row of the campaign export (headered CSV).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignRecord {
    pub advertiser_name: String,
    pub campaign_name: String,
    pub campaign_start_date: NaiveDate,
    pub campaign_end_date: NaiveDate,
    pub budget: f64,
    pub remaining_budget: f64,
    /// Free-text descriptor, e.g. `"Age 18-35, USA, sports"`.
    pub targeting_criteria: String,
    pub ad_slot_size: String,
}

// The exports write timestamps with a space separator; tolerate the ISO `T`
// form as well.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn de_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_datetime(s.trim())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'")))
}

fn de_opt_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    parse_datetime(s)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'")))
}

fn de_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean '{other}'"
        ))),
    }
}
