//! Wire types for the backend REST API.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// User profile as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    /// Returns "First Last", or the username when both names are blank.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email_or_username: &'a str,
    pub password: &'a str,
}

/// Body of both the login and the register response.
///
/// Every field is optional: success and failure share one shape and the
/// gateway decides which one it got.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub error: Option<String>,
}

/// New account details for `POST /api/auth/register/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Raw HTTP outcome handed from the client to the gateway.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One row of the download history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(with = "timestamp")]
    pub downloaded_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub from_date: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub to_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<i64>,
}

/// Body for `POST /api/auth/history/record/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewHistoryRecord {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "fromDate", with = "timestamp")]
    pub from_date: DateTime<Utc>,
    #[serde(rename = "toDate", with = "timestamp")]
    pub to_date: DateTime<Utc>,
}

/// Device identifier. The backend sends it as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Gfrid(pub String);

impl<'de> Deserialize<'de> for Gfrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Gfrid(n.to_string()),
            Raw::Text(s) => Gfrid(s),
        })
    }
}

impl fmt::Display for Gfrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Machine summary from `GET /api/machines/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Machine {
    pub gfrid: Gfrid,
    #[serde(default)]
    pub status: Option<String>,
    /// `YYYY-MM-DD HH:mm:ss` as sent by the backend
    #[serde(default)]
    pub last_seen: Option<String>,
}

/// Past-week ON share of one device, from `GET /api/priority-usage/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriorityUsage {
    pub gfrid: Gfrid,
    pub on_percent: f64,
}

/// Query for `GET /api/cumulative-analysis/`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gfrid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

/// Movement bucket of a cumulative analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Movement {
    #[serde(rename = "alertNotify_id")]
    pub alert_notify_id: i64,
    pub duration_hr: f64,
    #[serde(default)]
    pub color: Option<String>,
}

/// Response of `GET /api/cumulative-analysis/`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CumulativeAnalysis {
    #[serde(default)]
    pub on_time_hr: f64,
    #[serde(default)]
    pub off_time_hr: f64,
    #[serde(default, rename = "movements_by_alertNotify")]
    pub movements: Vec<Movement>,
}

pub(crate) mod timestamp {
    //! Timestamps as RFC 3339, or naive ISO-8601 read as UTC.

    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_history_entry_from_backend_json() {
        let json = r#"{
            "id": 7,
            "user": 3,
            "type": "pdf",
            "fromDate": "2024-01-01T00:00:00Z",
            "toDate": "2024-01-31T23:59:59Z",
            "downloadedAt": "2024-02-01T10:15:30.123456Z"
        }"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.kind, "pdf");
        assert_eq!(entry.user, Some(3));
        assert_eq!(
            entry.from_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_timestamp_accepts_naive_and_offset() {
        let naive = timestamp::parse("2024-01-05T08:00:00").unwrap();
        assert_eq!(naive, Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());

        let offset = timestamp::parse("2024-01-05T10:00:00+02:00").unwrap();
        assert_eq!(offset, naive);

        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn test_gfrid_number_or_string() {
        let machines: Vec<Machine> =
            serde_json::from_str(r#"[{"gfrid": 101, "status": "ON"}, {"gfrid": "A7"}]"#).unwrap();
        assert_eq!(machines[0].gfrid.to_string(), "101");
        assert_eq!(machines[1].gfrid.to_string(), "A7");
        assert_eq!(machines[1].status, None);
    }

    #[test]
    fn test_new_history_record_wire_names() {
        let record = NewHistoryRecord {
            user_id: 3,
            kind: "csv".to_string(),
            from_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            to_date: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userId"], 3);
        assert_eq!(json["type"], "csv");
        assert_eq!(json["fromDate"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_cumulative_query_omits_unset() {
        let query = CumulativeQuery {
            gfrid: Some("12".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({"gfrid": "12"}));
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = UserProfile {
            id: 1,
            username: "jdoe".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: String::new(),
        };
        assert_eq!(user.display_name(), "Jane Doe");
        user.first_name.clear();
        user.last_name.clear();
        assert_eq!(user.display_name(), "jdoe");
    }
}
