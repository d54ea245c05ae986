use chrono::{DateTime, SecondsFormat, Utc};

pub type Timestamp = DateTime<Utc>;

pub fn now() -> Timestamp {
    Utc::now()
}

/// Format a timestamp the way the upstream API expects it in query parameters.
pub fn to_query_param(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Store timestamps as native SurrealDB datetimes so that `ORDER BY` compares instants instead of strings.
pub mod surreal_datetime {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use surrealdb::sql::Datetime;

    use super::Timestamp;

    pub fn serialize<S: Serializer>(timestamp: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        Datetime::from(*timestamp).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let datetime = Datetime::deserialize(deserializer)?;
        Ok(datetime.0)
    }
}
