use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

/// Calendar date of the current UTC day; challenges are keyed by it.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}
